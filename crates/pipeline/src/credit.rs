//! CRS credit scenarios
//!
//! Turns the acreage and credit sums of one community into current, future
//! and maximum credit totals. Every ratio against the aSFHA is 0 when the
//! aSFHA is empty.

use crate::fields::weighted_share;
use floodosp_core::{Algorithm, Error};
use serde::{Deserialize, Serialize};

/// Sums produced by the eligibility and opportunity stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditInputs {
    pub osp_acres: f64,
    pub osp_credit: f64,
    pub nfos_acres: f64,
    pub nfos_credit: f64,
    pub opportunity_acres: f64,
    pub opportunity_credit: f64,
    pub asfha_acres: f64,
}

/// Extra-credit weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditWeights {
    pub nfos1: f64,
    pub nfos2: f64,
}

impl Default for CreditWeights {
    fn default() -> Self {
        Self {
            nfos1: 190.0,
            nfos2: 50.0,
        }
    }
}

/// Derived credit totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditTotals {
    pub osp_acres_total: f64,
    pub nfos1_future_max: f64,
    pub nfos2_future_max: f64,
    /// Deed restrictions, same formula as NFOS2
    pub dr_future_max: f64,
    pub current_total: f64,
    pub future_total: f64,
    pub future_max: f64,
}

/// Pure credit arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCalculator;

impl CreditCalculator {
    pub fn compute(inputs: &CreditInputs, weights: &CreditWeights) -> CreditTotals {
        let osp_acres_total = inputs.osp_acres + inputs.opportunity_acres;
        let nfos1_future_max = weighted_share(osp_acres_total, inputs.asfha_acres, weights.nfos1);
        let nfos2_future_max = weighted_share(osp_acres_total, inputs.asfha_acres, weights.nfos2);
        let dr_future_max = nfos2_future_max;
        let current_total = inputs.osp_credit + inputs.nfos_credit;
        let future_total = current_total + inputs.opportunity_credit;
        let future_max = inputs.osp_credit
            + inputs.opportunity_credit
            + nfos1_future_max
            + nfos2_future_max
            + dr_future_max;

        CreditTotals {
            osp_acres_total,
            nfos1_future_max,
            nfos2_future_max,
            dr_future_max,
            current_total,
            future_total,
            future_max,
        }
    }
}

impl Algorithm for CreditCalculator {
    type Input = CreditInputs;
    type Output = CreditTotals;
    type Params = CreditWeights;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CreditCalculator"
    }

    fn description(&self) -> &'static str {
        "CRS open space credit scenarios from eligible and opportunity acreage"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output, Self::Error> {
        Ok(Self::compute(&input, &params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scenarios() {
        let inputs = CreditInputs {
            osp_acres: 8.0,
            osp_credit: 8.0 / 85.0 * 1450.0,
            nfos_acres: 8.0,
            nfos_credit: 8.0 / 85.0 * 190.0,
            opportunity_acres: 20.0,
            opportunity_credit: 20.0 / 85.0 * 1450.0,
            asfha_acres: 85.0,
        };
        let t = CreditCalculator.execute_default(inputs).unwrap();

        assert_eq!(t.osp_acres_total, inputs.osp_acres + inputs.opportunity_acres);
        assert_relative_eq!(t.nfos1_future_max, 28.0 / 85.0 * 190.0, epsilon = 1e-9);
        assert_relative_eq!(t.nfos2_future_max, 28.0 / 85.0 * 50.0, epsilon = 1e-9);
        assert_eq!(t.dr_future_max, t.nfos2_future_max);
        assert_relative_eq!(t.current_total, inputs.osp_credit + inputs.nfos_credit, epsilon = 1e-9);
        assert_relative_eq!(t.future_total, t.current_total + inputs.opportunity_credit, epsilon = 1e-9);
        assert_relative_eq!(
            t.future_max,
            inputs.osp_credit + inputs.opportunity_credit + t.nfos1_future_max + 2.0 * t.nfos2_future_max,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_hazard_area() {
        let inputs = CreditInputs {
            osp_acres: 3.0,
            ..Default::default()
        };
        let t = CreditCalculator::compute(&inputs, &CreditWeights::default());
        assert_eq!(t.osp_acres_total, 3.0);
        assert_eq!(t.nfos1_future_max, 0.0);
        assert_eq!(t.nfos2_future_max, 0.0);
        assert_eq!(t.dr_future_max, 0.0);
        assert_eq!(t.future_max, 0.0);
        assert!(t.future_max.is_finite());
    }
}
