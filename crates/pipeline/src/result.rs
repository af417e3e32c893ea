//! Per-community result row

use crate::credit::{CreditInputs, CreditTotals};
use serde::{Deserialize, Serialize};

/// The fifteen numeric fields recorded for one community. Field names
/// match the columns added to the hazard-boundary copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityResult {
    #[serde(rename = "CID")]
    pub community_id: String,
    #[serde(rename = "SFHA_Area_Acres")]
    pub sfha_acres: f64,
    #[serde(rename = "aSFHA_Area_Acres")]
    pub asfha_acres: f64,
    #[serde(rename = "OSP_Acres_Curr")]
    pub osp_acres_curr: f64,
    #[serde(rename = "OSP_Cred_Curr")]
    pub osp_cred_curr: f64,
    #[serde(rename = "NFOS1_Acres_Curr")]
    pub nfos1_acres_curr: f64,
    #[serde(rename = "NFOS1_Cred_Curr")]
    pub nfos1_cred_curr: f64,
    #[serde(rename = "OSP_Acres_Future")]
    pub osp_acres_future: f64,
    #[serde(rename = "OSP_Cred_Future")]
    pub osp_cred_future: f64,
    #[serde(rename = "OSP_Acres_Total")]
    pub osp_acres_total: f64,
    #[serde(rename = "NFOS1_Cred_Future_Max")]
    pub nfos1_cred_future_max: f64,
    #[serde(rename = "NFOS2_Cred_Future_Max")]
    pub nfos2_cred_future_max: f64,
    #[serde(rename = "DR_Cred_Future_Max")]
    pub dr_cred_future_max: f64,
    #[serde(rename = "OSP_Cred_Curr_Total")]
    pub osp_cred_curr_total: f64,
    #[serde(rename = "OSP_Cred_Future_Max")]
    pub osp_cred_future_max: f64,
    #[serde(rename = "OSP_Cred_Future_Total")]
    pub osp_cred_future_total: f64,
}

impl CommunityResult {
    /// All-zero row
    pub fn zeroed(community_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            ..Default::default()
        }
    }

    pub fn new(community_id: impl Into<String>, sfha_acres: f64, inputs: &CreditInputs, totals: &CreditTotals) -> Self {
        Self {
            community_id: community_id.into(),
            sfha_acres,
            asfha_acres: inputs.asfha_acres,
            osp_acres_curr: inputs.osp_acres,
            osp_cred_curr: inputs.osp_credit,
            nfos1_acres_curr: inputs.nfos_acres,
            nfos1_cred_curr: inputs.nfos_credit,
            osp_acres_future: inputs.opportunity_acres,
            osp_cred_future: inputs.opportunity_credit,
            osp_acres_total: totals.osp_acres_total,
            nfos1_cred_future_max: totals.nfos1_future_max,
            nfos2_cred_future_max: totals.nfos2_future_max,
            dr_cred_future_max: totals.dr_future_max,
            osp_cred_curr_total: totals.current_total,
            osp_cred_future_max: totals.future_max,
            osp_cred_future_total: totals.future_total,
        }
    }

    /// `(column, value)` pairs in table order
    pub fn columns(&self) -> [(&'static str, f64); 15] {
        [
            ("SFHA_Area_Acres", self.sfha_acres),
            ("aSFHA_Area_Acres", self.asfha_acres),
            ("OSP_Acres_Curr", self.osp_acres_curr),
            ("OSP_Cred_Curr", self.osp_cred_curr),
            ("NFOS1_Acres_Curr", self.nfos1_acres_curr),
            ("NFOS1_Cred_Curr", self.nfos1_cred_curr),
            ("OSP_Acres_Future", self.osp_acres_future),
            ("OSP_Cred_Future", self.osp_cred_future),
            ("OSP_Acres_Total", self.osp_acres_total),
            ("NFOS1_Cred_Future_Max", self.nfos1_cred_future_max),
            ("NFOS2_Cred_Future_Max", self.nfos2_cred_future_max),
            ("DR_Cred_Future_Max", self.dr_cred_future_max),
            ("OSP_Cred_Curr_Total", self.osp_cred_curr_total),
            ("OSP_Cred_Future_Max", self.osp_cred_future_max),
            ("OSP_Cred_Future_Total", self.osp_cred_future_total),
        ]
    }
}
