//! # floodosp Pipeline
//!
//! Per-community Open Space Preservation credit workflow for the FEMA
//! Community Rating System.
//!
//! For every community the pipeline
//!
//! 1. extracts the community boundary and clips the inputs to it ([`region`])
//! 2. erases large open water and federal/tribal land from the SFHA ([`exclusion`])
//! 3. scores protected land inside the adjusted SFHA ([`eligibility`])
//! 4. searches the remaining undeveloped land for opportunities ([`opportunity`])
//! 5. derives credit scenarios ([`credit`])
//!
//! [`CommunityRunner`] drives the stages and records results in a
//! [`Workspace`]. All geometry goes through [`floodosp_core::SpatialOps`].

pub mod config;
pub mod credit;
pub mod eligibility;
pub mod error;
pub mod exclusion;
pub mod fields;
pub mod inputs;
pub mod opportunity;
pub mod plan;
pub mod region;
pub mod result;
pub mod runner;
pub mod workspace;

pub use config::{
    CommunitySelection, CoordinateSpace, DatasetPaths, FieldNames, PipelineParams, ProtectedAreasSource,
    RunConfig,
};
pub use credit::{CreditCalculator, CreditInputs, CreditTotals, CreditWeights};
pub use error::{PipelineError, Result};
pub use inputs::Datasets;
pub use plan::{StagePlan, Supplement};
pub use result::CommunityResult;
pub use runner::{CommunityOutput, CommunityRunner, RunSummary, Stage};
pub use workspace::{LayerRole, Workspace};
