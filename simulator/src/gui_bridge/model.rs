use fmcwcore::PipelineSnapshot;
use serde::{Deserialize, Serialize};

/// What a polling display reads from `GET /snapshot`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationModel {
    pub status: String,
    pub updated_at_s: f64,
    pub ticks: u64,
    #[serde(flatten)]
    pub snapshot: PipelineSnapshot,
}
