use crate::domain::forecast::ModelType;
use serde::{Deserialize, Serialize};

/// Accuracy threshold counted as a "high accuracy" assessment
pub const HIGH_ACCURACY_THRESHOLD: f64 = 0.8;

/// Read-only aggregate over assessed predictions of one model type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPerformanceStats {
    pub model_type: ModelType,
    pub count: usize,
    pub mean_accuracy: f64,
    pub mean_confidence: f64,
    /// Share of assessments with accuracy >= `HIGH_ACCURACY_THRESHOLD`
    pub high_accuracy_rate: f64,
    pub best_accuracy: f64,
    pub worst_accuracy: f64,
}
