pub mod accuracy;
pub mod performance;
pub mod record;

pub use accuracy::{
    ACCURACY_SCALE, AccuracyAssessment, AccuracyGrade, AccuracyMetrics, PredictionStatus,
    RealizedOutcome,
};
pub use performance::{HIGH_ACCURACY_THRESHOLD, ModelPerformanceStats};
pub use record::{NewPredictionRecord, PredictionRecord};
