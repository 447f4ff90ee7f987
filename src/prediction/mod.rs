pub mod triage;
pub mod types;

pub use triage::{classify_risk, RiskLevel, TriageVerdict};
pub use types::{ClassLabel, ClassProbabilities, PredictionResult};
