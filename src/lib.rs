pub mod cli;
pub mod config;
pub mod image;
pub mod models;
pub mod prediction;
pub mod utils;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use crate::image::{ImageTensor, NormalizationProfile, Preprocessor};
pub use models::{ImageInput, Predictor};
pub use prediction::{classify_risk, ClassLabel, PredictionResult, RiskLevel, TriageVerdict};
pub use utils::error::ClassifierError;

pub type Result<T> = std::result::Result<T, ClassifierError>;
