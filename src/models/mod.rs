pub mod backbone;
pub mod checkpoint;
pub mod predictor;

pub use backbone::{Backbone, OnnxBackbone};
pub use checkpoint::{Checkpoint, CheckpointMetadata};
pub use predictor::{ImageInput, ModelStats, Predictor};
