use crate::config::OnnxConfig;
use crate::utils::error::ClassifierError;
use crate::Result;
use ndarray::{Array4, ArrayD};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;

/// 预训练分类网络：输入 `[1, 3, S, S]`，输出每个类别的logit
pub trait Backbone: Send + Sync {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// 基于ONNX Runtime的实现
pub struct OnnxBackbone {
    // Session::run 需要 &mut，只在前向推理时加锁
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxBackbone {
    pub fn load(model_path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(optimization_level(onnx_config)))
            .and_then(|builder| builder.with_intra_threads(onnx_config.intra_threads))
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to create session: {}", e)))?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        // 动态发现输出名称
        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }
        tracing::info!(
            "Classification model ready: input='{}', output='{}'",
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Backbone for OnnxBackbone {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| ClassifierError::Inference(format!("Failed to build input tensor: {}", e)))?;

        let logits = {
            let mut session = self.session.lock();
            let outputs = session
                .run(inputs![self.input_name.as_str() => input_tensor])
                .map_err(|e| ClassifierError::Inference(format!("Forward pass failed: {}", e)))?;

            match outputs.get(&self.output_name) {
                Some(output) => output
                    .try_extract_array::<f32>()
                    .map_err(|e| ClassifierError::Inference(format!("Failed to read logits: {}", e)))?
                    .into_owned(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifierError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.output_name, available
                    )));
                }
            }
        };

        // 锁已释放
        flatten_logits(logits)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// 接受 `[N]` 或 `[1, N]` 形状的输出
fn flatten_logits(logits: ArrayD<f32>) -> Result<Vec<f32>> {
    let batch_ok = match logits.shape() {
        [_] => true,
        [batch, _] => *batch == 1,
        _ => false,
    };
    if !batch_ok {
        return Err(ClassifierError::Inference(format!(
            "Expected logits of shape [1, N], got {:?}",
            logits.shape()
        )));
    }

    Ok(logits.iter().copied().collect())
}

fn optimization_level(onnx_config: &OnnxConfig) -> GraphOptimizationLevel {
    if !onnx_config.enable_optimization {
        return GraphOptimizationLevel::Disable;
    }

    match onnx_config.optimization_level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}
