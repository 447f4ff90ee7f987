use crate::image::{ImageTensor, NormalizationProfile, Preprocessor};
use crate::models::{Backbone, Checkpoint, OnnxBackbone};
use crate::prediction::{self, PredictionResult, TriageVerdict};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// `infer` 接受的输入
pub enum ImageInput<'a> {
    Bytes(&'a [u8]),
    Path(&'a Path),
    Tensor(ImageTensor),
}

impl<'a> From<&'a [u8]> for ImageInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl<'a> From<&'a Path> for ImageInput<'a> {
    fn from(path: &'a Path) -> Self {
        ImageInput::Path(path)
    }
}

impl From<ImageTensor> for ImageInput<'_> {
    fn from(tensor: ImageTensor) -> Self {
        ImageInput::Tensor(tensor)
    }
}

/// 加载完成后只读
struct LoadedModel {
    backbone: Arc<dyn Backbone>,
    preprocessor: Preprocessor,
    accuracy: Option<f32>,
    model_path: Option<PathBuf>,
}

/// 分类器生命周期：`Uninitialized --load--> Ready --release--> Uninitialized`
pub struct Predictor {
    state: RwLock<Option<Arc<LoadedModel>>>,
}

impl Predictor {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// 创建并立即加载配置中的模型
    pub fn from_config(config: &Config) -> Result<Self> {
        let predictor = Self::new();
        predictor.load(config)?;
        Ok(predictor)
    }

    pub fn load(&self, config: &Config) -> Result<()> {
        let checkpoint = Checkpoint::locate(config)?;
        let backbone = OnnxBackbone::load(&checkpoint.model_path, &config.onnx_config)?;

        match checkpoint.accuracy {
            Some(accuracy) => tracing::info!("Model accuracy: {:.2}%", accuracy * 100.0),
            None => tracing::info!("Model accuracy: N/A"),
        }

        self.install(LoadedModel {
            backbone: Arc::new(backbone),
            preprocessor: Preprocessor::new(checkpoint.profile),
            accuracy: checkpoint.accuracy,
            model_path: Some(checkpoint.model_path),
        });
        Ok(())
    }

    /// 使用外部提供的分类网络
    pub fn load_with_backbone(
        &self,
        backbone: Arc<dyn Backbone>,
        profile: NormalizationProfile,
        accuracy: Option<f32>,
    ) {
        self.install(LoadedModel {
            backbone,
            preprocessor: Preprocessor::new(profile),
            accuracy,
            model_path: None,
        });
    }

    fn install(&self, model: LoadedModel) {
        tracing::info!("Classifier '{}' is ready", model.backbone.name());
        *self.state.write() = Some(Arc::new(model));
    }

    pub fn release(&self) {
        if self.state.write().take().is_some() {
            tracing::info!("Classifier released");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    fn loaded(&self) -> Result<Arc<LoadedModel>> {
        self.state
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(ClassifierError::ModelNotLoaded)
    }

    pub fn profile(&self) -> Result<NormalizationProfile> {
        Ok(*self.loaded()?.preprocessor.profile())
    }

    pub fn infer<'a>(&self, input: impl Into<ImageInput<'a>>) -> Result<PredictionResult> {
        let model = self.loaded()?;
        let start_time = Instant::now();

        // 预处理不持有任何锁
        let tensor = match input.into() {
            ImageInput::Bytes(bytes) => model.preprocessor.transform_bytes(bytes)?,
            ImageInput::Path(path) => model.preprocessor.transform_path(path)?,
            ImageInput::Tensor(tensor) => tensor,
        };

        let expected = model.preprocessor.profile().image_size() as usize;
        if tensor.image_size() != expected {
            return Err(ClassifierError::Inference(format!(
                "Input tensor is {}x{}, model expects {}x{}",
                tensor.image_size(),
                tensor.image_size(),
                expected,
                expected
            )));
        }

        let logits = model.backbone.forward(tensor.into_batch())?;
        let result = PredictionResult::from_logits(&logits)?;

        tracing::debug!(
            "Inference completed: class={}, confidence={:.4}, time={:.3}s",
            result.predicted_class(),
            result.confidence(),
            start_time.elapsed().as_secs_f32()
        );

        Ok(result)
    }

    pub fn infer_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        self.infer(bytes)
    }

    pub fn infer_path(&self, path: &Path) -> Result<PredictionResult> {
        self.infer(path)
    }

    pub fn infer_tensor(&self, tensor: ImageTensor) -> Result<PredictionResult> {
        self.infer(tensor)
    }

    pub fn classify_risk(&self, result: &PredictionResult) -> Result<TriageVerdict> {
        self.loaded()?;
        Ok(prediction::classify_risk(result))
    }

    pub fn health_check(&self) -> Result<()> {
        tracing::debug!("Performing model health check...");
        self.loaded()?;
        Ok(())
    }

    pub fn stats(&self) -> ModelStats {
        match self.state.read().as_ref() {
            Some(model) => {
                let profile = model.preprocessor.profile();
                ModelStats {
                    loaded: true,
                    backbone: Some(model.backbone.name().to_string()),
                    model_path: model.model_path.as_ref().map(|p| p.display().to_string()),
                    image_size: Some(profile.image_size()),
                    channel_means: Some(profile.channel_means()),
                    channel_stds: Some(profile.channel_stds()),
                    accuracy: model.accuracy,
                }
            }
            None => ModelStats::default(),
        }
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new()
    }
}

/// 模型统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelStats {
    pub loaded: bool,
    pub backbone: Option<String>,
    pub model_path: Option<String>,
    pub image_size: Option<u32>,
    pub channel_means: Option<[f32; 3]>,
    pub channel_stds: Option<[f32; 3]>,
    pub accuracy: Option<f32>,
}
