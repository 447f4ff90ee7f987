use crate::image::NormalizationProfile;
use crate::image::preprocessing::{DEFAULT_CHANNEL_MEANS, DEFAULT_CHANNEL_STDS, DEFAULT_IMAGE_SIZE};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 训练检查点附带的元数据，字段名与训练脚本保存的键一致
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CheckpointMetadata {
    #[serde(default, alias = "image_size")]
    pub img_size: Option<u32>,
    #[serde(default, alias = "channel_means")]
    pub mean: Option<[f32; 3]>,
    #[serde(default, alias = "channel_stds")]
    pub std: Option<[f32; 3]>,
    #[serde(default)]
    pub accuracy: Option<f32>,
}

impl CheckpointMetadata {
    /// 读取元数据文件；文件不存在时返回 `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("Failed to read metadata {}: {}", path.display(), e))
        })?;
        let metadata = serde_json::from_str(&data).map_err(|e| {
            ClassifierError::ModelLoad(format!("Invalid metadata {}: {}", path.display(), e))
        })?;

        Ok(Some(metadata))
    }

    /// 缺失字段使用默认值
    pub fn profile(&self) -> Result<NormalizationProfile> {
        NormalizationProfile::new(
            self.img_size.unwrap_or(DEFAULT_IMAGE_SIZE),
            self.mean.unwrap_or(DEFAULT_CHANNEL_MEANS),
            self.std.unwrap_or(DEFAULT_CHANNEL_STDS),
        )
    }
}

/// 已定位的检查点：模型权重文件 + 归一化参数
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub model_path: PathBuf,
    pub profile: NormalizationProfile,
    pub accuracy: Option<f32>,
}

impl Checkpoint {
    pub fn locate(config: &Config) -> Result<Self> {
        Self::from_paths(&config.model_path(), &config.metadata_path())
    }

    pub fn from_paths(model_path: &Path, metadata_path: &Path) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let metadata = match CheckpointMetadata::load(metadata_path)? {
            Some(metadata) => {
                tracing::info!("Loaded checkpoint metadata from: {}", metadata_path.display());
                metadata
            }
            None => {
                tracing::info!(
                    "Checkpoint metadata not found at {}, using default normalization",
                    metadata_path.display()
                );
                CheckpointMetadata::default()
            }
        };

        let profile = metadata.profile()?;
        tracing::info!(
            "Normalization profile: size={}, mean={:?}, std={:?}",
            profile.image_size(),
            profile.channel_means(),
            profile.channel_stds()
        );

        Ok(Self {
            model_path: model_path.to_path_buf(),
            profile,
            accuracy: metadata.accuracy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let metadata: CheckpointMetadata = serde_json::from_str(r#"{"img_size": 256}"#).unwrap();
        let profile = metadata.profile().unwrap();

        assert_eq!(profile.image_size(), 256);
        assert_eq!(profile.channel_means(), DEFAULT_CHANNEL_MEANS);
        assert_eq!(profile.channel_stds(), DEFAULT_CHANNEL_STDS);
        assert_eq!(metadata.accuracy, None);
    }

    #[test]
    fn accepts_descriptive_field_names() {
        let metadata: CheckpointMetadata = serde_json::from_str(
            r#"{"image_size": 192, "channel_means": [0.5, 0.5, 0.5], "channel_stds": [0.25, 0.25, 0.25], "accuracy": 0.91}"#,
        )
        .unwrap();
        let profile = metadata.profile().unwrap();

        assert_eq!(profile.image_size(), 192);
        assert_eq!(profile.channel_means(), [0.5, 0.5, 0.5]);
        assert_eq!(metadata.accuracy, Some(0.91));
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let parsed: std::result::Result<CheckpointMetadata, _> =
            serde_json::from_str(r#"{"mean": [0.5, 0.5]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_image_size_is_rejected() {
        let metadata = CheckpointMetadata {
            img_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(metadata.profile(), Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn missing_model_file_fails_to_locate() {
        let dir = tempfile::tempdir().unwrap();
        let err = Checkpoint::from_paths(&dir.path().join("model.onnx"), &dir.path().join("model.json"))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[test]
    fn locates_model_with_and_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        let sidecar = dir.path().join("model.json");
        fs::write(&model, b"weights").unwrap();

        let checkpoint = Checkpoint::from_paths(&model, &sidecar).unwrap();
        assert_eq!(checkpoint.profile, NormalizationProfile::default());

        fs::write(&sidecar, r#"{"img_size": 300, "accuracy": 0.87}"#).unwrap();
        let checkpoint = Checkpoint::from_paths(&model, &sidecar).unwrap();
        assert_eq!(checkpoint.profile.image_size(), 300);
        assert_eq!(checkpoint.accuracy, Some(0.87));
    }

    #[test]
    fn malformed_sidecar_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        let sidecar = dir.path().join("model.json");
        fs::write(&model, b"weights").unwrap();
        fs::write(&sidecar, "{ not json").unwrap();

        let err = Checkpoint::from_paths(&model, &sidecar).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }
}
