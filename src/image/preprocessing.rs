//! 分类器输入预处理
//!
//! 处理流程必须与训练时完全一致：RGB -> 双线性直接缩放到 `image_size x image_size`
//! -> `x / 255` -> 按通道 `(x - mean) / std`。不保持宽高比，也不做裁剪。

use crate::image::ImageLoader;
use crate::utils::error::ClassifierError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_IMAGE_SIZE: u32 = 224;
pub const DEFAULT_CHANNEL_MEANS: [f32; 3] = [0.485, 0.456, 0.406];
pub const DEFAULT_CHANNEL_STDS: [f32; 3] = [0.229, 0.224, 0.225];

/// 与训练管线一致的缩放插值方式
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// 归一化参数，加载后不可变
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationProfile {
    image_size: u32,
    channel_means: [f32; 3],
    channel_stds: [f32; 3],
}

impl NormalizationProfile {
    pub fn new(image_size: u32, channel_means: [f32; 3], channel_stds: [f32; 3]) -> Result<Self> {
        if image_size == 0 {
            return Err(ClassifierError::ModelLoad(
                "image_size must be greater than zero".to_string(),
            ));
        }

        if channel_means.iter().any(|m| !m.is_finite()) {
            return Err(ClassifierError::ModelLoad(format!(
                "channel means must be finite, got {:?}",
                channel_means
            )));
        }

        if channel_stds.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ClassifierError::ModelLoad(format!(
                "channel stds must be finite and non-zero, got {:?}",
                channel_stds
            )));
        }

        Ok(Self {
            image_size,
            channel_means,
            channel_stds,
        })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn channel_means(&self) -> [f32; 3] {
        self.channel_means
    }

    pub fn channel_stds(&self) -> [f32; 3] {
        self.channel_stds
    }
}

impl Default for NormalizationProfile {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            channel_means: DEFAULT_CHANNEL_MEANS,
            channel_stds: DEFAULT_CHANNEL_STDS,
        }
    }
}

/// 归一化后的 `[3, S, S]` 张量（CHW，RGB顺序）
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array3<f32>);

impl ImageTensor {
    /// 包装已有数组，要求形状为 `[3, S, S]`
    pub fn from_array(array: Array3<f32>) -> Result<Self> {
        let (channels, height, width) = array.dim();
        if channels != 3 || height != width || height == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "expected tensor of shape [3, S, S], got [{}, {}, {}]",
                channels, height, width
            )));
        }
        Ok(Self(array))
    }

    pub fn image_size(&self) -> usize {
        self.0.dim().1
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }

    /// 在最前面加入batch维度：`[1, 3, S, S]`
    pub fn into_batch(self) -> Array4<f32> {
        self.0.insert_axis(Axis(0))
    }
}

/// 无状态的预处理器，只依赖归一化参数
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    profile: NormalizationProfile,
}

impl Preprocessor {
    pub fn new(profile: NormalizationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &NormalizationProfile {
        &self.profile
    }

    pub fn transform_bytes(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = ImageLoader::from_bytes(bytes)?;
        Ok(self.transform_image(&image))
    }

    pub fn transform_path(&self, path: &Path) -> Result<ImageTensor> {
        let image = ImageLoader::from_path(path)?;
        Ok(self.transform_image(&image))
    }

    pub fn transform_image(&self, image: &DynamicImage) -> ImageTensor {
        // 灰度图复制到三个通道，alpha通道直接丢弃
        let rgb_image = image.to_rgb8();
        let size = self.profile.image_size;
        let resized = imageops::resize(&rgb_image, size, size, RESIZE_FILTER);

        let means = self.profile.channel_means;
        let stds = self.profile.channel_stds;
        let side = size as usize;
        let mut tensor = Array3::<f32>::zeros((3, side, side));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[c, y as usize, x as usize]] = (value - means[c]) / stds[c];
            }
        }

        ImageTensor(tensor)
    }
}
