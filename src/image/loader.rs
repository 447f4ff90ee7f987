use crate::utils::error::ClassifierError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// 单张图片的最大字节数
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// 单边最大像素数，防止解码炸弹
const MAX_DIMENSION: u32 = 16384;

pub struct ImageLoader;

impl ImageLoader {
    /// 解码base64，兼容 `data:image/xxx;base64,` 前缀
    pub fn decode_base64(base64_data: &str) -> Result<Vec<u8>> {
        let trimmed = base64_data.trim();
        let base64_clean = if trimmed.starts_with("data:") {
            trimmed.split_once(',').map(|(_, data)| data).unwrap_or(trimmed)
        } else {
            trimmed
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean)?;
        Ok(image_bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(ClassifierError::Decode("empty image data".to_string()));
        }

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifierError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        let image = image::load_from_memory(bytes)?;
        Self::validate_dimensions(&image)?;

        Ok(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 按文件头检查格式，无法识别的数据交给解码器报错
    pub fn ensure_supported(bytes: &[u8]) -> Result<()> {
        match Self::detect_format(bytes) {
            Some(format) if !Self::is_supported_format(format) => Err(
                ClassifierError::UnsupportedFormat(format!("{:?}", format).to_lowercase()),
            ),
            _ => Ok(()),
        }
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }

    /// 验证图像尺寸
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(ClassifierError::Decode(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ClassifierError::InvalidInput(format!(
                "Image too large: {}x{}, maximum {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(())
    }
}
