//! Shared fixtures for integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use parking_lot::Mutex;
use skin_lesion_triage::models::Backbone;
use skin_lesion_triage::{ClassifierError, NormalizationProfile, Predictor, Result};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory classifier returning fixed logits
pub struct MockBackbone {
    logits: Vec<f32>,
    fail_with: Option<String>,
    calls: AtomicUsize,
    last_shape: Mutex<Option<Vec<usize>>>,
}

impl MockBackbone {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            logits,
            fail_with: None,
            calls: AtomicUsize::new(0),
            last_shape: Mutex::new(None),
        }
    }

    /// Logits whose softmax reproduces the given probabilities
    pub fn from_probabilities(probabilities: [f32; 3]) -> Self {
        Self::new(probabilities.iter().map(|p| p.ln()).collect())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(vec![0.0, 0.0, 0.0])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_shape(&self) -> Option<Vec<usize>> {
        self.last_shape.lock().clone()
    }
}

impl Backbone for MockBackbone {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_shape.lock() = Some(input.shape().to_vec());

        if let Some(message) = &self.fail_with {
            return Err(ClassifierError::Inference(message.clone()));
        }
        Ok(self.logits.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn small_profile() -> NormalizationProfile {
    NormalizationProfile::new(32, [0.485, 0.456, 0.406], [0.229, 0.224, 0.225]).unwrap()
}

pub fn ready_predictor(backbone: Arc<MockBackbone>) -> Predictor {
    let predictor = Predictor::new();
    predictor.load_with_backbone(backbone, small_profile(), Some(0.93));
    predictor
}

pub fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn lesion_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 120])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}
