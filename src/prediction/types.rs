use crate::utils::error::ClassifierError;
use crate::Result;
use serde::{Serialize, Serializer};
use std::fmt;

/// 概率和的容差
pub const PROBABILITY_SUM_TOLERANCE: f32 = 1e-5;

/// 分类标签，顺序即模型输出下标，重新训练前不可调整
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ClassLabel {
    Malignant,
    Benign,
    Normal,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 3] = [ClassLabel::Malignant, ClassLabel::Benign, ClassLabel::Normal];

    pub fn index(self) -> usize {
        match self {
            ClassLabel::Malignant => 0,
            ClassLabel::Benign => 1,
            ClassLabel::Normal => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Malignant => "Malignant",
            ClassLabel::Benign => "Benign",
            ClassLabel::Normal => "Normal",
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个类别恰好一个概率值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities([f32; 3]);

impl ClassProbabilities {
    pub fn get(&self, label: ClassLabel) -> f32 {
        self.0[label.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassLabel, f32)> + '_ {
        ClassLabel::ALL.iter().map(move |label| (*label, self.get(*label)))
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(ClassLabel::ALL.len()))?;
        for (label, probability) in self.iter() {
            map.serialize_entry(label.as_str(), &probability)?;
        }
        map.end()
    }
}

/// 单次推理的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    predicted_class: ClassLabel,
    confidence: f32,
    #[serde(rename = "all_probabilities")]
    probabilities: ClassProbabilities,
}

impl PredictionResult {
    /// 对原始logits做softmax并取arg-max
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        if logits.len() != ClassLabel::ALL.len() {
            return Err(ClassifierError::Inference(format!(
                "expected {} logits, got {}",
                ClassLabel::ALL.len(),
                logits.len()
            )));
        }

        if logits.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model produced non-finite logits: {:?}",
                logits
            )));
        }

        let probabilities = softmax(logits);
        Self::from_probabilities([probabilities[0], probabilities[1], probabilities[2]])
    }

    /// 由已归一化的概率构造，主要用于策略测试
    pub fn from_probabilities(probabilities: [f32; 3]) -> Result<Self> {
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
            return Err(ClassifierError::InvalidInput(format!(
                "probabilities must lie in [0, 1], got {:?}",
                probabilities
            )));
        }

        // 首个最大值优先
        let mut max_idx = 0;
        for i in 1..probabilities.len() {
            if probabilities[i] > probabilities[max_idx] {
                max_idx = i;
            }
        }

        let predicted_class = ClassLabel::from_index(max_idx)
            .ok_or_else(|| ClassifierError::Internal(format!("class index {} out of range", max_idx)))?;

        Ok(Self {
            predicted_class,
            confidence: probabilities[max_idx],
            probabilities: ClassProbabilities(probabilities),
        })
    }

    pub fn predicted_class(&self) -> ClassLabel {
        self.predicted_class
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn probabilities(&self) -> &ClassProbabilities {
        &self.probabilities
    }

    pub fn probability(&self, label: ClassLabel) -> f32 {
        self.probabilities.get(label)
    }
}

/// 数值稳定的softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let denominator: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / denominator).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn label_order_is_fixed() {
        let names: Vec<&str> = ClassLabel::ALL.iter().map(|l| l.as_str()).collect();
        assert_eq!(names, vec!["Malignant", "Benign", "Normal"]);
        for (i, label) in ClassLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(ClassLabel::from_index(i), Some(*label));
        }
        assert_eq!(ClassLabel::from_index(3), None);
    }

    #[test]
    fn softmax_of_equal_logits_is_uniform() {
        let probs = softmax(&[2.0, 2.0, 2.0]);
        for p in probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn softmax_survives_large_logits() {
        let probs = softmax(&[1000.0, 0.0, -1000.0]);
        assert!((probs[0] - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn from_logits_picks_argmax() {
        let result = PredictionResult::from_logits(&[0.1, 2.5, -1.0]).unwrap();
        assert_eq!(result.predicted_class(), ClassLabel::Benign);
        assert_eq!(result.confidence(), result.probability(ClassLabel::Benign));
        assert!((result.probabilities().sum() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE);
    }

    #[test]
    fn ties_resolve_to_first_label() {
        let result = PredictionResult::from_probabilities([0.4, 0.4, 0.2]).unwrap();
        assert_eq!(result.predicted_class(), ClassLabel::Malignant);
    }

    #[test]
    fn wrong_logit_count_is_an_inference_error() {
        let err = PredictionResult::from_logits(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
    }

    #[test]
    fn non_finite_logits_are_rejected() {
        let err = PredictionResult::from_logits(&[f32::NAN, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
    }

    #[test]
    fn out_of_range_probabilities_are_rejected() {
        assert!(PredictionResult::from_probabilities([1.2, -0.1, 0.0]).is_err());
    }

    #[test]
    fn serializes_with_api_field_names() {
        let result = PredictionResult::from_probabilities([0.7, 0.2, 0.1]).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["predicted_class"], "Malignant");
        let all = json["all_probabilities"].as_object().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.contains_key("Malignant"));
        assert!(all.contains_key("Benign"));
        assert!(all.contains_key("Normal"));
    }

    proptest! {
        #[test]
        fn probabilities_sum_to_one(logits in proptest::array::uniform3(-50.0f32..50.0)) {
            let result = PredictionResult::from_logits(&logits).unwrap();
            prop_assert!((result.probabilities().sum() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE);
            prop_assert_eq!(result.confidence(), result.probability(result.predicted_class()));
            for (_, p) in result.probabilities().iter() {
                prop_assert!((0.0..=1.0).contains(&p));
            }
        }
    }
}
