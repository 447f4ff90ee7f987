//! 风险分级策略
//!
//! 规则按顺序判定，前一条命中则不再检查后一条：
//! 1. 预测为恶性且置信度 > 0.5 -> `Alert`
//! 2. 恶性概率 > 0.10 -> `Caution`
//! 3. 其他 -> `Clear`
//!
//! 阈值属于策略本身而非配置项，修改时需同步更新 [`TRIAGE_POLICY_VERSION`]。

use super::types::{ClassLabel, PredictionResult};
use serde::Serialize;

pub const TRIAGE_POLICY_VERSION: &str = "1";

/// 恶性预警的置信度阈值（严格大于）
pub const ALERT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// 提示复查的恶性概率阈值（严格大于）
///
/// 比较在 `f32` 下进行：概率恰为 `0.1f32` 时判为 `Clear`。
pub const CAUTION_MALIGNANT_THRESHOLD: f32 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Alert,
    Caution,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageVerdict {
    pub level: RiskLevel,
    pub message: String,
    pub policy_version: &'static str,
}

pub fn classify_risk(result: &PredictionResult) -> TriageVerdict {
    let malignant = result.probability(ClassLabel::Malignant);

    if result.predicted_class() == ClassLabel::Malignant
        && result.confidence() > ALERT_CONFIDENCE_THRESHOLD
    {
        return TriageVerdict {
            level: RiskLevel::Alert,
            message: "Potential malignant lesion detected! Please consult a dermatologist for proper diagnosis."
                .to_string(),
            policy_version: TRIAGE_POLICY_VERSION,
        };
    }

    if malignant > CAUTION_MALIGNANT_THRESHOLD {
        return TriageVerdict {
            level: RiskLevel::Caution,
            message: format!(
                "Appears to be {}, but there's a possibility to be Malignant ({:.1}% probability). \
                 Consider consulting a dermatologist for confirmation.",
                result.predicted_class(),
                malignant * 100.0
            ),
            policy_version: TRIAGE_POLICY_VERSION,
        };
    }

    TriageVerdict {
        level: RiskLevel::Clear,
        message: format!(
            "Appears to be {} with no significant indication of malignancy.",
            result.predicted_class()
        ),
        policy_version: TRIAGE_POLICY_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(probabilities: [f32; 3]) -> PredictionResult {
        PredictionResult::from_probabilities(probabilities).unwrap()
    }

    #[test]
    fn confident_malignant_prediction_raises_alert() {
        let r = result([0.7, 0.2, 0.1]);
        assert_eq!(r.predicted_class(), ClassLabel::Malignant);
        assert_eq!(classify_risk(&r).level, RiskLevel::Alert);
    }

    #[test]
    fn non_trivial_malignant_probability_raises_caution() {
        let r = result([0.15, 0.75, 0.10]);
        assert_eq!(r.predicted_class(), ClassLabel::Benign);

        let verdict = classify_risk(&r);
        assert_eq!(verdict.level, RiskLevel::Caution);
        assert!(verdict.message.contains("Benign"));
        assert!(verdict.message.contains("15.0%"));
    }

    #[test]
    fn low_malignant_probability_is_clear() {
        let r = result([0.05, 0.10, 0.85]);
        assert_eq!(r.predicted_class(), ClassLabel::Normal);
        assert_eq!(classify_risk(&r).level, RiskLevel::Clear);
    }

    #[test]
    fn confidence_of_exactly_half_falls_through_to_caution() {
        let r = result([0.5, 0.3, 0.2]);
        assert_eq!(r.predicted_class(), ClassLabel::Malignant);
        assert_eq!(r.confidence(), 0.5);
        assert_eq!(classify_risk(&r).level, RiskLevel::Caution);
    }

    #[test]
    fn malignant_probability_of_exactly_threshold_is_clear() {
        let r = result([0.10, 0.30, 0.60]);
        assert_eq!(classify_risk(&r).level, RiskLevel::Clear);
    }

    #[test]
    fn alert_takes_precedence_over_caution() {
        // 两条规则同时满足时只返回 Alert
        let r = result([0.9, 0.05, 0.05]);
        let verdict = classify_risk(&r);
        assert_eq!(verdict.level, RiskLevel::Alert);
        assert!(verdict.message.contains("dermatologist"));
    }

    #[test]
    fn policy_is_pure() {
        let r = result([0.15, 0.75, 0.10]);
        assert_eq!(classify_risk(&r), classify_risk(&r));
        assert_eq!(classify_risk(&r).policy_version, TRIAGE_POLICY_VERSION);
    }
}
