use crate::prediction::{PredictionResult, RiskLevel, TriageVerdict};
use std::fmt::Write;

const BAR_WIDTH: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

pub fn probability_bar(probability: f32) -> String {
    "█".repeat((probability.clamp(0.0, 1.0) * BAR_WIDTH) as usize)
}

pub fn render_text(result: &PredictionResult, verdict: &TriageVerdict) -> String {
    let mut out = String::new();

    // 写入String不会失败
    let _ = writeln!(out, "\n{}", "=".repeat(50));
    let _ = writeln!(out, "PREDICTION RESULTS");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out, "\nPredicted Class: {}", result.predicted_class());
    let _ = writeln!(out, "Confidence: {:.2}%", result.confidence() * 100.0);
    let _ = writeln!(out, "\nAll Class Probabilities:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    for (label, probability) in result.probabilities().iter() {
        let _ = writeln!(
            out,
            "   {:10} {:6.2}% {}",
            label.as_str(),
            probability * 100.0,
            probability_bar(probability)
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(30));

    let prefix = match verdict.level {
        RiskLevel::Alert => "WARNING",
        RiskLevel::Caution => "NOTE",
        RiskLevel::Clear => "RESULT",
    };
    let _ = writeln!(out, "\n{}: {}", prefix, verdict.message);

    out
}

pub fn render_json(result: &PredictionResult, verdict: &TriageVerdict) -> serde_json::Value {
    serde_json::json!({
        "predicted_class": result.predicted_class(),
        "confidence": result.confidence(),
        "all_probabilities": result.probabilities(),
        "triage": verdict,
    })
}
