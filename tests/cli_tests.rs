mod common;

use common::{lesion_png, ready_predictor, MockBackbone};
use skin_lesion_triage::cli::{predict_paths, run_interactive, OutputFormat};
use std::sync::Arc;

#[test]
fn interactive_loop_survives_bad_images() {
    let predictor = ready_predictor(Arc::new(MockBackbone::from_probabilities([0.7, 0.2, 0.1])));

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    let bad = dir.path().join("bad.png");
    std::fs::write(&good, lesion_png(24, 24)).unwrap();
    std::fs::write(&bad, b"corrupted").unwrap();

    let input = format!("'{}'\n{}\n\"{}\"\nquit\n", bad.display(), "", good.display());
    let mut out = Vec::new();
    run_interactive(&predictor, input.as_bytes(), &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Error processing image"));
    assert!(text.contains("Error: No image path provided!"));
    assert!(text.contains("Predicted Class: Malignant"));
    assert!(text.contains("WARNING:"));
    assert!(text.contains("Goodbye!"));
}

#[test]
fn interactive_loop_ends_at_end_of_input() {
    let predictor = ready_predictor(Arc::new(MockBackbone::new(vec![0.0, 1.0, 0.0])));
    let mut out = Vec::new();
    run_interactive(&predictor, "".as_bytes(), &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("Enter image path"));
}

#[test]
fn predict_paths_reports_failures_in_json() {
    let predictor = ready_predictor(Arc::new(MockBackbone::from_probabilities([0.05, 0.10, 0.85])));

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    std::fs::write(&good, lesion_png(24, 24)).unwrap();
    let missing = dir.path().join("missing.png");

    let mut out = Vec::new();
    let failures = predict_paths(
        &predictor,
        &[good.clone(), missing.clone()],
        OutputFormat::Json,
        &mut out,
    )
    .unwrap();
    assert_eq!(failures, 1);

    let reports: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["predicted_class"], "Normal");
    assert_eq!(reports[0]["triage"]["level"], "Clear");
    assert_eq!(reports[1]["code"], "IO_ERROR");
}

#[test]
fn predict_paths_renders_text() {
    let predictor = ready_predictor(Arc::new(MockBackbone::from_probabilities([0.15, 0.75, 0.10])));

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    std::fs::write(&good, lesion_png(24, 24)).unwrap();

    let mut out = Vec::new();
    let failures = predict_paths(&predictor, &[good], OutputFormat::Text, &mut out).unwrap();
    assert_eq!(failures, 0);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Predicted Class: Benign"));
    assert!(text.contains("NOTE:"));
}
