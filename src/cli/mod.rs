//! 命令行前端：交互式循环与一次性批量预测

pub mod interactive;
pub mod render;

pub use interactive::run_interactive;
pub use render::{render_json, render_text, OutputFormat};

use crate::models::Predictor;
use std::io::Write;
use std::path::PathBuf;

/// 逐个预测给定路径，单个失败不影响其余文件，返回失败数量
pub fn predict_paths<W: Write>(
    predictor: &Predictor,
    paths: &[PathBuf],
    format: OutputFormat,
    mut output: W,
) -> anyhow::Result<usize> {
    let mut failures = 0;
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        let outcome = predictor.infer_path(path).and_then(|prediction| {
            let verdict = predictor.classify_risk(&prediction)?;
            Ok((prediction, verdict))
        });

        match outcome {
            Ok((prediction, verdict)) => match format {
                OutputFormat::Text => {
                    writeln!(output, "\nImage: {}", path.display())?;
                    write!(output, "{}", render_text(&prediction, &verdict))?;
                }
                OutputFormat::Json => {
                    let mut report = render_json(&prediction, &verdict);
                    report["path"] = serde_json::json!(path.display().to_string());
                    reports.push(report);
                }
            },
            Err(e) => {
                failures += 1;
                tracing::warn!("Failed to classify {}: {}", path.display(), e);
                match format {
                    OutputFormat::Text => {
                        writeln!(output, "\n[ERR ] {} -- {}", path.display(), e)?;
                    }
                    OutputFormat::Json => reports.push(serde_json::json!({
                        "path": path.display().to_string(),
                        "error": e.to_string(),
                        "code": e.error_code(),
                    })),
                }
            }
        }
    }

    if format == OutputFormat::Json {
        writeln!(output, "{}", serde_json::to_string_pretty(&reports)?)?;
    }

    Ok(failures)
}
