use crate::cli::render::render_text;
use crate::models::Predictor;
use std::io::{BufRead, Write};
use std::path::Path;

const PROMPT: &str = "\nEnter image path (or 'quit' to exit): ";

/// 交互式循环：每行一个图片路径，`quit` 退出。单张图片出错只打印提示并继续。
pub fn run_interactive<R: BufRead, W: Write>(
    predictor: &Predictor,
    mut input: R,
    mut output: W,
) -> anyhow::Result<()> {
    writeln!(output, "\n{}", "=".repeat(50))?;
    writeln!(output, "SKIN LESION CLASSIFICATION")?;
    writeln!(output, "{}", "=".repeat(50))?;
    writeln!(output, "Type 'quit' to exit the program.")?;

    let mut line = String::new();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            // 输入流结束
            writeln!(output)?;
            break;
        }

        let image_path = clean_path(&line);

        if image_path.eq_ignore_ascii_case("quit") {
            writeln!(output, "\nGoodbye!")?;
            break;
        }

        if image_path.is_empty() {
            writeln!(output, "Error: No image path provided!")?;
            continue;
        }

        let path = Path::new(image_path);
        if !path.exists() {
            writeln!(output, "Error: Image file '{}' not found!", image_path)?;
            continue;
        }

        writeln!(output, "\nAnalyzing image: {}", image_path)?;
        let outcome = predictor.infer_path(path).and_then(|prediction| {
            let verdict = predictor.classify_risk(&prediction)?;
            Ok((prediction, verdict))
        });

        match outcome {
            Ok((prediction, verdict)) => write!(output, "{}", render_text(&prediction, &verdict))?,
            Err(e) => {
                tracing::debug!("Failed to classify {}: {}", image_path, e);
                writeln!(output, "Error processing image: {}", e)?;
            }
        }
    }

    Ok(())
}

/// 去掉首尾空白以及拖拽文件时带上的引号
fn clean_path(line: &str) -> &str {
    line.trim().trim_matches('"').trim_matches('\'')
}
