use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skin_lesion_triage::{
    cli::{self, OutputFormat},
    config::Config,
    web, Predictor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skin-lesion-triage")]
#[command(about = "Skin lesion classification (Malignant / Benign / Normal) with triage warnings")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP prediction service
    Serve {
        /// Server bind address
        #[arg(long, default_value = "0.0.0.0:5000")]
        bind: String,

        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Enable development mode
        #[arg(long)]
        dev: bool,

        #[command(flatten)]
        model: ModelArgs,
    },
    /// Classify images interactively, one path per line
    Interactive {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Classify the given images and exit
    Predict {
        /// Image files to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Path to the exported ONNX classifier
    #[arg(short, long, default_value = "skin_cancer_model.onnx")]
    model: String,

    /// Path to the normalization metadata (defaults to the model path with a .json extension)
    #[arg(long)]
    metadata: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Serve {
            bind,
            workers,
            dev,
            model,
        } => {
            let config = Config::new(bind, model.model, model.metadata, workers, dev)?;
            tracing::info!("Starting skin lesion triage service...");
            tracing::info!("Bind address: {}", config.bind_addr);
            tracing::info!("Model: {}", config.model_path.display());

            let predictor = Arc::new(load_predictor(&config)?);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.workers.max(1))
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;

            runtime.block_on(web::serve(config, predictor))?;
        }
        Command::Interactive { model } => {
            let config = Config::new(String::new(), model.model, model.metadata, None, false)?;
            let predictor = load_predictor(&config)?;

            let stdin = std::io::stdin();
            cli::run_interactive(&predictor, stdin.lock(), std::io::stdout())?;
            predictor.release();
        }
        Command::Predict {
            paths,
            format,
            model,
        } => {
            let config = Config::new(String::new(), model.model, model.metadata, None, false)?;
            let predictor = load_predictor(&config)?;

            let failures = cli::predict_paths(&predictor, &paths, format, std::io::stdout())?;
            predictor.release();

            if failures > 0 {
                anyhow::bail!("{} of {} images could not be classified", failures, paths.len());
            }
        }
    }

    Ok(())
}

fn load_predictor(config: &Config) -> Result<Predictor> {
    Predictor::from_config(config).with_context(|| {
        format!(
            "failed to load model '{}'; export the trained classifier to ONNX and place it there",
            config.model_path.display()
        )
    })
}
