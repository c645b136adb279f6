use anyhow::Context;
use clap::Parser;
use pneumoscan_app::cli::{Cli, Commands};
use pneumoscan_app::config::AppConfig;
use pneumoscan_app::display::PredictionView;
use pneumoscan_app::server::run_server;
use pneumoscan_app::state::AppState;
use pneumoscan_classifiers::{load_model_async, ClassificationPipeline, Classifier};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.command.verbose());

    let config = AppConfig::load(&cli.config, &cli.command.overrides())?;

    match cli.command {
        Commands::Serve { .. } => {
            let addr = config.server.socket_addr()?;

            println!();
            println!("  PneumoScan - chest X-ray classifier");
            println!();
            println!("  Open http://{} in your browser", addr);
            println!();

            run_server(AppState::new(config), addr).await?;
        }

        Commands::Classify { image, json, .. } => {
            classify_file(&config, &image, json).await?;
        }
    }

    Ok(())
}

async fn classify_file(config: &AppConfig, image: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let model = load_model_async(config.classifier.to_model_config()).await?;
    let pipeline = ClassificationPipeline::new(model);

    let result = pipeline.classify(&bytes).await?;
    info!(
        "Classified {} in {}us",
        image.display(),
        result.latency_us
    );

    let view = PredictionView::new(&result.prediction, Some(chrono::Utc::now()));
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.render_text());
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "pneumoscan_app=debug,pneumoscan_classifiers=debug,tower_http=debug"
    } else {
        "pneumoscan_app=info,pneumoscan_classifiers=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
