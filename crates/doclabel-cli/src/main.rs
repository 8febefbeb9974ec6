//! doclabel - turn PDFs into pre-annotated OCR labeling datasets.
//!
//! Renders each page, runs OCR, and writes a Label Studio import file whose
//! regions link a bounding box with its transcription.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "doclabel=info,doclabel_analysis=info,doclabel_server=info"
    } else {
        "doclabel=warn,doclabel_analysis=warn,doclabel_server=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run().await
}
