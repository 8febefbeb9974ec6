//! `process`: PDFs to a dataset file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use tokio::sync::{mpsc, watch};

use doclabel::config::Settings;
use doclabel::dataset::{Assembler, Dataset, DatasetWriter, RegionIdStrategy, RunSummary};
use doclabel::utils::write_json_atomic;
use doclabel_analysis::ocr::{create_backend, OcrBackendType, OcrConfig};
use doclabel_analysis::render::{PopplerRasterizer, Rasterizer};
use doclabel_analysis::services::{
    discover_documents, DatasetEvent, DatasetRun, DatasetService, PipelineOptions,
};

use crate::cli::progress::{bar_eprintln, page_bar};

#[derive(Args)]
pub struct ProcessArgs {
    /// A PDF file or a directory of PDFs
    input: PathBuf,
    /// Dataset output path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Directory for rendered page images
    #[arg(long)]
    images_dir: Option<PathBuf>,
    /// Rendering resolution
    #[arg(long)]
    dpi: Option<u32>,
    /// Base URL the images directory is served under
    #[arg(long)]
    base_url: Option<String>,
    /// Number of concurrent OCR workers
    #[arg(short, long)]
    workers: Option<usize>,
    /// OCR backend: tesseract, ocrs, paddleocr
    #[arg(short, long)]
    backend: Option<String>,
    /// OCR language (tesseract)
    #[arg(short, long)]
    lang: Option<String>,
    /// Region id style: random or sequential
    #[arg(long)]
    region_ids: Option<String>,
    /// Also write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl ProcessArgs {
    fn apply(&self, settings: &mut Settings) -> anyhow::Result<()> {
        if let Some(ref output) = self.output {
            settings.output_path = output.clone();
        }
        if let Some(ref dir) = self.images_dir {
            settings.images_dir = dir.clone();
        }
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        if let Some(ref url) = self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(ref backend) = self.backend {
            settings.ocr_backend = backend.clone();
        }
        if let Some(ref lang) = self.lang {
            settings.ocr_language = lang.clone();
        }
        if let Some(ref ids) = self.region_ids {
            settings.region_ids = RegionIdStrategy::from_str(ids)
                .with_context(|| format!("Unknown region id style '{}'", ids))?;
        }
        Ok(())
    }
}

pub async fn cmd_process(mut settings: Settings, args: ProcessArgs) -> anyhow::Result<()> {
    args.apply(&mut settings)?;
    settings.validate()?;

    let backend_type = OcrBackendType::from_str(&settings.ocr_backend).with_context(|| {
        format!(
            "Unknown OCR backend '{}' (expected tesseract, ocrs, or paddleocr)",
            settings.ocr_backend
        )
    })?;
    let ocr = create_backend(
        backend_type,
        OcrConfig {
            language: settings.ocr_language.clone(),
            ..Default::default()
        },
    )?;
    if !ocr.is_available() {
        println!(
            "{} {} is not available: {}",
            style("!").yellow(),
            backend_type,
            ocr.availability_hint()
        );
        println!("  Every page will be recorded as failed. Run 'doclabel check' for details.");
    }

    let rasterizer = Arc::new(PopplerRasterizer::new());
    if !rasterizer.is_available() {
        println!(
            "{} pdftoppm/pdfinfo not found; every document will fail. Install poppler-utils.",
            style("!").yellow()
        );
    }

    let mut summary_base = RunSummary::started();
    let documents = match discover_documents(&args.input) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::warn!("{}", e);
            println!("{} {}", style("!").yellow(), e);
            summary_base.record_input_error(e.to_string());
            Vec::new()
        }
    };

    let locator = settings.image_locator()?;
    let service = DatasetService::new(
        rasterizer,
        ocr,
        Assembler::new(settings.assembly_options(), locator),
        PipelineOptions {
            dpi: settings.dpi,
            workers: settings.workers,
            images_dir: settings.images_dir.clone(),
        },
    );

    // Ctrl+C stops the run between documents
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Interrupted; finishing queued pages and writing the dataset",
                style("!").yellow()
            );
            let _ = cancel_tx.send(true);
        }
    });

    let (event_tx, event_rx) = mpsc::channel::<DatasetEvent>(100);
    let event_handler = tokio::spawn(handle_events(event_rx));

    let DatasetRun { dataset, summary } = service.process(documents, event_tx, cancel_rx).await;
    let _ = event_handler.await;

    let mut summary = RunSummary {
        started_at: summary_base.started_at,
        input_errors: summary_base.input_errors,
        ..summary
    };

    if keeps_existing_output(&summary, &dataset, settings.output_path.exists()) {
        println!(
            "{} Nothing was processed; leaving existing {} untouched",
            style("!").yellow(),
            settings.output_path.display()
        );
    } else {
        write_dataset(&settings, &dataset)?;
    }
    summary.finish();

    if let Some(ref path) = args.summary {
        write_json_atomic(path, &summary)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }

    print_summary(&summary);
    Ok(())
}

/// A run that failed on its input must not replace a dataset from an earlier run.
fn keeps_existing_output(summary: &RunSummary, dataset: &Dataset, output_exists: bool) -> bool {
    output_exists && dataset.is_empty() && !summary.input_errors.is_empty()
}

fn write_dataset(settings: &Settings, dataset: &Dataset) -> anyhow::Result<()> {
    let writer = DatasetWriter::new(&settings.output_path);
    writer
        .write(dataset)
        .with_context(|| format!("Failed to write dataset to {}", writer.path().display()))?;
    println!(
        "{} Wrote {} tasks to {}",
        style("✓").green(),
        dataset.len(),
        writer.path().display()
    );
    Ok(())
}

async fn handle_events(mut event_rx: mpsc::Receiver<DatasetEvent>) {
    let bar = page_bar();

    while let Some(event) = event_rx.recv().await {
        match event {
            DatasetEvent::Started { total_documents } => {
                bar.set_message(format!("0/{} documents rendered", total_documents));
            }
            DatasetEvent::DocumentStarted { document_id, .. } => {
                bar.set_message(format!("Rendering {}", document_id));
            }
            DatasetEvent::DocumentRendered { pages, .. } => {
                bar.inc_length(pages as u64);
            }
            DatasetEvent::DocumentFailed { document_id, error } => {
                bar_eprintln(
                    &bar,
                    &format!("  {} Document {} failed: {}", style("✗").red(), document_id, error),
                );
            }
            DatasetEvent::PageCompleted { .. } => bar.inc(1),
            DatasetEvent::PageFailed { key, error } => {
                bar_eprintln(
                    &bar,
                    &format!(
                        "  {} Page {} of {} failed: {}",
                        style("✗").red(),
                        key.page,
                        key.document,
                        error
                    ),
                );
                bar.inc(1);
            }
            DatasetEvent::Aborted {
                remaining_documents,
            } => {
                bar_eprintln(
                    &bar,
                    &format!(
                        "  {} Skipped {} remaining documents",
                        style("!").yellow(),
                        remaining_documents
                    ),
                );
            }
            DatasetEvent::Finished { .. } => bar.finish_and_clear(),
            DatasetEvent::PageStarted { .. } => {}
        }
    }
    bar.finish_and_clear();
}

fn print_summary(summary: &RunSummary) {
    let mark = if summary.aborted || summary.has_failures() {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    println!("{} {}", mark, summary);
    if let Some(secs) = summary.duration_secs() {
        println!("  {}", style(format!("took {:.1}s", secs)).dim());
    }

    for error in &summary.input_errors {
        println!("  {} {}", style("✗").red(), error);
    }
    for failure in &summary.document_failures {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            failure.document,
            failure.error
        );
    }
    for failure in &summary.page_failures {
        println!("  {} {}: {}", style("✗").red(), failure.key, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_keeps_existing_output() {
        let empty = Dataset::new(Vec::new());
        let mut failed_input = RunSummary::started();
        failed_input.record_input_error("Input not found: scnas/");

        assert!(keeps_existing_output(&failed_input, &empty, true));
        // first run still produces an (empty) dataset file
        assert!(!keeps_existing_output(&failed_input, &empty, false));
        // without an input error the old dataset is replaced
        assert!(!keeps_existing_output(&RunSummary::started(), &empty, true));
    }
}
