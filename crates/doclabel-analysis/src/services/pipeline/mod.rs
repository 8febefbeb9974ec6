//! Dataset pipeline: rasterize each document, OCR its pages on a bounded
//! set of blocking workers, and assemble one record per page.
//!
//! Pages from one document may still be in OCR while the next document is
//! rendering. Records are reordered by discovery order and page number
//! before they are returned.

mod discovery;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use doclabel::dataset::{Assembler, Dataset, DatasetRecord, RunSummary};
use doclabel::models::{Page, PageImage, SourceDocument};

use crate::ocr::OcrBackend;
use crate::render::{PageRender, PageRenderError, Rasterizer};

pub use discovery::{discover_documents, DiscoveryError};
pub use types::{DatasetEvent, DatasetRun};

/// Knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub dpi: u32,
    pub workers: usize,
    pub images_dir: PathBuf,
}

struct PendingPage {
    order: usize,
    image: PageImage,
    handle: JoinHandle<DatasetRecord>,
}

/// Service that turns discovered PDFs into a dataset.
pub struct DatasetService {
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrBackend>,
    assembler: Arc<Assembler>,
    options: PipelineOptions,
}

impl DatasetService {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrBackend>,
        assembler: Assembler,
        options: PipelineOptions,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            assembler: Arc::new(assembler),
            options: PipelineOptions {
                workers: options.workers.max(1),
                ..options
            },
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process documents in order.
    ///
    /// The caller must drain `event_tx`'s receiver concurrently. Setting
    /// `cancel` to `true` stops the run before the next document starts;
    /// pages already queued still finish and are included.
    pub async fn process(
        &self,
        documents: Vec<SourceDocument>,
        event_tx: mpsc::Sender<DatasetEvent>,
        cancel: watch::Receiver<bool>,
    ) -> DatasetRun {
        let mut summary = RunSummary::started();
        summary.documents_discovered = documents.len();

        let _ = event_tx
            .send(DatasetEvent::Started {
                total_documents: documents.len(),
            })
            .await;

        let total = documents.len();
        let mut pending: Vec<PendingPage> = Vec::with_capacity(self.options.workers);
        let mut records: Vec<(usize, DatasetRecord)> = Vec::new();

        for (order, document) in documents.into_iter().enumerate() {
            if *cancel.borrow() {
                warn!("Cancelled; skipping {} remaining documents", total - order);
                summary.aborted = true;
                let _ = event_tx
                    .send(DatasetEvent::Aborted {
                        remaining_documents: total - order,
                    })
                    .await;
                break;
            }

            let _ = event_tx
                .send(DatasetEvent::DocumentStarted {
                    document_id: document.id.clone(),
                    path: document.path.clone(),
                })
                .await;

            let images = match self.render(&document).await {
                Ok(images) => images,
                Err(error) => {
                    warn!("{}: {}", document.id, error);
                    summary.record_document_failure(&document.id, &error);
                    let _ = event_tx
                        .send(DatasetEvent::DocumentFailed {
                            document_id: document.id.clone(),
                            error,
                        })
                        .await;
                    continue;
                }
            };

            summary.documents_processed += 1;
            info!("{}: rendered {} pages", document.id, images.len());
            let _ = event_tx
                .send(DatasetEvent::DocumentRendered {
                    document_id: document.id.clone(),
                    pages: images.len(),
                })
                .await;

            for outcome in images {
                let image = match outcome {
                    Ok(image) => image,
                    Err(failure) => {
                        records.push((order, self.render_failure(failure, &event_tx).await));
                        continue;
                    }
                };
                let handle = self.spawn_page(image.clone(), event_tx.clone());
                pending.push(PendingPage {
                    order,
                    image,
                    handle,
                });

                if pending.len() >= self.options.workers {
                    self.drain(&mut pending, &mut records).await;
                }
            }
        }

        self.drain(&mut pending, &mut records).await;

        records.sort_by(|(a_order, a), (b_order, b)| {
            a_order.cmp(b_order).then(a.key.page.cmp(&b.key.page))
        });
        let records: Vec<DatasetRecord> = records.into_iter().map(|(_, r)| r).collect();
        for record in &records {
            summary.record_page(record);
        }
        summary.finish();

        let _ = event_tx
            .send(DatasetEvent::Finished {
                pages: summary.pages_total,
                failed_pages: summary.pages_failed(),
            })
            .await;

        DatasetRun {
            dataset: Dataset::new(records),
            summary,
        }
    }

    async fn render(&self, document: &SourceDocument) -> Result<Vec<PageRender>, String> {
        let rasterizer = self.rasterizer.clone();
        let path = document.path.clone();
        let id = document.id.clone();
        let dpi = self.options.dpi;
        let images_dir = self.options.images_dir.clone();

        match tokio::task::spawn_blocking(move || {
            rasterizer.render_pages(&path, &id, dpi, &images_dir)
        })
        .await
        {
            Ok(Ok(images)) => Ok(images),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("renderer panicked: {}", e)),
        }
    }

    /// Error-marked record for a page whose image was never produced.
    async fn render_failure(
        &self,
        failure: PageRenderError,
        event_tx: &mpsc::Sender<DatasetEvent>,
    ) -> DatasetRecord {
        let error = failure.source.to_string();
        let _ = event_tx
            .send(DatasetEvent::PageFailed {
                key: failure.key.clone(),
                error: error.clone(),
            })
            .await;
        let url = self.assembler.locator().url_for_path(&failure.path);
        DatasetRecord::failed(failure.key, url, error)
    }

    fn spawn_page(
        &self,
        image: PageImage,
        event_tx: mpsc::Sender<DatasetEvent>,
    ) -> JoinHandle<DatasetRecord> {
        let ocr = self.ocr.clone();
        let assembler = self.assembler.clone();

        tokio::task::spawn_blocking(move || {
            let key = image.key.clone();
            let _ = futures::executor::block_on(
                event_tx.send(DatasetEvent::PageStarted { key: key.clone() }),
            );

            let page = match ocr.detect(&image.path) {
                Ok(result) => {
                    debug!(
                        "{}: {} detections in {}ms ({})",
                        key,
                        result.detections.len(),
                        result.processing_time_ms,
                        result.backend
                    );
                    let _ = futures::executor::block_on(event_tx.send(
                        DatasetEvent::PageCompleted {
                            key: key.clone(),
                            detections: result.detections.len(),
                        },
                    ));
                    Page::recognized(image, result.detections)
                }
                Err(e) => {
                    let _ = futures::executor::block_on(event_tx.send(DatasetEvent::PageFailed {
                        key: key.clone(),
                        error: e.to_string(),
                    }));
                    Page::failed(image, e.to_string())
                }
            };

            assembler.assemble_page(&page)
        })
    }

    async fn drain(&self, pending: &mut Vec<PendingPage>, records: &mut Vec<(usize, DatasetRecord)>) {
        for p in pending.drain(..) {
            let record = match p.handle.await {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!("OCR worker panicked: {}", e);
                    let url = self.assembler.locator().url_for_path(&p.image.path);
                    DatasetRecord::failed(p.image.key, url, format!("OCR worker panicked: {}", e))
                }
            };
            records.push((p.order, record));
        }
    }
}
