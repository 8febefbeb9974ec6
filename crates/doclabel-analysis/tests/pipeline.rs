//! Pipeline behavior with in-process rasterizer and recognizer fakes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use doclabel::dataset::{Assembler, AssemblyOptions, RegionIdStrategy};
use doclabel::models::{Detection, PageImage, PageKey, Quad, SourceDocument};
use doclabel::utils::{page_image_name, ImageLocator};
use doclabel_analysis::ocr::{OcrBackend, OcrBackendType, OcrError};
use doclabel_analysis::render::{PageRender, PageRenderError, Rasterizer, RenderError};
use doclabel_analysis::services::{DatasetEvent, DatasetService, PipelineOptions};
use tokio::sync::{mpsc, watch};

/// Pretends every document has a fixed page count; `broken` fails and page 2
/// of `smudged` cannot be decoded.
struct FakeRasterizer {
    pages: u32,
    cancel_after: Option<(String, watch::Sender<bool>)>,
}

impl Rasterizer for FakeRasterizer {
    fn render_pages(
        &self,
        _pdf_path: &Path,
        document_id: &str,
        _dpi: u32,
        images_dir: &Path,
    ) -> Result<Vec<PageRender>, RenderError> {
        if document_id == "broken" {
            return Err(RenderError::NoPages(PathBuf::from("broken.pdf")));
        }
        if let Some((id, tx)) = &self.cancel_after {
            if id == document_id {
                let _ = tx.send(true);
            }
        }
        Ok((1..=self.pages)
            .map(|page| {
                let key = PageKey::new(document_id, page);
                let path = images_dir.join(document_id).join(page_image_name(page));
                if document_id == "smudged" && page == 2 {
                    return Err(PageRenderError {
                        key,
                        path: path.clone(),
                        source: RenderError::Image {
                            path,
                            message: "truncated PNG".into(),
                        },
                    });
                }
                Ok(PageImage {
                    key,
                    path,
                    width: 1000,
                    height: 2000,
                })
            })
            .collect())
    }
}

/// One line per page; page 2 of `flaky` fails.
struct FakeOcr {
    seen: Mutex<Vec<PathBuf>>,
}

impl OcrBackend for FakeOcr {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<Vec<Detection>, OcrError> {
        self.seen.lock().unwrap().push(image_path.to_path_buf());
        if image_path.ends_with("flaky/page_2.png") {
            return Err(OcrError::OcrFailed("engine crashed".into()));
        }
        Ok(vec![Detection::new(
            Quad::from_rect(100.0, 200.0, 300.0, 400.0),
            "Total: $42",
            0.95,
        )])
    }
}

fn service(rasterizer: FakeRasterizer, workers: usize) -> (DatasetService, Arc<FakeOcr>) {
    let ocr = Arc::new(FakeOcr {
        seen: Mutex::new(Vec::new()),
    });
    let locator = ImageLocator::new("http://localhost:8080/", "image").unwrap();
    let assembler = Assembler::new(
        AssemblyOptions {
            region_ids: RegionIdStrategy::Sequential,
            ..Default::default()
        },
        locator,
    );
    let service = DatasetService::new(
        Arc::new(rasterizer),
        ocr.clone(),
        assembler,
        PipelineOptions {
            dpi: 300,
            workers,
            images_dir: PathBuf::from("image"),
        },
    );
    (service, ocr)
}

fn docs(ids: &[&str]) -> Vec<SourceDocument> {
    ids.iter()
        .map(|id| SourceDocument::new(*id, format!("in/{}.pdf", id)))
        .collect()
}

async fn run(
    service: &DatasetService,
    documents: Vec<SourceDocument>,
    cancel: watch::Receiver<bool>,
) -> (doclabel_analysis::services::DatasetRun, Vec<DatasetEvent>) {
    let (tx, mut rx) = mpsc::channel(8);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });
    let result = service.process(documents, tx, cancel).await;
    let events = collector.await.unwrap();
    (result, events)
}

#[tokio::test]
async fn test_records_are_ordered_by_document_then_page() {
    let (service, ocr) = service(
        FakeRasterizer {
            pages: 5,
            cancel_after: None,
        },
        3,
    );
    let (_cancel_tx, cancel) = watch::channel(false);
    let (run, _) = run(&service, docs(&["b", "a"]), cancel).await;

    let keys: Vec<String> = run
        .dataset
        .records
        .iter()
        .map(|r| r.key.to_string())
        .collect();
    assert_eq!(
        keys,
        ["b p1", "b p2", "b p3", "b p4", "b p5", "a p1", "a p2", "a p3", "a p4", "a p5"]
    );
    assert_eq!(ocr.seen.lock().unwrap().len(), 10);
    assert_eq!(run.summary.pages_total, 10);
    assert_eq!(run.summary.detections_emitted, 10);
    assert!(run.summary.finished_at.is_some());

    let first = &run.dataset.records[0];
    assert_eq!(first.image_url, "http://localhost:8080/b/page_1.png");
    assert_eq!(first.shapes[0].id, "r0001");
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let (service, _) = service(
        FakeRasterizer {
            pages: 3,
            cancel_after: None,
        },
        2,
    );
    let (_cancel_tx, cancel) = watch::channel(false);
    let (run, events) = run(&service, docs(&["broken", "flaky"]), cancel).await;

    assert_eq!(run.summary.documents_discovered, 2);
    assert_eq!(run.summary.documents_processed, 1);
    assert_eq!(run.summary.document_failures.len(), 1);
    assert_eq!(run.summary.document_failures[0].document, "broken");

    let records = &run.dataset.records;
    assert_eq!(records.len(), 3);
    assert!(records[1].is_failed());
    assert!(records[1].shapes.is_empty());
    assert!(records[1].error.as_deref().unwrap().contains("engine crashed"));
    assert!(!records[0].is_failed() && !records[2].is_failed());
    assert_eq!(run.summary.pages_failed(), 1);

    assert!(events
        .iter()
        .any(|e| matches!(e, DatasetEvent::DocumentFailed { document_id, .. } if document_id == "broken")));
    assert!(events
        .iter()
        .any(|e| matches!(e, DatasetEvent::PageFailed { key, .. } if key.page == 2)));
    assert!(matches!(
        events.last(),
        Some(DatasetEvent::Finished {
            pages: 3,
            failed_pages: 1
        })
    ));
}

#[tokio::test]
async fn test_unrenderable_page_keeps_its_siblings() {
    let (service, ocr) = service(
        FakeRasterizer {
            pages: 3,
            cancel_after: None,
        },
        2,
    );
    let (_cancel_tx, cancel) = watch::channel(false);
    let (run, events) = run(&service, docs(&["smudged"]), cancel).await;

    assert_eq!(run.summary.documents_processed, 1);
    assert!(run.summary.document_failures.is_empty());

    let records = &run.dataset.records;
    let pages: Vec<u32> = records.iter().map(|r| r.key.page).collect();
    assert_eq!(pages, [1, 2, 3]);
    assert!(!records[0].is_failed() && !records[2].is_failed());
    assert!(records[1].is_failed());
    assert!(records[1].error.as_deref().unwrap().contains("truncated PNG"));
    assert_eq!(records[1].image_url, "http://localhost:8080/smudged/page_2.png");

    // the failed page never reaches the recognizer
    assert_eq!(ocr.seen.lock().unwrap().len(), 2);
    assert_eq!(run.summary.pages_failed(), 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, DatasetEvent::PageFailed { key, .. } if key.page == 2)));
}

#[tokio::test]
async fn test_cancel_stops_before_next_document() {
    let (cancel_tx, cancel) = watch::channel(false);
    let (service, _) = service(
        FakeRasterizer {
            pages: 2,
            cancel_after: Some(("a".to_string(), cancel_tx)),
        },
        4,
    );
    let (run, events) = run(&service, docs(&["a", "b", "c"]), cancel).await;

    assert!(run.summary.aborted);
    assert_eq!(run.summary.documents_processed, 1);
    // pages already queued from the first document are kept
    assert_eq!(run.dataset.len(), 2);
    assert!(run.dataset.records.iter().all(|r| r.key.document == "a"));
    assert!(events.iter().any(|e| matches!(
        e,
        DatasetEvent::Aborted {
            remaining_documents: 2
        }
    )));
}

#[tokio::test]
async fn test_no_documents_yields_empty_dataset() {
    let (service, _) = service(
        FakeRasterizer {
            pages: 1,
            cancel_after: None,
        },
        1,
    );
    let (_cancel_tx, cancel) = watch::channel(false);
    let (run, _) = run(&service, Vec::new(), cancel).await;
    assert!(run.dataset.is_empty());
    assert!(!run.summary.has_failures());
}
