//! Tool availability check command.

use console::style;

use doclabel::config::Settings;
use doclabel_analysis::ocr::{check_binary, OcrBackend, OcrBackendType, TesseractBackend};
use doclabel_server::AnnotatorProcess;

/// Report which external tools and OCR backends are usable.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("Tool Status").bold());
    println!("{}", "-".repeat(50));

    println!("\n{}", style("Rasterizer:").cyan());
    let mut all_found = true;
    for tool in ["pdftoppm", "pdfinfo"] {
        let status = if check_binary(tool) {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!("\n{}", style("OCR Backends:").cyan());

    let tesseract = TesseractBackend::new();
    let tesseract_status = if tesseract.is_available() {
        style("✓ available").green()
    } else {
        style("✗ not available").red()
    };
    println!("  {:<15} {}", "Tesseract", tesseract_status);
    if !tesseract.is_available() {
        println!(
            "                  {}",
            style(tesseract.availability_hint()).dim()
        );
    }

    // OCRS (models auto-download on first use)
    #[cfg(feature = "ocr-ocrs")]
    {
        use doclabel_analysis::ocr::OcrsBackend;
        let ocrs = OcrsBackend::new();
        let ocrs_status = if ocrs.is_available() {
            style("✓ available").green()
        } else {
            style("○ models will auto-download").yellow()
        };
        println!("  {:<15} {}", "OCRS", ocrs_status);
        println!(
            "                  {}",
            style(ocrs.availability_hint()).dim()
        );
    }
    #[cfg(not(feature = "ocr-ocrs"))]
    {
        println!(
            "  {:<15} {}",
            "OCRS",
            style("not compiled (enable ocr-ocrs feature)").dim()
        );
    }

    // PaddleOCR (models auto-download on first use)
    #[cfg(feature = "ocr-paddle")]
    {
        use doclabel_analysis::ocr::PaddleBackend;
        let paddle = PaddleBackend::new();
        let paddle_status = if paddle.is_available() {
            style("✓ available").green()
        } else {
            style("○ models will auto-download").yellow()
        };
        println!("  {:<15} {}", "PaddleOCR", paddle_status);
        println!(
            "                  {}",
            style(paddle.availability_hint()).dim()
        );
    }
    #[cfg(not(feature = "ocr-paddle"))]
    {
        println!(
            "  {:<15} {}",
            "PaddleOCR",
            style("not compiled (enable ocr-paddle feature)").dim()
        );
    }

    println!("\n{}", style("Annotation Tool:").cyan());
    let annotator = &settings.serve.annotator;
    let annotator_status = if AnnotatorProcess::is_available(annotator) {
        style("✓ found").green()
    } else {
        style("○ not installed").yellow()
    };
    println!("  {:<15} {}", annotator.program, annotator_status);

    println!("\n{}", style("Configured Backend:").cyan());
    match OcrBackendType::from_str(&settings.ocr_backend) {
        Some(backend) if backend.is_compiled() => {
            println!(
                "  {} {} (language: {})",
                style("→").green(),
                backend,
                settings.ocr_language
            );
        }
        Some(backend) => println!(
            "  {} {} is configured but not compiled in (enable {})",
            style("!").yellow(),
            backend,
            backend.feature().unwrap_or_default()
        ),
        None => println!(
            "  {} Unknown backend '{}'",
            style("!").yellow(),
            settings.ocr_backend
        ),
    }

    println!();

    if all_found && tesseract.is_available() {
        println!("{} Required tools are available", style("✓").green());
    } else {
        println!(
            "{} Some tools are missing. Install them to process PDFs:",
            style("!").yellow()
        );
        println!("  - pdftoppm, pdfinfo: poppler-utils package");
        println!("  - tesseract: tesseract-ocr package");
    }

    Ok(())
}
