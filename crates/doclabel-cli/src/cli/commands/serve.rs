//! `serve`: image file server plus annotation tool.

use std::path::PathBuf;

use console::style;

use doclabel::config::Settings;
use doclabel_server::{AnnotatorProcess, FileServer};

/// Serve images and supervise the annotation tool until Ctrl+C.
pub async fn cmd_serve(
    settings: Settings,
    bind: Option<&str>,
    images_dir: Option<PathBuf>,
    no_annotator: bool,
) -> anyhow::Result<()> {
    let serve = &settings.serve;
    let (host, port) = match bind {
        Some(bind) => parse_bind_address(bind, &serve.host, serve.port),
        None => (serve.host.clone(), serve.port),
    };
    let images_dir = images_dir.unwrap_or_else(|| settings.images_dir.clone());
    if !images_dir.is_dir() {
        println!(
            "{} {} does not exist yet; run 'doclabel process' first",
            style("!").yellow(),
            images_dir.display()
        );
    }

    let mut file_server = FileServer::start(&host, port, &images_dir).await?;
    println!(
        "{} Serving {} at http://{}",
        style("→").cyan(),
        images_dir.display(),
        file_server.local_addr()
    );

    let mut annotator = None;
    if !no_annotator && serve.annotator.enabled {
        println!(
            "{} Starting {} on port {} (waiting up to {}s)",
            style("→").cyan(),
            serve.annotator.program,
            serve.annotator.port,
            serve.annotator.start_timeout.as_secs()
        );
        match AnnotatorProcess::start(&serve.annotator).await {
            Ok(process) => {
                println!(
                    "  {} {} ready at http://localhost:{}",
                    style("✓").green(),
                    serve.annotator.program,
                    serve.annotator.port
                );
                annotator = Some(process);
            }
            Err(e) => {
                eprintln!("  {} {}", style("✗").red(), e);
                file_server.stop(serve.shutdown_timeout).await?;
                return Err(e.into());
            }
        }
    }

    println!("  Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    println!("\n{} Shutting down...", style("→").cyan());

    if let Some(mut process) = annotator {
        process.stop(serve.annotator.stop_timeout).await?;
    }
    file_server.stop(serve.shutdown_timeout).await?;

    println!("{} Stopped", style("✓").green());
    Ok(())
}

/// Parse a bind address that can be:
/// - Just a port: "8080" -> default host
/// - Just a host: "127.0.0.1" -> default port
/// - Host and port: "0.0.0.0:8080"
fn parse_bind_address(bind: &str, default_host: &str, default_port: u16) -> (String, u16) {
    if let Ok(port) = bind.parse::<u16>() {
        return (default_host.to_string(), port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (bind.to_string(), default_port)
}
