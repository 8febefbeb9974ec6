//! `convert`: annotation export to training set.

use std::path::Path;

use anyhow::Context;
use console::style;

use doclabel::config::Settings;
use doclabel::convert::{convert_file, LabelMap};

pub async fn cmd_convert(
    settings: &Settings,
    input: &Path,
    output: &Path,
    labels: Vec<String>,
) -> anyhow::Result<()> {
    let labels = if labels.is_empty() {
        settings.labels.clone()
    } else {
        labels
    };
    let label_map = LabelMap::new(&labels);

    println!(
        "{} Converting {} ({} labels)",
        style("→").cyan(),
        input.display(),
        labels.len()
    );

    let (input_path, output_path) = (input.to_path_buf(), output.to_path_buf());
    let stats = tokio::task::spawn_blocking(move || convert_file(&input_path, &output_path, &label_map))
        .await?
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    println!(
        "{} Wrote {} examples ({} tokens) to {}",
        style("✓").green(),
        stats.examples,
        stats.tokens,
        output.display()
    );
    if stats.unknown_labels > 0 {
        println!(
            "  {} {} tags used labels outside the configured set",
            style("!").yellow(),
            stats.unknown_labels
        );
    }
    if stats.unpaired > 0 {
        println!(
            "  {} {} tokens or regions had no counterpart and were dropped",
            style("!").yellow(),
            stats.unpaired
        );
    }
    Ok(())
}
