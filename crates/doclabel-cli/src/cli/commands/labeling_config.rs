//! `labeling-config`: print the labeling interface XML.

use doclabel::config::Settings;
use doclabel::dataset::labeling_config;

pub fn cmd_labeling_config(settings: &Settings, labels: Vec<String>) -> anyhow::Result<()> {
    let labels = if labels.is_empty() {
        settings.labels.clone()
    } else {
        labels
    };
    if labels.is_empty() {
        tracing::warn!("No labels configured; the label set will be empty");
    }
    print!("{}", labeling_config(&labels));
    Ok(())
}
