//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod convert;
mod labeling_config;
mod process;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use doclabel::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "doclabel")]
#[command(about = "Turn PDFs into pre-annotated OCR labeling datasets")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Render, OCR, and assemble a dataset from a PDF or a directory of PDFs
    Process(process::ProcessArgs),

    /// Serve page images and run the annotation tool until Ctrl+C
    Serve {
        /// Bind address: port, host, or host:port (default from config)
        #[arg(short, long)]
        bind: Option<String>,
        /// Images directory to serve (default from config)
        #[arg(long)]
        images_dir: Option<PathBuf>,
        /// Serve images only; do not start the annotation tool
        #[arg(long)]
        no_annotator: bool,
    },

    /// Check availability of rasterizer, OCR backends, and annotation tool
    Check,

    /// Convert an annotation export into a columnar training set
    Convert {
        /// JSON-MIN export file from the annotation tool
        input: PathBuf,
        /// Output path for the training set
        #[arg(short, long, default_value = "training_set.json")]
        output: PathBuf,
        /// Label names in class-id order (overrides config `labels`)
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,
    },

    /// Print the labeling interface config matching the emitted dataset
    LabelingConfig {
        /// Label names (overrides config `labels`)
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Process(args) => process::cmd_process(settings, args).await,
        Commands::Serve {
            bind,
            images_dir,
            no_annotator,
        } => serve::cmd_serve(settings, bind.as_deref(), images_dir, no_annotator).await,
        Commands::Check => check::cmd_check(&settings).await,
        Commands::Convert {
            input,
            output,
            labels,
        } => convert::cmd_convert(&settings, &input, &output, labels).await,
        Commands::LabelingConfig { labels } => {
            labeling_config::cmd_labeling_config(&settings, labels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["doclabel", "process", "docs/", "-v", "--cwd"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.cwd);
        assert!(matches!(cli.command, Commands::Process(_)));
    }

    #[test]
    fn test_labels_are_comma_separated() {
        let cli =
            Cli::try_parse_from(["doclabel", "labeling-config", "--labels", "name,total"]).unwrap();
        match cli.command {
            Commands::LabelingConfig { labels } => assert_eq!(labels, ["name", "total"]),
            _ => panic!("expected labeling-config"),
        }
    }
}
