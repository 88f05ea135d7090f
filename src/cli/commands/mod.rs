//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod documents;
mod files;
mod generate;
mod helpers;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON array
    Json,
}

#[derive(Parser)]
#[command(name = "pdfbot")]
#[command(about = "Generate, merge, extract and watermark PDF documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory generated PDFs are written to (overrides config and environment)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

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
    /// Start the HTTP server
    Serve {
        /// Address to bind: PORT, HOST or HOST:PORT
        bind: Option<String>,
    },

    /// Render an HTML file to PDF with the headless browser
    Html {
        /// HTML file to render
        input: PathBuf,
        /// Output file name inside the output directory
        #[arg(short = 'n', long = "name", default_value = "output.pdf")]
        name: String,
        /// Page format (A4, Letter, Legal, ...)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Lay out a plain text file as PDF ("-" reads stdin)
    Text {
        /// Text file to lay out, or "-" for stdin
        input: String,
        /// Output file name inside the output directory
        #[arg(short = 'n', long = "name", default_value = "text-output.pdf")]
        name: String,
        /// Title drawn above the text and stored in the document info
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Merge PDFs in the given order
    Merge {
        /// PDF files to merge
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Output file name inside the output directory
        #[arg(short = 'n', long = "name", default_value = "merged.pdf")]
        name: String,
    },

    /// Extract text and metadata from a PDF
    Extract {
        /// PDF file to read
        source: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stamp text across every page of a PDF
    Watermark {
        /// PDF file to watermark (left untouched)
        source: PathBuf,
        /// Watermark text
        text: String,
        /// Output file name inside the output directory
        #[arg(short = 'n', long = "name", default_value = "watermarked.pdf")]
        name: String,
        /// Fill opacity, 0 to 1
        #[arg(long, default_value = "0.3")]
        opacity: f32,
        /// Font size in points
        #[arg(long, default_value = "50")]
        font_size: f32,
        /// Counter-clockwise rotation in degrees
        #[arg(long, default_value = "45")]
        rotation: f32,
    },

    /// List generated PDFs
    Ls {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        output_dir: cli.output_dir,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Html {
            input,
            name,
            format,
        } => generate::cmd_html(&settings, &input, &name, format.as_deref()).await,
        Commands::Text { input, name, title } => {
            generate::cmd_text(&settings, &input, &name, title.as_deref()).await
        }
        Commands::Merge { sources, name } => {
            documents::cmd_merge(&settings, &sources, &name).await
        }
        Commands::Extract { source, json } => {
            documents::cmd_extract(&settings, &source, json).await
        }
        Commands::Watermark {
            source,
            text,
            name,
            opacity,
            font_size,
            rotation,
        } => {
            let options = crate::documents::WatermarkOptions {
                opacity,
                font_size,
                rotation_degrees: rotation,
            };
            documents::cmd_watermark(&settings, &source, &text, &name, &options).await
        }
        Commands::Ls { format } => files::cmd_ls(&settings, format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_watermark() {
        let cli = Cli::try_parse_from([
            "pdfbot",
            "watermark",
            "in.pdf",
            "DRAFT",
            "--opacity",
            "0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Watermark {
                text,
                name,
                opacity,
                font_size,
                ..
            } => {
                assert_eq!(text, "DRAFT");
                assert_eq!(name, "watermarked.pdf");
                assert_eq!(opacity, 0.5);
                assert_eq!(font_size, 50.0);
            }
            _ => panic!("expected watermark command"),
        }
    }

    #[test]
    fn test_cli_global_output_dir() {
        let cli = Cli::try_parse_from(["pdfbot", "ls", "-o", "/tmp/pdfs", "--format", "json"])
            .unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/pdfs")));
        assert!(matches!(
            cli.command,
            Commands::Ls {
                format: OutputFormat::Json
            }
        ));
    }

    #[test]
    fn test_cli_merge_requires_sources() {
        assert!(Cli::try_parse_from(["pdfbot", "merge"]).is_err());
    }
}
