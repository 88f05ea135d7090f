//! Commands operating on existing PDFs: merge, extract and watermark.

use std::path::{Path, PathBuf};

use console::style;

use crate::config::Settings;
use crate::documents::WatermarkOptions;

use super::helpers::{open_facade, print_written};

/// Merge PDFs in the given order.
pub async fn cmd_merge(settings: &Settings, sources: &[PathBuf], name: &str) -> anyhow::Result<()> {
    let missing: Vec<_> = sources.iter().filter(|p| !p.exists()).collect();
    for path in &missing {
        println!(
            "{} Skipping missing file {}",
            style("!").yellow(),
            path.display()
        );
    }

    let facade = open_facade(settings)?;
    let result = facade.merge(sources, name).await?;
    print_written("Merged into", &result);
    Ok(())
}

/// Print the text and metadata of a PDF.
pub async fn cmd_extract(settings: &Settings, source: &Path, json: bool) -> anyhow::Result<()> {
    let facade = open_facade(settings)?;
    let extracted = facade.extract_text(source).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&extracted)?);
        return Ok(());
    }

    println!("\n{}", style(source.display()).bold());
    println!("{}", "-".repeat(60));
    println!("{:<20} {}", "Pages", extracted.page_count);
    for (key, value) in &extracted.metadata {
        println!("{:<20} {}", key, value);
    }
    println!("{}", "-".repeat(60));
    println!("{}", extracted.text.trim_end());

    Ok(())
}

/// Watermark a PDF into a new file.
pub async fn cmd_watermark(
    settings: &Settings,
    source: &Path,
    text: &str,
    name: &str,
    options: &WatermarkOptions,
) -> anyhow::Result<()> {
    let facade = open_facade(settings)?;
    let result = facade.apply_watermark(source, text, name, options).await?;
    print_written("Watermarked", &result);
    Ok(())
}
