//! Listing of generated files.

use console::style;

use crate::config::Settings;

use super::helpers::{format_bytes, open_facade, truncate};
use super::OutputFormat;

/// List PDFs in the output directory.
pub async fn cmd_ls(settings: &Settings, format: OutputFormat) -> anyhow::Result<()> {
    let facade = open_facade(settings)?;
    let files = facade.list_artifacts().await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!(
            "{} No PDFs in {}",
            style("!").yellow(),
            facade.output_dir().display()
        );
        return Ok(());
    }

    println!("\n{}", style("Generated PDFs").bold());
    println!("{}", "-".repeat(60));
    println!("{:<35} {:>10} Created", "Name", "Size");
    println!("{}", "-".repeat(60));

    for file in &files {
        println!(
            "{:<35} {:>10} {}",
            truncate(&file.name, 34),
            format_bytes(file.size_bytes),
            file.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
