//! Generation commands: HTML rendering and text layout.

use std::path::Path;

use console::style;
use tokio::io::AsyncReadExt;

use crate::config::Settings;
use crate::documents::OptionMap;

use super::helpers::{open_facade, print_written};

/// Render an HTML file to PDF.
pub async fn cmd_html(
    settings: &Settings,
    input: &Path,
    name: &str,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let markup = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input.display(), e))?;

    let mut options = OptionMap::new();
    if let Some(format) = format {
        options.insert("format".to_string(), format.into());
    }

    println!(
        "{} Rendering {}...",
        style("→").cyan(),
        input.display()
    );
    let facade = open_facade(settings)?;
    let result = facade.render_html(&markup, name, &options).await?;
    print_written("Generated", &result);
    Ok(())
}

/// Lay out a text file (or stdin when `input` is "-") as PDF.
pub async fn cmd_text(
    settings: &Settings,
    input: &str,
    name: &str,
    title: Option<&str>,
) -> anyhow::Result<()> {
    let text = if input == "-" {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        text
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input, e))?
    };

    if text.trim().is_empty() {
        println!("{} No text to lay out", style("!").yellow());
        return Ok(());
    }

    let mut options = OptionMap::new();
    if let Some(title) = title {
        options.insert("title".to_string(), title.into());
    }

    let facade = open_facade(settings)?;
    let result = facade.compose_text(&text, name, &options).await?;
    print_written("Generated", &result);
    Ok(())
}
