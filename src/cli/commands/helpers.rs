//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::documents::{DocumentFacade, ResultDescriptor};

/// Build the facade from settings.
pub fn open_facade(settings: &Settings) -> anyhow::Result<DocumentFacade> {
    Ok(DocumentFacade::new(
        settings.facade_config(),
        settings.providers(),
    )?)
}

/// Print the outcome of a write operation.
pub fn print_written(action: &str, result: &ResultDescriptor) {
    match result.pages() {
        Some(pages) => println!(
            "{} {} {} ({} pages)",
            style("✓").green(),
            action,
            result.path.display(),
            pages
        ),
        None => println!(
            "{} {} {}",
            style("✓").green(),
            action,
            result.path.display()
        ),
    }
}

/// Truncate a string to `max_chars` characters, marking the cut with "...".
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Format a byte count for display.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
