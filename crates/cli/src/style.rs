//! Shared styling utilities for the CLI.

use console::Style;

/// Success message with a green checkmark prefix.
pub fn success(msg: &str) -> String {
    format!("{} {}", Style::new().green().apply_to("✓"), msg)
}

/// Error message with a red cross prefix.
pub fn error(msg: &str) -> String {
    format!("{} {}", Style::new().red().apply_to("✗"), msg)
}

/// Warning message with a yellow sign prefix.
pub fn warn(msg: &str) -> String {
    format!("{} {}", Style::new().yellow().apply_to("⚠"), msg)
}

/// Bold section header.
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Dimmed secondary text.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Label for the current branch's side of a conflict (green).
pub fn ours_label(msg: &str) -> String {
    Style::new().green().bold().apply_to(msg).to_string()
}

/// Label for the incoming side of a conflict (blue).
pub fn theirs_label(msg: &str) -> String {
    Style::new().blue().bold().apply_to(msg).to_string()
}

/// Status indicator: merge in progress (yellow dot).
pub fn status_merging() -> String {
    format!("{} Merge in progress", Style::new().yellow().apply_to("●"))
}

/// Status indicator: no merge active (dim dot).
pub fn status_idle() -> String {
    format!("{} No merge in progress", Style::new().dim().apply_to("○"))
}
