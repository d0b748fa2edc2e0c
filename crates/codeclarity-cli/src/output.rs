//! Terminal output: tables, JSON and status messages.

use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Utc};
use console::{measure_text_width, style, Style, Term};
use serde::Serialize;

/// Placeholder for empty table cells
pub const EMPTY_CELL: &str = "-";

/// Gap between table columns
const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    /// Unknown formats fall back to table output.
    pub fn parse(format: &str) -> Self {
        match format.trim().to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Left-aligned table. Cell widths ignore ANSI styling.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = measure_text_width(cell);
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }
        widths
    }

    fn render_line(cells: &[String], widths: &[usize]) -> String {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            if i > 0 {
                line.push_str(COLUMN_GAP);
            }
            line.push_str(cell);
            if i + 1 < widths.len() {
                line.push_str(&" ".repeat(width.saturating_sub(measure_text_width(cell))));
            }
        }
        line.trim_end().to_string()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let headers: Vec<String> = self
            .headers
            .iter()
            .map(|h| style(h.to_uppercase()).bold().to_string())
            .collect();
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

        let mut lines = vec![
            Self::render_line(&headers, &widths),
            Self::render_line(&rule, &widths),
        ];
        lines.extend(self.rows.iter().map(|row| Self::render_line(row, &widths)));
        lines.join("\n")
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

/// Print aligned `label: value` lines.
pub fn print_fields(fields: &[(&str, String)]) {
    let width = fields.iter().map(|(label, _)| label.len() + 1).max().unwrap_or(0);
    for (label, value) in fields {
        println!("{:<width$} {}", format!("{}:", label), value, width = width);
    }
}

pub fn success(message: impl Display) {
    println!("{} {}", style("✓").green(), message);
}

/// Where diagnostics go, so stdout stays parseable with `-f json`.
fn message_term() -> Term {
    Term::stderr()
}

fn message(symbol: impl Display, message: impl Display) {
    let _ = message_term().write_line(&format!("{} {}", symbol, message));
}

pub fn error(text: impl Display) {
    message(style("✗").red(), text);
}

pub fn warning(text: impl Display) {
    message(style("!").yellow(), text);
}

pub fn info(text: impl Display) {
    message(style("ℹ").blue(), text);
}

pub fn bold(text: impl Display) -> String {
    style(text).bold().to_string()
}

pub fn dim(text: impl Display) -> String {
    style(text).dim().to_string()
}

pub fn status_color(status: &str) -> String {
    match status.to_ascii_lowercase().as_str() {
        "success" | "completed" => style(status).green().to_string(),
        "failed" => style(status).red().to_string(),
        "started" | "triggered" | "requested" => style(status).yellow().to_string(),
        _ => status.to_string(),
    }
}

pub fn severity_style(severity: &str) -> Style {
    match severity.to_ascii_lowercase().as_str() {
        "critical" => Style::new().red().bold(),
        "high" => Style::new().red(),
        "medium" => Style::new().yellow(),
        "low" => Style::new().blue(),
        _ => Style::new(),
    }
}

pub fn severity_color(severity: &str) -> String {
    severity_style(severity).apply_to(severity).to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional timestamp for display
pub fn format_time(time: Option<&DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

pub fn or_empty(value: &str) -> String {
    if value.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        value.to_string()
    }
}
