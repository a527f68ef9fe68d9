use colored::Colorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Longest cell rendered in a table before it is cut with an ellipsis
pub const MAX_CELL_WIDTH: usize = 48;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Shorten a cell to `max` characters
pub fn truncate_cell(value: &str, max: usize) -> String {
    let value = value.replace(['\n', '\r'], " ");
    if value.chars().count() <= max {
        return value;
    }
    let mut cut: String = value.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Render rows under a header line
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row.iter().map(|cell| truncate_cell(cell, MAX_CELL_WIDTH)));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Render a single record as a two-column field/value table
pub fn render_detail(headers: &[&str], row: &[String]) -> String {
    let mut builder = Builder::default();
    for (header, value) in headers.iter().zip(row) {
        builder.push_record([header.to_string(), value.clone()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Serialize data as pretty JSON
pub fn to_json<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<(), serde_json::Error> {
    println!("{}", to_json(data)?);
    Ok(())
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow().bold(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "i".blue().bold(), message);
}

/// Print primary output without decoration
pub fn print_raw(message: &str) {
    println!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short", 10), "short");
        assert_eq!(truncate_cell("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_cell("two\nlines", 20), "two lines");
    }

    #[test]
    fn test_render_table_contains_cells() {
        let rendered = render_table(
            &["Name", "ID"],
            &[vec!["first".to_string(), "1".to_string()]],
        );
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("first"));
    }

    #[test]
    fn test_render_detail_pairs() {
        let rendered = render_detail(&["ID", "Name"], &["X".to_string(), "thing".to_string()]);
        let id_line = rendered.lines().find(|l| l.contains("ID")).unwrap();
        assert!(id_line.contains('X'));
    }
}
