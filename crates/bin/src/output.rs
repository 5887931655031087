//! Output formatting helpers for human-readable and JSON output.

use clap::ValueEnum;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned tables and key/value lines
    #[default]
    Human,
    /// One JSON document per command
    Json,
}

/// Lay out rows as aligned text lines, header first.
///
/// `headers` and each row in `rows` must have the same length. Returns
/// nothing when there are no rows.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render(headers.to_vec()));
    for row in rows {
        lines.push(render(
            row.iter().take(col_count).map(String::as_str).collect(),
        ));
    }
    lines
}

/// Print a table with aligned columns in human-readable format.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in format_table(headers, rows) {
        println!("{line}");
    }
}
