//! Output formatting: table, JSON, plain.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render a list of rows in the chosen format.
///
/// - `table`: `Tabled` rows built with `to_row`, preceded by `summary`
/// - `json`: the serde form of `report`
/// - `plain`: `id_fn` on each item, one per line
pub fn render_list<T, R, S>(
    format: OutputFormat,
    summary: &str,
    report: &S,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    R: Tabled,
    S: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            if rows.is_empty() {
                summary.to_owned()
            } else {
                format!("{summary}\n{}", render_table(&rows))
            }
        }
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
    })
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
