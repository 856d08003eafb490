//! Table export
//!
//! The default exporter writes a flat CSV from the columns' rendered text.
//! Entity managers may plug in their own [`Exporter`].

use super::Column;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, Utc};
use serde_json::Value;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A finished export, ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [(CONTENT_TYPE, self.content_type.to_string()), (CONTENT_DISPOSITION, disposition)],
            self.body,
        )
            .into_response()
    }
}

pub trait Exporter: Send + Sync {
    /// `rows` are already filtered and sorted, never paginated
    fn export(&self, columns: &[Column], rows: &[&Value]) -> ExportFile;
}

/// `<prefix>-YYYY-MM-DD.csv`
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}.csv", prefix, date.format("%Y-%m-%d"))
}

/// Commas become semicolons and line breaks become spaces; nothing else is
/// escaped.
pub fn csv_cell(text: &str) -> String {
    text.replace(',', ";").replace(['\r', '\n'], " ")
}

pub fn csv_line<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|c| csv_cell(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone)]
pub struct CsvExporter {
    prefix: String,
}

impl CsvExporter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new("export")
    }
}

impl Exporter for CsvExporter {
    fn export(&self, columns: &[Column], rows: &[&Value]) -> ExportFile {
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(csv_line(columns.iter().map(|c| c.header.as_str())));
        for row in rows {
            lines.push(csv_line(columns.iter().map(|c| c.render_cell(row))));
        }

        ExportFile {
            filename: export_filename(&self.prefix, Utc::now().date_naive()),
            content_type: CSV_CONTENT_TYPE,
            body: lines.join("\n"),
        }
    }
}
