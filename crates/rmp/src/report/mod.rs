//! Tabular reports rendered to Excel or PDF.
//!
//! Every report kind is first built into a format independent
//! [`ReportTable`], renderers only deal with layout.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use staffing::permission::{Actions, Module};

use crate::service::access::Access;

pub mod data;
pub mod pdf;
pub mod schedule;
pub mod scheduler;
pub mod xlsx;

staffing::named_enum!(ReportKind, "report kind", {
    Allocations => "allocations",
    Bench => "bench",
    Utilization => "utilization",
    Certifications => "certifications",
    OverAllocation => "over-allocation",
});

staffing::named_enum!(ReportFormat, "report format", {
    Xlsx => "xlsx",
    Pdf => "pdf",
});

impl ReportKind {
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Allocations => "Active allocations",
            ReportKind::Bench => "Bench",
            ReportKind::Utilization => "Utilization",
            ReportKind::Certifications => "Expiring certifications",
            ReportKind::OverAllocation => "Over-allocated employees",
        }
    }
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(Cell::Date).unwrap_or(Cell::Empty)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(number) => {
                let text = format!("{number:.2}");
                let text = text.trim_end_matches('0').trim_end_matches('.');
                f.write_str(text)
            }
            Cell::Date(date) => write!(f, "{date}"),
            Cell::Empty => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: String,
    /// Day the data describes.
    pub date: NaiveDate,
    pub generated_at: NaiveDateTime,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Totals printed under the rows.
    pub footer: Option<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(kind: ReportKind, date: NaiveDate, columns: &[&str]) -> Self {
        ReportTable {
            kind,
            title: format!("{} ({date})", kind.title()),
            date,
            generated_at: Local::now().naive_local(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            footer: None,
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Widest text of each column, header and footer included.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in self.rows.iter().chain(self.footer.iter()) {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.to_string().chars().count());
            }
        }
        widths
    }
}

pub fn file_name(kind: ReportKind, format: ReportFormat, date: NaiveDate) -> String {
    format!("{kind}-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

pub fn build(
    conn: &Connection,
    access: &Access,
    kind: ReportKind,
    on: NaiveDate,
) -> crate::Result<ReportTable> {
    access.require(Module::Reports, Actions::VIEW)?;
    match kind {
        ReportKind::Allocations => data::allocations(conn, on),
        ReportKind::Bench => data::bench(conn, on),
        ReportKind::Utilization => data::utilization(conn, on),
        ReportKind::Certifications => data::certifications(conn, on),
        ReportKind::OverAllocation => data::over_allocation(conn, on),
    }
}

pub fn render(table: &ReportTable, format: ReportFormat) -> crate::Result<Vec<u8>> {
    match format {
        ReportFormat::Xlsx => xlsx::render(table),
        ReportFormat::Pdf => pdf::render(table),
    }
}

/// Renders an already built report into `directory`.
pub fn write_to_dir(
    table: &ReportTable,
    format: ReportFormat,
    directory: &Path,
) -> crate::Result<PathBuf> {
    let content = render(table, format)?;
    std::fs::create_dir_all(directory)?;
    let path = directory.join(file_name(table.kind, format, table.date));
    std::fs::write(&path, content)?;
    log::info!(
        "Report {} ({} row(s)) written to {}",
        table.kind,
        table.rows.len(),
        path.display()
    );
    Ok(path)
}

/// Builds, renders and writes the report into `directory`.
pub fn generate_to_dir(
    conn: &Connection,
    access: &Access,
    kind: ReportKind,
    format: ReportFormat,
    on: NaiveDate,
    directory: &Path,
) -> crate::Result<PathBuf> {
    let table = build(conn, access, kind, on)?;
    write_to_dir(&table, format, directory)
}
