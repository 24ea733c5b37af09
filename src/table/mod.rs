//! Column-major in-memory table shared by the processing and training steps.
//!
//! Columns carry a single inferred type. Integer columns never hold nulls; a
//! column of integers with gaps is read as floats, so missing numeric values
//! always live in `Float` columns.

mod csv_io;

pub use csv_io::{read_csv, write_csv};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Format used when timestamps are displayed or written back to CSV.
pub const TIMESTAMP_DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Errors raised while reading, writing or assembling tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// The input path does not resolve to a file.
    #[error("File not found at {path}: {source}")]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file exists but could not be read or parsed.
    #[error("Failed to load {path}: {source}")]
    Load { path: PathBuf, source: csv::Error },
    /// The file parsed as CSV but does not describe a usable table.
    #[error("Malformed table in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    /// Writing the table out failed.
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
    /// A column does not match the table's row count.
    #[error("Column {column} has {found} rows but the table has {expected}")]
    ShapeMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
    Timestamp,
}

impl ColumnType {
    /// Whether the type takes part in numeric feature selection and imputation.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<PrimitiveDateTime>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(values) => values.len(),
            ColumnData::Float(values) => values.len(),
            ColumnData::Bool(values) => values.len(),
            ColumnData::Text(values) => values.len(),
            ColumnData::Timestamp(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int(_) => ColumnType::Int,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Timestamp(_) => ColumnType::Timestamp,
        }
    }
}

/// Borrowed view of a single value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(&'a str),
    Timestamp(PrimitiveDateTime),
}

impl Cell<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(value) => write!(f, "{value}"),
            // Debug keeps the decimal point so floats read back as floats.
            Cell::Float(value) => write!(f, "{value:?}"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::Text(value) => f.write_str(value),
            Cell::Timestamp(value) => {
                let text = value
                    .format(TIMESTAMP_DISPLAY_FORMAT)
                    .map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

/// Named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn int(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn timestamp(name: impl Into<String>, values: Vec<Option<PrimitiveDateTime>>) -> Self {
        Self::new(name, ColumnData::Timestamp(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn is_numeric(&self) -> bool {
        self.column_type().is_numeric()
    }

    /// Value at `row`; out-of-range rows read as null.
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match &self.data {
            ColumnData::Int(values) => values.get(row).map_or(Cell::Null, |&v| Cell::Int(v)),
            ColumnData::Float(values) => match values.get(row) {
                Some(Some(v)) => Cell::Float(*v),
                _ => Cell::Null,
            },
            ColumnData::Bool(values) => match values.get(row) {
                Some(Some(v)) => Cell::Bool(*v),
                _ => Cell::Null,
            },
            ColumnData::Text(values) => match values.get(row) {
                Some(Some(v)) => Cell::Text(v.as_str()),
                _ => Cell::Null,
            },
            ColumnData::Timestamp(values) => match values.get(row) {
                Some(Some(v)) => Cell::Timestamp(*v),
                _ => Cell::Null,
            },
        }
    }

    /// Numeric value at `row`, or `None` for nulls and non-numeric columns.
    pub fn numeric_value(&self, row: usize) -> Option<f64> {
        match self.cell(row) {
            Cell::Int(v) => Some(v as f64),
            Cell::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.cell(row).is_null()).count()
    }
}

/// Ordered collection of equally long columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that every column has the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let n_rows = columns.first().map_or(0, Column::len);
        for column in &columns {
            if column.len() != n_rows {
                return Err(TableError::ShapeMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> std::slice::IterMut<'_, Column> {
        self.columns.iter_mut()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Replace the column with the same name in place, or append it.
    pub fn set_column(&mut self, column: Column) -> Result<(), TableError> {
        let found = column.len();
        if !self.columns.is_empty() && found != self.n_rows {
            return Err(TableError::ShapeMismatch {
                column: column.name,
                expected: self.n_rows,
                found,
            });
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Render the first `n` rows as aligned text.
    pub fn head(&self, n: usize) -> String {
        let rows = n.min(self.n_rows);
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows + 1);
        grid.push(self.column_names().map(str::to_string).collect());
        for row in 0..rows {
            grid.push(
                self.columns
                    .iter()
                    .map(|column| match column.cell(row) {
                        Cell::Null => "NaN".to_string(),
                        cell => cell.to_string(),
                    })
                    .collect(),
            );
        }
        let widths: Vec<usize> = (0..self.columns.len())
            .map(|col| grid.iter().map(|line| line[col].len()).max().unwrap_or(0))
            .collect();
        let mut out = String::new();
        for line in grid {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}
