//! Conversion from table columns to the dense inputs the forest trains on.

use std::collections::BTreeSet;

use crate::table::{Cell, Column, Table};

/// Null value found where a number was required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NullCell {
    pub column: String,
    pub row: usize,
}

/// Numeric columns of `table` in table order, minus `excluded` names.
pub(crate) fn numeric_feature_columns<'a>(table: &'a Table, excluded: &[&str]) -> Vec<&'a Column> {
    table
        .columns()
        .iter()
        .filter(|column| !excluded.contains(&column.name()))
        .filter(|column| column.is_numeric())
        .collect()
}

/// Row-major feature vectors built from `columns`.
pub(crate) fn feature_rows(columns: &[&Column], n_rows: usize) -> Result<Vec<Vec<f64>>, NullCell> {
    (0..n_rows)
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    column.numeric_value(row).ok_or_else(|| NullCell {
                        column: column.name().to_string(),
                        row,
                    })
                })
                .collect::<Result<Vec<f64>, NullCell>>()
        })
        .collect()
}

/// Textual label of a target cell, or `None` for nulls.
pub(crate) fn label_text(cell: Cell<'_>) -> Option<String> {
    (!cell.is_null()).then(|| cell.to_string())
}

/// Sorted class labels and per-row class indices for the target column.
pub(crate) fn encode_labels(target: &Column) -> Result<(Vec<String>, Vec<usize>), usize> {
    let labels: Vec<String> = (0..target.len())
        .map(|row| label_text(target.cell(row)).ok_or(row))
        .collect::<Result<_, _>>()?;
    let classes: Vec<String> = labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let y = labels
        .iter()
        .map(|label| classes.binary_search(label).unwrap_or_default())
        .collect();
    Ok((classes, y))
}
