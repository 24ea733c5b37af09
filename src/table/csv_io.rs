use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use super::{Column, ColumnData, Table, TableError};

/// Tokens read as a missing value, on top of the empty field.
const NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>"];

/// Read a CSV file with a header row into a [`Table`], inferring column types.
///
/// The whole file is parsed before anything is returned; a ragged or otherwise
/// unreadable file fails as a unit.
pub fn read_csv(path: &Path) -> Result<Table, TableError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TableError::NotFound {
            path: path.to_path_buf(),
            source,
        },
        _ => TableError::Load {
            path: path.to_path_buf(),
            source: source.into(),
        },
    })?;
    let load_err = |source: csv::Error| TableError::Load {
        path: path.to_path_buf(),
        source,
    };
    let malformed = |reason: String| TableError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));
    let headers: Vec<String> = reader
        .headers()
        .map_err(load_err)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(malformed("no header row".to_string()));
    }
    let mut seen = BTreeSet::new();
    for name in &headers {
        if !seen.insert(name.as_str()) {
            return Err(malformed(format!("duplicate column name {name:?}")));
        }
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(load_err)?;
        for (values, field) in raw.iter_mut().zip(record.iter()) {
            values.push(if is_null_token(field) {
                None
            } else {
                Some(field.to_string())
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, values)| Column::new(name, infer_column(values)))
        .collect();
    Table::from_columns(columns)
}

/// Write `table` as CSV, creating parent directories and replacing any existing file.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), TableError> {
    let write_err = |source: csv::Error| TableError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| write_err(err.into()))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer
        .write_record(table.column_names())
        .map_err(write_err)?;
    for row in 0..table.n_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| column.cell(row).to_string())
            .collect();
        writer.write_record(&record).map_err(write_err)?;
    }
    writer.flush().map_err(|err| write_err(err.into()))
}

fn is_null_token(field: &str) -> bool {
    let trimmed = field.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    let mut present = values.iter().flatten().map(String::as_str).peekable();
    if present.peek().is_none() {
        return ColumnData::Float(vec![None; values.len()]);
    }
    let has_nulls = values.iter().any(Option::is_none);

    if values.iter().flatten().all(|v| parse_bool(v).is_some()) {
        return ColumnData::Bool(
            values
                .iter()
                .map(|v| v.as_deref().and_then(parse_bool))
                .collect(),
        );
    }
    if !has_nulls && values.iter().flatten().all(|v| parse_int(v).is_some()) {
        return ColumnData::Int(
            values
                .iter()
                .flatten()
                .filter_map(|v| parse_int(v))
                .collect(),
        );
    }
    if values.iter().flatten().all(|v| parse_float(v).is_some()) {
        return ColumnData::Float(
            values
                .iter()
                .map(|v| v.as_deref().and_then(parse_float))
                .collect(),
        );
    }
    ColumnData::Text(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnType};
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn infers_column_types() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "data.csv",
            "id,amount,score,flag,label\n1,100,0.5,true,a\n2,,1.5,False,b\n",
        );
        let table = read_csv(&path).unwrap();
        assert_eq!(table.shape(), (2, 5));
        let types: Vec<ColumnType> = table.columns().iter().map(Column::column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Int,
                ColumnType::Float,
                ColumnType::Float,
                ColumnType::Bool,
                ColumnType::Text,
            ]
        );
        assert_eq!(table.column("amount").unwrap().cell(1), Cell::Null);
        assert_eq!(table.column("flag").unwrap().cell(1), Cell::Bool(false));
    }

    #[test]
    fn null_tokens_and_all_null_columns() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "data.csv", "a,b\nNA,x\nnull,NaN\n");
        let table = read_csv(&path).unwrap();
        let a = table.column("a").unwrap();
        assert_eq!(a.column_type(), ColumnType::Float);
        assert_eq!(a.null_count(), 2);
        assert_eq!(table.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, TableError::NotFound { .. }));
    }

    #[test]
    fn ragged_rows_fail_to_load() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "bad.csv", "a,b\n1,2\n3,4,5\n");
        let err = read_csv(&path).unwrap_err();
        assert!(matches!(err, TableError::Load { .. }));
    }

    #[test]
    fn empty_file_is_malformed() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", "");
        assert!(matches!(
            read_csv(&path).unwrap_err(),
            TableError::Malformed { .. }
        ));
    }

    #[test]
    fn duplicate_headers_are_malformed() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "dup.csv", "a,a\n1,2\n");
        assert!(matches!(
            read_csv(&path).unwrap_err(),
            TableError::Malformed { .. }
        ));
    }

    #[test]
    fn write_then_read_preserves_values() {
        let dir = tempdir().unwrap();
        let table = Table::from_columns(vec![
            Column::int("id", vec![1, 2]),
            Column::float("amount", vec![Some(100.0), None]),
            Column::text("note", vec![Some("a,b"), None]),
        ])
        .unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write_csv(&table, &path).unwrap();
        let reloaded = read_csv(&path).unwrap();
        assert_eq!(reloaded, table);
    }
}
