//! Data preparation: load a raw table, derive calendar features and impute
//! missing numeric values.

mod calendar;
mod impute;

pub use calendar::{derive_calendar_features, parse_timestamp};
pub use impute::{Imputed, column_mean, impute_means};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::FeatureConfig;
use crate::table::{Table, TableError, read_csv, write_csv};

/// Errors raised by [`DataProcessor`].
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A step that needs data ran before [`DataProcessor::load`].
    #[error("No data loaded; call load() first")]
    NotLoaded,
    /// Reading or writing the table failed (including a missing input file).
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Missing column required for feature engineering: {column}")]
    MissingColumn { column: String },
    #[error("Cannot parse {value:?} in column {column} (row {row}) as a timestamp")]
    TimestampParse {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Cannot impute column {column}: it has no values to average")]
    Imputation { column: String },
}

impl ProcessError {
    /// Whether the error is a missing input file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessError::Table(TableError::NotFound { .. }))
    }
}

/// Holds the working table between pipeline steps.
#[derive(Debug)]
pub struct DataProcessor {
    config: FeatureConfig,
    table: Option<Table>,
}

impl DataProcessor {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            table: None,
        }
    }

    /// Load `path` as the working table, replacing any previous one.
    pub fn load(&mut self, path: &Path) -> Result<&Table, ProcessError> {
        info!("Attempting to load data from {}...", path.display());
        let table = read_csv(path).inspect_err(|err| match err {
            TableError::NotFound { .. } => {
                error!("File not found at {}. Please check the path.", path.display())
            }
            _ => error!("Failed to load data from {}: {err}", path.display()),
        })?;
        let (rows, cols) = table.shape();
        info!("Data loaded successfully. Shape: ({rows}, {cols})");
        Ok(self.table.insert(table))
    }

    /// Derive calendar features, then mean-impute numeric columns, in place.
    pub fn engineer_features(&mut self) -> Result<&Table, ProcessError> {
        let Some(table) = self.table.as_mut() else {
            error!("Feature engineering requested before any data was loaded");
            return Err(ProcessError::NotLoaded);
        };
        info!("Starting feature engineering...");
        run_steps(table, &self.config)
            .inspect_err(|err| error!("Error during feature engineering: {err}"))?;
        info!("Feature engineering completed.");
        Ok(table)
    }

    /// Write the working table to `path` as CSV.
    pub fn save(&self, path: &Path) -> Result<(), ProcessError> {
        let Some(table) = self.table.as_ref() else {
            error!("Save requested before any data was loaded");
            return Err(ProcessError::NotLoaded);
        };
        info!("Saving processed data to {}...", path.display());
        write_csv(table, path)
            .inspect_err(|err| error!("Failed to save processed data: {err}"))?;
        info!("Processed data saved. Shape: {:?}", table.shape());
        Ok(())
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn into_table(self) -> Option<Table> {
        self.table
    }
}

fn run_steps(table: &mut Table, config: &FeatureConfig) -> Result<(), ProcessError> {
    if derive_calendar_features(table, config)? {
        debug!(
            "Derived {} and {} from {}",
            config.hour_column, config.day_column, config.timestamp_column
        );
    } else {
        debug!(
            "Column {} not present; skipping calendar features",
            config.timestamp_column
        );
    }
    for imputed in impute_means(table, config.all_null_policy)? {
        match imputed.mean {
            Some(mean) => debug!(
                "Imputed {} nulls in {} with mean {mean}",
                imputed.filled, imputed.column
            ),
            None => debug!("Column {} is entirely null; left as-is", imputed.column),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnData};
    use tempfile::tempdir;

    #[test]
    fn engineer_before_load_is_not_loaded() {
        let mut processor = DataProcessor::new(FeatureConfig::default());
        assert!(matches!(
            processor.engineer_features().unwrap_err(),
            ProcessError::NotLoaded
        ));
        assert!(matches!(
            processor.save(Path::new("unused.csv")).unwrap_err(),
            ProcessError::NotLoaded
        ));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut processor = DataProcessor::new(FeatureConfig::default());
        let err = processor.load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(err.is_not_found());
        assert!(processor.table().is_none());
    }

    #[test]
    fn load_replaces_previous_table() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        std::fs::write(&first, "x\n1\n").unwrap();
        std::fs::write(&second, "y,z\n1,2\n3,4\n").unwrap();
        let mut processor = DataProcessor::new(FeatureConfig::default());
        processor.load(&first).unwrap();
        let table = processor.load(&second).unwrap();
        assert_eq!(table.shape(), (2, 2));
    }

    #[test]
    fn engineers_documented_scenario() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(
            &path,
            "TransactionStartTime,Amount,FraudResult\n\
             2024-01-05T13:00:00,100,0\n\
             2024-01-06T09:00:00,,1\n",
        )
        .unwrap();
        let mut processor = DataProcessor::new(FeatureConfig::default());
        processor.load(&path).unwrap();
        let table = processor.engineer_features().unwrap();
        assert_eq!(
            table.column("Transaction_Hour").unwrap().data(),
            &ColumnData::Int(vec![13, 9])
        );
        assert_eq!(
            table.column("Transaction_Day").unwrap().data(),
            &ColumnData::Int(vec![5, 6])
        );
        let amount = table.column("Amount").unwrap();
        assert_eq!(amount.cell(0), Cell::Float(100.0));
        assert_eq!(amount.cell(1), Cell::Float(100.0));
    }
}
