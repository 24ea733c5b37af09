//! Persisted model artifact: the fitted forest plus the column names it reads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::matrix::feature_rows;
use crate::ml::forest::RandomForest;
use crate::table::Table;

/// Current artifact format version.
pub const ARTIFACT_FORMAT_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("input table is missing feature column {0}")]
    MissingFeature(String),
    #[error("feature column {column} is null at row {row}")]
    NullFeature { column: String, row: usize },
}

/// Serialized model together with the schema needed to score new tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: i64,
    /// Label column the model was trained to predict.
    pub target_column: String,
    /// Feature columns, in the order the model expects them.
    pub feature_columns: Vec<String>,
    pub model: RandomForest,
}

impl ModelArtifact {
    pub fn new(target_column: String, feature_columns: Vec<String>, model: RandomForest) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            target_column,
            feature_columns,
            model,
        }
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "unsupported format_version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.feature_columns.len() != self.model.n_features {
            return Err(ArtifactError::Invalid(format!(
                "{} feature columns but the model expects {}",
                self.feature_columns.len(),
                self.model.n_features
            )));
        }
        self.model.validate().map_err(ArtifactError::Invalid)
    }

    pub fn classes(&self) -> &[String] {
        &self.model.classes
    }

    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<(), ArtifactError> {
        let io_err = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).map_err(io_err)
    }

    /// Load and validate an artifact written by [`ModelArtifact::save_json`].
    pub fn load_json(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: Self = serde_json::from_slice(&bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Feature vectors for every row of `table`, selected by column name.
    pub fn feature_rows(&self, table: &Table) -> Result<Vec<Vec<f64>>, ArtifactError> {
        let columns = self
            .feature_columns
            .iter()
            .map(|name| {
                table
                    .column(name)
                    .ok_or_else(|| ArtifactError::MissingFeature(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        feature_rows(&columns, table.n_rows())
            .map_err(|null| ArtifactError::NullFeature {
                column: null.column,
                row: null.row,
            })
    }

    /// Predicted class index per row of `table`.
    pub fn predict_indices(&self, table: &Table) -> Result<Vec<usize>, ArtifactError> {
        Ok(self
            .feature_rows(table)?
            .iter()
            .map(|row| self.model.predict_class_index(row))
            .collect())
    }

    /// Predicted label per row of `table`.
    pub fn predict_table(&self, table: &Table) -> Result<Vec<String>, ArtifactError> {
        Ok(self
            .predict_indices(table)?
            .into_iter()
            .map(|idx| self.model.classes[idx].clone())
            .collect())
    }
}
