//! Model training: load processed data, fit a random forest, evaluate it on a
//! held-out split and persist the artifact.

mod artifact;
mod matrix;

pub use artifact::{ARTIFACT_FORMAT_VERSION, ArtifactError, ModelArtifact};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::TrainConfig;
use crate::ml::forest::{ForestDataset, train_random_forest};
use crate::ml::metrics::{ClassStats, ConfusionMatrix, accuracy, precision_recall_by_class};
use crate::ml::split::train_test_split;
use crate::table::{TableError, read_csv};

use matrix::{encode_labels, feature_rows, numeric_feature_columns};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Processed data file not found at {path}")]
    NotFound { path: PathBuf },
    #[error(transparent)]
    Load(#[from] TableError),
    #[error("Target column '{column}' not found in dataset")]
    MissingTarget { column: String },
    #[error("No numeric feature columns left after dropping the target")]
    NoFeatures,
    #[error("Feature column {column} is null at row {row}")]
    NullFeature { column: String, row: usize },
    #[error("Target column is null at row {row}")]
    NullLabel { row: usize },
    #[error("Cannot split data: {0}")]
    Split(String),
    #[error("Model fitting failed: {0}")]
    Fit(String),
    #[error("Failed to save model: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Outcome of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Correct predictions divided by test rows.
    pub accuracy: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub feature_columns: Vec<String>,
    pub classes: Vec<String>,
    /// One entry per class, in `classes` order.
    pub per_class: Vec<ClassStats>,
}

/// Train on `input_path` and write the fitted model to `model_output_path`.
///
/// Any failure is logged and returned as-is; no model file is written unless
/// every earlier step succeeded.
pub fn train_model(
    input_path: &Path,
    model_output_path: &Path,
    config: &TrainConfig,
) -> Result<TrainReport, TrainError> {
    run(input_path, model_output_path, config).inspect_err(|err| error!("Training failed: {err}"))
}

fn run(
    input_path: &Path,
    model_output_path: &Path,
    config: &TrainConfig,
) -> Result<TrainReport, TrainError> {
    if !input_path.exists() {
        return Err(TrainError::NotFound {
            path: input_path.to_path_buf(),
        });
    }

    info!("Loading processed data for training from {}...", input_path.display());
    let table = read_csv(input_path)?;
    let Some(target) = table.column(&config.target_column) else {
        return Err(TrainError::MissingTarget {
            column: config.target_column.clone(),
        });
    };

    let columns = numeric_feature_columns(
        &table,
        &[config.target_column.as_str(), config.timestamp_column.as_str()],
    );
    if columns.is_empty() {
        return Err(TrainError::NoFeatures);
    }
    let feature_columns: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    debug!("Using feature columns: {}", feature_columns.join(", "));
    let x = feature_rows(&columns, table.n_rows()).map_err(|null| TrainError::NullFeature {
        column: null.column,
        row: null.row,
    })?;
    let (classes, y) = encode_labels(target).map_err(|row| TrainError::NullLabel { row })?;

    let split =
        train_test_split(table.n_rows(), config.test_fraction, config.seed).map_err(TrainError::Split)?;
    let select = |indices: &[usize]| ForestDataset {
        classes: classes.clone(),
        x: indices.iter().map(|&i| x[i].clone()).collect(),
        y: indices.iter().map(|&i| y[i]).collect(),
    };
    let train_set = select(&split.train);
    let test_set = select(&split.test);

    info!(
        "Initializing random forest model ({} trees, seed {})...",
        config.n_trees, config.seed
    );
    let model = train_random_forest(&train_set, &config.forest_options()).map_err(TrainError::Fit)?;

    let predicted: Vec<usize> = test_set
        .x
        .iter()
        .map(|row| model.predict_class_index(row))
        .collect();
    let cm = ConfusionMatrix::from_predictions(classes.len(), &test_set.y, &predicted);
    let acc = accuracy(&cm);
    let per_class = precision_recall_by_class(&cm, &classes);
    info!("Model training completed. Accuracy: {acc:.4}");
    for stats in &per_class {
        debug!(
            "class {}: precision={:.3} recall={:.3} support={}",
            stats.label, stats.precision, stats.recall, stats.support
        );
    }

    info!("Saving model to {}...", model_output_path.display());
    ModelArtifact::new(config.target_column.clone(), feature_columns.clone(), model)
        .save_json(model_output_path)?;
    info!("Model saved successfully.");

    Ok(TrainReport {
        accuracy: acc,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        feature_columns,
        classes,
        per_class,
    })
}
