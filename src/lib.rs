//! Credit-risk data preparation and model training.
/// Layered pipeline configuration.
pub mod config;
/// Calendar feature derivation and mean imputation.
pub mod features;
/// Tracing subscriber setup.
pub mod logging;
/// Random forest, data splitting and evaluation metrics.
pub mod ml;
/// In-memory tables and CSV I/O.
pub mod table;
/// End-to-end model training and the persisted model artifact.
pub mod training;
