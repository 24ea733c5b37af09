//! Machine learning helpers for training and evaluation.
//!
//! Self-contained building blocks used by the training pipeline: a seeded
//! row split, a random forest classifier and classification metrics.

pub mod forest;
pub mod metrics;
pub mod split;
