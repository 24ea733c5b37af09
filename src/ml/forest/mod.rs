//! Deterministic random forest classifier.
//!
//! Trees are grown without external ML dependencies:
//! - Gini CART splits over a random feature subset per node.
//! - Bootstrap sampling per tree, seeded from a single master seed.
//! - Majority vote across trees and reproducible JSON export.

mod model;
mod train;

pub use model::{DecisionTree, FOREST_MODEL_VERSION, Node, RandomForest};
pub use train::{ForestDataset, ForestOptions, MaxFeatures, train_random_forest};
