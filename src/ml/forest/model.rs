use serde::{Deserialize, Serialize};

/// Current random forest serialization version.
pub const FOREST_MODEL_VERSION: i64 = 1;

/// Node of a binary classification tree stored in a flat, pre-order array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal node: `feature <= threshold` goes left.
    Split {
        feature_index: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding training class counts.
    Leaf { counts: Vec<u32> },
}

/// Single CART classification tree. The root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class counts of the leaf reached by `features`.
    pub fn leaf_counts(&self, features: &[f64]) -> &[u32] {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature_index).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { counts }) => return counts,
                None => return &[],
            }
        }
    }

    /// Majority class of the reached leaf; ties go to the lower class index.
    pub fn predict_class_index(&self, features: &[f64]) -> usize {
        argmax(self.leaf_counts(features))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature_index,
                    left,
                    right,
                    ..
                } => {
                    if *feature_index >= n_features {
                        return Err(format!(
                            "Node {idx} splits on feature {feature_index} but model has {n_features}"
                        ));
                    }
                    // Children always follow their parent, which also rules out cycles.
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("Node {idx} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { counts } => {
                    if counts.len() != n_classes {
                        return Err(format!(
                            "Leaf {idx} has {} counts but expected {n_classes}",
                            counts.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bagged ensemble of decision trees combined by majority vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f64` values per feature vector.
    pub n_features: usize,
    /// Ordered list of class labels.
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != FOREST_MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {FOREST_MODEL_VERSION})",
                self.model_version
            ));
        }
        if self.classes.is_empty() {
            return Err("Model must contain at least 1 class".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least 1 tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|err| format!("Tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Per-class vote counts across all trees.
    pub fn votes(&self, features: &[f64]) -> Vec<u32> {
        let mut votes = vec![0u32; self.classes.len()];
        for tree in &self.trees {
            let class_idx = tree.predict_class_index(features);
            if let Some(slot) = votes.get_mut(class_idx) {
                *slot += 1;
            }
        }
        votes
    }

    /// Fraction of trees voting for each class.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f32> {
        let total = self.trees.len().max(1) as f32;
        self.votes(features)
            .into_iter()
            .map(|v| v as f32 / total)
            .collect()
    }

    /// Majority-vote class index; ties go to the lower index.
    pub fn predict_class_index(&self, features: &[f64]) -> usize {
        argmax(&self.votes(features))
    }

    pub fn predict_label(&self, features: &[f64]) -> &str {
        &self.classes[self.predict_class_index(features)]
    }
}

fn argmax(values: &[u32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = 0u32;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: Vec<u32>, right: Vec<u32>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature_index: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { counts: left },
                Node::Leaf { counts: right },
            ],
        }
    }

    fn forest(trees: Vec<DecisionTree>) -> RandomForest {
        RandomForest {
            model_version: FOREST_MODEL_VERSION,
            n_features: 1,
            classes: vec!["0".into(), "1".into()],
            trees,
        }
    }

    #[test]
    fn tree_routes_on_threshold() {
        let tree = stump(0.5, vec![3, 0], vec![0, 2]);
        assert_eq!(tree.predict_class_index(&[0.5]), 0);
        assert_eq!(tree.predict_class_index(&[0.6]), 1);
    }

    #[test]
    fn forest_uses_majority_vote() {
        let model = forest(vec![
            stump(0.5, vec![1, 0], vec![0, 1]),
            stump(0.8, vec![1, 0], vec![0, 1]),
            stump(0.9, vec![1, 0], vec![0, 1]),
        ]);
        assert!(model.validate().is_ok());
        // Only the first tree votes "1" at 0.6.
        assert_eq!(model.predict_label(&[0.6]), "0");
        assert_eq!(model.predict_label(&[1.0]), "1");
        let proba = model.predict_proba(&[0.6]);
        assert!((proba[1] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn vote_ties_go_to_lower_class() {
        let model = forest(vec![
            stump(0.5, vec![1, 0], vec![0, 1]),
            stump(0.5, vec![0, 1], vec![1, 0]),
        ]);
        assert_eq!(model.predict_class_index(&[0.0]), 0);
    }

    #[test]
    fn validate_rejects_backward_children() {
        let mut tree = stump(0.5, vec![1, 0], vec![0, 1]);
        tree.nodes[0] = Node::Split {
            feature_index: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(forest(vec![tree]).validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_feature() {
        let mut model = forest(vec![stump(0.5, vec![1, 0], vec![0, 1])]);
        model.n_features = 0;
        assert!(model.validate().is_err());
    }
}
