use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{DecisionTree, FOREST_MODEL_VERSION, Node, RandomForest};

/// Number of features considered at each split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least one.
    #[default]
    Sqrt,
    /// Every feature.
    All,
    /// A fixed count, capped at the number of features.
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let wanted = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(count) => count,
        };
        wanted.clamp(1, n_features.max(1))
    }
}

/// Training hyperparameters for the random forest.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Depth limit; `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree instead of using every row.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// In-memory dataset used for fitting.
#[derive(Debug, Clone)]
pub struct ForestDataset {
    /// Ordered list of class labels.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f64>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Fit a random forest of Gini CART trees on bootstrap samples.
///
/// Every tree draws its own seed from a master generator seeded with
/// `options.seed`, so the same dataset and options always produce the same model.
pub fn train_random_forest(
    dataset: &ForestDataset,
    options: &ForestOptions,
) -> Result<RandomForest, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes == 0 {
        return Err("No classes available for training".to_string());
    }
    if options.n_trees == 0 {
        return Err("Need at least 1 tree".to_string());
    }
    let n_features = dataset.x[0].len();
    if n_features == 0 {
        return Err("Feature vectors are empty".to_string());
    }
    for (row_idx, row) in dataset.x.iter().enumerate() {
        if row.len() != n_features {
            return Err(format!("Row {row_idx} has inconsistent feature length"));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(format!("Row {row_idx} contains a non-finite feature value"));
        }
    }
    if let Some(&bad) = dataset.y.iter().find(|&&label| label >= n_classes) {
        return Err(format!("Label index {bad} out of range for {n_classes} classes"));
    }

    let n = dataset.x.len();
    let mut master = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees);
    for _ in 0..options.n_trees {
        let mut rng = StdRng::seed_from_u64(master.random::<u64>());
        let mut samples: Vec<usize> = if options.bootstrap {
            (0..n).map(|_| rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        let mut builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            n_classes,
            n_features,
            max_features: options.max_features.resolve(n_features),
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split.max(2),
            rng,
            nodes: Vec::new(),
        };
        builder.grow(&mut samples);
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    let model = RandomForest {
        model_version: FOREST_MODEL_VERSION,
        n_features,
        classes: dataset.classes.clone(),
        trees,
    };
    model.validate()?;
    Ok(model)
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A node waiting to be built from `samples[start..end]`.
#[derive(Debug, Clone, Copy)]
struct PendingNode {
    parent: Option<(usize, Side)>,
    start: usize,
    end: usize,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    impurity: f64,
    feature_index: usize,
    threshold: f64,
}

impl TreeBuilder<'_> {
    /// Grow the whole tree over `samples`, depth first with an explicit stack.
    ///
    /// Nodes are numbered in pre-order (a node, then its left subtree, then
    /// its right subtree), so every child index is greater than its parent's.
    fn grow(&mut self, samples: &mut [usize]) {
        let mut pending = vec![PendingNode {
            parent: None,
            start: 0,
            end: samples.len(),
            depth: 0,
        }];
        while let Some(item) = pending.pop() {
            let node_samples = &mut samples[item.start..item.end];
            let counts = self.class_counts(node_samples);
            let idx = self.nodes.len();
            self.nodes.push(Node::Leaf {
                counts: counts.clone(),
            });
            if let Some((parent, side)) = item.parent {
                self.attach(parent, side, idx);
            }

            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = self.max_depth.is_some_and(|max| item.depth >= max);
            if pure || depth_reached || node_samples.len() < self.min_samples_split {
                continue;
            }
            let Some(split) = self.best_split(node_samples, &counts) else {
                continue;
            };

            let x = self.x;
            let mid = item.start
                + partition_in_place(node_samples, |i| {
                    x[i][split.feature_index] <= split.threshold
                });
            self.nodes[idx] = Node::Split {
                feature_index: split.feature_index,
                threshold: split.threshold,
                left: idx,
                right: idx,
            };
            // Right is pushed first so the left subtree is built next.
            pending.push(PendingNode {
                parent: Some((idx, Side::Right)),
                start: mid,
                end: item.end,
                depth: item.depth + 1,
            });
            pending.push(PendingNode {
                parent: Some((idx, Side::Left)),
                start: item.start,
                end: mid,
                depth: item.depth + 1,
            });
        }
    }

    fn attach(&mut self, parent: usize, side: Side, child: usize) {
        if let Node::Split { left, right, .. } = &mut self.nodes[parent] {
            match side {
                Side::Left => *left = child,
                Side::Right => *right = child,
            }
        }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini split over a random feature subset, if it beats the parent.
    fn best_split(&mut self, samples: &[usize], parent_counts: &[u32]) -> Option<SplitCandidate> {
        let total = samples.len();
        let parent_impurity = gini(parent_counts, total);
        let features =
            rand::seq::index::sample(&mut self.rng, self.n_features, self.max_features).into_vec();

        let mut best: Option<SplitCandidate> = None;
        let mut ordered: Vec<(f64, usize)> = Vec::with_capacity(total);
        for feature_index in features {
            ordered.clear();
            ordered.extend(samples.iter().map(|&i| (self.x[i][feature_index], self.y[i])));
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0u32; self.n_classes];
            let mut right = parent_counts.to_vec();
            for k in 0..total - 1 {
                let (value, label) = ordered[k];
                left[label] += 1;
                right[label] -= 1;
                let next = ordered[k + 1].0;
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / total as f64;
                if best.is_none_or(|b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        impurity,
                        feature_index,
                        threshold: midpoint(value, next),
                    });
                }
            }
        }
        best.filter(|split| split.impurity < parent_impurity - 1e-12)
    }
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Midpoint between two sorted distinct values, kept strictly below `upper`.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower / 2.0 + upper / 2.0;
    if mid >= upper || !mid.is_finite() {
        lower
    } else {
        mid
    }
}

/// Move samples satisfying `goes_left` to the front; returns how many did.
fn partition_in_place(samples: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0usize;
    for i in 0..samples.len() {
        if goes_left(samples[i]) {
            samples.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> ForestDataset {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            // Wide gap between the classes keeps every bootstrap threshold inside it.
            let v = if i < 20 { i as f64 } else { (i + 80) as f64 };
            x.push(vec![v, (i % 7) as f64]);
            y.push(usize::from(i >= 20));
        }
        ForestDataset {
            classes: vec!["0".into(), "1".into()],
            x,
            y,
        }
    }

    #[test]
    fn fits_separable_data() {
        let dataset = separable();
        let options = ForestOptions {
            n_trees: 15,
            max_features: MaxFeatures::All,
            ..ForestOptions::default()
        };
        let model = train_random_forest(&dataset, &options).unwrap();
        assert_eq!(model.trees.len(), 15);
        for (row, &label) in dataset.x.iter().zip(&dataset.y) {
            assert_eq!(model.predict_class_index(row), label);
        }
    }

    #[test]
    fn same_seed_same_model() {
        let dataset = separable();
        let options = ForestOptions {
            n_trees: 10,
            ..ForestOptions::default()
        };
        let a = train_random_forest(&dataset, &options).unwrap();
        let b = train_random_forest(&dataset, &options).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn single_class_yields_leaf_only_trees() {
        let dataset = ForestDataset {
            classes: vec!["0".into()],
            x: vec![vec![1.0], vec![2.0]],
            y: vec![0, 0],
        };
        let model = train_random_forest(&dataset, &ForestOptions::default()).unwrap();
        assert!(model.trees.iter().all(|tree| tree.nodes.len() == 1));
        assert_eq!(model.predict_label(&[5.0]), "0");
    }

    #[test]
    fn max_depth_limits_growth() {
        let options = ForestOptions {
            n_trees: 3,
            max_depth: Some(1),
            ..ForestOptions::default()
        };
        let model = train_random_forest(&separable(), &options).unwrap();
        assert!(model.trees.iter().all(|tree| tree.nodes.len() <= 3));
    }

    #[test]
    fn deep_tree_on_alternating_labels_does_not_overflow() {
        let n = 5_000;
        let dataset = ForestDataset {
            classes: vec!["0".into(), "1".into()],
            x: (0..n).map(|i| vec![i as f64]).collect(),
            y: (0..n).map(|i| i % 2).collect(),
        };
        let options = ForestOptions {
            n_trees: 1,
            bootstrap: false,
            ..ForestOptions::default()
        };
        let model = train_random_forest(&dataset, &options).unwrap();
        model.validate().unwrap();
        for i in [0, 1, 2, 2_501, n - 2, n - 1] {
            assert_eq!(model.predict_class_index(&dataset.x[i]), dataset.y[i]);
        }
    }

    #[test]
    fn children_follow_parents_in_preorder() {
        let options = ForestOptions {
            n_trees: 3,
            ..ForestOptions::default()
        };
        let model = train_random_forest(&separable(), &options).unwrap();
        for tree in &model.trees {
            for (idx, node) in tree.nodes.iter().enumerate() {
                if let Node::Split { left, right, .. } = node {
                    assert_eq!(*left, idx + 1);
                    assert!(*right > *left);
                }
            }
        }
    }

    #[test]
    fn rejects_inconsistent_inputs() {
        let mut dataset = separable();
        dataset.y.pop();
        assert!(train_random_forest(&dataset, &ForestOptions::default()).is_err());

        let mut dataset = separable();
        dataset.x[3][0] = f64::NAN;
        assert!(train_random_forest(&dataset, &ForestOptions::default()).is_err());
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::All.resolve(4), 4);
        assert_eq!(MaxFeatures::Count(9).resolve(4), 4);
    }

    #[test]
    fn gini_of_pure_and_even_nodes() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }
}
