//! Evaluation metrics for classification models.

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Build a matrix from aligned truth/prediction class indices.
    pub fn from_predictions(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    /// Rows whose true class is `class`.
    pub fn row_total(&self, class: usize) -> u32 {
        (0..self.n_classes).map(|pred| self.get(class, pred)).sum()
    }

    /// Rows predicted as `class`.
    pub fn column_total(&self, class: usize) -> u32 {
        (0..self.n_classes).map(|truth| self.get(truth, class)).sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }
}

/// Precision, recall and support for one class label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStats {
    pub label: String,
    /// `TP / (TP + FP)`, zero when the class was never predicted.
    pub precision: f64,
    /// `TP / (TP + FN)`, zero when the class never occurs.
    pub recall: f64,
    /// Rows whose true label is this class.
    pub support: u32,
}

/// Per-class statistics, labelled with `labels[class_index]`.
///
/// Classes beyond the end of `labels` are reported by index.
pub fn precision_recall_by_class(cm: &ConfusionMatrix, labels: &[String]) -> Vec<ClassStats> {
    let ratio = |hits: u32, total: u32| {
        if total == 0 {
            0.0
        } else {
            f64::from(hits) / f64::from(total)
        }
    };
    (0..cm.n_classes)
        .map(|class| {
            let hits = cm.get(class, class);
            let support = cm.row_total(class);
            ClassStats {
                label: labels
                    .get(class)
                    .cloned()
                    .unwrap_or_else(|| class.to_string()),
                precision: ratio(hits, cm.column_total(class)),
                recall: ratio(hits, support),
                support,
            }
        })
        .collect()
}

/// Compute overall accuracy (correct / total) from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let correct: u64 = (0..cm.n_classes).map(|c| cm.get(c, c) as u64).sum();
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}
