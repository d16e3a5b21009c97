//! Held-out evaluation metrics.
//!
//! Labels are dense class indices. Precision, recall and F1 default to 0.0
//! when their denominator is zero.

use crate::types::{AverageMetrics, ClassMetrics};

/// Per-class metrics plus their averages and the raw confusion matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion_matrix: Vec<Vec<usize>>,
}

/// Fraction of positions where `predicted` equals `actual`.
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    correct as f64 / actual.len() as f64
}

/// `matrix[true][predicted]` counts over `n_classes` classes.
pub fn confusion_matrix(actual: &[usize], predicted: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&a, &p) in actual.iter().zip(predicted) {
        if a < n_classes && p < n_classes {
            matrix[a][p] += 1;
        }
    }
    matrix
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Build the per-class report. Classes that occur in neither `actual` nor
/// `predicted` are left out of the per-class rows and the averages, but
/// keep their row and column in the confusion matrix.
pub fn classification_report(
    actual: &[usize],
    predicted: &[usize],
    classes: &[String],
) -> ClassificationReport {
    let n = classes.len();
    let matrix = confusion_matrix(actual, predicted, n);

    let mut per_class = Vec::new();
    for (c, name) in classes.iter().enumerate() {
        let tp = matrix[c][c];
        let support: usize = matrix[c].iter().sum();
        let predicted_as: usize = matrix.iter().map(|row| row[c]).sum();
        if support == 0 && predicted_as == 0 {
            continue;
        }

        let precision = ratio(tp, predicted_as);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_class.push(ClassMetrics {
            class: name.clone(),
            precision,
            recall,
            f1,
            support,
        });
    }

    let total_support: usize = per_class.iter().map(|m| m.support).sum();
    let k = per_class.len().max(1) as f64;
    let macro_avg = AverageMetrics {
        precision: per_class.iter().map(|m| m.precision).sum::<f64>() / k,
        recall: per_class.iter().map(|m| m.recall).sum::<f64>() / k,
        f1: per_class.iter().map(|m| m.f1).sum::<f64>() / k,
        support: total_support,
    };

    let weighted = |value: fn(&ClassMetrics) -> f64| {
        if total_support == 0 {
            return 0.0;
        }
        per_class
            .iter()
            .map(|m| value(m) * m.support as f64)
            .sum::<f64>()
            / total_support as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total_support,
    };

    ClassificationReport {
        per_class,
        macro_avg,
        weighted_avg,
        confusion_matrix: matrix,
    }
}
