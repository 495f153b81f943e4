//! Metric registry and scoring adapter
//!
//! Metrics are resolved by name through [`MetricRegistry`] at configuration time;
//! unknown names are a typed error, never a late lookup failure. Individual metric
//! evaluations are isolated by [`score_line`]: a metric that cannot be computed for
//! the given shapes yields an `ERROR:` line instead of aborting the report, since a
//! pipeline's metric list commonly mixes regression and classification metrics.

use crate::error::{ConveyorError, Result};
use ndarray::Array1;
use std::collections::HashMap;

/// A scoring function over (y_true, y_pred).
pub type MetricFn = fn(&Array1<f64>, &Array1<f64>) -> Result<f64>;

/// Name-to-function metric registry.
#[derive(Clone)]
pub struct MetricRegistry {
    metrics: HashMap<String, MetricFn>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        let mut registry = Self {
            metrics: HashMap::new(),
        };
        registry.register("r2_score", r2_score);
        registry.register("explained_variance_score", explained_variance_score);
        registry.register("accuracy_score", accuracy_score);
        registry.register("roc_auc_score", roc_auc_score);
        registry
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under a name, replacing any previous binding.
    pub fn register(&mut self, name: &str, f: MetricFn) {
        self.metrics.insert(name.to_string(), f);
    }

    /// Resolve a metric by name.
    pub fn resolve(&self, name: &str) -> Result<MetricFn> {
        self.metrics
            .get(name)
            .copied()
            .ok_or_else(|| ConveyorError::UnknownMetric(name.to_string()))
    }

    /// Registered metric names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Evaluate one metric and format the result as a report line.
///
/// Failures are captured in the line itself so that the remaining metrics in a report
/// still get evaluated.
pub fn score_line(name: &str, f: MetricFn, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> String {
    match f(y_true, y_pred) {
        Ok(value) => format!("{} = {}\n", name, value),
        Err(e) => format!("{} = ERROR: {}\n", name, e),
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.is_empty() {
        return Err(ConveyorError::MetricError("empty target".to_string()));
    }
    if y_true.len() != y_pred.len() {
        return Err(ConveyorError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{}", y_pred.len()),
        });
    }
    Ok(())
}

/// Coefficient of determination.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|v| (v - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Err(ConveyorError::MetricError(
            "r2_score is undefined for a constant target".to_string(),
        ));
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(1.0 - ss_res / ss_tot)
}

/// Explained variance: 1 - Var(y - y_hat) / Var(y).
pub fn explained_variance_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let variance = |v: &[f64]| {
        let mean = v.iter().sum::<f64>() / v.len() as f64;
        v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64
    };
    let truth: Vec<f64> = y_true.to_vec();
    let var_y = variance(&truth);
    if var_y == 0.0 {
        return Err(ConveyorError::MetricError(
            "explained variance is undefined for a constant target".to_string(),
        ));
    }
    let residuals: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| t - p)
        .collect();
    Ok(1.0 - variance(&residuals) / var_y)
}

fn is_label(v: f64) -> bool {
    (v - v.round()).abs() < 1e-9
}

/// Fraction of exact label matches. Errors on continuous inputs, mirroring the usual
/// classification-metric contract.
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.iter().chain(y_pred.iter()).any(|&v| !is_label(v)) {
        return Err(ConveyorError::MetricError(
            "accuracy_score does not support continuous values".to_string(),
        ));
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.round() == p.round())
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve via the rank statistic, with tie-averaged ranks.
/// The target must contain exactly two classes.
pub fn roc_auc_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mut classes: Vec<f64> = Vec::new();
    for &v in y_true.iter() {
        if !is_label(v) {
            return Err(ConveyorError::MetricError(
                "roc_auc_score requires discrete class labels".to_string(),
            ));
        }
        if !classes.iter().any(|&c| c == v.round()) {
            classes.push(v.round());
        }
    }
    if classes.len() != 2 {
        return Err(ConveyorError::MetricError(format!(
            "roc_auc_score requires a binary target, found {} classes",
            classes.len()
        )));
    }
    let positive = classes.iter().cloned().fold(f64::MIN, f64::max);

    // Rank predictions, averaging ranks over ties.
    let n = y_pred.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y_pred[a].partial_cmp(&y_pred[b]).unwrap_or(std::cmp::Ordering::Equal));
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_pred[order[j + 1]] == y_pred[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let n_pos = y_true.iter().filter(|&&v| v.round() == positive).count();
    let n_neg = n - n_pos;
    let rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t.round() == positive)
        .map(|(_, &r)| r)
        .sum();
    Ok((rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64)
}
