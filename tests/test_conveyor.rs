//! Integration tests: pipeline orchestration (fit → transform → predict → score)

use conveyor::explain::{DisplayMode, ExplainKind, Explainer};
use conveyor::prelude::*;
use ndarray::Array1;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Subtracts per-column means fitted from training data.
struct CenterStage {
    means: Vec<f64>,
}

impl CenterStage {
    fn new() -> Self {
        Self { means: Vec::new() }
    }
}

impl Stage for CenterStage {
    fn name(&self) -> &str {
        "center"
    }

    fn fit(&mut self, x: &Table, _y: &Array1<f64>) -> Result<()> {
        self.means = (0..x.n_cols())
            .map(|i| x.data().column(i).mean().unwrap_or(0.0))
            .collect();
        Ok(())
    }

    fn transform(&self, x: &Table) -> Result<Table> {
        let mut data = x.data().clone();
        for (i, mean) in self.means.iter().enumerate() {
            data.column_mut(i).mapv_inplace(|v| v - mean);
        }
        Table::new(x.names().to_vec(), data)
    }
}

/// Drops one named column during transform.
struct DropColumnStage {
    column: String,
}

impl Stage for DropColumnStage {
    fn name(&self) -> &str {
        "drop_column"
    }

    fn fit(&mut self, _x: &Table, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Table) -> Result<Table> {
        x.drop_column(&self.column)
    }
}

/// Identity stage that counts fit calls and records the column names it saw.
struct RecordingStage {
    fits: Arc<AtomicUsize>,
    seen_columns: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Stage for RecordingStage {
    fn name(&self) -> &str {
        "recording"
    }

    fn fit(&mut self, x: &Table, _y: &Array1<f64>) -> Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.seen_columns.lock().unwrap().push(x.names().to_vec());
        Ok(())
    }

    fn transform(&self, x: &Table) -> Result<Table> {
        Ok(x.clone())
    }
}

/// Halves the target; features pass through.
struct HalfTargetStage;

impl Stage for HalfTargetStage {
    fn name(&self) -> &str {
        "half_target"
    }

    fn fit(&mut self, _x: &Table, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Table) -> Result<Table> {
        Ok(x.clone())
    }

    fn transforms_target(&self) -> bool {
        true
    }

    fn target_transform(&self, y: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(y.mapv(|v| v * 0.5))
    }
}

/// Always fails during transform.
struct BrokenStage;

impl Stage for BrokenStage {
    fn name(&self) -> &str {
        "broken"
    }

    fn fit(&mut self, _x: &Table, _y: &Array1<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, _x: &Table) -> Result<Table> {
        Err(ConveyorError::DataError("deliberate failure".to_string()))
    }
}

/// Predicts the fitted target mean for every row.
struct MeanEstimator {
    mean: Option<f64>,
}

impl MeanEstimator {
    fn new() -> Self {
        Self { mean: None }
    }
}

impl Estimator for MeanEstimator {
    fn name(&self) -> &str {
        "mean"
    }

    fn fit(&mut self, _x: &Table, y: &Array1<f64>) -> Result<()> {
        self.mean = y.mean();
        Ok(())
    }

    fn predict(&self, x: &Table) -> Result<Array1<f64>> {
        let mean = self.mean.ok_or(ConveyorError::ModelNotFitted)?;
        Ok(Array1::from_elem(x.n_rows(), mean))
    }
}

/// Classifies rows by comparing the first feature to its fitted mean.
struct ThresholdClassifier {
    threshold: Option<f64>,
}

impl ThresholdClassifier {
    fn new() -> Self {
        Self { threshold: None }
    }
}

impl Estimator for ThresholdClassifier {
    fn name(&self) -> &str {
        "threshold"
    }

    fn fit(&mut self, x: &Table, _y: &Array1<f64>) -> Result<()> {
        self.threshold = x.data().column(0).mean();
        Ok(())
    }

    fn predict(&self, x: &Table) -> Result<Array1<f64>> {
        let threshold = self.threshold.ok_or(ConveyorError::ModelNotFitted)?;
        Ok(x.data()
            .column(0)
            .mapv(|v| if v > threshold { 1.0 } else { 0.0 }))
    }
}

fn regression_data() -> (Table, Array1<f64>) {
    let n = 30;
    let x0: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
    let y: Vec<f64> = (0..n).map(|i| 3.0 * i as f64 + 2.0).collect();
    let table = Table::from_columns(&[("x0", x0), ("x1", x1)]).unwrap();
    (table, Array1::from(y))
}

// ---------------------------------------------------------------------------
// Pipeline contract
// ---------------------------------------------------------------------------

#[test]
fn test_transform_matches_fit_transform_output() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new().with_stage(Box::new(CenterStage::new()));

    let (fitted_x, fitted_y) = pipeline.fit_transform(&x, &y, false).unwrap();
    let (replayed_x, replayed_y) = pipeline.transform(&x, Some(&y)).unwrap();

    assert_eq!(fitted_x, replayed_x);
    assert_eq!(Some(fitted_y), replayed_y);
}

#[test]
fn test_inputs_are_not_mutated() {
    let (x, y) = regression_data();
    let x_before = x.clone();
    let y_before = y.clone();

    let mut pipeline = Conveyor::new()
        .with_stage(Box::new(CenterStage::new()))
        .with_estimator(Box::new(MeanEstimator::new()));
    pipeline.fit(&x, &y).unwrap();

    assert_eq!(x, x_before);
    assert_eq!(y, y_before);
}

#[test]
fn test_predict_never_refits_stages() {
    let fits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (x, y) = regression_data();

    let mut pipeline = Conveyor::new()
        .with_stage(Box::new(RecordingStage {
            fits: fits.clone(),
            seen_columns: seen.clone(),
        }))
        .with_estimator(Box::new(MeanEstimator::new()));

    pipeline.fit(&x, &y).unwrap();
    assert_eq!(fits.load(Ordering::SeqCst), 1);

    pipeline.predict(&x).unwrap();
    pipeline.predict(&x).unwrap();
    pipeline.score(&x, &y, &["r2_score"], &[]).unwrap();
    assert_eq!(fits.load(Ordering::SeqCst), 1, "inference must not re-fit stages");
}

#[test]
fn test_dropped_column_shrinks_downstream_view() {
    let fits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let x = Table::from_columns(&[
        ("age", vec![21.0, 34.0, 47.0, 58.0]),
        ("income", vec![30.0, 55.0, 80.0, 95.0]),
    ])
    .unwrap();
    let y = Array1::from(vec![0.0, 0.0, 1.0, 1.0]);

    let mut pipeline = Conveyor::new()
        .with_stage(Box::new(RecordingStage {
            fits: fits.clone(),
            seen_columns: seen.clone(),
        }))
        .with_stage(Box::new(DropColumnStage {
            column: "income".to_string(),
        }))
        .with_stage(Box::new(RecordingStage {
            fits: fits.clone(),
            seen_columns: seen.clone(),
        }))
        .with_estimator(Box::new(ThresholdClassifier::new()));

    pipeline.fit(&x, &y).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], vec!["age".to_string(), "income".to_string()]);
    assert_eq!(seen[1], vec!["age".to_string()]);
    // Column count shrinks monotonically in fit order.
    assert!(seen[1].len() < seen[0].len());

    let preds = pipeline.predict(&x).unwrap();
    assert_eq!(preds.len(), 4);
}

#[test]
fn test_target_transform_only_with_target() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new().with_stage(Box::new(HalfTargetStage));

    let (_, fitted_y) = pipeline.fit_transform(&x, &y, false).unwrap();
    assert_eq!(fitted_y, y.mapv(|v| v * 0.5));

    let (_, no_target) = pipeline.transform(&x, None).unwrap();
    assert_eq!(no_target, None);
}

#[test]
fn test_broken_stage_aborts_pipeline() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new()
        .with_stage(Box::new(CenterStage::new()))
        .with_stage(Box::new(BrokenStage))
        .with_estimator(Box::new(MeanEstimator::new()));

    let err = pipeline.fit(&x, &y).unwrap_err();
    match err {
        ConveyorError::StageError { stage, .. } => assert_eq!(stage, "broken"),
        other => panic!("expected StageError, got {other}"),
    }
    // Transform fails the same way: the whole operation aborts.
    assert!(pipeline.transform(&x, None).is_err());
}

#[test]
fn test_row_target_mismatch_is_rejected() {
    let (x, _) = regression_data();
    let short_y = Array1::from(vec![1.0, 2.0]);
    let mut pipeline = Conveyor::new().with_estimator(Box::new(MeanEstimator::new()));
    assert!(matches!(
        pipeline.fit(&x, &short_y),
        Err(ConveyorError::ShapeError { .. })
    ));
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[test]
fn test_score_isolates_incompatible_metric() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new().with_estimator(Box::new(MeanEstimator::new()));
    pipeline.fit(&x, &y).unwrap();

    // Regression target: r2 applies, accuracy does not.
    let report = pipeline
        .score(&x, &y, &["r2_score", "accuracy_score"], &[])
        .unwrap();

    let lines: Vec<&str> = report.report.lines().collect();
    assert_eq!(lines.len(), 2);
    let error_lines = lines.iter().filter(|l| l.contains("ERROR")).count();
    assert_eq!(error_lines, 1, "exactly one metric fails: {}", report.report);
    assert!(lines[0].starts_with("r2_score = "));
    assert!(!lines[0].contains("ERROR"));
    assert!(lines[1].starts_with("accuracy_score = ERROR:"));
}

#[test]
fn test_score_accepts_direct_metric_references() {
    fn always_seven(_: &Array1<f64>, _: &Array1<f64>) -> Result<f64> {
        Ok(7.0)
    }

    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new().with_estimator(Box::new(MeanEstimator::new()));
    pipeline.fit(&x, &y).unwrap();

    let report = pipeline
        .score(&x, &y, &[], &[("always_seven", always_seven)])
        .unwrap();
    assert_eq!(report.report, "always_seven = 7\n");
    assert_eq!(report.predictions.len(), x.n_rows());
}

#[test]
fn test_binary_example_accuracy_in_unit_interval() {
    let x = Table::from_columns(&[
        ("age", vec![22.0, 25.0, 31.0, 44.0, 52.0, 61.0]),
        ("income", vec![28.0, 35.0, 42.0, 61.0, 75.0, 90.0]),
    ])
    .unwrap();
    let y = Array1::from(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

    let mut pipeline = Conveyor::new().with_estimator(Box::new(ThresholdClassifier::new()));
    pipeline.fit(&x, &y).unwrap();

    let preds = pipeline.predict(&x).unwrap();
    assert_eq!(preds.len(), 6);

    let report = pipeline.score(&x, &y, &["accuracy_score"], &[]).unwrap();
    assert!(report.report.contains("accuracy_score ="));

    let value: f64 = report
        .report
        .trim()
        .rsplit("= ")
        .next()
        .unwrap()
        .parse()
        .unwrap();
    assert!((0.0..=1.0).contains(&value));
}

// ---------------------------------------------------------------------------
// Explainability collaborator
// ---------------------------------------------------------------------------

/// Explainer whose attribution renderer always fails.
struct HalfBrokenExplainer;

impl Explainer for HalfBrokenExplainer {
    fn render(
        &self,
        kind: ExplainKind,
        _estimator: &dyn Estimator,
        _x: &Table,
        _y: &Array1<f64>,
        _save: bool,
        _name: &str,
    ) -> Result<()> {
        match kind {
            ExplainKind::Permutation => Ok(()),
            ExplainKind::Attribution => {
                Err(ConveyorError::ExplainError("renderer unavailable".to_string()))
            }
        }
    }
}

#[test]
fn test_feature_importances_isolates_sub_modes() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new()
        .with_estimator(Box::new(MeanEstimator::new()))
        .with_explainer(Box::new(HalfBrokenExplainer));
    pipeline.fit(&x, &y).unwrap();

    let report = pipeline
        .feature_importances(&x, &y, DisplayMode::All, false, "run")
        .unwrap();
    assert!(report.contains("attribution = ERROR:"));
    assert!(report.contains("permutation = ok"));
}

#[test]
fn test_feature_importances_requires_explainer() {
    let (x, y) = regression_data();
    let mut pipeline = Conveyor::new().with_estimator(Box::new(MeanEstimator::new()));
    pipeline.fit(&x, &y).unwrap();

    assert!(matches!(
        pipeline.feature_importances(&x, &y, DisplayMode::All, false, ""),
        Err(ConveyorError::ConfigError(_))
    ));
}
