//! Pipeline orchestrator
//!
//! [`Conveyor`] owns an ordered list of preprocessing stages and one estimator slot.
//! Fitting couples each stage's `fit` with an immediate `transform` of the same data,
//! so every stage sees the output of the one before it; inference-time `transform`
//! replays the fitted stages in the same order without re-fitting. `fit_model` runs
//! the two hyperparameter search tracks against a held-out split and installs the
//! champion as the pipeline's estimator.

use crate::dataset::{self, Table};
use crate::error::{ConveyorError, Result};
use crate::estimator::Estimator;
use crate::explain::{DisplayMode, Explainer};
use crate::metrics::{score_line, MetricFn, MetricRegistry};
use crate::persist::{artifact_name, ArtifactStore, PipelineSnapshot};
use crate::progress::{NullProgress, ProgressReporter};
use crate::search::{
    select_champion, CatalogTrack, SearchResult, TrackOutcome, TreeEnsembleTrack, TrialParams,
};
use crate::stage::Stage;
use chrono::Local;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// The original default metric list for score reports.
pub const DEFAULT_METRICS: [&str; 4] = [
    "r2_score",
    "roc_auc_score",
    "accuracy_score",
    "explained_variance_score",
];

/// Result of a `score` call: the textual report plus the raw predictions and the
/// transformed target they were evaluated against.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub report: String,
    pub predictions: Array1<f64>,
    pub target: Array1<f64>,
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report)
    }
}

/// Options for a `fit_model` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitModelOptions {
    /// Metric both tracks are rated with (direction: maximize).
    pub metric: String,
    /// Fraction split off for validation when no holdout set is supplied.
    pub test_fraction: f64,
}

impl Default for FitModelOptions {
    fn default() -> Self {
        Self {
            metric: "r2_score".to_string(),
            test_fraction: 0.1,
        }
    }
}

impl FitModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }
}

/// What one track found, without the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSummary {
    pub family: String,
    pub params: TrialParams,
    pub score: f64,
}

impl TrackSummary {
    fn of(result: &SearchResult) -> Self {
        Self {
            family: result.family.clone(),
            params: result.params.clone(),
            score: result.score,
        }
    }
}

impl fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})\nbest_value = {}", self.family, self.params, self.score)
    }
}

/// Outcome of a `fit_model` run: the champion plus both tracks' summaries (a failed
/// track is reported as its error string).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitModelReport {
    pub champion: TrackSummary,
    pub tree: std::result::Result<TrackSummary, String>,
    pub catalog: std::result::Result<TrackSummary, String>,
}

impl FitModelReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConveyorError::SerializationError(e.to_string()))
    }
}

impl fmt::Display for FitModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best model = {}", self.champion)
    }
}

/// Sequential transform/fit pipeline with an automated model-selection entry point.
pub struct Conveyor {
    stages: Vec<Box<dyn Stage>>,
    estimator: Option<Box<dyn Estimator>>,
    registry: MetricRegistry,
    progress: Box<dyn ProgressReporter>,
    store: Option<Box<dyn ArtifactStore>>,
    explainer: Option<Box<dyn Explainer>>,
    seed: u64,
}

impl Default for Conveyor {
    fn default() -> Self {
        Self::new()
    }
}

impl Conveyor {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            estimator: None,
            registry: MetricRegistry::default(),
            progress: Box::new(NullProgress),
            store: None,
            explainer: None,
            seed: 42,
        }
    }

    /// Append a stage. Stage order is fixed after construction.
    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn Estimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn with_registry(mut self, registry: MetricRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_store(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_explainer(mut self, explainer: Box<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Seed for the internal validation split in `fit_model`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The fitted estimator, if any.
    pub fn estimator(&self) -> Option<&dyn Estimator> {
        self.estimator.as_deref()
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Fit all stages and the estimator, discarding the transformed output.
    pub fn fit(&mut self, x: &Table, y: &Array1<f64>) -> Result<()> {
        let _ = self.fit_transform(x, y, true)?;
        Ok(())
    }

    /// Fit stages in order, each immediately transforming the data that feeds the
    /// next stage. When `with_estimator` is set, the estimator is trained on the final
    /// transformed data. The inputs are never mutated.
    pub fn fit_transform(
        &mut self,
        x: &Table,
        y: &Array1<f64>,
        with_estimator: bool,
    ) -> Result<(Table, Array1<f64>)> {
        dataset::validate(x, y)?;
        let mut xt = x.clone();
        let mut yt = y.clone();

        for i in 0..self.stages.len() {
            let name = self.stages[i].name().to_string();
            self.progress.annotate("transform", &name);

            let stage = &mut self.stages[i];
            stage.fit(&xt, &yt).map_err(|e| stage_failure(&name, e))?;
            xt = stage.transform(&xt).map_err(|e| stage_failure(&name, e))?;
            if !yt.is_empty() && stage.transforms_target() {
                yt = stage
                    .target_transform(&yt)
                    .map_err(|e| stage_failure(&name, e))?;
            }
            self.progress.advance();
        }

        if with_estimator {
            let estimator = self
                .estimator
                .as_mut()
                .ok_or(ConveyorError::ModelNotFitted)?;
            self.progress.annotate("transform", estimator.name());
            estimator.fit(&xt, &yt)?;
            self.progress.advance();
        }
        Ok((xt, yt))
    }

    /// Apply the fitted stages in fit order, without re-fitting. Used for
    /// inference-time data and for scoring held-out data.
    pub fn transform(
        &self,
        x: &Table,
        y: Option<&Array1<f64>>,
    ) -> Result<(Table, Option<Array1<f64>>)> {
        let mut xt = x.clone();
        let mut yt = y.cloned();

        for stage in &self.stages {
            xt = stage
                .transform(&xt)
                .map_err(|e| stage_failure(stage.name(), e))?;
            if let Some(target) = yt.as_ref() {
                if !target.is_empty() && stage.transforms_target() {
                    yt = Some(
                        stage
                            .target_transform(target)
                            .map_err(|e| stage_failure(stage.name(), e))?,
                    );
                }
            }
        }
        Ok((xt, yt))
    }

    /// Transform then delegate to the estimator.
    pub fn predict(&self, x: &Table) -> Result<Array1<f64>> {
        let (xt, _) = self.transform(x, None)?;
        let estimator = self
            .estimator
            .as_ref()
            .ok_or(ConveyorError::ModelNotFitted)?;
        estimator.predict(&xt)
    }

    /// Transform, predict, and evaluate every requested metric against the transformed
    /// target. Names are resolved through the registry up front (unknown names are a
    /// typed error); each evaluation is isolated, so a metric that does not apply to
    /// this task contributes an `ERROR:` line instead of aborting the report. `extra`
    /// adds directly-referenced metric functions.
    pub fn score(
        &self,
        x: &Table,
        y: &Array1<f64>,
        metric_names: &[&str],
        extra: &[(&str, MetricFn)],
    ) -> Result<ScoreReport> {
        let resolved: Vec<(&str, MetricFn)> = metric_names
            .iter()
            .map(|name| self.registry.resolve(name).map(|f| (*name, f)))
            .collect::<Result<_>>()?;

        let (xt, yt) = self.transform(x, Some(y))?;
        let target = yt.unwrap_or_else(|| y.clone());
        let estimator = self
            .estimator
            .as_ref()
            .ok_or(ConveyorError::ModelNotFitted)?;
        let predictions = estimator.predict(&xt)?;

        let mut report = String::new();
        for (name, f) in resolved {
            report.push_str(&score_line(name, f, &target, &predictions));
        }
        for (name, f) in extra {
            report.push_str(&score_line(name, *f, &target, &predictions));
        }

        Ok(ScoreReport {
            report,
            predictions,
            target,
        })
    }

    /// Render feature-importance artifacts through the configured explainer. Each
    /// sub-mode of `mode` is attempted independently; a sub-mode that fails is
    /// reported in the returned text and does not abort the others.
    pub fn feature_importances(
        &self,
        x: &Table,
        y: &Array1<f64>,
        mode: DisplayMode,
        save: bool,
        name: &str,
    ) -> Result<String> {
        let explainer = self.explainer.as_ref().ok_or_else(|| {
            ConveyorError::ConfigError("no explainer configured".to_string())
        })?;
        let estimator = self
            .estimator
            .as_ref()
            .ok_or(ConveyorError::ModelNotFitted)?;

        let (xt, yt) = self.transform(x, Some(y))?;
        let target = yt.unwrap_or_else(|| y.clone());
        let name = if name.is_empty() {
            Local::now().format("%Y-%m-%d_%M").to_string()
        } else {
            name.to_string()
        };

        let mut report = String::new();
        for kind in mode.kinds() {
            match explainer.render(*kind, estimator.as_ref(), &xt, &target, save, &name) {
                Ok(()) => report.push_str(&format!("{} = ok\n", kind.label())),
                Err(e) => {
                    warn!(kind = kind.label(), error = %e, "explainer sub-mode failed");
                    report.push_str(&format!("{} = ERROR: {}\n", kind.label(), e));
                }
            }
        }
        Ok(report)
    }

    /// Fit the preprocessing stages, run both hyperparameter search tracks against a
    /// held-out split, and install the champion as this pipeline's estimator.
    ///
    /// When `holdout` is given it is transformed with the fitted stages and used as
    /// the validation split; otherwise `test_fraction` of the transformed training
    /// data is split off with this conveyor's seed. A configured [`ArtifactStore`]
    /// receives one timestamped binary snapshot per run; persistence failures surface
    /// to the caller.
    pub fn fit_model(
        &mut self,
        x: &Table,
        y: &Array1<f64>,
        holdout: Option<(&Table, &Array1<f64>)>,
        tree: &TreeEnsembleTrack,
        catalog: &CatalogTrack,
        opts: &FitModelOptions,
    ) -> Result<FitModelReport> {
        let metric = self.registry.resolve(&opts.metric)?;
        let (xt, yt) = self.fit_transform(x, y, false)?;

        let (x_train, y_train, x_val, y_val) = match holdout {
            Some((hx, hy)) => {
                dataset::validate(hx, hy)?;
                let (hxt, hyt) = self.transform(hx, Some(hy))?;
                let hyt = hyt.unwrap_or_else(|| hy.clone());
                (xt, yt, hxt, hyt)
            }
            None => dataset::train_test_split(&xt, &yt, opts.test_fraction, self.seed)?,
        };

        let tree_outcome = tree.run(
            &x_train,
            &y_train,
            &x_val,
            &y_val,
            metric,
            self.progress.as_mut(),
        );
        let catalog_outcome = catalog.run(
            &x_train,
            &y_train,
            &x_val,
            &y_val,
            metric,
            self.progress.as_mut(),
        );

        let tree_summary = summarize(&tree_outcome);
        let catalog_summary = summarize(&catalog_outcome);

        let champion = select_champion(tree_outcome, catalog_outcome)?;
        info!(family = %champion.family, score = champion.score, "best model selected");

        let champion_summary = TrackSummary::of(&champion);
        let SearchResult { model, .. } = champion;
        self.estimator = Some(model);

        if let Some(store) = &self.store {
            let snapshot = PipelineSnapshot {
                created_at: Local::now().to_rfc3339(),
                stages: self.stage_names(),
                champion_family: champion_summary.family.clone(),
                champion_params: champion_summary.params.clone(),
                champion_score: champion_summary.score,
            };
            let path = store.save(&artifact_name(Local::now()), &snapshot.to_bytes()?)?;
            info!(path = %path.display(), "pipeline artifact saved");
        }

        Ok(FitModelReport {
            champion: champion_summary,
            tree: tree_summary,
            catalog: catalog_summary,
        })
    }
}

impl fmt::Display for Conveyor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conveyor = (")?;
        for stage in &self.stages {
            writeln!(f, "  {},", stage.name())?;
        }
        let estimator = self
            .estimator
            .as_ref()
            .map(|e| e.name())
            .unwrap_or("None");
        writeln!(f, "  estimator = {}", estimator)?;
        write!(f, ")")
    }
}

fn stage_failure(stage: &str, e: ConveyorError) -> ConveyorError {
    match e {
        already @ ConveyorError::StageError { .. } => already,
        other => ConveyorError::StageError {
            stage: stage.to_string(),
            message: other.to_string(),
        },
    }
}

fn summarize(outcome: &TrackOutcome) -> std::result::Result<TrackSummary, String> {
    match outcome {
        Ok(result) => Ok(TrackSummary::of(result)),
        Err(e) => Err(e.to_string()),
    }
}
