//! Hyperparameter search tracks
//!
//! Two independent optimization loops: [`TreeEnsembleTrack`] runs one early-stopping
//! tree-ensemble family, [`CatalogTrack`] iterates a catalog of generic estimator
//! families with a sub-budget per family. Both sample assignments from the family's
//! search space, evaluate candidates against a held-out split, keep the best-seen
//! assignment, and refit it on the full training input.

use super::space::TrialParams;
use crate::dataset::Table;
use crate::error::ConveyorError;
use crate::estimator::{Estimator, ModelFamily, TreeEnsembleFamily};
use crate::metrics::MetricFn;
use crate::progress::ProgressReporter;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Search loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Trial budget. For the catalog track this is the budget per family.
    pub n_trials: usize,
    /// Parallel trial evaluations; 0 means all available workers.
    pub n_jobs: usize,
    /// Sampling seed. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 100,
            n_jobs: 0,
            seed: Some(42),
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Outcome of one completed search track.
pub struct SearchResult {
    /// Candidate family identifier.
    pub family: String,
    /// Best hyperparameter assignment found.
    pub params: TrialParams,
    /// Best validation score (higher is better).
    pub score: f64,
    /// Model refit on the full training input with the best assignment.
    pub model: Box<dyn Estimator>,
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("family", &self.family)
            .field("params", &self.params)
            .field("score", &self.score)
            .field("model", &self.model.name())
            .finish()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})\nbest_value = {}", self.family, self.params, self.score)
    }
}

/// Failure of an entire search track, as opposed to individual trial failures (which
/// are recorded and skipped inside the loop).
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("track '{family}' produced no successful trials: [{}]", .errors.join("; "))]
    NoSuccessfulTrials { family: String, errors: Vec<String> },

    #[error("refit of best '{family}' candidate failed: {message}")]
    RefitFailed { family: String, message: String },
}

impl From<SearchError> for ConveyorError {
    fn from(e: SearchError) -> Self {
        ConveyorError::SearchError(e.to_string())
    }
}

/// A track either completes with its best result or fails as a whole.
pub type TrackOutcome = std::result::Result<SearchResult, SearchError>;

/// Evaluate sampled assignments, sequentially or in bounded parallel chunks.
///
/// Sampling happened up front, so the trial sequence is identical regardless of the
/// worker count; only evaluation is parallelized. Candidate models live and die inside
/// the evaluation closure, which bounds peak memory over long searches.
fn evaluate_trials<F>(
    samples: Vec<TrialParams>,
    n_jobs: usize,
    progress: &mut dyn ProgressReporter,
    eval: F,
) -> Vec<(TrialParams, std::result::Result<f64, String>)>
where
    F: Fn(&TrialParams) -> std::result::Result<f64, String> + Sync,
{
    let workers = if n_jobs == 0 {
        rayon::current_num_threads()
    } else {
        n_jobs
    };

    let mut results = Vec::with_capacity(samples.len());
    if workers <= 1 {
        for params in samples {
            let outcome = eval(&params);
            progress.advance();
            results.push((params, outcome));
        }
    } else {
        for chunk in samples.chunks(workers) {
            let batch: Vec<_> = chunk
                .par_iter()
                .map(|params| (params.clone(), eval(params)))
                .collect();
            for item in batch {
                progress.advance();
                results.push(item);
            }
        }
    }
    results
}

/// Fold trial outcomes into the best-seen assignment. First success wins the slot;
/// later trials must be strictly better to replace it.
fn best_of(
    results: Vec<(TrialParams, std::result::Result<f64, String>)>,
    errors: &mut Vec<String>,
) -> Option<(TrialParams, f64)> {
    let mut best: Option<(TrialParams, f64)> = None;
    for (params, outcome) in results {
        match outcome {
            Ok(score) => {
                if best.as_ref().map_or(true, |(_, s)| score > *s) {
                    best = Some((params, score));
                }
            }
            Err(e) => errors.push(e),
        }
    }
    best
}

/// Search track for the early-stopping tree-ensemble family.
pub struct TreeEnsembleTrack {
    family: Box<dyn TreeEnsembleFamily>,
    categorical: Vec<String>,
    config: SearchConfig,
}

impl TreeEnsembleTrack {
    pub fn new(family: Box<dyn TreeEnsembleFamily>) -> Self {
        Self {
            family,
            categorical: Vec::new(),
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare feature columns the family should treat as categorical.
    pub fn with_categorical_columns(mut self, columns: &[&str]) -> Self {
        self.categorical = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Run the budgeted loop: sample, build with the declared categorical columns,
    /// fit with validation-driven early stopping, score on the validation split.
    pub fn run(
        &self,
        x: &Table,
        y: &Array1<f64>,
        x_val: &Table,
        y_val: &Array1<f64>,
        metric: MetricFn,
        progress: &mut dyn ProgressReporter,
    ) -> TrackOutcome {
        progress.annotate("model", self.family.name());

        let mut rng = self.config.rng();
        let space = self.family.search_space();
        let samples: Vec<TrialParams> = (0..self.config.n_trials)
            .map(|_| space.sample(&mut rng))
            .collect();

        let family = self.family.as_ref();
        let categorical = &self.categorical;
        let results = evaluate_trials(samples, self.config.n_jobs, progress, |params| {
            let mut model = family
                .build(params, categorical)
                .map_err(|e| e.to_string())?;
            model
                .fit_with_validation(x, y, x_val, y_val)
                .map_err(|e| e.to_string())?;
            let preds = model.predict(x_val).map_err(|e| e.to_string())?;
            drop(model);
            metric(y_val, &preds).map_err(|e| e.to_string())
        });

        let mut errors = Vec::new();
        let (params, score) =
            best_of(results, &mut errors).ok_or_else(|| SearchError::NoSuccessfulTrials {
                family: self.family.name().to_string(),
                errors,
            })?;

        let refit_err = |e: ConveyorError| SearchError::RefitFailed {
            family: self.family.name().to_string(),
            message: e.to_string(),
        };
        let mut model = self.family.build(&params, &self.categorical).map_err(refit_err)?;
        model
            .fit_with_validation(x, y, x_val, y_val)
            .map_err(refit_err)?;

        tracing::info!(family = self.family.name(), score, "tree-ensemble track finished");
        Ok(SearchResult {
            family: self.family.name().to_string(),
            params,
            score,
            model,
        })
    }
}

/// Search track over a catalog of generic estimator families.
pub struct CatalogTrack {
    families: Vec<Box<dyn ModelFamily>>,
    config: SearchConfig,
}

impl CatalogTrack {
    pub fn new(families: Vec<Box<dyn ModelFamily>>) -> Self {
        Self {
            families,
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a sub-budget of trials per family and keep the best family+params pair.
    ///
    /// A family whose every trial fails is skipped without aborting the track. A
    /// catalog in which every family fails is a defined error state
    /// ([`SearchError::NoSuccessfulTrials`]); no placeholder model is ever returned.
    pub fn run(
        &self,
        x: &Table,
        y: &Array1<f64>,
        x_val: &Table,
        y_val: &Array1<f64>,
        metric: MetricFn,
        progress: &mut dyn ProgressReporter,
    ) -> TrackOutcome {
        if self.families.is_empty() {
            return Err(SearchError::NoSuccessfulTrials {
                family: "catalog".to_string(),
                errors: vec!["empty model catalog".to_string()],
            });
        }

        let mut rng = self.config.rng();
        let mut best: Option<(usize, TrialParams, f64)> = None;
        let mut family_errors = Vec::new();

        for (family_idx, family) in self.families.iter().enumerate() {
            progress.annotate("model", family.name());

            let space = family.search_space();
            let samples: Vec<TrialParams> = (0..self.config.n_trials)
                .map(|_| space.sample(&mut rng))
                .collect();

            let f = family.as_ref();
            let results = evaluate_trials(samples, self.config.n_jobs, progress, |params| {
                let mut model = f.build(params).map_err(|e| e.to_string())?;
                model.fit(x, y).map_err(|e| e.to_string())?;
                let preds = model.predict(x_val).map_err(|e| e.to_string())?;
                drop(model);
                metric(y_val, &preds).map_err(|e| e.to_string())
            });

            let mut errors = Vec::new();
            match best_of(results, &mut errors) {
                Some((params, score)) => {
                    if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                        best = Some((family_idx, params, score));
                    }
                }
                None => {
                    let first = errors.first().cloned().unwrap_or_default();
                    tracing::warn!(family = f.name(), error = %first, "family skipped");
                    family_errors.push(format!("{}: {}", f.name(), first));
                }
            }
        }

        let (family_idx, params, score) =
            best.ok_or(SearchError::NoSuccessfulTrials {
                family: "catalog".to_string(),
                errors: family_errors,
            })?;

        let family = &self.families[family_idx];
        let refit_err = |e: ConveyorError| SearchError::RefitFailed {
            family: family.name().to_string(),
            message: e.to_string(),
        };
        let mut model = family.build(&params).map_err(refit_err)?;
        model.fit(x, y).map_err(refit_err)?;

        tracing::info!(family = family.name(), score, "catalog track finished");
        Ok(SearchResult {
            family: family.name().to_string(),
            params,
            score,
            model,
        })
    }
}
