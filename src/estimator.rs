//! Estimator and model-family traits
//!
//! The core never implements a concrete model: candidate families plug in through
//! [`ModelFamily`] (generic catalog track) and [`TreeEnsembleFamily`] (early-stopping
//! track), each building [`Estimator`]s from sampled hyperparameters.

use crate::dataset::Table;
use crate::error::Result;
use crate::search::{SearchSpace, TrialParams};
use ndarray::Array1;

/// A trainable predictor.
pub trait Estimator: Send {
    /// Model name for reports and progress annotation.
    fn name(&self) -> &str;

    /// Fit on training data.
    fn fit(&mut self, x: &Table, y: &Array1<f64>) -> Result<()>;

    /// Fit with a validation set available for early stopping. Families without an
    /// early-stopping rule fall back to a plain fit.
    fn fit_with_validation(
        &mut self,
        x: &Table,
        y: &Array1<f64>,
        _x_val: &Table,
        _y_val: &Array1<f64>,
    ) -> Result<()> {
        self.fit(x, y)
    }

    /// Predict one value per input row.
    fn predict(&self, x: &Table) -> Result<Array1<f64>>;
}

/// A candidate model family for the generic catalog track.
pub trait ModelFamily: Send + Sync {
    /// Family name (e.g. "ridge", "knn").
    fn name(&self) -> &str;

    /// The hyperparameter domain this family is sampled from.
    fn search_space(&self) -> SearchSpace;

    /// Instantiate an unfitted estimator from one hyperparameter assignment.
    fn build(&self, params: &TrialParams) -> Result<Box<dyn Estimator>>;
}

/// The tree-ensemble family for the early-stopping track.
///
/// Differs from [`ModelFamily`] in that candidates receive the declared categorical
/// column names at construction, and their fits are driven through
/// [`Estimator::fit_with_validation`].
pub trait TreeEnsembleFamily: Send + Sync {
    fn name(&self) -> &str;

    fn search_space(&self) -> SearchSpace;

    /// Instantiate an unfitted estimator; `categorical` lists the feature columns the
    /// model should treat as categorical (unknown names are the family's concern).
    fn build(&self, params: &TrialParams, categorical: &[String]) -> Result<Box<dyn Estimator>>;
}
