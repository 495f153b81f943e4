//! Pipeline stage contract
//!
//! Every preprocessing block the [`Conveyor`](crate::conveyor::Conveyor) drives
//! implements [`Stage`]. Target transformation is an explicit capability
//! (`transforms_target`) rather than a probed optional method: the orchestrator calls
//! `target_transform` only when a target is present and the stage declares support.

use crate::dataset::Table;
use crate::error::Result;
use ndarray::Array1;

/// A fit/transform unit in the pipeline.
///
/// A stage that errors during `fit` or `transform` aborts the whole pipeline
/// operation; stages are never retried.
pub trait Stage: Send {
    /// Stage name, used for progress reporting and error messages.
    fn name(&self) -> &str;

    /// Fit internal state from the training data.
    fn fit(&mut self, x: &Table, y: &Array1<f64>) -> Result<()>;

    /// Transform the feature table. Pure given fitted state.
    fn transform(&self, x: &Table) -> Result<Table>;

    /// Whether this stage also transforms the target.
    fn transforms_target(&self) -> bool {
        false
    }

    /// Transform the target. Only invoked when `transforms_target` returns true and a
    /// target was supplied; the default is the identity.
    fn target_transform(&self, y: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(y.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Stage for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn fit(&mut self, _x: &Table, _y: &Array1<f64>) -> Result<()> {
            Ok(())
        }

        fn transform(&self, x: &Table) -> Result<Table> {
            Ok(x.clone())
        }
    }

    #[test]
    fn test_default_target_capability() {
        let stage = Identity;
        assert!(!stage.transforms_target());
        let y = Array1::from(vec![1.0, 2.0]);
        assert_eq!(stage.target_transform(&y).unwrap(), y);
    }
}
