//! Explainability collaborator interface
//!
//! Plot/attribution rendering lives outside the core; the orchestrator only expands
//! the requested display mode into concrete sub-modes and isolates each sub-mode's
//! failure so one broken renderer never suppresses the other.

use crate::dataset::Table;
use crate::error::Result;
use crate::estimator::Estimator;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One concrete explanation technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainKind {
    /// Permutation-based feature importance.
    Permutation,
    /// Game-theoretic attribution (SHAP-style).
    Attribution,
}

impl ExplainKind {
    pub fn label(&self) -> &'static str {
        match self {
            ExplainKind::Permutation => "permutation",
            ExplainKind::Attribution => "attribution",
        }
    }
}

/// Which sub-modes a `feature_importances` call should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    All,
    Permutation,
    Attribution,
}

impl DisplayMode {
    /// Concrete sub-modes this display mode expands to.
    pub fn kinds(&self) -> &'static [ExplainKind] {
        match self {
            DisplayMode::All => &[ExplainKind::Attribution, ExplainKind::Permutation],
            DisplayMode::Permutation => &[ExplainKind::Permutation],
            DisplayMode::Attribution => &[ExplainKind::Attribution],
        }
    }
}

/// Renderer of explanation artifacts (images etc.) as a side effect.
pub trait Explainer: Send + Sync {
    /// Render one sub-mode for the fitted estimator over transformed data. `save` and
    /// `name` control artifact output naming.
    fn render(
        &self,
        kind: ExplainKind,
        estimator: &dyn Estimator,
        x: &Table,
        y: &Array1<f64>,
        save: bool,
        name: &str,
    ) -> Result<()>;
}
