//! Conveyor - pipeline composition and automated model selection for tabular learning
//!
//! This crate chains user-supplied preprocessing stages ahead of a final estimator and
//! selects that estimator automatically by racing two hyperparameter-search tracks:
//!
//! - [`conveyor`] - The pipeline orchestrator (fit/transform/predict/score/fit_model)
//! - [`stage`] - The contract every preprocessing block satisfies
//! - [`estimator`] - Estimator and candidate-family traits
//! - [`search`] - Search spaces, the two optimization tracks, champion selection
//! - [`metrics`] - Metric registry and failure-isolating scoring adapter
//! - [`dataset`] - Named-column feature tables and seeded splits
//! - [`progress`] - Observational progress reporting
//! - [`persist`] - Opaque binary pipeline artifacts
//! - [`explain`] - Explainability collaborator interface

pub mod error;

pub mod conveyor;
pub mod dataset;
pub mod estimator;
pub mod explain;
pub mod metrics;
pub mod persist;
pub mod progress;
pub mod search;
pub mod stage;

pub use error::{ConveyorError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ConveyorError, Result};

    pub use crate::conveyor::{
        Conveyor, FitModelOptions, FitModelReport, ScoreReport, TrackSummary, DEFAULT_METRICS,
    };

    pub use crate::dataset::{train_test_split, Table};

    pub use crate::stage::Stage;

    pub use crate::estimator::{Estimator, ModelFamily, TreeEnsembleFamily};

    pub use crate::metrics::{MetricFn, MetricRegistry};

    pub use crate::search::{
        select_champion, CatalogTrack, ParamRange, ParamValue, SearchConfig, SearchError,
        SearchResult, SearchSpace, TrackOutcome, TreeEnsembleTrack, TrialParams,
    };

    pub use crate::progress::{LogProgress, NullProgress, ProgressReporter};

    pub use crate::persist::{ArtifactStore, FileStore, PipelineSnapshot};

    pub use crate::explain::{DisplayMode, Explainer, ExplainKind};
}
