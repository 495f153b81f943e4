//! Hyperparameter search
//!
//! Provides the two optimization tracks and their supporting types:
//! - Search spaces with seeded random sampling
//! - The tree-ensemble track (early stopping, categorical columns)
//! - The generic catalog track (sub-budget per family, skip-on-failure)
//! - Champion selection over the two outcomes

mod selector;
mod space;
mod track;

pub use selector::select_champion;
pub use space::{ParamRange, ParamValue, SearchSpace, TrialParams};
pub use track::{
    CatalogTrack, SearchConfig, SearchError, SearchResult, TrackOutcome, TreeEnsembleTrack,
};
