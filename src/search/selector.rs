//! Champion selection across the two search tracks

use super::track::{SearchResult, TrackOutcome};
use crate::error::{ConveyorError, Result};
use tracing::warn;

/// Pick the champion between the tree-ensemble and catalog outcomes.
///
/// Both tracks must have been scored with the same metric on the same validation
/// split. The challenger (catalog) wins only on a strictly greater score; a tie keeps
/// the tree-ensemble result. A track that failed is non-competitive; if both failed,
/// there is no champion and the error carries both causes.
pub fn select_champion(tree: TrackOutcome, catalog: TrackOutcome) -> Result<SearchResult> {
    match (tree, catalog) {
        (Ok(tree), Ok(catalog)) => {
            if catalog.score > tree.score {
                Ok(catalog)
            } else {
                Ok(tree)
            }
        }
        (Ok(tree), Err(e)) => {
            warn!(error = %e, "catalog track failed; keeping tree-ensemble result");
            Ok(tree)
        }
        (Err(e), Ok(catalog)) => {
            warn!(error = %e, "tree-ensemble track failed; keeping catalog result");
            Ok(catalog)
        }
        (Err(tree_err), Err(catalog_err)) => Err(ConveyorError::SearchError(format!(
            "both tracks failed: tree-ensemble: {}; catalog: {}",
            tree_err, catalog_err
        ))),
    }
}
