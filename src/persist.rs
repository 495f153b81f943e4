//! Pipeline artifact persistence
//!
//! After a full `fit_model` run the pipeline state is serialized into an opaque
//! binary artifact with a timestamped name, one artifact per run. The destination is
//! a collaborator behind [`ArtifactStore`]; failures surface to the caller unchanged.

use crate::error::{ConveyorError, Result};
use crate::search::TrialParams;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Destination for serialized pipeline artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Persist one named artifact, returning where it landed.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Filesystem-backed store writing artifacts into one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ArtifactStore for FileStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Artifact name for one run, e.g. `model_2024_05_01_m33`.
pub fn artifact_name(now: DateTime<Local>) -> String {
    format!("model_{}", now.format("%Y_%m_%d_m%M"))
}

/// Serializable snapshot of a trained pipeline: stage list plus the champion's
/// identity, hyperparameters, and validation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub created_at: String,
    pub stages: Vec<String>,
    pub champion_family: String,
    pub champion_params: TrialParams,
    pub champion_score: f64,
}

impl PipelineSnapshot {
    /// Encode as the opaque binary artifact format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ConveyorError::SerializationError(e.to_string()))
    }

    /// Decode a previously written artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| ConveyorError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ParamValue;
    use chrono::TimeZone;

    fn snapshot() -> PipelineSnapshot {
        let mut params = TrialParams::new();
        params.insert("n_estimators", ParamValue::Int(300));
        PipelineSnapshot {
            created_at: "2024-05-01T10:33:00".to_string(),
            stages: vec!["imputer".to_string(), "scaler".to_string()],
            champion_family: "gbdt".to_string(),
            champion_params: params,
            champion_score: 0.91,
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snap = snapshot();
        let bytes = snap.to_bytes().unwrap();
        let restored = PipelineSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored, snap);
    }

    #[test]
    fn test_file_store_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("runs"));
        let path = store.save("model_2024_05_01_m33", b"payload").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_artifact_name_format() {
        let ts = Local.with_ymd_and_hms(2024, 5, 1, 10, 33, 7).unwrap();
        assert_eq!(artifact_name(ts), "model_2024_05_01_m33");
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(PipelineSnapshot::from_bytes(&[0xff, 0x01]).is_err());
    }
}
