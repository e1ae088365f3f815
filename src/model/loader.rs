use std::{fs, io, path::Path};

use log::{debug, info};
use parking_lot::Mutex;

use super::{Artifact, ModelHandle};
use crate::error::{PredictorErr, Result};

static SHARED: ModelCache = ModelCache::new();

/// A lazily populated, process-wide slot for the loaded estimator.
///
/// The lock is held while loading, so concurrent first uses wait for a single load and then
/// all observe the same handle. A failed load leaves the slot empty.
#[derive(Debug, Default)]
pub struct ModelCache {
    slot: Mutex<Option<ModelHandle>>,
}

impl ModelCache {
    /// Creates a new, empty `ModelCache`.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached handle, running `load` only if nothing has been cached yet.
    ///
    /// # Arguments
    /// * `load` - Produces the handle on first use.
    ///
    /// # Returns
    /// The cached handle or the error returned by `load`.
    pub fn get_or_load<F>(&self, load: F) -> Result<ModelHandle>
    where
        F: FnOnce() -> Result<ModelHandle>,
    {
        let mut slot = self.slot.lock();

        if let Some(handle) = slot.as_ref() {
            debug!("model cache hit");
            return Ok(handle.clone());
        }

        let handle = load()?;
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Returns the cached handle without loading.
    pub fn get(&self) -> Option<ModelHandle> {
        self.slot.lock().clone()
    }
}

/// The cache backing [`load_model`].
pub fn shared() -> &'static ModelCache {
    &SHARED
}

/// Loads the estimator at `path` once per process and returns the cached handle afterwards.
///
/// Only one artifact is served per deployment, so later calls ignore `path` once a model has
/// been cached.
///
/// # Errors
/// `ArtifactNotFound` if the file doesn't exist, `ArtifactCorrupt` if it can't be read or
/// deserialized.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelHandle> {
    shared().get_or_load(|| read_artifact(path.as_ref()))
}

/// Reads and validates the artifact at `path`, bypassing any cache.
pub fn read_artifact(path: &Path) -> Result<ModelHandle> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PredictorErr::ArtifactNotFound {
            path: path.to_path_buf(),
        },
        _ => PredictorErr::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason: format!("cannot read: {e}"),
        },
    })?;

    let corrupt = |reason| PredictorErr::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    let artifact = Artifact::from_slice(&bytes).map_err(corrupt)?;
    artifact.validate().map_err(corrupt)?;

    let handle = ModelHandle::new(artifact);
    info!(kind = handle.kind(), bytes = bytes.len(); "loaded model from {}", path.display());
    Ok(handle)
}
