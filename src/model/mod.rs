mod artifact;
mod loader;

use std::{fmt, sync::Arc};

use ndarray::{Array1, ArrayView2};

use crate::error::Result;

pub use artifact::{Artifact, GradientBoosting, Linear, Node, Tree};
pub use loader::{load_model, read_artifact, shared, ModelCache};

/// A trained estimator mapping feature rows to a single target value.
pub trait Regressor: Send + Sync {
    /// Predicts one value per row of `x`.
    ///
    /// # Arguments
    /// * `x` - A `(n_samples, n_features)` batch of feature rows.
    ///
    /// # Returns
    /// The predictions, one per row, or an error if inference failed.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Short name of the estimator family, used for logging.
    fn kind(&self) -> &'static str;
}

/// A cheap, shareable reference to a loaded estimator.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<dyn Regressor>,
}

impl ModelHandle {
    /// Wraps an estimator into a new handle.
    pub fn new<R>(model: R) -> Self
    where
        R: Regressor + 'static,
    {
        Self {
            inner: Arc::new(model),
        }
    }

    /// Whether both handles refer to the same loaded estimator.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.inner.predict(x)
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("kind", &self.kind())
            .finish()
    }
}
