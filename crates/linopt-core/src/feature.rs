//! Feature projection from raw observations
//!
//! All value and model parameters live in the projected feature space, so a
//! projection must be pure and dimension-stable: the same observation always
//! maps to the same vector, and the output length never changes for a given
//! configuration.

use ndarray::{Array1, ArrayView1, ArrayView2};
use tracing::warn;

use crate::{RLError, Result};

/// Pure map from a raw observation to a fixed-length feature vector φ
pub trait FeatureProjection: Send + Sync {
    /// Project a raw observation into feature space
    fn project(&self, s: &[f64]) -> Array1<f64>;

    /// Length of the produced feature vector
    fn output_len(&self) -> usize;
}

/// Projection that passes the raw observation through unchanged
#[derive(Debug, Clone)]
pub struct IdentityProjection {
    len: usize,
}

impl IdentityProjection {
    /// Create an identity projection for observations of length `len`
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl FeatureProjection for IdentityProjection {
    fn project(&self, s: &[f64]) -> Array1<f64> {
        Array1::from_iter(s.iter().copied())
    }

    fn output_len(&self) -> usize {
        self.len
    }
}

/// Project an observation and validate length and finiteness.
///
/// A projection emitting the wrong length or non-finite values is a fatal
/// configuration error, never silently coerced.
pub fn project_checked(projection: &dyn FeatureProjection, s: &[f64]) -> Result<Array1<f64>> {
    let phi = projection.project(s);
    if phi.len() != projection.output_len() {
        warn!(
            expected = projection.output_len(),
            actual = phi.len(),
            "projection emitted the wrong feature dimension"
        );
        return Err(RLError::DimensionMismatch {
            expected: projection.output_len(),
            actual: phi.len(),
        });
    }
    ensure_finite("phi", phi.view())?;
    Ok(phi)
}

/// Fail with [`RLError::NonFinite`] if any element of `v` is NaN or infinite
pub fn ensure_finite(what: &'static str, v: ArrayView1<'_, f64>) -> Result<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(RLError::NonFinite(what))
    }
}

/// Matrix variant of [`ensure_finite`]
pub fn ensure_finite_mat(what: &'static str, m: ArrayView2<'_, f64>) -> Result<()> {
    if m.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(RLError::NonFinite(what))
    }
}
