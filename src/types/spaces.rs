//! Vector space markers and typed vectors
//!
//! State estimates and sensor measurements are both small real vectors, and
//! nothing in plain linear algebra stops one from being subtracted from the
//! other. The types here bind every vector and covariance to a marker space
//! so that such mix-ups are compile errors.

use ::core::marker::PhantomData;
use ::core::ops::{Add, Sub};
use nalgebra::{RealField, SMatrix, SVector, Scalar};

/// Marker type for state-space quantities (position, speed, heading, yaw rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace;

/// Marker type for measurement-space quantities (sensor observations)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A vector bound to a scalar type, a dimension, and a mathematical space.
///
/// Internals of the filter drop down to raw [`SVector`] arithmetic; the typed
/// wrapper exists at the API boundary where state and measurement quantities
/// meet.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a vector from raw components.
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self {
            inner: SVector::from(data),
            _marker: PhantomData,
        }
    }

    /// Wraps an nalgebra vector in this space.
    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying nalgebra vector.
    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    /// Consumes self and returns the underlying nalgebra vector.
    #[inline]
    pub fn into_svector(self) -> SVector<T, N> {
        self.inner
    }

    /// Returns the components as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Access element at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

impl<T: RealField + Copy, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a zero vector.
    #[inline]
    pub fn zeros() -> Self {
        Self::from_svector(SVector::zeros())
    }
}

impl<T: RealField + Copy, const N: usize, Space> Add for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner + rhs.inner)
    }
}

impl<T: RealField + Copy, const N: usize, Space> Sub for Vector<T, N, Space> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_svector(self.inner - rhs.inner)
    }
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A covariance matrix bound to a vector space.
///
/// Logically symmetric positive semi-definite. The constructors do not verify
/// this; the filter surfaces a violation as an error at the point where the
/// Cholesky square root is taken.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    /// Wraps a raw matrix in this space.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }

    /// Consumes self and returns the underlying matrix.
    #[inline]
    pub fn into_matrix(self) -> SMatrix<T, N, N> {
        self.inner
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Copy, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates an identity covariance matrix.
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    /// Creates a diagonal covariance matrix from per-dimension variances.
    #[inline]
    pub fn from_diagonal(variances: &SVector<T, N>) -> Self {
        Self::from_matrix(SMatrix::from_diagonal(variances))
    }

    /// Creates a diagonal covariance matrix from per-dimension standard
    /// deviations (each entry is squared).
    #[inline]
    pub fn from_stds(stds: [T; N]) -> Self {
        Self::from_diagonal(&SVector::from(stds.map(|s| s * s)))
    }

    /// Sum of the per-dimension variances.
    #[inline]
    pub fn trace(&self) -> T {
        self.inner.trace()
    }

    /// Lower-triangular Cholesky factor, or `None` if the matrix is not
    /// positive definite.
    #[inline]
    pub fn cholesky(&self) -> Option<SMatrix<T, N, N>> {
        nalgebra::Cholesky::new(self.inner).map(|c| c.l())
    }

    /// Attempts to invert the covariance matrix.
    #[inline]
    pub fn try_inverse(&self) -> Option<SMatrix<T, N, N>> {
        self.inner.try_inverse()
    }
}

impl<T: RealField + Copy, const N: usize, Space> Add for Covariance<T, N, Space> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_matrix(self.inner + rhs.inner)
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// Dimension of the CTRV state: [px, py, v, yaw, yaw rate].
pub const N_STATE: usize = 5;

/// Dimension of the augmented state: CTRV state plus the two process-noise
/// terms (longitudinal acceleration, yaw acceleration).
pub const N_AUG: usize = 7;

/// A CTRV state vector.
pub type StateVector<T> = Vector<T, N_STATE, StateSpace>;

/// A CTRV state covariance.
pub type StateCovariance<T> = Covariance<T, N_STATE, StateSpace>;

/// A measurement vector of sensor-specific dimension.
pub type Measurement<T, const M: usize> = Vector<T, M, MeasurementSpace>;

/// A measurement-space covariance of sensor-specific dimension.
pub type MeasurementCovariance<T, const M: usize> = Covariance<T, M, MeasurementSpace>;
