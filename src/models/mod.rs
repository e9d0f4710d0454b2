//! Motion and sensor models
//!
//! The motion model describes how the target state evolves over time; sensor
//! models describe how a state projects into each sensor's measurement space.

pub mod ctrv;
pub mod sensors;

use nalgebra::{RealField, SVector};

use crate::types::spaces::{MeasurementCovariance, N_STATE};

/// Trait for (possibly nonlinear) sensor models.
///
/// A sensor model is the full parameterization of the generic sigma-point
/// update: a projection from state space into measurement space, the sensor's
/// noise covariance, and the indices of measurement components that are
/// angles (whose residuals must be wrapped into (−π, π]).
///
/// Implementations need no Jacobian; the unscented transform pushes sigma
/// points through `project` directly.
pub trait SensorModel<T: RealField, const M: usize> {
    /// Indices of angular components of the measurement vector.
    const ANGULAR_COMPONENTS: &'static [usize];

    /// Projects a state vector into this sensor's measurement space.
    fn project(&self, state: &SVector<T, N_STATE>) -> SVector<T, M>;

    /// Returns the measurement noise covariance.
    fn noise(&self) -> MeasurementCovariance<T, M>;
}
