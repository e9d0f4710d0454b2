//! Pursuit: single-target state estimation with an Unscented Kalman Filter
//!
//! Estimates the time-varying state (position, speed, heading, yaw rate) of a
//! moving object from a stream of noisy, asynchronous sensor readings. Two
//! sensor kinds are fused: a positional sensor reporting Cartesian (x, y) and
//! a range-bearing sensor reporting (range, bearing, range-rate).
//!
//! # Motion model
//!
//! The filter uses the CTRV ("constant turn rate and velocity") model: the
//! target is assumed to move at constant speed along a circular arc between
//! updates. The model is nonlinear in the heading and yaw-rate components,
//! which is why the unscented transform is used instead of linearization.
//!
//! # Type Safety
//!
//! State vectors and measurements live in distinct phantom-typed spaces, so a
//! measurement cannot be accidentally added to a state estimate and dimension
//! mismatches are caught at compile time.
//!
//! # Example
//!
//! ```
//! use pursuit::filters::ukf::{CtrvUkf, UkfConfig};
//! use pursuit::types::measurement::SensorReading;
//!
//! let mut filter = CtrvUkf::new(UkfConfig::default());
//!
//! // First reading initializes the track.
//! filter.process(&SensorReading::position(0, 5.0, 0.1)).unwrap();
//!
//! // Later readings run a predict-then-update cycle.
//! filter.process(&SensorReading::position(100_000, 5.2, 0.1)).unwrap();
//!
//! let track = filter.track().unwrap();
//! assert!(*track.mean.index(0) > 5.0);
//! ```

pub mod types;
pub mod models;
pub mod filters;

pub mod prelude {
    pub use crate::filters::sigma::{SigmaPoints, SigmaWeights};
    pub use crate::filters::ukf::{CtrvUkf, TrackState, UkfConfig};
    pub use crate::models::ctrv::CtrvModel;
    pub use crate::models::sensors::{PositionSensor, RangeBearingSensor};
    pub use crate::models::SensorModel;
    pub use crate::types::angles::wrap_angle;
    pub use crate::types::measurement::{SensorData, SensorKind, SensorReading};
    pub use crate::types::spaces::*;
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// A reading arrived with a timestamp earlier than the previous one.
    ///
    /// The input stream contract requires monotonically non-decreasing
    /// timestamps; predicting backward in time is a caller error.
    #[error("reading timestamp {got} us precedes previous timestamp {last} us")]
    OutOfOrderTimestamp {
        /// Timestamp of the previously processed reading, in microseconds.
        last: i64,
        /// Timestamp of the offending reading, in microseconds.
        got: i64,
    },

    /// A raw measurement did not have the dimensionality its sensor kind
    /// declares (2 for positional, 3 for range-bearing).
    #[error("{kind:?} measurement expects {expected} values, got {got}")]
    MalformedMeasurement {
        /// Sensor kind the values were declared as.
        kind: crate::types::measurement::SensorKind,
        /// Dimensionality required by that sensor kind.
        expected: usize,
        /// Number of values actually supplied.
        got: usize,
    },

    /// A covariance matrix was not positive definite, so its Cholesky square
    /// root could not be computed.
    ///
    /// This indicates the filter has numerically diverged. Continuing to
    /// filter with a corrupted covariance produces meaningless estimates, so
    /// the caller must decide whether to reinitialize.
    #[error("covariance is not positive definite; filter has diverged")]
    CovarianceNotPositiveDefinite,

    /// The innovation covariance could not be inverted.
    ///
    /// A near-singular innovation covariance points at an ill-conditioned
    /// measurement-noise configuration rather than a transient condition.
    #[error("innovation covariance is singular; check measurement noise configuration")]
    SingularInnovationCovariance,
}

pub type Result<T> = ::core::result::Result<T, FilterError>;
