//! Unscented Kalman Filter for single-target CTRV tracking
//!
//! The filter consumes one timestamped [`SensorReading`] at a time. The
//! first reading initializes the track; every later reading runs a
//! predict-then-update cycle:
//!
//! 1. Augment the state with the process-noise dimensions and generate
//!    sigma points (λ = 3 − n, Cholesky square root).
//! 2. Propagate each sigma point through the CTRV dynamics over the elapsed
//!    time and recombine into the predicted mean and covariance.
//! 3. Project the predicted points into the reading's measurement space,
//!    compute the Kalman gain from the innovation and cross covariances, and
//!    fuse the measurement.
//!
//! Angle-aware residuals are used throughout: the heading component of state
//! deviations and the bearing component of range-bearing deviations are
//! wrapped into (−π, π] before any outer product.
//!
//! A failing call leaves the track exactly as it was; all arithmetic runs on
//! locals and the result is committed only at the end.
//!
//! # Example
//!
//! ```
//! use pursuit::filters::ukf::{CtrvUkf, UkfConfig};
//! use pursuit::types::measurement::SensorReading;
//!
//! let mut filter = CtrvUkf::new(UkfConfig::default());
//!
//! filter.process(&SensorReading::range_bearing(0, 5.0, 0.0, 0.0)).unwrap();
//! filter.process(&SensorReading::position(100_000, 5.1, 0.05)).unwrap();
//!
//! let track = filter.track().unwrap();
//! let (x, y) = track.position();
//! assert!(x > 5.0 && x < 5.1);
//! # let _ = y;
//! ```

use log::{debug, trace, warn};
use nalgebra::{RealField, SVector};
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::filters::sigma::{
    weighted_covariance, weighted_cross_covariance, weighted_mean, SigmaPoints, SigmaWeights,
};
use crate::models::ctrv::{CtrvModel, YAW};
use crate::models::sensors::{PositionSensor, RangeBearingSensor};
use crate::models::SensorModel;
use crate::types::angles::wrap_angle;
use crate::types::measurement::{SensorData, SensorReading, MICROS_PER_SECOND};
use crate::types::spaces::{Measurement, StateCovariance, StateVector, N_AUG, N_STATE};
use crate::{FilterError, Result};

// ============================================================================
// Configuration
// ============================================================================

/// Filter configuration, fixed for the filter's lifetime.
///
/// The process-noise standard deviations are tuning knobs; the per-sensor
/// measurement-noise standard deviations come from the sensor datasheet
/// and are not meant to be tuned by the integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UkfConfig<T: RealField> {
    /// Fuse positional readings (initialization uses them regardless).
    pub use_position_sensor: bool,
    /// Fuse range-bearing readings (initialization uses them regardless).
    pub use_range_bearing_sensor: bool,

    /// Longitudinal acceleration process noise std dev (m/s²)
    pub std_accel: T,
    /// Yaw acceleration process noise std dev (rad/s²)
    pub std_yaw_accel: T,

    /// Positional sensor noise std dev in x (m)
    pub std_position_x: T,
    /// Positional sensor noise std dev in y (m)
    pub std_position_y: T,

    /// Range noise std dev (m)
    pub std_range: T,
    /// Bearing noise std dev (rad)
    pub std_bearing: T,
    /// Range-rate noise std dev (m/s)
    pub std_range_rate: T,

    /// Yaw-rate magnitude below which the CTRV propagation takes its
    /// straight-line branch (rad/s).
    pub yaw_rate_floor: T,
    /// Floor applied to the range before it divides the range-rate (m).
    pub range_floor: T,
}

impl<T: RealField + Float + Copy> Default for UkfConfig<T> {
    fn default() -> Self {
        let f = |v: f64| T::from_f64(v).unwrap();
        Self {
            use_position_sensor: true,
            use_range_bearing_sensor: true,
            std_accel: f(2.0),
            std_yaw_accel: f(1.0),
            std_position_x: f(0.15),
            std_position_y: f(0.15),
            std_range: f(0.3),
            std_bearing: f(0.03),
            std_range_rate: f(0.3),
            yaw_rate_floor: f(1e-3),
            range_floor: f(1e-4),
        }
    }
}

// ============================================================================
// Track State
// ============================================================================

/// The filter's current estimate: state mean and covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState<T: RealField> {
    /// State estimate mean: [px, py, v, yaw, yaw rate]
    pub mean: StateVector<T>,
    /// State estimate covariance
    pub covariance: StateCovariance<T>,
}

impl<T: RealField + Copy> TrackState<T> {
    /// Creates a track state.
    #[inline]
    pub fn new(mean: StateVector<T>, covariance: StateCovariance<T>) -> Self {
        Self { mean, covariance }
    }

    /// Estimated position (px, py).
    #[inline]
    pub fn position(&self) -> (T, T) {
        (*self.mean.index(0), *self.mean.index(1))
    }

    /// Estimated speed magnitude.
    #[inline]
    pub fn speed(&self) -> T {
        *self.mean.index(2)
    }

    /// Estimated heading angle in radians.
    #[inline]
    pub fn heading(&self) -> T {
        *self.mean.index(YAW)
    }

    /// Estimated yaw rate in radians/second.
    #[inline]
    pub fn yaw_rate(&self) -> T {
        *self.mean.index(4)
    }

    /// Total uncertainty (trace of the covariance).
    #[inline]
    pub fn uncertainty(&self) -> T {
        self.covariance.trace()
    }
}

/// A live track: the estimate plus the timestamp it is valid at.
#[derive(Debug, Clone)]
struct Track<T: RealField> {
    state: TrackState<T>,
    timestamp_us: i64,
}

/// Prediction intermediate: the predicted estimate together with the
/// propagated sigma points and their weights, consumed by the update step.
#[derive(Debug, Clone)]
struct Predicted<T: RealField> {
    state: TrackState<T>,
    points: Vec<SVector<T, N_STATE>>,
    weights: SigmaWeights<T>,
}

// ============================================================================
// Filter
// ============================================================================

/// Single-target CTRV Unscented Kalman Filter.
///
/// Owns its track exclusively; to track several objects, run one filter
/// instance per object. Each [`process`](CtrvUkf::process) call is a
/// self-contained, deterministic computation.
#[derive(Debug, Clone)]
pub struct CtrvUkf<T: RealField> {
    motion: CtrvModel<T>,
    position_sensor: PositionSensor<T>,
    range_bearing_sensor: RangeBearingSensor<T>,
    use_position_sensor: bool,
    use_range_bearing_sensor: bool,
    track: Option<Track<T>>,
    last_nis: Option<T>,
}

impl<T: RealField + Float + Copy> CtrvUkf<T> {
    /// Creates an uninitialized filter.
    ///
    /// # Panics
    /// Panics if a noise standard deviation or numerical floor in `config`
    /// is out of range (see [`CtrvModel::new`], [`PositionSensor::new`],
    /// [`RangeBearingSensor::new`]).
    pub fn new(config: UkfConfig<T>) -> Self {
        Self {
            motion: CtrvModel::new(config.std_accel, config.std_yaw_accel, config.yaw_rate_floor),
            position_sensor: PositionSensor::new(config.std_position_x, config.std_position_y),
            range_bearing_sensor: RangeBearingSensor::new(
                config.std_range,
                config.std_bearing,
                config.std_range_rate,
                config.range_floor,
            ),
            use_position_sensor: config.use_position_sensor,
            use_range_bearing_sensor: config.use_range_bearing_sensor,
            track: None,
            last_nis: None,
        }
    }

    /// The current estimate, or `None` before the first reading.
    #[inline]
    pub fn track(&self) -> Option<&TrackState<T>> {
        self.track.as_ref().map(|t| &t.state)
    }

    /// Whether the first reading has been processed.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.track.is_some()
    }

    /// Normalized innovation squared of the most recent fused measurement.
    ///
    /// `None` before the first update and after readings whose sensor was
    /// disabled. Under a consistent filter the values are χ²-distributed
    /// with as many degrees of freedom as the measurement has dimensions.
    #[inline]
    pub fn last_nis(&self) -> Option<T> {
        self.last_nis
    }

    /// Consumes one sensor reading.
    ///
    /// The first reading initializes the track and returns without running a
    /// prediction or update. Every later reading predicts over the elapsed
    /// time and then fuses the measurement. Only the prediction is applied
    /// when the reading's sensor kind is disabled, or for a range-bearing
    /// reading whose predicted position sits at the range floor (where the
    /// bearing is undefined).
    ///
    /// # Errors
    /// - [`FilterError::OutOfOrderTimestamp`] if the reading is older than
    ///   the previous one; the track is left unchanged.
    /// - [`FilterError::CovarianceNotPositiveDefinite`] /
    ///   [`FilterError::SingularInnovationCovariance`] on numerical
    ///   divergence; the track is left unchanged, and the caller decides
    ///   whether to rebuild the filter.
    pub fn process(&mut self, reading: &SensorReading<T>) -> Result<()> {
        let Some(track) = self.track.as_ref() else {
            let track = self.initialize(reading);
            debug!(
                "track initialized from {:?} reading at {} us",
                reading.kind(),
                reading.timestamp_us
            );
            self.track = Some(track);
            return Ok(());
        };

        if reading.timestamp_us < track.timestamp_us {
            return Err(FilterError::OutOfOrderTimestamp {
                last: track.timestamp_us,
                got: reading.timestamp_us,
            });
        }
        let dt = T::from_f64(
            (reading.timestamp_us - track.timestamp_us) as f64 / MICROS_PER_SECOND,
        )
        .unwrap();

        let predicted = self.predict(&track.state, dt)?;

        let (state, nis) = match &reading.data {
            SensorData::Position(z) if self.use_position_sensor => {
                let (state, nis) = fuse_measurement(&predicted, &self.position_sensor, z)?;
                (state, Some(nis))
            }
            SensorData::RangeBearing(z) if self.use_range_bearing_sensor => {
                if self
                    .range_bearing_sensor
                    .bearing_observable(predicted.state.mean.as_svector())
                {
                    let (state, nis) =
                        fuse_measurement(&predicted, &self.range_bearing_sensor, z)?;
                    (state, Some(nis))
                } else {
                    warn!("predicted range is at the floor; bearing undefined, applying prediction only");
                    (predicted.state, None)
                }
            }
            _ => {
                warn!(
                    "{:?} sensor disabled; applying prediction only",
                    reading.kind()
                );
                (predicted.state, None)
            }
        };

        trace!(
            "processed {:?} reading at {} us: mean {:?}",
            reading.kind(),
            reading.timestamp_us,
            state.mean
        );

        // Commit only after every step succeeded.
        if let Some(track) = self.track.as_mut() {
            track.state = state;
            track.timestamp_us = reading.timestamp_us;
        }
        self.last_nis = nis;
        Ok(())
    }

    /// Builds the initial track from the first reading.
    ///
    /// A positional reading observes (px, py) directly; a range-bearing
    /// reading is converted from polar, with the speed seeded from the
    /// radial velocity magnitude. Heading and yaw rate are unobservable
    /// from a single reading of either kind, so they start at zero with
    /// large variances.
    fn initialize(&self, reading: &SensorReading<T>) -> Track<T> {
        let zero = T::zero();
        let one = T::one();

        let state = match &reading.data {
            SensorData::Position(z) => {
                let mean = StateVector::from_array([*z.index(0), *z.index(1), zero, zero, zero]);
                let covariance = StateCovariance::from_diagonal(&nalgebra::vector![
                    self.position_sensor.std_x * self.position_sensor.std_x,
                    self.position_sensor.std_y * self.position_sensor.std_y,
                    one,
                    heading_variance::<T>(),
                    one
                ]);
                TrackState::new(mean, covariance)
            }
            SensorData::RangeBearing(z) => {
                let range = *z.index(0);
                let bearing = *z.index(1);
                let range_rate = *z.index(2);

                // The radial velocity component bounds the speed from below;
                // use its magnitude as the initial speed guess.
                let mean = StateVector::from_array([
                    range * Float::cos(bearing),
                    range * Float::sin(bearing),
                    Float::abs(range_rate),
                    zero,
                    zero,
                ]);
                let var_range = self.range_bearing_sensor.std_range * self.range_bearing_sensor.std_range;
                let var_range_rate =
                    self.range_bearing_sensor.std_range_rate * self.range_bearing_sensor.std_range_rate;
                let covariance = StateCovariance::from_diagonal(&nalgebra::vector![
                    var_range,
                    var_range,
                    var_range_rate,
                    heading_variance::<T>(),
                    one
                ]);
                TrackState::new(mean, covariance)
            }
        };

        Track {
            state,
            timestamp_us: reading.timestamp_us,
        }
    }

    /// Prediction step: augmented sigma points pushed through the CTRV
    /// dynamics over `dt` seconds, recombined with heading-aware residuals.
    fn predict(&self, state: &TrackState<T>, dt: T) -> Result<Predicted<T>> {
        let aug_mean = self.motion.augmented_mean(state.mean.as_svector());
        let aug_cov = self.motion.augmented_covariance(state.covariance.as_matrix());

        let sigma = SigmaPoints::<T, N_AUG>::generate(&aug_mean, &aug_cov)?;

        let points: Vec<SVector<T, N_STATE>> = sigma
            .columns
            .iter()
            .map(|column| self.motion.propagate(column, dt))
            .collect();

        let mean = weighted_mean(&points, &sigma.weights, &[YAW]);
        let covariance = weighted_covariance(&points, &mean, &sigma.weights, &[YAW]);

        Ok(Predicted {
            state: TrackState::new(
                StateVector::from_svector(mean),
                StateCovariance::from_matrix(covariance),
            ),
            points,
            weights: sigma.weights,
        })
    }
}

/// Variance assigned to the heading at initialization.
///
/// π²/4 (a standard deviation of 90°) expresses a direction that is entirely
/// unknown while keeping the ±√3·σ sigma perturbations strictly inside
/// (−π, π], so the heading columns of the first prediction do not land on
/// the wrap boundary.
fn heading_variance<T: RealField + Float + Copy>() -> T {
    let half_pi = T::pi() / T::from_f64(2.0).unwrap();
    half_pi * half_pi
}

/// Measurement update, generic over the sensor model.
///
/// Projects the predicted sigma points into measurement space, recombines
/// them into the predicted measurement mean and innovation covariance (plus
/// sensor noise), computes the state/measurement cross correlation and the
/// Kalman gain, and applies the correction. Returns the updated state and
/// the normalized innovation squared.
fn fuse_measurement<T, S, const M: usize>(
    predicted: &Predicted<T>,
    sensor: &S,
    measurement: &Measurement<T, M>,
) -> Result<(TrackState<T>, T)>
where
    T: RealField + Float + Copy,
    S: SensorModel<T, M>,
{
    let projected: Vec<SVector<T, M>> = predicted
        .points
        .iter()
        .map(|point| sensor.project(point))
        .collect();

    let predicted_measurement =
        weighted_mean(&projected, &predicted.weights, S::ANGULAR_COMPONENTS);

    let mut innovation_cov = weighted_covariance(
        &projected,
        &predicted_measurement,
        &predicted.weights,
        S::ANGULAR_COMPONENTS,
    );
    innovation_cov += sensor.noise().into_matrix();

    let cross = weighted_cross_covariance(
        &predicted.points,
        predicted.state.mean.as_svector(),
        &[YAW],
        &projected,
        &predicted_measurement,
        S::ANGULAR_COMPONENTS,
        &predicted.weights,
    );

    let innovation_cov_inv = innovation_cov
        .try_inverse()
        .ok_or(FilterError::SingularInnovationCovariance)?;
    let gain = cross * innovation_cov_inv;

    let mut residual = measurement.as_svector() - predicted_measurement;
    for &i in S::ANGULAR_COMPONENTS {
        residual[i] = wrap_angle(residual[i]);
    }

    let nis = (residual.transpose() * innovation_cov_inv * residual)[(0, 0)];

    let mean = predicted.state.mean.as_svector() + gain * residual;
    let covariance =
        predicted.state.covariance.as_matrix() - gain * innovation_cov * gain.transpose();

    // The subtraction can leave the result asymmetric in the last ulps and,
    // under strong nonlinearity, indefinite. Symmetrize and verify the square
    // root still exists before anything is committed.
    let half = T::from_f64(0.5).unwrap();
    let covariance = (covariance + covariance.transpose()) * half;
    if nalgebra::Cholesky::new(covariance).is_none() {
        return Err(FilterError::CovarianceNotPositiveDefinite);
    }

    Ok((
        TrackState::new(
            StateVector::from_svector(mean),
            StateCovariance::from_matrix(covariance),
        ),
        nis,
    ))
}
