//! Sensor models
//!
//! Two sensors observe the target: a Cartesian positional sensor (lidar-like)
//! and a polar range-bearing sensor (radar-like). Both are expressed through
//! the [`SensorModel`] trait so the filter's update step is a single routine
//! parameterized by the model, not two duplicated code paths.

use nalgebra::{RealField, SVector};
use num_traits::Float;

use crate::models::SensorModel;
use crate::types::spaces::{MeasurementCovariance, N_STATE};

/// Cartesian positional sensor.
///
/// Observes (px, py) directly from the state; the projection is linear and
/// has no angular components.
#[derive(Debug, Clone)]
pub struct PositionSensor<T: RealField> {
    /// X position noise standard deviation (m)
    pub std_x: T,
    /// Y position noise standard deviation (m)
    pub std_y: T,
}

impl<T: RealField + Float + Copy> PositionSensor<T> {
    /// Creates a positional sensor model.
    ///
    /// # Panics
    /// Panics if a noise standard deviation is not positive.
    pub fn new(std_x: T, std_y: T) -> Self {
        assert!(std_x > T::zero(), "Measurement noise std_x must be positive");
        assert!(std_y > T::zero(), "Measurement noise std_y must be positive");
        Self { std_x, std_y }
    }
}

impl<T: RealField + Float + Copy> SensorModel<T, 2> for PositionSensor<T> {
    const ANGULAR_COMPONENTS: &'static [usize] = &[];

    fn project(&self, state: &SVector<T, N_STATE>) -> SVector<T, 2> {
        SVector::from([state[0], state[1]])
    }

    fn noise(&self) -> MeasurementCovariance<T, 2> {
        MeasurementCovariance::from_stds([self.std_x, self.std_y])
    }
}

/// Polar range-bearing sensor.
///
/// Observes (range, bearing, range-rate). The projection is nonlinear, and
/// the bearing component wraps modulo 2π. Near the origin both the bearing
/// and the range-rate are degenerate, so the range is floored at
/// `range_floor` before dividing.
#[derive(Debug, Clone)]
pub struct RangeBearingSensor<T: RealField> {
    /// Range noise standard deviation (m)
    pub std_range: T,
    /// Bearing noise standard deviation (rad)
    pub std_bearing: T,
    /// Range-rate noise standard deviation (m/s)
    pub std_range_rate: T,
    /// Floor applied to the range before it is used as a divisor (m).
    pub range_floor: T,
}

impl<T: RealField + Float + Copy> RangeBearingSensor<T> {
    /// Creates a range-bearing sensor model.
    ///
    /// # Panics
    /// Panics if a noise standard deviation or the range floor is not
    /// positive.
    pub fn new(std_range: T, std_bearing: T, std_range_rate: T, range_floor: T) -> Self {
        assert!(
            std_range > T::zero(),
            "Measurement noise std_range must be positive"
        );
        assert!(
            std_bearing > T::zero(),
            "Measurement noise std_bearing must be positive"
        );
        assert!(
            std_range_rate > T::zero(),
            "Measurement noise std_range_rate must be positive"
        );
        assert!(range_floor > T::zero(), "Range floor must be positive");
        Self {
            std_range,
            std_bearing,
            std_range_rate,
            range_floor,
        }
    }
}

impl<T: RealField + Float + Copy> RangeBearingSensor<T> {
    /// Whether the bearing is observable from this predicted state.
    ///
    /// A predicted position at the range floor has no defined bearing, so a
    /// polar measurement cannot be fused against it.
    pub fn bearing_observable(&self, state: &SVector<T, N_STATE>) -> bool {
        Float::hypot(state[0], state[1]) > self.range_floor
    }
}

impl<T: RealField + Float + Copy> SensorModel<T, 3> for RangeBearingSensor<T> {
    // Bearing is the angular component.
    const ANGULAR_COMPONENTS: &'static [usize] = &[1];

    fn project(&self, state: &SVector<T, N_STATE>) -> SVector<T, 3> {
        let px = state[0];
        let py = state[1];
        let v = state[2];
        let yaw = state[3];

        let range = Float::max(
            Float::sqrt(px * px + py * py),
            self.range_floor,
        );
        let bearing = Float::atan2(py, px);
        let range_rate = (px * v * Float::cos(yaw) + py * v * Float::sin(yaw)) / range;

        SVector::from([range, bearing, range_rate])
    }

    fn noise(&self) -> MeasurementCovariance<T, 3> {
        MeasurementCovariance::from_stds([self.std_range, self.std_bearing, self.std_range_rate])
    }
}
