//! CTRV motion model ("constant turn rate and velocity")
//!
//! State: [px, py, v, yaw, yaw rate]. Between updates the target is assumed
//! to hold its speed and yaw rate, so it travels along a circular arc; with
//! the yaw rate at zero the arc degenerates to a straight line and the exact
//! integral has a removable singularity (division by the yaw rate).
//!
//! For the unscented prediction step the state is augmented with the two
//! zero-mean process-noise terms (longitudinal acceleration and yaw
//! acceleration), so that the nonlinear noise coupling is carried through
//! the sigma points rather than added as a linearized Q matrix.

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::types::spaces::{N_AUG, N_STATE};

/// Index of the heading (yaw) component within the state vector.
pub const YAW: usize = 3;

/// CTRV motion model with augmented-state process noise.
#[derive(Debug, Clone)]
pub struct CtrvModel<T: RealField> {
    /// Longitudinal acceleration noise standard deviation (m/s²)
    pub std_accel: T,
    /// Yaw acceleration noise standard deviation (rad/s²)
    pub std_yaw_accel: T,
    /// Yaw rates with magnitude below this floor take the straight-line
    /// branch of the propagation (rad/s).
    pub yaw_rate_floor: T,
}

impl<T: RealField + Float + Copy> CtrvModel<T> {
    /// Creates a CTRV model.
    ///
    /// # Arguments
    /// - `std_accel`: longitudinal acceleration noise std dev (must be >= 0)
    /// - `std_yaw_accel`: yaw acceleration noise std dev (must be >= 0)
    /// - `yaw_rate_floor`: threshold below which the straight-line branch is
    ///   taken (must be > 0)
    ///
    /// # Panics
    /// Panics if a noise parameter is negative or the floor is not positive.
    pub fn new(std_accel: T, std_yaw_accel: T, yaw_rate_floor: T) -> Self {
        assert!(
            std_accel >= T::zero(),
            "Process noise std_accel must be non-negative"
        );
        assert!(
            std_yaw_accel >= T::zero(),
            "Process noise std_yaw_accel must be non-negative"
        );
        assert!(
            yaw_rate_floor > T::zero(),
            "Yaw rate floor must be positive"
        );
        Self {
            std_accel,
            std_yaw_accel,
            yaw_rate_floor,
        }
    }

    /// Extends a state mean with the two zero-mean noise dimensions.
    pub fn augmented_mean(&self, mean: &SVector<T, N_STATE>) -> SVector<T, N_AUG> {
        let mut aug = SVector::<T, N_AUG>::zeros();
        aug.fixed_rows_mut::<N_STATE>(0).copy_from(mean);
        aug
    }

    /// Builds the block-diagonal augmented covariance: the state covariance
    /// in the top-left corner and the diagonal process-noise variances in the
    /// bottom-right.
    pub fn augmented_covariance(
        &self,
        covariance: &SMatrix<T, N_STATE, N_STATE>,
    ) -> SMatrix<T, N_AUG, N_AUG> {
        let mut aug = SMatrix::<T, N_AUG, N_AUG>::zeros();
        aug.fixed_view_mut::<N_STATE, N_STATE>(0, 0)
            .copy_from(covariance);
        aug[(5, 5)] = self.std_accel * self.std_accel;
        aug[(6, 6)] = self.std_yaw_accel * self.std_yaw_accel;
        aug
    }

    /// Propagates one augmented sigma column through the CTRV dynamics over
    /// `dt` seconds, returning the 5-dimensional state-space column.
    ///
    /// Each column is propagated independently; columns do not interact.
    ///
    /// # Panics
    /// Panics if `dt < 0`.
    pub fn propagate(&self, column: &SVector<T, N_AUG>, dt: T) -> SVector<T, N_STATE> {
        assert!(dt >= T::zero(), "Time step dt must be non-negative");

        let px = column[0];
        let py = column[1];
        let v = column[2];
        let yaw = column[3];
        let yaw_rate = column[4];
        let nu_accel = column[5];
        let nu_yaw_accel = column[6];

        let sin_yaw = Float::sin(yaw);
        let cos_yaw = Float::cos(yaw);

        let (dx, dy) = if Float::abs(yaw_rate) < self.yaw_rate_floor {
            // Straight-line limit of the arc integral.
            (v * cos_yaw * dt, v * sin_yaw * dt)
        } else {
            let yaw_next = yaw + yaw_rate * dt;
            let v_over_rate = v / yaw_rate;
            (
                v_over_rate * (Float::sin(yaw_next) - sin_yaw),
                v_over_rate * (cos_yaw - Float::cos(yaw_next)),
            )
        };

        let half = T::from_f64(0.5).unwrap();
        let dt_sq = dt * dt;

        SVector::from([
            px + dx + half * dt_sq * cos_yaw * nu_accel,
            py + dy + half * dt_sq * sin_yaw * nu_accel,
            v + dt * nu_accel,
            yaw + yaw_rate * dt + half * dt_sq * nu_yaw_accel,
            yaw_rate + dt * nu_yaw_accel,
        ])
    }
}
