//! Sigma-point generation and weighted recombination
//!
//! The unscented transform represents a Gaussian by 2n+1 deterministic
//! sample vectors ("sigma points") whose weighted mean and covariance match
//! the distribution exactly. Pushing the points through a nonlinear function
//! and recombining them approximates how the function transforms the
//! distribution, without computing Jacobians.
//!
//! # Sigma Point Selection
//!
//! This implementation uses the symmetric selection with λ = 3 − n:
//! - χ₀ = μ
//! - χᵢ = μ + √(λ+n)·Lᵢ for i = 1...n
//! - χᵢ₊ₙ = μ − √(λ+n)·Lᵢ for i = 1...n
//!
//! where L is the lower Cholesky factor of the covariance. λ = 3 − n matches
//! the fourth moment of a Gaussian prior. The ordering (center, then the
//! plus block, then the minus block) is an invariant: weights are tied to
//! columns by index.

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::types::angles::wrap_angle;
use crate::{FilterError, Result};

// ============================================================================
// Weights
// ============================================================================

/// Combination weights for recombining sigma points.
///
/// The center column gets λ/(λ+n) (negative whenever n > 3); every other
/// column gets 1/(2(λ+n)). The weights sum to 1 by construction of the
/// formulas, not by normalization.
#[derive(Debug, Clone, Copy)]
pub struct SigmaWeights<T: RealField> {
    /// Weight of the center column (index 0).
    pub center: T,
    /// Weight of every perturbed column.
    pub side: T,
}

impl<T: RealField + Float + Copy> SigmaWeights<T> {
    /// Computes the weights for a state of dimension `n` with λ = 3 − n.
    ///
    /// Must be recomputed whenever the dimension changes; the base and
    /// augmented states use different weights.
    pub fn for_dimension(n: usize) -> Self {
        let n_t = T::from_usize(n).unwrap();
        let lambda = T::from_f64(3.0).unwrap() - n_t;
        let denom = lambda + n_t;
        Self {
            center: lambda / denom,
            side: T::from_f64(0.5).unwrap() / denom,
        }
    }

    /// Weight of the column at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        if index == 0 {
            self.center
        } else {
            self.side
        }
    }
}

// ============================================================================
// Sigma Points
// ============================================================================

/// A set of 2N+1 sigma points with their combination weights.
#[derive(Debug, Clone)]
pub struct SigmaPoints<T: RealField, const N: usize> {
    /// Columns in invariant order: center, plus block, minus block.
    pub columns: Vec<SVector<T, N>>,
    /// Weights tied to the columns by index.
    pub weights: SigmaWeights<T>,
}

impl<T: RealField + Float + Copy, const N: usize> SigmaPoints<T, N> {
    /// Generates sigma points for the given mean and covariance.
    ///
    /// # Errors
    /// [`FilterError::CovarianceNotPositiveDefinite`] if the Cholesky
    /// decomposition fails. No fallback is substituted: a covariance without
    /// a square root means the filter has diverged.
    pub fn generate(mean: &SVector<T, N>, covariance: &SMatrix<T, N, N>) -> Result<Self> {
        let weights = SigmaWeights::for_dimension(N);

        let sqrt_cov = nalgebra::Cholesky::new(*covariance)
            .ok_or(FilterError::CovarianceNotPositiveDefinite)?
            .l();

        // lambda + n = 3 for the lambda = 3 - n choice
        let spread = Float::sqrt(T::from_f64(3.0).unwrap());

        let mut columns = Vec::with_capacity(2 * N + 1);
        columns.push(*mean);
        for i in 0..N {
            columns.push(mean + sqrt_cov.column(i) * spread);
        }
        for i in 0..N {
            columns.push(mean - sqrt_cov.column(i) * spread);
        }

        Ok(Self { columns, weights })
    }
}

// ============================================================================
// Recombination
// ============================================================================

/// Weighted mean of transformed sigma points.
///
/// Angular components (by index) cannot be averaged linearly: two bearings
/// straddling the ±π boundary would average to the opposite direction. For
/// those components the mean is taken over deviations wrapped relative to
/// the center point, then wrapped back into (−π, π]. Away from the boundary
/// this is identical to the linear mean.
pub fn weighted_mean<T: RealField + Float + Copy, const D: usize>(
    points: &[SVector<T, D>],
    weights: &SigmaWeights<T>,
    angular: &[usize],
) -> SVector<T, D> {
    let mut mean = points[0] * weights.center;
    for point in points.iter().skip(1) {
        mean += point * weights.side;
    }
    for &i in angular {
        let reference = points[0][i];
        let mut deviation = T::zero();
        for (k, point) in points.iter().enumerate() {
            deviation += weights.get(k) * wrap_angle(point[i] - reference);
        }
        mean[i] = wrap_angle(reference + deviation);
    }
    mean
}

/// Weighted covariance of transformed sigma points about `mean`.
///
/// Angular components of each deviation are wrapped into (−π, π] before the
/// outer product; without this, points straddling the ±π boundary register
/// as ~2π apart and the covariance blows up.
pub fn weighted_covariance<T: RealField + Float + Copy, const D: usize>(
    points: &[SVector<T, D>],
    mean: &SVector<T, D>,
    weights: &SigmaWeights<T>,
    angular: &[usize],
) -> SMatrix<T, D, D> {
    let mut covariance = SMatrix::<T, D, D>::zeros();
    for (i, point) in points.iter().enumerate() {
        let deviation = wrapped_deviation(point, mean, angular);
        covariance += deviation * deviation.transpose() * weights.get(i);
    }
    covariance
}

/// Weighted cross-correlation between state-space and measurement-space
/// deviations, with angle wrapping applied on both sides.
pub fn weighted_cross_covariance<T: RealField + Float + Copy, const N: usize, const M: usize>(
    state_points: &[SVector<T, N>],
    state_mean: &SVector<T, N>,
    state_angular: &[usize],
    measurement_points: &[SVector<T, M>],
    measurement_mean: &SVector<T, M>,
    measurement_angular: &[usize],
    weights: &SigmaWeights<T>,
) -> SMatrix<T, N, M> {
    let mut cross = SMatrix::<T, N, M>::zeros();
    for (i, (x, z)) in state_points.iter().zip(measurement_points).enumerate() {
        let dx = wrapped_deviation(x, state_mean, state_angular);
        let dz = wrapped_deviation(z, measurement_mean, measurement_angular);
        cross += dx * dz.transpose() * weights.get(i);
    }
    cross
}

fn wrapped_deviation<T: RealField + Float + Copy, const D: usize>(
    point: &SVector<T, D>,
    mean: &SVector<T, D>,
    angular: &[usize],
) -> SVector<T, D> {
    let mut deviation = point - mean;
    for &i in angular {
        deviation[i] = wrap_angle(deviation[i]);
    }
    deviation
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{matrix, vector};
    use std::f64::consts::PI;

    #[test]
    fn test_weights_sum_to_one() {
        for n in [5usize, 7] {
            let w: SigmaWeights<f64> = SigmaWeights::for_dimension(n);
            let sum = w.center + 2.0 * n as f64 * w.side;
            assert!((sum - 1.0).abs() < 1e-12, "n = {}: weights sum {}", n, sum);
        }
    }

    #[test]
    fn test_center_weight_negative_above_three() {
        let w: SigmaWeights<f64> = SigmaWeights::for_dimension(7);
        assert!(w.center < 0.0);
        assert!(w.side > 0.0);
    }

    #[test]
    fn test_column_ordering() {
        let mean = vector![1.0, 2.0];
        let cov = matrix![4.0, 0.0; 0.0, 9.0];
        let sigma = SigmaPoints::generate(&mean, &cov).unwrap();

        assert_eq!(sigma.columns.len(), 5);
        // Center first.
        assert!((sigma.columns[0] - mean).norm() < 1e-12);
        // Plus block before minus block, per Cholesky column.
        let spread = 3.0_f64.sqrt();
        assert!((sigma.columns[1][0] - (1.0 + 2.0 * spread)).abs() < 1e-12);
        assert!((sigma.columns[2][1] - (2.0 + 3.0 * spread)).abs() < 1e-12);
        assert!((sigma.columns[3][0] - (1.0 - 2.0 * spread)).abs() < 1e-12);
        assert!((sigma.columns[4][1] - (2.0 - 3.0 * spread)).abs() < 1e-12);
    }

    #[test]
    fn test_recombination_reproduces_moments() {
        // Recombining untransformed points must give back the original mean
        // and covariance to floating-point tolerance.
        let mean = vector![1.0, -2.0, 0.5];
        let cov = matrix![
            2.0, 0.3, 0.0;
            0.3, 1.5, -0.2;
            0.0, -0.2, 0.8
        ];
        let sigma = SigmaPoints::generate(&mean, &cov).unwrap();

        let m = weighted_mean(&sigma.columns, &sigma.weights, &[]);
        assert!((m - mean).norm() < 1e-10, "mean error {}", (m - mean).norm());

        let p = weighted_covariance(&sigma.columns, &m, &sigma.weights, &[]);
        assert!((p - cov).norm() < 1e-9, "cov error {}", (p - cov).norm());
    }

    #[test]
    fn test_generate_rejects_indefinite_covariance() {
        let mean = vector![0.0, 0.0];
        let cov = matrix![1.0, 2.0; 2.0, 1.0]; // eigenvalues 3 and -1
        let err = SigmaPoints::<f64, 2>::generate(&mean, &cov).unwrap_err();
        assert_eq!(err, FilterError::CovarianceNotPositiveDefinite);
    }

    #[test]
    fn test_angular_mean_crosses_pi_boundary() {
        // Points clustered around the pi boundary: the linear average of
        // +3.13 and -3.13 is 0 (the opposite direction); the circular mean
        // must stay near pi.
        let points = vec![vector![3.10], vector![3.13], vector![-3.13]];
        let weights = SigmaWeights {
            center: 1.0 / 3.0,
            side: 1.0 / 3.0,
        };

        let mean = weighted_mean(&points, &weights, &[0]);
        assert!(
            mean[0].abs() > 3.0,
            "circular mean {} landed on the wrong side of the circle",
            mean[0]
        );
    }

    #[test]
    fn test_angular_mean_matches_linear_away_from_boundary() {
        let points = vec![vector![0.4], vector![0.6], vector![0.2]];
        let weights = SigmaWeights {
            center: 1.0 / 3.0,
            side: 1.0 / 3.0,
        };

        let circular = weighted_mean(&points, &weights, &[0]);
        let linear = weighted_mean(&points, &weights, &[]);
        assert!((circular[0] - linear[0]).abs() < 1e-12);
    }

    #[test]
    fn test_angular_deviation_wraps() {
        // Two points on either side of the pi boundary: naive covariance
        // would see a ~2pi spread, wrapped covariance a tiny one.
        let points = vec![
            vector![PI - 0.01],
            vector![-PI + 0.01],
            vector![PI - 0.02],
        ];
        let weights = SigmaWeights {
            center: 1.0 / 3.0,
            side: 1.0 / 3.0,
        };
        let mean = vector![PI - 0.005];

        let wrapped = weighted_covariance(&points, &mean, &weights, &[0]);
        let naive = weighted_covariance(&points, &mean, &weights, &[]);

        assert!(wrapped[(0, 0)] < 1e-3, "wrapped variance {}", wrapped[(0, 0)]);
        assert!(naive[(0, 0)] > 1.0, "naive variance {}", naive[(0, 0)]);
    }
}
