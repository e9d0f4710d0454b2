//! Angle normalization
//!
//! Headings and bearings are signed angles in radians and wrap modulo 2π.
//! Every residual with an angular component must be reduced into (−π, π]
//! before it enters an outer product or a state correction; otherwise a pair
//! of headings straddling the ±π boundary produces a spurious ~2π residual
//! and the covariance blows up.

use nalgebra::RealField;
use num_traits::Float;

/// Reduces an angle into the half-open interval (−π, π].
///
/// Closed-form reduction: `a − 2π·⌈(a − π) / 2π⌉`. Unlike the textbook
/// add-or-subtract-2π loop this is constant-time for arbitrarily large
/// inputs, and it is idempotent: wrapping an already-wrapped angle returns
/// it unchanged.
///
/// Note that −π wraps to +π, so the result is unique for every direction.
#[inline]
pub fn wrap_angle<T: RealField + Float + Copy>(angle: T) -> T {
    let pi = T::pi();
    let two_pi = pi + pi;
    angle - two_pi * Float::ceil((angle - pi) / two_pi)
}

/// Difference `a − b` reduced into (−π, π].
#[inline]
pub fn angle_difference<T: RealField + Float + Copy>(a: T, b: T) -> T {
    wrap_angle(a - b)
}
