//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid gives [-pi, pi), move the lower bound onto +pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Wrap an angle into the range `[0, 2pi)`.
pub fn wrap_2pi<T>(angle: T) -> T
where
    T: Float,
{
    let tau_t = T::from(std::f64::consts::TAU).unwrap_or_else(T::zero);
    let wrapped = rem_euclid(angle, tau_t);

    if wrapped >= tau_t {
        wrapped - tau_t
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `from` to `to`, in `(-pi, pi]`.
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_pi(to - from)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{PI, TAU};

    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(3.0 * PI - 0.5) - (PI - 0.5)).abs() < 1e-9);
        assert!((wrap_pi(TAU + 1.0) - 1.0).abs() < EPS);
        assert!((wrap_pi(-TAU - 1.0) + 1.0).abs() < EPS);
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < EPS);
    }

    #[test]
    fn test_wrap_2pi() {
        assert!((wrap_2pi(-1f64) - (TAU - 1.0)).abs() < EPS);
        assert!((wrap_2pi(TAU)).abs() < EPS);
        assert!((wrap_2pi(1f64) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_ang_dist() {
        assert!((ang_dist(1f64, 2f64) - 1.0).abs() < EPS);
        assert!((ang_dist(2f64, 1f64) + 1.0).abs() < EPS);
        assert!((ang_dist(0.1f64, TAU - 0.1) + 0.2).abs() < EPS);
        assert!((ang_dist(TAU - 0.1, 0.1f64) - 0.2).abs() < EPS);
    }
}
