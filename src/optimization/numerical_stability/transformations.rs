//! Softplus reparameterization for strictly positive parameters.
//!
//! Both directions switch to the identity above `x = 20`, where
//! `ln(1 + e^x)` and `ln(e^x - 1)` agree with `x` to machine precision and
//! the naive forms would overflow.

/// Cutoff above which softplus and its inverse are the identity.
const SOFTPLUS_LINEAR_CUTOFF: f64 = 20.0;

/// `ln(1 + exp(x))`, mapping ℝ onto (0, ∞).
pub fn safe_softplus(x: f64) -> f64 {
    if x > SOFTPLUS_LINEAR_CUTOFF { x } else { x.exp().ln_1p() }
}

/// Inverse of [`safe_softplus`] on (0, ∞): `ln(exp(x) - 1)`.
///
/// `x` must be finite and `> 0`; zero maps to `-∞`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > SOFTPLUS_LINEAR_CUTOFF { x } else { x.exp_m1().ln() }
}
