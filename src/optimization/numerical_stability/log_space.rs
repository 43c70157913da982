//! Log-domain arithmetic.
//!
//! Probabilities are carried as natural logarithms so that long products
//! never underflow. `-∞` is the log of probability zero and is a legal input
//! everywhere: `log_sum_exp(-∞, x) = x` and the log-sum of nothing is `-∞`.
//! NaN propagates.
use ndarray::{ArrayView1, ArrayViewMut1};

/// `ln(exp(a) + exp(b))` without leaving log space.
///
/// Computed as `max + ln_1p(exp(min - max))`, which is exact to rounding for
/// any finite pair and total over `-∞`.
#[inline]
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    if hi == f64::INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}

/// `ln Σ exp(xᵢ)` over a slice, shifting by the maximum once.
///
/// Returns `-∞` for an empty slice or when every entry is `-∞`.
pub fn log_sum_exp_slice(xs: &[f64]) -> f64 {
    log_sum_exp_iter(xs.iter().copied())
}

/// `ln Σ exp(xᵢ)` over an `ndarray` view (rows or strided columns).
pub fn log_sum_exp_view(xs: ArrayView1<'_, f64>) -> f64 {
    let max = xs.fold(f64::NEG_INFINITY, |m, &x| if x > m || x.is_nan() { x } else { m });
    if max.is_nan() || max == f64::NEG_INFINITY || max == f64::INFINITY {
        return max;
    }
    max + xs.fold(0.0, |acc, &x| acc + (x - max).exp()).ln()
}

/// Streaming `ln Σ exp(xᵢ)` for iterators that can only be walked once.
pub fn log_sum_exp_iter<I: IntoIterator<Item = f64>>(xs: I) -> f64 {
    xs.into_iter().fold(f64::NEG_INFINITY, log_sum_exp)
}

/// Shift a log-weight vector so it sums to one in probability space.
///
/// Returns the normalizer that was subtracted. A vector that is entirely
/// `-∞` is left untouched and `-∞` is returned; the caller decides how to
/// treat an impossible row.
pub fn log_normalize(mut xs: ArrayViewMut1<'_, f64>) -> f64 {
    let norm = log_sum_exp_view(xs.view());
    if norm.is_finite() {
        xs.mapv_inplace(|x| x - norm);
    }
    norm
}

/// `ln(p)` with `ln(0) = -∞`; negative inputs yield NaN.
#[inline]
pub fn safe_ln(p: f64) -> f64 {
    if p == 0.0 { f64::NEG_INFINITY } else { p.ln() }
}
