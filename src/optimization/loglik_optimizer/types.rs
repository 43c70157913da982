//! Numeric aliases shared by the optimizer modules.
//!
//! Parameters and gradients are `ndarray` vectors over `f64`; the cost is the
//! negated log-likelihood. The L-BFGS aliases pin argmin's generics to these
//! shapes so the rest of the crate never spells them out.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Unconstrained parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient with the same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// argmin's function-evaluation counters, keyed by counter name.
pub type FnEvalMap = HashMap<String, u64>;

/// L-BFGS history size used when `MLEOptions::lbfgs_mem` is `None`.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
