//! Initial parameter layouts for new models.
//!
//! - Ergodic: every state reachable from every other; the chain starts in
//!   state 0 and each transition row is uniform.
//! - Forward (left-to-right): the chain starts in state 0 and may only stay
//!   or move up to `reach - 1` states ahead. Transitions outside that band
//!   are `-∞` and stay `-∞` under Baum-Welch.
use std::str::FromStr;

use ndarray::{Array1, Array2};

use crate::markov::errors::{HMMError, HMMResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    Ergodic,
    Forward,
}

impl FromStr for TopologyKind {
    type Err = HMMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ergodic" => Ok(TopologyKind::Ergodic),
            "forward" | "left-to-right" => Ok(TopologyKind::Forward),
            _ => Err(HMMError::InvalidOptionName { option: "topology", name: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    kind: TopologyKind,
    states: usize,
    reach: usize,
}

impl Topology {
    /// `reach` is ignored for ergodic layouts; `None` means `states` for
    /// forward layouts.
    ///
    /// # Errors
    /// - [`HMMError::NoStates`] for `states == 0`.
    /// - [`HMMError::InvalidTopology`] for a forward reach of zero.
    pub fn new(kind: TopologyKind, states: usize, reach: Option<usize>) -> HMMResult<Self> {
        if states == 0 {
            return Err(HMMError::NoStates);
        }
        let reach = match kind {
            TopologyKind::Ergodic => states,
            TopologyKind::Forward => reach.unwrap_or(states),
        };
        if reach == 0 {
            return Err(HMMError::InvalidTopology { reason: "forward reach must be at least 1" });
        }
        Ok(Self { kind, states, reach: reach.min(states) })
    }

    pub fn ergodic(states: usize) -> HMMResult<Self> {
        Self::new(TopologyKind::Ergodic, states, None)
    }

    pub fn forward(states: usize, reach: usize) -> HMMResult<Self> {
        Self::new(TopologyKind::Forward, states, Some(reach))
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn log_initial(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.states, |i| if i == 0 { 0.0 } else { f64::NEG_INFINITY })
    }

    pub fn log_transitions(&self) -> Array2<f64> {
        let n = self.states;
        match self.kind {
            TopologyKind::Ergodic => Array2::from_elem((n, n), -(n as f64).ln()),
            TopologyKind::Forward => Array2::from_shape_fn((n, n), |(i, j)| {
                let end = (i + self.reach).min(n);
                if (i..end).contains(&j) { -((end - i) as f64).ln() } else { f64::NEG_INFINITY }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Shapes and band structure of the two layouts, and name parsing.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ergodic rows are uniform and the chain starts in state 0.
    //
    // Given
    // -----
    // - Four states.
    //
    // Expect
    // ------
    // - Every transition equals 1/4; initial is (1, 0, 0, 0).
    fn ergodic_is_uniform() {
        let t = Topology::ergodic(4).unwrap();
        assert!(t.log_transitions().iter().all(|&v| (v.exp() - 0.25).abs() < 1e-12));
        let init = t.log_initial().mapv(f64::exp);
        assert_eq!(init.to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // Forward rows only cover the band `i..i+reach`, truncated at the end.
    //
    // Given
    // -----
    // - Four states, reach 2.
    //
    // Expect
    // ------
    // - Row 0 = (½, ½, 0, 0); row 3 = (0, 0, 0, 1).
    fn forward_band_is_truncated() {
        // Arrange
        let t = Topology::forward(4, 2).unwrap();

        // Act
        let a = t.log_transitions().mapv(f64::exp);

        // Assert
        assert_eq!(a.row(0).to_vec(), vec![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(a.row(3).to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Invalid sizes and names are rejected.
    //
    // Given
    // -----
    // - Zero states; reach 0; the name "circular".
    //
    // Expect
    // ------
    // - `NoStates`, `InvalidTopology`, `InvalidOptionName`.
    fn invalid_layouts_are_rejected() {
        assert_eq!(Topology::ergodic(0), Err(HMMError::NoStates));
        assert!(matches!(Topology::forward(3, 0), Err(HMMError::InvalidTopology { .. })));
        assert!(matches!(
            "circular".parse::<TopologyKind>(),
            Err(HMMError::InvalidOptionName { .. })
        ));
        assert_eq!("Forward".parse(), Ok(TopologyKind::Forward));
    }
}
