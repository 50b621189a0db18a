//! Settings and result types for the root search.

use crate::error::{PzError, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tunable constants of the search. The defaults are empirically tuned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Outer iterations allowed without confirming a new root.
    pub max_iterations: usize,
    /// Numerical aberrations tolerated before the search gives up. Stalls are
    /// limited by the same count.
    pub max_aberrations: usize,
    /// The search stops once `high_guess - low_guess` exceeds this spread.
    pub guess_spread_limit: f64,
    /// Factor by which real-axis guesses grow outward.
    pub guess_growth: f64,
    pub root_abs_tol: f64,
    pub root_rel_tol: f64,
    pub trial_abs_tol: f64,
    pub trial_rel_tol: f64,
    /// Binary orders beyond which the smaller operand of a scaled sum is dropped.
    pub discard_orders: i32,
    /// Binary orders by which bracket differences must trail the values to count as flat.
    pub flat_orders: i32,
    /// Times a duplicate candidate is nudged before it is treated as converged.
    pub max_shifts: usize,
    /// Identical trapped moves tolerated before the bracket is split.
    pub consecutive_move_limit: usize,
    /// Imaginary offset used to bootstrap Muller iteration from a real minimum.
    pub complex_guess_near: f64,
    /// Imaginary offset used when a wider bracket already exists.
    pub complex_guess_far: f64,
    /// Binary orders a trial may exceed its sign-change bracket by before it is an aberration.
    pub aberration_spike_orders: i32,
    /// The symmetric fit degrades to a secant when `|a| * span <= ratio * |b|`.
    pub linear_fallback_ratio: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_aberrations: 3,
            guess_spread_limit: 1e35,
            guess_growth: 10.0,
            root_abs_tol: 1e-5,
            root_rel_tol: 1e-6,
            trial_abs_tol: 1e-20,
            trial_rel_tol: 1e-12,
            discard_orders: 50,
            flat_orders: 10,
            max_shifts: 3,
            consecutive_move_limit: 3,
            complex_guess_near: 1e8,
            complex_guess_far: 1e12,
            aberration_spike_orders: 10,
            linear_fallback_ratio: 1e-10,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PzError::invalid_settings("max_iterations must be greater than zero."));
        }
        if self.max_aberrations == 0 {
            return Err(PzError::invalid_settings("max_aberrations must be greater than zero."));
        }
        if !(self.guess_spread_limit > 0.0) {
            return Err(PzError::invalid_settings("guess_spread_limit must be positive."));
        }
        if !(self.guess_growth > 1.0) {
            return Err(PzError::invalid_settings("guess_growth must exceed 1."));
        }
        for (name, value) in [
            ("root_abs_tol", self.root_abs_tol),
            ("root_rel_tol", self.root_rel_tol),
            ("trial_abs_tol", self.trial_abs_tol),
            ("trial_rel_tol", self.trial_rel_tol),
            ("complex_guess_near", self.complex_guess_near),
            ("complex_guess_far", self.complex_guess_far),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(PzError::invalid_settings(format!(
                    "{name} must be positive and finite."
                )));
            }
        }
        if self.discard_orders <= 0 || self.flat_orders <= 0 {
            return Err(PzError::invalid_settings(
                "discard_orders and flat_orders must be positive.",
            ));
        }
        if self.consecutive_move_limit == 0 {
            return Err(PzError::invalid_settings(
                "consecutive_move_limit must be greater than zero.",
            ));
        }
        if self.linear_fallback_ratio < 0.0 {
            return Err(PzError::invalid_settings(
                "linear_fallback_ratio must not be negative.",
            ));
        }
        Ok(())
    }
}

/// How a single pole or zero search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    Ok,
    /// Every sample was a root; the transfer function looks shorted and results were discarded.
    ShortedInput,
    /// The search kept converging onto points that are not roots.
    Singular,
    AberrationLimitReached,
    IterationLimitReached,
    Cancelled,
}

impl SearchStatus {
    pub fn is_ok(self) -> bool {
        self == SearchStatus::Ok
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchStatus::Ok => "ok",
            SearchStatus::ShortedInput => "input shorted",
            SearchStatus::Singular => "singular",
            SearchStatus::AberrationLimitReached => "aberration limit reached",
            SearchStatus::IterationLimitReached => "iteration limit reached",
            SearchStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Which root set a search is looking for. Only used for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    Poles,
    Zeros,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::Poles => f.write_str("pole"),
            SearchKind::Zeros => f.write_str("zero"),
        }
    }
}

/// A confirmed root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub value: Complex64,
    pub multiplicity: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub trials: usize,
    pub iterations: usize,
    pub aberrations: usize,
    pub stalls: usize,
    pub flat_samples: usize,
    /// Roots counted with multiplicity, conjugates included.
    pub roots_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSearchOutcome {
    /// Ascending by real part, then imaginary part. Complex roots appear with their conjugate.
    pub roots: Vec<Root>,
    pub status: SearchStatus,
    pub stats: SearchStats,
}

impl RootSearchOutcome {
    /// Number of roots, counted with multiplicity.
    pub fn root_count(&self) -> usize {
        self.roots.iter().map(|root| root.multiplicity).sum()
    }
}
