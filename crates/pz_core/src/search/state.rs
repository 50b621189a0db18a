use super::repository::{Direction, TrialId};
use crate::scaled::ScaledReal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign or magnitude pattern the current bracket is locked onto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trap {
    #[default]
    Free,
    /// Sign change between left and center.
    Left,
    /// Sign change between center and right.
    Right,
    /// A magnitude minimum lies inside the bracket.
    Minimum,
}

impl Trap {
    pub fn code(self) -> u8 {
        match self {
            Trap::Free => 0,
            Trap::Left => 1,
            Trap::Right => 2,
            Trap::Minimum => 3,
        }
    }

    pub fn is_sign_change(self) -> bool {
        matches!(self, Trap::Left | Trap::Right)
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trap::Free => "free",
            Trap::Left => "left sign change",
            Trap::Right => "right sign change",
            Trap::Minimum => "minimum",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Where the last real trial landed relative to the bracket it updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    #[default]
    None,
    /// Between left and center, replacing left.
    NearLeft,
    /// Between left and center, becoming the new center.
    MidLeft,
    /// Beyond left.
    FarLeft,
    NearRight,
    MidRight,
    FarRight,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::None => "none",
            Move::NearLeft => "near-left",
            Move::MidLeft => "mid-left",
            Move::FarLeft => "far-left",
            Move::NearRight => "near-right",
            Move::MidRight => "mid-right",
            Move::FarRight => "far-right",
        };
        f.write_str(name)
    }
}

/// Mutable bookkeeping for one pole or zero search.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Roots confirmed so far, conjugates and multiplicity included.
    pub roots_found: usize,
    /// Trials whose deflated value barely moved from the bracket center.
    pub flat_total: usize,
    pub trap: Trap,
    pub last_move: Move,
    pub consecutive_moves: usize,
    pub low_guess: Option<f64>,
    pub high_guess: Option<f64>,
    pub guess_direction: Direction,
    /// Outer iterations since the last confirmed root.
    pub iterations: usize,
    pub total_iterations: usize,
    pub trials: usize,
    pub aberrations: usize,
    /// Converged retries that were neither a root nor a fresh minimum.
    pub stalls: usize,
    pub stalls_since_root: usize,
    /// Imaginary offset suggested by a symmetric fit with a negative discriminant.
    pub pending_imag: Option<ScaledReal>,
    /// Set once s = 0 has been evaluated.
    pub origin_sampled: bool,
    /// Sample around which the bracket is rebuilt after a reset.
    pub anchor: Option<TrialId>,
    pub next_sequence: usize,
    /// Evaluations that returned a finite, nonzero value.
    pub nondegenerate_samples: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spread between the outermost real-axis guesses, unset bounds counting as zero.
    pub fn guess_spread(&self) -> f64 {
        self.high_guess.unwrap_or(0.0) - self.low_guess.unwrap_or(0.0)
    }

    /// Records a bracket move and tracks runs of the same move while trapped.
    pub fn record_move(&mut self, mv: Move) {
        if self.trap != Trap::Free && mv == self.last_move {
            self.consecutive_moves += 1;
        } else {
            self.consecutive_moves = 0;
        }
        self.last_move = mv;
    }

    pub fn take_sequence(&mut self) -> usize {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}
