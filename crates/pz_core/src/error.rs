//! Error types for the pole-zero search.
//!
//! Soft terminations (iteration limit, aberration limit, cancellation) are not
//! errors; they are reported through [`crate::search::SearchStatus`]. Only
//! oracle failures and broken search invariants surface here.

use crate::oracle::OracleError;
use crate::search::{Move, Strategy, Trap};
use num_complex::Complex64;
use thiserror::Error;

/// Result type alias using [`PzError`].
pub type Result<T> = std::result::Result<T, PzError>;

#[derive(Error, Debug)]
pub enum PzError {
    /// The oracle failed outright; not retried at this layer.
    #[error("oracle failed at s = {s}: {source}")]
    Oracle {
        s: Complex64,
        #[source]
        source: OracleError,
    },

    /// The selector saw repeated identical moves under a move code it cannot split on.
    #[error(
        "strategy selector stuck after {moves} consecutive {last_move} moves while trapped ({trap})"
    )]
    StrategyState {
        last_move: Move,
        trap: Trap,
        moves: usize,
    },

    /// An interpolator was asked to run without the bracket it needs.
    #[error("strategy {strategy} requires a complete bracket")]
    IncompleteBracket { strategy: Strategy },

    #[error("invalid search settings: {message}")]
    InvalidSettings { message: String },
}

impl PzError {
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: message.into(),
        }
    }
}
