//! Strategy selection over the current bracket.

use super::bracket::Bracket;
use super::repository::TrialRepository;
use super::state::{Move, SearchState, Trap};
use super::types::SearchSettings;
use crate::error::{PzError, Result};
use crate::scaled::scaled_add;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Init,
    Guess,
    SkipLeft,
    SkipRight,
    ShiftLeft,
    ShiftRight,
    Sym,
    Sym2,
    Muller,
    SplitLeft,
    SplitRight,
    ComplexInit,
    ComplexGuess,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Init => "init",
            Strategy::Guess => "guess",
            Strategy::SkipLeft => "skip-left",
            Strategy::SkipRight => "skip-right",
            Strategy::ShiftLeft => "shift-left",
            Strategy::ShiftRight => "shift-right",
            Strategy::Sym => "sym",
            Strategy::Sym2 => "sym2",
            Strategy::Muller => "muller",
            Strategy::SplitLeft => "split-left",
            Strategy::SplitRight => "split-right",
            Strategy::ComplexInit => "complex-init",
            Strategy::ComplexGuess => "complex-guess",
        }
    }

    /// Step strategies rearrange the bracket from existing trials instead of
    /// proposing a new point.
    pub fn is_step(self) -> bool {
        matches!(
            self,
            Strategy::Init
                | Strategy::SkipLeft
                | Strategy::SkipRight
                | Strategy::ShiftLeft
                | Strategy::ShiftRight
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks the next strategy for `bracket` and updates the trap code in `state`.
///
/// Fails only when a run of identical trapped moves ends on a move code that
/// has no split direction.
pub fn select(
    bracket: &Bracket,
    repo: &TrialRepository,
    state: &mut SearchState,
    settings: &SearchSettings,
) -> Result<Strategy> {
    if let Some(center) = bracket.center {
        if repo[center].is_minimum() {
            return Ok(Strategy::ComplexInit);
        }
    }
    if let Some(left) = bracket.left {
        if repo[left].is_complex() {
            if bracket.center.is_none() || bracket.right.is_none() {
                return Ok(Strategy::ComplexGuess);
            }
            return Ok(Strategy::Muller);
        }
    }
    let (Some(left), Some(center), Some(right)) = (bracket.left, bracket.center, bracket.right)
    else {
        return Ok(Strategy::Init);
    };

    let (l, c, r) = (&repo[left], &repo[center], &repo[right]);
    let fl = l.deflated.re();
    let fc = c.deflated.re();
    let fr = r.deflated.re();
    let previous = state.trap;

    let (trap, mut strategy) = if fl.signum() != fc.signum() {
        (Trap::Left, Strategy::Sym2)
    } else if fc.signum() != fr.signum() {
        (Trap::Right, Strategy::Sym2)
    } else if previous != Trap::Free {
        (Trap::Minimum, Strategy::Sym)
    } else {
        let a = scaled_add(fc, -fl, settings.discard_orders);
        let b = scaled_add(fr, -fc, settings.discard_orders);
        let orders = settings.flat_orders;
        let flat = a.is_negligible_against(fl, orders)
            && a.is_negligible_against(fc, orders)
            && b.is_negligible_against(fc, orders)
            && b.is_negligible_against(fr, orders);
        let widen = if c.s.re - l.s.re > r.s.re - c.s.re {
            Strategy::SkipRight
        } else {
            Strategy::SkipLeft
        };

        if flat {
            (Trap::Free, widen)
        } else if a.signum() != -b.signum() {
            if a.signum() == 0 {
                (Trap::Free, Strategy::SkipLeft)
            } else if b.signum() == 0 {
                (Trap::Free, Strategy::SkipRight)
            } else if a.signum() == fc.signum() {
                (Trap::Free, Strategy::ShiftLeft)
            } else {
                (Trap::Free, Strategy::ShiftRight)
            }
        } else if a.signum() == -fc.signum() {
            (Trap::Minimum, Strategy::Sym)
        } else {
            (Trap::Free, widen)
        }
    };

    if state.consecutive_moves >= settings.consecutive_move_limit && previous == trap {
        strategy = match state.last_move {
            Move::MidLeft | Move::NearRight => Strategy::SplitLeft,
            Move::MidRight | Move::NearLeft => Strategy::SplitRight,
            last_move => {
                return Err(PzError::StrategyState {
                    last_move,
                    trap,
                    moves: state.consecutive_moves,
                });
            }
        };
        state.consecutive_moves = 0;
    }

    state.trap = trap;
    Ok(strategy)
}
