//! Proposal of the next trial point for each non-step strategy.

use super::bracket::Bracket;
use super::repository::{Direction, Trial, TrialRepository};
use super::state::{Move, SearchState, Trap};
use super::strategy::Strategy;
use super::types::SearchSettings;
use crate::error::{PzError, Result};
use crate::scaled::ScaledReal;
use num_complex::Complex64;
use num_traits::Zero;

/// Proposes the next complex frequency to sample.
///
/// Step strategies never reach this point; the driver resolves them against the
/// repository first and degrades to [`Strategy::Guess`] when that walk fails.
pub fn propose(
    strategy: Strategy,
    bracket: &Bracket,
    repo: &TrialRepository,
    state: &mut SearchState,
    settings: &SearchSettings,
) -> Result<Complex64> {
    let s = match strategy {
        Strategy::Init
        | Strategy::Guess
        | Strategy::SkipLeft
        | Strategy::SkipRight
        | Strategy::ShiftLeft
        | Strategy::ShiftRight => Complex64::new(guess(state, settings), 0.0),
        Strategy::Sym | Strategy::Sym2 => {
            let (l, c, r) = full(bracket, repo, strategy)?;
            Complex64::new(symmetric(strategy, l, c, r, state, settings), 0.0)
        }
        Strategy::Muller => {
            let (l, c, r) = full(bracket, repo, strategy)?;
            muller(l, c, r)
        }
        Strategy::SplitLeft => {
            let (l, c, _) = full(bracket, repo, strategy)?;
            Complex64::new((l.s.re + 2.0 * c.s.re) / 3.0, 0.0)
        }
        Strategy::SplitRight => {
            let (_, c, r) = full(bracket, repo, strategy)?;
            Complex64::new((r.s.re + 2.0 * c.s.re) / 3.0, 0.0)
        }
        Strategy::ComplexInit => {
            let center = bracket
                .center
                .map(|id| &repo[id])
                .ok_or(PzError::IncompleteBracket { strategy })?;
            let x = center.s.re;
            let imag = match state.pending_imag.take().map(ScaledReal::to_f64) {
                Some(offset) if offset.is_finite() && offset > 0.0 => offset,
                _ => x.abs().max(1.0),
            };
            Complex64::new(x, imag)
        }
        Strategy::ComplexGuess => {
            let left = bracket
                .left
                .map(|id| &repo[id])
                .ok_or(PzError::IncompleteBracket { strategy })?;
            let imag = if bracket.right.is_some() {
                settings.complex_guess_far
            } else {
                settings.complex_guess_near
            };
            Complex64::new(left.s.re, imag)
        }
    };
    Ok(s)
}

fn full<'a>(
    bracket: &Bracket,
    repo: &'a TrialRepository,
    strategy: Strategy,
) -> Result<(&'a Trial, &'a Trial, &'a Trial)> {
    match (bracket.left, bracket.center, bracket.right) {
        (Some(l), Some(c), Some(r)) => Ok((&repo[l], &repo[c], &repo[r])),
        _ => Err(PzError::IncompleteBracket { strategy }),
    }
}

/// Expands the real-axis guess bounds geometrically in the last walk direction.
fn guess(state: &mut SearchState, settings: &SearchSettings) -> f64 {
    let direction = match state.guess_direction {
        Direction::Here if !state.origin_sampled => return 0.0,
        Direction::Here => Direction::Next,
        other => other,
    };
    if direction == Direction::Previous {
        let low = state.low_guess.map_or(-1.0, |low| low * settings.guess_growth);
        state.low_guess = Some(low);
        low
    } else {
        let high = state.high_guess.map_or(1.0, |high| high * settings.guess_growth);
        state.high_guess = Some(high);
        high
    }
}

/// Fits a parabola through the real bracket and returns its root nearest the center.
///
/// A negative discriminant yields the vertex and leaves the imaginary offset of
/// the complex roots in `state.pending_imag`.
fn symmetric(
    strategy: Strategy,
    l: &Trial,
    c: &Trial,
    r: &Trial,
    state: &mut SearchState,
    settings: &SearchSettings,
) -> f64 {
    state.pending_imag = None;
    let values = [l.deflated.re(), c.deflated.re(), r.deflated.re()];
    let reference = values
        .iter()
        .filter(|v| !v.is_zero())
        .map(|v| v.exponent)
        .max()
        .unwrap_or(0);
    let [f0, f1, f2] = values.map(|v| v.to_f64_at(reference));

    let x0 = l.s.re - c.s.re;
    let x2 = r.s.re - c.s.re;
    let d0 = (f0 - f1) / x0;
    let d2 = (f2 - f1) / x2;
    let a = (d2 - d0) / (x2 - x0);
    let b = d0 - a * x0;

    let offset = if a == 0.0 || a.abs() * (x2 - x0) <= settings.linear_fallback_ratio * b.abs() {
        match (strategy, state.trap) {
            (Strategy::Sym2, Trap::Left) => -f1 / d0,
            (Strategy::Sym2, _) => -f1 / d2,
            _ => -f1 / b,
        }
    } else {
        let disc = b * b - 4.0 * a * f1;
        if disc < 0.0 {
            state.pending_imag = Some(ScaledReal::new((-disc).sqrt() / (2.0 * a.abs())));
            -b / (2.0 * a)
        } else {
            let root = disc.sqrt();
            let q = -0.5 * (b + if b >= 0.0 { root } else { -root });
            if q == 0.0 {
                0.0
            } else {
                let first = q / a;
                let second = f1 / q;
                if first.abs() <= second.abs() {
                    first
                } else {
                    second
                }
            }
        }
    };

    clamp(c.s.re + offset, l.s.re, c.s.re, r.s.re, state)
}

/// Keeps a symmetric-fit proposal inside the part of the bracket the trap allows.
fn clamp(x: f64, l: f64, c: f64, r: f64, state: &SearchState) -> f64 {
    let inside = |lo: f64, hi: f64| x.is_finite() && lo < x && x < hi;
    match state.trap {
        Trap::Left if !inside(l, c) => 0.5 * (l + c),
        Trap::Right if !inside(c, r) => 0.5 * (c + r),
        Trap::Left | Trap::Right => x,
        Trap::Minimum | Trap::Free if !inside(l, r) => {
            let mid = 0.5 * (l + r);
            if mid != c {
                mid
            } else if matches!(state.last_move, Move::MidLeft | Move::NearRight) {
                0.5 * (l + c)
            } else {
                0.5 * (c + r)
            }
        }
        Trap::Minimum | Trap::Free => x,
    }
}

/// One Muller step. `left` holds the newest point, `right` the oldest.
fn muller(left: &Trial, center: &Trial, right: &Trial) -> Complex64 {
    let reference = [left, center, right]
        .iter()
        .filter(|t| !t.deflated.is_zero())
        .map(|t| t.deflated.exponent)
        .max()
        .unwrap_or(0);
    let (x0, x1, x2) = (right.s, center.s, left.s);
    let f0 = right.deflated.to_complex_at(reference);
    let f1 = center.deflated.to_complex_at(reference);
    let f2 = left.deflated.to_complex_at(reference);

    let h1 = x1 - x0;
    let h2 = x2 - x1;
    let d1 = (f1 - f0) / h1;
    let d2 = (f2 - f1) / h2;
    let dd = (d2 - d1) / (h2 + h1);
    let w = d2 + h2 * dd;
    let sq = (w * w - 4.0 * f2 * dd).sqrt();
    let denom = if (w * sq.conj()).re >= 0.0 { w + sq } else { w - sq };

    let next = x2 - 2.0 * f2 / denom;
    if !denom.is_zero() && next.re.is_finite() && next.im.is_finite() {
        return next;
    }
    let slope = f2 - f1;
    if slope.is_zero() {
        x2 + h2
    } else {
        x2 - f2 * h2 / slope
    }
}
