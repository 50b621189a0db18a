//! Turns a proposed frequency into a classified trial.

use super::bracket::Bracket;
use super::repository::{Trial, TrialFlags, TrialId, TrialRepository};
use super::state::{SearchState, Trap};
use super::types::SearchSettings;
use crate::error::{PzError, Result};
use crate::oracle::{Evaluation, TransferOracle};
use crate::scaled::ScaledComplex;
use num_complex::Complex64;
use num_traits::{One, Zero};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialOutcome {
    /// An ordinary sample was added to the repository.
    New(TrialId),
    /// The trial is a root: either the oracle returned zero or a singular
    /// system, or retries converged onto an existing sample.
    Root(TrialId),
    /// Retries converged onto an already confirmed root.
    Repeat(TrialId),
    /// Retries converged onto a sample that is a magnitude minimum, not a root.
    Minimum(TrialId),
    /// The value at this frequency could not be trusted and was dropped.
    Aberration(Complex64),
    /// Retries converged onto a trial that is not a root but cannot start a
    /// new complex search: a minimum already searched from, or a complex sample.
    Stalled(TrialId),
}

/// `|a - b|` measured relative to `|b|`, with `abs_tol / rel_tol` as the floor.
pub fn coincides(a: Complex64, b: Complex64, abs_tol: f64, rel_tol: f64) -> bool {
    (a - b).norm() / (b.norm() + abs_tol / rel_tol) < rel_tol
}

/// Evaluates `candidate` against the oracle after resolving near-duplicates.
pub fn run_trial<O: TransferOracle + ?Sized>(
    candidate: Complex64,
    oracle: &mut O,
    repo: &mut TrialRepository,
    bracket: &Bracket,
    state: &mut SearchState,
    settings: &SearchSettings,
) -> Result<TrialOutcome> {
    let mut s = candidate;
    if s.im < 0.0 {
        s.im = -s.im;
    }

    let mut shifted = false;
    'scan: loop {
        for id in repo.ids() {
            let trial = &repo[id];
            let (abs_tol, rel_tol) = tolerances(trial, settings);
            if !coincides(s, trial.s, abs_tol, rel_tol) {
                if state.trap == Trap::Free {
                    repo[id].count = 0;
                }
                continue;
            }

            let retry = if shifted || trial.count >= settings.max_shifts || s.im != 0.0 {
                None
            } else {
                let near = bracket.center.unwrap_or(id);
                alter(near, repo, state.trap, settings)
            };
            match retry {
                Some(next) => {
                    repo[id].count += 1;
                    s = Complex64::new(next, 0.0);
                    shifted = true;
                    continue 'scan;
                }
                None => return Ok(duplicate(id, s, repo, bracket, state, settings)),
            }
        }
        break;
    }

    let raw = match oracle.evaluate(s) {
        Ok(Evaluation::Value(value)) => value,
        Ok(Evaluation::Singular) => ScaledComplex::zero(),
        Err(source) => return Err(PzError::Oracle { s, source }),
    };
    if !raw.is_finite() {
        return Ok(TrialOutcome::Aberration(s));
    }

    let mut trial = Trial::new(s);
    trial.raw = raw;
    if raw.is_zero() {
        trial.flags.insert(TrialFlags::ROOT);
    } else {
        state.nondegenerate_samples += 1;
        match raw.checked_div(deflation(s, repo)) {
            Some(deflated) if deflated.is_finite() => trial.deflated = deflated,
            _ => return Ok(TrialOutcome::Aberration(s)),
        }
        if is_spike(&trial, repo, bracket, state, settings) {
            return Ok(TrialOutcome::Aberration(s));
        }
    }

    trial.sequence = state.take_sequence();
    let is_root = trial.is_root();
    let (id, _) = repo.insert_ordered(trial);
    state.trials += 1;
    if s.is_zero() {
        state.origin_sampled = true;
    }
    Ok(if is_root {
        TrialOutcome::Root(id)
    } else {
        TrialOutcome::New(id)
    })
}

fn tolerances(trial: &Trial, settings: &SearchSettings) -> (f64, f64) {
    if trial.is_root() {
        root_tolerances(trial.multiplicity, settings)
    } else {
        (settings.trial_abs_tol, settings.trial_rel_tol)
    }
}

/// `(abs, rel)` tolerances for matching against a root of multiplicity `m`.
///
/// A cluster of `m + 1` coincident roots is only resolved to about the
/// `(m + 1)`-th root of the trial precision, so the relative tolerance widens
/// with `m` and never drops below `root_rel_tol`.
pub fn root_tolerances(multiplicity: usize, settings: &SearchSettings) -> (f64, f64) {
    let order = multiplicity.max(1) as f64 + 1.0;
    let rel = settings.root_rel_tol.max(settings.trial_rel_tol.powf(order.recip()));
    (settings.root_abs_tol, rel)
}

/// Classifies a candidate that converged onto the existing trial `id`.
fn duplicate(
    id: TrialId,
    s: Complex64,
    repo: &mut TrialRepository,
    bracket: &Bracket,
    state: &SearchState,
    settings: &SearchSettings,
) -> TrialOutcome {
    if repo[id].is_root() {
        let trial = &mut repo[id];
        trial.multiplicity += 1;
        trial.flags.insert(TrialFlags::REPEAT);
        return TrialOutcome::Repeat(id);
    }

    let x = repo[id].s;
    let paired = s.im == 0.0
        && state.pending_imag.is_some_and(|imag| {
            imag.to_f64().abs() >= settings.root_rel_tol * x.norm() + settings.root_abs_tol
        });
    let settled = !paired
        && secant_step(id, repo, bracket)
            .is_some_and(|step| step < settings.root_rel_tol * x.norm() + settings.root_abs_tol);

    let trial = &mut repo[id];
    let sign_change = state.trap.is_sign_change() && !trial.is_complex();
    if settled || sign_change {
        trial.flags.remove(TrialFlags::MINIMUM);
        trial.flags.insert(TrialFlags::ROOT);
        TrialOutcome::Root(id)
    } else if trial.is_minimum() || trial.is_aberration() || trial.is_complex() || s.im != 0.0 {
        TrialOutcome::Stalled(id)
    } else {
        trial.flags.insert(TrialFlags::MINIMUM);
        TrialOutcome::Minimum(id)
    }
}

/// Distance from trial `id` to the zero of the secant through it and its
/// nearest non-root neighbor, bracket members included.
///
/// `None` when there is no usable neighbor or the secant is flat.
fn secant_step(id: TrialId, repo: &TrialRepository, bracket: &Bracket) -> Option<f64> {
    let trial = &repo[id];
    let candidates = [
        bracket.left,
        bracket.center,
        bracket.right,
        real_neighbor(repo, id, false),
        real_neighbor(repo, id, true),
    ];
    let neighbor = candidates
        .into_iter()
        .flatten()
        .filter_map(|other| repo.get(other))
        .filter(|other| !other.is_root() && other.s != trial.s)
        .min_by(|a, b| (a.s - trial.s).norm().total_cmp(&(b.s - trial.s).norm()))?;

    let reference = trial.deflated.exponent.max(neighbor.deflated.exponent);
    let value = trial.deflated.to_complex_at(reference);
    let rise = (neighbor.deflated.to_complex_at(reference) - value).norm();
    if rise == 0.0 {
        return None;
    }
    let step = value.norm() * (neighbor.s - trial.s).norm() / rise;
    step.is_finite().then_some(step)
}

/// Deflation factor for a value at `s`: the product of `(s - r)^m` over every
/// confirmed root, with complex roots contributing their conjugate pair.
pub fn deflation(s: Complex64, repo: &TrialRepository) -> ScaledComplex {
    repo.iter()
        .filter(|(_, trial)| trial.is_root())
        .fold(ScaledComplex::one(), |acc, (_, root)| {
            acc * root_factor(s, root.s).powu(root.multiplicity.max(1))
        })
}

pub fn root_factor(s: Complex64, root: Complex64) -> ScaledComplex {
    let factor = ScaledComplex::new(s - root);
    if root.im != 0.0 {
        factor * ScaledComplex::new(s - root.conj())
    } else {
        factor
    }
}

/// A real trial inside a bracketed sign change should not dwarf both endpoints.
fn is_spike(
    trial: &Trial,
    repo: &TrialRepository,
    bracket: &Bracket,
    state: &SearchState,
    settings: &SearchSettings,
) -> bool {
    if trial.is_complex() {
        return false;
    }
    let (lo, hi) = match state.trap {
        Trap::Left => (bracket.left, bracket.center),
        Trap::Right => (bracket.center, bracket.right),
        _ => return false,
    };
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return false;
    };
    let (lo, hi) = (&repo[lo], &repo[hi]);
    if !(lo.s.re < trial.s.re && trial.s.re < hi.s.re) {
        return false;
    }
    let ceiling = lo.deflated.exponent.max(hi.deflated.exponent);
    trial.deflated.exponent > ceiling.saturating_add(settings.aberration_spike_orders)
}

/// Nudges a proposal that collided with `near` to the midpoint between `near`
/// and its closer real neighbor.
///
/// A sign-change trap restricts the nudge to its own side. A missing neighbor is
/// replaced by a point ten times further out. Returns `None` when every midpoint
/// would collapse onto an existing point.
pub fn alter(
    near: TrialId,
    repo: &TrialRepository,
    trap: Trap,
    settings: &SearchSettings,
) -> Option<f64> {
    let anchor = &repo[near];
    if anchor.is_complex() {
        return None;
    }
    let x = anchor.s.re;
    let distinct = |a: f64, b: f64| {
        !coincides(
            Complex64::new(a, 0.0),
            Complex64::new(b, 0.0),
            settings.trial_abs_tol,
            settings.trial_rel_tol,
        )
    };
    let extension = 10.0 * x.abs().max(1.0);

    let candidate = |neighbor: Option<f64>, fallback: f64| {
        let neighbor = neighbor.unwrap_or(fallback);
        let mid = 0.5 * (x + neighbor);
        (distinct(mid, x) && distinct(mid, neighbor)).then_some((mid, (neighbor - x).abs()))
    };

    let neighbor_re = |forward| real_neighbor(repo, near, forward).map(|id| repo[id].s.re);
    let left = if trap == Trap::Right {
        None
    } else {
        candidate(neighbor_re(false), x - extension)
    };
    let right = if trap == Trap::Left {
        None
    } else {
        candidate(neighbor_re(true), x + extension)
    };

    match (left, right) {
        (Some((l, dl)), Some((r, dr))) => Some(if dr < dl { r } else { l }),
        (Some((l, _)), None) => Some(l),
        (None, Some((r, _))) => Some(r),
        (None, None) => None,
    }
}

/// Nearest real trial on one side of `from` with a different real part.
fn real_neighbor(repo: &TrialRepository, from: TrialId, forward: bool) -> Option<TrialId> {
    let x = repo[from].s.re;
    let mut cursor = if forward { repo.next(from) } else { repo.prev(from) };
    while let Some(id) = cursor {
        let trial = &repo[id];
        if !trial.is_complex() && trial.s.re != x {
            return Some(id);
        }
        cursor = if forward { repo.next(id) } else { repo.prev(id) };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{FnOracle, OracleError};
    use crate::scaled::ScaledReal;

    fn sample(repo: &mut TrialRepository, x: f64, value: f64) -> TrialId {
        let mut trial = Trial::new(Complex64::new(x, 0.0));
        trial.raw = ScaledComplex::new(Complex64::new(value, 0.0));
        trial.deflated = trial.raw;
        repo.insert_ordered(trial).0
    }

    fn complex_sample(repo: &mut TrialRepository, s: Complex64, value: f64) -> TrialId {
        let mut trial = Trial::new(s);
        trial.raw = ScaledComplex::new(Complex64::new(value, 0.0));
        trial.deflated = trial.raw;
        repo.insert_ordered(trial).0
    }

    type TestFn = fn(Complex64) -> std::result::Result<Evaluation, OracleError>;

    fn quadratic() -> FnOracle<TestFn> {
        let f: TestFn = |s| Ok(Evaluation::from_complex((s - 2.0) * (s - 5.0)));
        FnOracle::new(3, f)
    }

    #[test]
    fn new_sample_is_inserted_in_order() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let settings = SearchSettings::default();
        let outcome = run_trial(
            Complex64::new(1.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &settings,
        )
        .expect("evaluate");
        let TrialOutcome::New(id) = outcome else {
            panic!("expected a new trial, got {outcome:?}");
        };
        assert!((repo[id].raw.to_complex().re - 4.0).abs() < 1e-12);
        assert_eq!(state.trials, 1);
        assert_eq!(state.nondegenerate_samples, 1);
    }

    #[test]
    fn negative_imaginary_part_is_folded_into_upper_half_plane() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(1.0, -2.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        let TrialOutcome::New(id) = outcome else {
            panic!("expected a new trial, got {outcome:?}");
        };
        assert_eq!(repo[id].s, Complex64::new(1.0, 2.0));
    }

    #[test]
    fn exact_zero_is_a_root() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(2.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        let TrialOutcome::Root(id) = outcome else {
            panic!("expected a root, got {outcome:?}");
        };
        assert!(repo[id].is_root());
        assert_eq!(state.nondegenerate_samples, 0);
    }

    #[test]
    fn singular_evaluation_is_a_root() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = FnOracle::new(1, |_s: Complex64| Ok(Evaluation::Singular));
        let outcome = run_trial(
            Complex64::new(0.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert!(matches!(outcome, TrialOutcome::Root(_)));
        assert!(state.origin_sampled);
    }

    #[test]
    fn non_finite_value_is_an_aberration() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = FnOracle::new(1, |_s: Complex64| {
            Ok(Evaluation::from_complex(Complex64::new(f64::NAN, 0.0)))
        });
        let outcome = run_trial(
            Complex64::new(3.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Aberration(Complex64::new(3.0, 0.0)));
        assert!(repo.is_empty());
    }

    #[test]
    fn oracle_failure_is_propagated() {
        let mut repo = TrialRepository::new();
        let mut state = SearchState::new();
        let mut oracle = FnOracle::new(1, |_s: Complex64| Err(OracleError::Allocation));
        let err = run_trial(
            Complex64::new(3.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect_err("oracle failure must surface");
        assert!(matches!(err, PzError::Oracle { source: OracleError::Allocation, .. }));
    }

    #[test]
    fn duplicate_is_nudged_to_a_midpoint() {
        let mut repo = TrialRepository::new();
        let l = sample(&mut repo, -1.0, 2.0);
        let c = sample(&mut repo, 0.0, 1.0);
        let r = sample(&mut repo, 1.0, 2.0);
        let bracket = Bracket {
            left: Some(l),
            center: Some(c),
            right: Some(r),
        };
        let mut state = SearchState::new();
        state.trap = Trap::Minimum;
        let mut oracle = FnOracle::new(3, |s: Complex64| Ok(Evaluation::from_complex(s * s + 1.0)));
        let outcome = run_trial(
            Complex64::new(0.0, 0.0),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        let TrialOutcome::New(id) = outcome else {
            panic!("expected a nudged trial, got {outcome:?}");
        };
        assert_eq!(repo[id].s.re, -0.5);
        assert_eq!(repo[c].count, 1);
    }

    #[test]
    fn exhausted_retries_mark_a_minimum_then_stall() {
        let mut repo = TrialRepository::new();
        let c = sample(&mut repo, 0.0, 1.0);
        repo[c].count = 3;
        let bracket = Bracket {
            left: None,
            center: Some(c),
            right: None,
        };
        let mut state = SearchState::new();
        state.trap = Trap::Minimum;
        let settings = SearchSettings::default();
        let mut oracle = quadratic();

        let mut attempt = |repo: &mut TrialRepository, state: &mut SearchState| {
            run_trial(Complex64::zero(), &mut oracle, repo, &bracket, state, &settings)
                .expect("evaluate")
        };

        assert_eq!(attempt(&mut repo, &mut state), TrialOutcome::Minimum(c));
        assert!(repo[c].is_minimum());
        assert_eq!(attempt(&mut repo, &mut state), TrialOutcome::Stalled(c));
        assert!(!repo[c].is_root());
    }

    #[test]
    fn converged_minimum_with_negligible_value_is_a_root() {
        // deflated (s + 5), sampled just right of its root
        let x = -4.999_999_999_999_67;
        let mut repo = TrialRepository::new();
        let c = sample(&mut repo, x, x + 5.0);
        sample(&mut repo, -4.0, 1.0);
        repo[c].count = 3;
        repo[c].flags.insert(TrialFlags::MINIMUM);
        let bracket = Bracket {
            left: None,
            center: Some(c),
            right: None,
        };
        let mut state = SearchState::new();
        state.trap = Trap::Minimum;
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(x, 0.0),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Root(c));
        assert!(repo[c].is_root());
        assert!(!repo[c].is_minimum());
    }

    #[test]
    fn suspected_complex_pair_keeps_a_small_minimum() {
        let x = -4.999_999_999_999_67;
        let mut repo = TrialRepository::new();
        let c = sample(&mut repo, x, x + 5.0);
        sample(&mut repo, -4.0, 1.0);
        repo[c].count = 3;
        let bracket = Bracket {
            left: None,
            center: Some(c),
            right: None,
        };
        let mut state = SearchState::new();
        state.trap = Trap::Minimum;
        state.pending_imag = Some(ScaledReal::new(0.5));
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(x, 0.0),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Minimum(c));
    }

    #[test]
    fn stale_complex_sample_is_not_a_root() {
        let mut repo = TrialRepository::new();
        let stale = complex_sample(&mut repo, Complex64::new(-0.8575, 1e12), 1e48);
        let start = complex_sample(&mut repo, Complex64::new(-0.5, 0.4), 0.2);
        let bracket = Bracket {
            left: Some(start),
            center: None,
            right: None,
        };
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(-0.5, 1e12),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Stalled(stale));
        assert!(!repo[stale].is_root());
    }

    #[test]
    fn converged_complex_candidate_is_a_root() {
        let root = Complex64::new(-1.0, 2.0);
        let f = |s: Complex64| (s - root) * (s - root.conj());
        let mut repo = TrialRepository::new();
        let near = root + Complex64::new(1e-13, 0.0);
        let last = complex_sample(&mut repo, near, f(near).norm());
        let older = root + Complex64::new(0.01, 0.01);
        let prior = complex_sample(&mut repo, older, f(older).norm());
        let bracket = Bracket {
            left: Some(last),
            center: Some(prior),
            right: None,
        };
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            near + Complex64::new(1e-14, 0.0),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Root(last));
    }

    #[test]
    fn converged_sign_change_becomes_a_root() {
        let mut repo = TrialRepository::new();
        let c = sample(&mut repo, 2.0, 1e-3);
        repo[c].count = 3;
        let bracket = Bracket {
            left: None,
            center: Some(c),
            right: None,
        };
        let mut state = SearchState::new();
        state.trap = Trap::Left;
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(2.0, 0.0),
            &mut oracle,
            &mut repo,
            &bracket,
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Root(c));
        assert!(repo[c].is_root());
    }

    #[test]
    fn repeat_hit_on_root_raises_multiplicity() {
        let mut repo = TrialRepository::new();
        let root = sample(&mut repo, 3.0, 0.0);
        repo[root].flags.insert(TrialFlags::ROOT);
        repo[root].multiplicity = 1;
        repo[root].count = 3;
        let mut state = SearchState::new();
        state.trap = Trap::Right;
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(3.0 + 1e-9, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        assert_eq!(outcome, TrialOutcome::Repeat(root));
        assert_eq!(repo[root].multiplicity, 2);
        assert!(repo[root].flags.contains(TrialFlags::REPEAT));
    }

    #[test]
    fn repeat_tolerance_widens_with_multiplicity() {
        let settings = SearchSettings::default();
        let (_, single) = root_tolerances(1, &settings);
        let (_, double) = root_tolerances(2, &settings);
        assert!((single - settings.root_rel_tol).abs() < 1e-15);
        assert!(double > 10.0 * single);

        let mut repo = TrialRepository::new();
        let root = sample(&mut repo, 2.999_98, 0.0);
        repo[root].flags.insert(TrialFlags::ROOT);
        repo[root].multiplicity = 2;
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(3.000_01, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &settings,
        )
        .expect("evaluate");
        let TrialOutcome::New(id) = outcome else {
            panic!("expected a nudged trial, got {outcome:?}");
        };
        assert!((repo[id].s.re - 3.0).abs() > 1.0);
    }

    #[test]
    fn new_values_are_deflated_by_confirmed_roots() {
        let mut repo = TrialRepository::new();
        let root = sample(&mut repo, 2.0, 0.0);
        repo[root].flags.insert(TrialFlags::ROOT);
        repo[root].multiplicity = 1;
        let mut state = SearchState::new();
        let mut oracle = quadratic();
        let outcome = run_trial(
            Complex64::new(7.0, 0.0),
            &mut oracle,
            &mut repo,
            &Bracket::default(),
            &mut state,
            &SearchSettings::default(),
        )
        .expect("evaluate");
        let TrialOutcome::New(id) = outcome else {
            panic!("expected a new trial, got {outcome:?}");
        };
        // (7 - 2)(7 - 5) / (7 - 2)
        assert!((repo[id].deflated.to_complex().re - 2.0).abs() < 1e-12);
    }

    #[test]
    fn complex_root_deflates_by_conjugate_pair() {
        let factor = root_factor(Complex64::new(2.0, 0.0), Complex64::new(0.0, 1.0));
        assert!((factor.to_complex() - Complex64::new(5.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn alter_respects_trap_side() {
        let mut repo = TrialRepository::new();
        sample(&mut repo, -4.0, 1.0);
        let c = sample(&mut repo, 0.0, 1.0);
        sample(&mut repo, 1.0, 1.0);
        let settings = SearchSettings::default();

        assert_eq!(alter(c, &repo, Trap::Free, &settings), Some(0.5));
        assert_eq!(alter(c, &repo, Trap::Left, &settings), Some(-2.0));
        assert_eq!(alter(c, &repo, Trap::Right, &settings), Some(0.5));
    }

    #[test]
    fn alter_extends_past_a_missing_neighbor() {
        let mut repo = TrialRepository::new();
        let c = sample(&mut repo, 2.0, 1.0);
        let settings = SearchSettings::default();
        assert_eq!(alter(c, &repo, Trap::Free, &settings), Some(-8.0));
        assert_eq!(alter(c, &repo, Trap::Right, &settings), Some(12.0));
    }

    #[test]
    fn alter_fails_when_neighbors_are_too_close() {
        let mut repo = TrialRepository::new();
        sample(&mut repo, 1.0 - 1e-14, 1.0);
        let c = sample(&mut repo, 1.0, 1.0);
        sample(&mut repo, 1.0 + 1e-14, 1.0);
        let settings = SearchSettings::default();
        assert_eq!(alter(c, &repo, Trap::Free, &settings), None);
    }
}
