//! Root confirmation and deflation of the surviving samples.

use super::evaluate::{coincides, deflation, root_factor, root_tolerances};
use super::repository::{TrialFlags, TrialId, TrialRepository};
use super::state::SearchState;
use super::types::SearchSettings;
use num_complex::Complex64;

/// What [`confirm_root`] did to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// The root trial. Differs from the confirmed id after a snap or a merge.
    pub root: TrialId,
    pub pruned: usize,
    /// Set when the root was folded into a nearby root of the same cluster.
    pub merged: bool,
}

/// Accepts the trial `id` as a root, divides its factor out of every other
/// sample and prunes samples that collapse onto it.
///
/// A fresh complex root within root tolerance of the real axis is moved onto
/// it. Two roots closer than the tolerance of their combined multiplicity are
/// merged into the one with the higher multiplicity. Complex samples are
/// dropped, and minimum or stalled flags on the survivors are cleared since
/// the deflated landscape changed.
///
/// Leaves `state.anchor` on the nearest remaining real sample.
pub fn confirm_root(
    id: TrialId,
    repo: &mut TrialRepository,
    state: &mut SearchState,
    settings: &SearchSettings,
) -> Confirmation {
    let id = if repo[id].is_root() {
        id
    } else {
        snap_to_real_axis(id, repo, settings)
    };
    let counted = {
        let trial = &mut repo[id];
        trial.flags.insert(TrialFlags::ROOT);
        trial.flags.remove(TrialFlags::MINIMUM);
        trial.flags.remove(TrialFlags::ABERRATION);
        trial.multiplicity = trial.multiplicity.max(1);
        trial.count = 0;
        if trial.is_complex() {
            2
        } else {
            1
        }
    };
    state.roots_found += counted;
    state.stalls_since_root = 0;

    let merged = merge_cluster(id, repo, settings);
    let id = merged.unwrap_or(id);
    let root = repo[id].s;
    let (abs_tol, rel_tol) = root_tolerances(repo[id].multiplicity, settings);

    let mut pruned = 0;
    for other in repo.ids() {
        let trial = &repo[other];
        if trial.is_root() {
            continue;
        }
        let s = trial.s;
        let deflated = if trial.is_complex() || coincides(s, root, abs_tol, rel_tol) {
            None
        } else if merged.is_some() {
            trial.raw.checked_div(deflation(s, repo))
        } else {
            trial.deflated.checked_div(root_factor(s, root))
        };
        match deflated {
            Some(value) => {
                let trial = &mut repo[other];
                trial.deflated = value;
                trial.flags.remove(TrialFlags::MINIMUM);
                trial.flags.remove(TrialFlags::ABERRATION);
            }
            None => {
                repo.remove(other);
                pruned += 1;
            }
        }
    }

    state.anchor = repo
        .iter()
        .filter(|(_, trial)| trial.is_sample() && !trial.is_complex())
        .min_by(|(_, a), (_, b)| (a.s - root).norm().total_cmp(&(b.s - root).norm()))
        .map(|(other, _)| other);
    Confirmation {
        root: id,
        pruned,
        merged: merged.is_some(),
    }
}

/// Drops every complex trial that is not a root. Returns how many went.
pub fn discard_complex_samples(repo: &mut TrialRepository) -> usize {
    let stale: Vec<TrialId> = repo
        .iter()
        .filter(|(_, trial)| trial.is_complex() && !trial.is_root())
        .map(|(id, _)| id)
        .collect();
    for &id in &stale {
        repo.remove(id);
    }
    stale.len()
}

fn snap_to_real_axis(
    id: TrialId,
    repo: &mut TrialRepository,
    settings: &SearchSettings,
) -> TrialId {
    let s = repo[id].s;
    let axis = Complex64::new(s.re, 0.0);
    if s.im == 0.0 || !coincides(s, axis, settings.root_abs_tol, settings.root_rel_tol) {
        return id;
    }
    match repo.remove(id) {
        Some(mut trial) => {
            trial.s = axis;
            repo.insert_ordered(trial).0
        }
        None => id,
    }
}

/// Folds `id` and the first root of its cluster into one trial, keeping the
/// location with the higher multiplicity. Returns the surviving id.
fn merge_cluster(
    id: TrialId,
    repo: &mut TrialRepository,
    settings: &SearchSettings,
) -> Option<TrialId> {
    let (s, multiplicity) = (repo[id].s, repo[id].multiplicity);
    let partner = repo
        .iter()
        .filter(|(other, trial)| *other != id && trial.is_root())
        .filter(|(_, trial)| trial.is_complex() == (s.im != 0.0))
        .find(|(_, trial)| {
            let (abs_tol, rel_tol) =
                root_tolerances(trial.multiplicity + multiplicity - 1, settings);
            coincides(s, trial.s, abs_tol, rel_tol)
        })
        .map(|(other, _)| other)?;

    let (keep, drop) = if repo[partner].multiplicity >= multiplicity {
        (partner, id)
    } else {
        (id, partner)
    };
    let dropped = repo.remove(drop)?;
    repo[keep].multiplicity += dropped.multiplicity;
    Some(keep)
}
