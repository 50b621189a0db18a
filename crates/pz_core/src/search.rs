//! Adaptive root search over a transfer-function oracle.
//!
//! One [`RootSearch`] finds either the poles or the zeros of a network. Each
//! outer iteration picks a strategy for the current bracket, proposes a trial
//! frequency, evaluates it and folds the result back into the bracket. Confirmed
//! roots are divided out of every surviving sample so later iterations converge
//! elsewhere.

pub mod bracket;
pub mod evaluate;
pub mod interpolate;
pub mod repository;
pub mod state;
pub mod strategy;
pub mod types;
pub mod verify;

pub use bracket::Bracket;
pub use evaluate::TrialOutcome;
pub use repository::{Direction, Trial, TrialFlags, TrialId, TrialRepository};
pub use state::{Move, SearchState, Trap};
pub use strategy::Strategy;
pub use types::{Root, RootSearchOutcome, SearchKind, SearchSettings, SearchStats, SearchStatus};

use crate::diagnostics::{DiagnosticSink, TraceEvent};
use crate::error::Result;
use crate::oracle::TransferOracle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Squared distance below which consecutive deflated values count as flat.
const FLAT_DISTANCE_SQR: f64 = 1e-20;

pub struct RootSearch<O> {
    oracle: O,
    settings: SearchSettings,
    kind: SearchKind,
    repo: TrialRepository,
    bracket: Bracket,
    state: SearchState,
    interrupt: Option<Arc<AtomicBool>>,
    outcome: Option<RootSearchOutcome>,
}

impl<O: TransferOracle> RootSearch<O> {
    pub fn new(oracle: O, settings: SearchSettings, kind: SearchKind) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            oracle,
            settings,
            kind,
            repo: TrialRepository::new(),
            bracket: Bracket::default(),
            state: SearchState::new(),
            interrupt: None,
            outcome: None,
        })
    }

    /// Polls `flag` once per outer iteration and stops with
    /// [`SearchStatus::Cancelled`] once it is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn repository(&self) -> &TrialRepository {
        &self.repo
    }

    pub fn bracket(&self) -> Bracket {
        self.bracket
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&RootSearchOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<RootSearchOutcome> {
        self.outcome
    }

    /// Runs one outer iteration. Returns the final status once the search has ended.
    pub fn step(&mut self, sink: &mut dyn DiagnosticSink) -> Result<Option<SearchStatus>> {
        if let Some(outcome) = &self.outcome {
            return Ok(Some(outcome.status));
        }
        if let Some(status) = self.termination() {
            return Ok(Some(self.finish(status, sink)));
        }
        self.iterate(sink)?;
        if let Some(status) = self.termination() {
            return Ok(Some(self.finish(status, sink)));
        }
        Ok(None)
    }

    pub fn run(mut self, sink: &mut dyn DiagnosticSink) -> Result<RootSearchOutcome> {
        loop {
            self.step(sink)?;
            if let Some(outcome) = self.outcome.take() {
                return Ok(outcome);
            }
        }
    }

    fn iterate(&mut self, sink: &mut dyn DiagnosticSink) -> Result<()> {
        let mut strategy =
            strategy::select(&self.bracket, &self.repo, &mut self.state, &self.settings)?;
        let mut budget = 3 * self.repo.len() + 3;
        while strategy.is_step() {
            if budget == 0 || !self.bracket.step(strategy, &self.repo, &mut self.state) {
                strategy = Strategy::Guess;
                break;
            }
            budget -= 1;
            strategy =
                strategy::select(&self.bracket, &self.repo, &mut self.state, &self.settings)?;
        }

        self.state.iterations += 1;
        self.state.total_iterations += 1;
        let iteration = self.state.total_iterations;
        debug!(
            kind = %self.kind,
            iteration,
            strategy = strategy.name(),
            trap = self.state.trap.code(),
            "strategy selected"
        );
        sink.record(&TraceEvent::StrategyChosen {
            kind: self.kind,
            iteration,
            strategy,
            trap: self.state.trap,
        });

        let candidate = interpolate::propose(
            strategy,
            &self.bracket,
            &self.repo,
            &mut self.state,
            &self.settings,
        )?;
        let outcome = evaluate::run_trial(
            candidate,
            &mut self.oracle,
            &mut self.repo,
            &self.bracket,
            &mut self.state,
            &self.settings,
        )?;

        match outcome {
            TrialOutcome::New(id) => {
                self.record_trial(id, sink);
                self.track_flatness(id);
                let mv = self.bracket.absorb(id, &self.repo, &mut self.state);
                debug!(
                    kind = %self.kind,
                    s = %self.repo[id].s,
                    bracket_move = %mv,
                    "trial absorbed"
                );
            }
            TrialOutcome::Root(id) => {
                self.record_trial(id, sink);
                self.confirm(id, sink);
            }
            TrialOutcome::Repeat(id) => self.confirm(id, sink),
            TrialOutcome::Minimum(id) => {
                let s = self.repo[id].s;
                let dropped = verify::discard_complex_samples(&mut self.repo);
                debug!(kind = %self.kind, %s, dropped, "magnitude minimum");
                sink.record(&TraceEvent::Minimum { kind: self.kind, s });
                self.bracket = Bracket {
                    left: None,
                    center: Some(id),
                    right: None,
                };
            }
            TrialOutcome::Aberration(s) => {
                self.state.aberrations += 1;
                debug!(
                    kind = %self.kind,
                    %s,
                    count = self.state.aberrations,
                    "numerical aberration"
                );
                sink.record(&TraceEvent::Aberration {
                    kind: self.kind,
                    s,
                    count: self.state.aberrations,
                });
                self.bracket.reset(&self.repo, &mut self.state);
            }
            TrialOutcome::Stalled(id) => self.stall(id, sink),
        }
        Ok(())
    }

    fn record_trial(&self, id: TrialId, sink: &mut dyn DiagnosticSink) {
        let trial = &self.repo[id];
        sink.record(&TraceEvent::TrialEvaluated {
            kind: self.kind,
            s: trial.s,
            deflated: trial.deflated,
        });
    }

    fn track_flatness(&mut self, id: TrialId) {
        let Some(center) = self.bracket.center else {
            return;
        };
        let (a, b) = (self.repo[id].deflated, self.repo[center].deflated);
        if (a.exponent - b.exponent).abs() > 1 {
            return;
        }
        let reference = a.exponent.max(b.exponent);
        let gap = a.to_complex_at(reference) - b.to_complex_at(reference);
        if gap.norm_sqr() < FLAT_DISTANCE_SQR {
            self.state.flat_total += 1;
        }
    }

    /// Retires the trial a search stalled on and starts over from the anchor.
    fn stall(&mut self, id: TrialId, sink: &mut dyn DiagnosticSink) {
        let trial = &mut self.repo[id];
        trial.flags.remove(TrialFlags::MINIMUM);
        trial.flags.insert(TrialFlags::ABERRATION);
        let s = trial.s;
        self.state.stalls += 1;
        self.state.stalls_since_root += 1;
        let dropped = verify::discard_complex_samples(&mut self.repo);
        debug!(kind = %self.kind, %s, dropped, count = self.state.stalls, "search stalled");
        sink.record(&TraceEvent::Stalled {
            kind: self.kind,
            s,
            count: self.state.stalls,
        });
        self.bracket.reset(&self.repo, &mut self.state);
    }

    fn confirm(&mut self, id: TrialId, sink: &mut dyn DiagnosticSink) {
        let done = verify::confirm_root(id, &mut self.repo, &mut self.state, &self.settings);
        let root = &self.repo[done.root];
        debug!(
            kind = %self.kind,
            value = %root.s,
            multiplicity = root.multiplicity,
            pruned = done.pruned,
            merged = done.merged,
            roots_found = self.state.roots_found,
            "root confirmed"
        );
        sink.record(&TraceEvent::RootConfirmed {
            kind: self.kind,
            value: root.s,
            multiplicity: root.multiplicity,
            pruned: done.pruned,
        });
        self.state.iterations = 0;
        self.bracket.reset(&self.repo, &mut self.state);
    }

    fn termination(&self) -> Option<SearchStatus> {
        if self.state.roots_found >= self.oracle.size() {
            return Some(SearchStatus::Ok);
        }
        if self.state.aberrations >= self.settings.max_aberrations {
            return Some(SearchStatus::AberrationLimitReached);
        }
        if self.state.stalls_since_root >= self.settings.max_aberrations {
            return Some(SearchStatus::Singular);
        }
        if self.state.iterations >= self.settings.max_iterations {
            return Some(SearchStatus::IterationLimitReached);
        }
        if self.state.guess_spread() > self.settings.guess_spread_limit {
            return Some(SearchStatus::Ok);
        }
        if let (Some(left), Some(right)) = (self.bracket.left, self.bracket.right) {
            if self.state.trap == Trap::Free && self.repo[left].s.re == self.repo[right].s.re {
                return Some(SearchStatus::Ok);
            }
        }
        if self
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(SearchStatus::Cancelled);
        }
        None
    }

    fn finish(&mut self, status: SearchStatus, sink: &mut dyn DiagnosticSink) -> SearchStatus {
        let size = self.oracle.size();
        let shorted =
            size > 0 && self.state.roots_found >= size && self.state.nondegenerate_samples == 0;
        let status = if shorted {
            SearchStatus::ShortedInput
        } else {
            status
        };

        let mut roots = Vec::new();
        if shorted {
            self.repo.clear(false);
        } else {
            self.repo.clear(true);
            for (_, trial) in self.repo.iter() {
                roots.push(Root {
                    value: trial.s,
                    multiplicity: trial.multiplicity,
                });
                if trial.is_complex() {
                    roots.push(Root {
                        value: trial.s.conj(),
                        multiplicity: trial.multiplicity,
                    });
                }
            }
            roots.sort_by(|a, b| {
                a.value
                    .re
                    .total_cmp(&b.value.re)
                    .then(a.value.im.total_cmp(&b.value.im))
            });
        }

        match status {
            SearchStatus::Ok | SearchStatus::Cancelled => {}
            SearchStatus::ShortedInput => {
                warn!(
                    kind = %self.kind,
                    size,
                    "transfer function appears shorted; discarding roots"
                )
            }
            other => warn!(
                kind = %self.kind,
                status = %other,
                roots_found = self.state.roots_found,
                "search stopped early; returning partial results"
            ),
        }

        let stats = SearchStats {
            trials: self.state.trials,
            iterations: self.state.total_iterations,
            aberrations: self.state.aberrations,
            stalls: self.state.stalls,
            flat_samples: self.state.flat_total,
            roots_found: if shorted { 0 } else { self.state.roots_found },
        };
        info!(
            kind = %self.kind,
            %status,
            roots = roots.len(),
            trials = stats.trials,
            iterations = stats.iterations,
            "root search finished"
        );
        sink.record(&TraceEvent::Terminated {
            kind: self.kind,
            status,
            roots: roots.len(),
            iterations: stats.iterations,
        });
        self.outcome = Some(RootSearchOutcome {
            roots,
            status,
            stats,
        });
        status
    }
}
