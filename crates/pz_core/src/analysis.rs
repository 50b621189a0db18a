//! Combined pole and zero analysis.
//!
//! Poles are searched first, then zeros. Each search owns its own state and
//! trial repository; nothing carries over between them.

use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::oracle::TransferOracle;
use crate::polynomial::RationalFunction;
use crate::search::{Root, RootSearch, RootSearchOutcome, SearchKind, SearchSettings, SearchStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Which root sets to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PzKind {
    Poles,
    Zeros,
    #[default]
    Both,
}

impl PzKind {
    fn wants_poles(self) -> bool {
        matches!(self, PzKind::Poles | PzKind::Both)
    }

    fn wants_zeros(self) -> bool {
        matches!(self, PzKind::Zeros | PzKind::Both)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoleZeroSettings {
    pub kind: PzKind,
    pub poles: SearchSettings,
    pub zeros: SearchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleZeroResult {
    pub poles: Vec<Root>,
    pub zeros: Vec<Root>,
    /// First non-ok status of the searches that ran, poles first.
    pub status: SearchStatus,
    pub pole_search: Option<RootSearchOutcome>,
    pub zero_search: Option<RootSearchOutcome>,
}

/// Snapshot of a running analysis, shaped for batch runners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoleZeroProgress {
    pub done: bool,
    /// The search currently running, if any.
    pub phase: Option<SearchKind>,
    pub iterations: usize,
    pub poles_found: usize,
    pub zeros_found: usize,
}

/// Stepped pole-then-zero analysis.
pub struct PoleZeroRunner<P, Z> {
    poles: Option<RootSearch<P>>,
    zeros: Option<RootSearch<Z>>,
    pole_outcome: Option<RootSearchOutcome>,
    zero_outcome: Option<RootSearchOutcome>,
    failed: bool,
}

impl<P: TransferOracle, Z: TransferOracle> PoleZeroRunner<P, Z> {
    pub fn new(pole_oracle: P, zero_oracle: Z, settings: &PoleZeroSettings) -> Result<Self> {
        let poles = if settings.kind.wants_poles() {
            Some(RootSearch::new(pole_oracle, settings.poles, SearchKind::Poles)?)
        } else {
            None
        };
        let zeros = if settings.kind.wants_zeros() {
            Some(RootSearch::new(zero_oracle, settings.zeros, SearchKind::Zeros)?)
        } else {
            None
        };
        Ok(Self {
            poles,
            zeros,
            pole_outcome: None,
            zero_outcome: None,
            failed: false,
        })
    }

    /// Shares one interrupt flag between both searches.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.poles = self.poles.map(|search| search.with_interrupt(flag.clone()));
        self.zeros = self.zeros.map(|search| search.with_interrupt(flag));
        self
    }

    pub fn is_done(&self) -> bool {
        self.poles.is_none() && self.zeros.is_none()
    }

    /// Runs one outer iteration of whichever search is current. Returns `true` once
    /// the analysis has finished.
    ///
    /// A hard error ends the analysis; no result is produced afterwards.
    pub fn step(&mut self, sink: &mut dyn DiagnosticSink) -> Result<bool> {
        if let Some(search) = self.poles.as_mut() {
            let status = match search.step(sink) {
                Ok(Some(status)) => status,
                Ok(None) => return Ok(false),
                Err(err) => {
                    self.abort();
                    return Err(err);
                }
            };
            self.pole_outcome = self.poles.take().and_then(RootSearch::into_outcome);
            if status == SearchStatus::Cancelled {
                info!("pole search cancelled; skipping zero search");
                self.zeros = None;
            } else if self.zeros.is_some() {
                info!(%status, "pole search complete; starting zero search");
            }
            return Ok(self.is_done());
        }
        if let Some(search) = self.zeros.as_mut() {
            match search.step(sink) {
                Ok(Some(_)) => {
                    self.zero_outcome = self.zeros.take().and_then(RootSearch::into_outcome);
                }
                Ok(None) => return Ok(false),
                Err(err) => {
                    self.abort();
                    return Err(err);
                }
            }
        }
        Ok(true)
    }

    pub fn progress(&self) -> PoleZeroProgress {
        let (phase, current) = match (&self.poles, &self.zeros) {
            (Some(search), _) => (Some(SearchKind::Poles), Some(search.state())),
            (None, Some(search)) => (Some(SearchKind::Zeros), Some(search.state())),
            (None, None) => (None, None),
        };
        let finished_iterations = [&self.pole_outcome, &self.zero_outcome]
            .into_iter()
            .flatten()
            .map(|outcome| outcome.stats.iterations)
            .sum::<usize>();
        let found = |outcome: &Option<RootSearchOutcome>, kind: SearchKind| {
            outcome
                .as_ref()
                .map(|o| o.stats.roots_found)
                .or_else(|| current.filter(|_| phase == Some(kind)).map(|s| s.roots_found))
                .unwrap_or(0)
        };
        PoleZeroProgress {
            done: self.is_done(),
            phase,
            iterations: finished_iterations + current.map_or(0, |s| s.total_iterations),
            poles_found: found(&self.pole_outcome, SearchKind::Poles),
            zeros_found: found(&self.zero_outcome, SearchKind::Zeros),
        }
    }

    /// The combined result, once every requested search has finished.
    pub fn result(&self) -> Option<PoleZeroResult> {
        if !self.is_done() || self.failed {
            return None;
        }
        Some(combine(self.pole_outcome.clone(), self.zero_outcome.clone()))
    }

    pub fn run(mut self, sink: &mut dyn DiagnosticSink) -> Result<PoleZeroResult> {
        while !self.step(sink)? {}
        let result = combine(self.pole_outcome, self.zero_outcome);
        info!(
            status = %result.status,
            poles = result.poles.len(),
            zeros = result.zeros.len(),
            "pole-zero analysis finished"
        );
        Ok(result)
    }

    fn abort(&mut self) {
        self.poles = None;
        self.zeros = None;
        self.failed = true;
    }
}

fn combine(
    pole_search: Option<RootSearchOutcome>,
    zero_search: Option<RootSearchOutcome>,
) -> PoleZeroResult {
    let status = [&pole_search, &zero_search]
        .into_iter()
        .flatten()
        .map(|outcome| outcome.status)
        .find(|status| !status.is_ok())
        .unwrap_or(SearchStatus::Ok);
    let roots = |outcome: &Option<RootSearchOutcome>| {
        outcome.as_ref().map(|o| o.roots.clone()).unwrap_or_default()
    };
    PoleZeroResult {
        poles: roots(&pole_search),
        zeros: roots(&zero_search),
        status,
        pole_search,
        zero_search,
    }
}

/// One-shot pole-zero analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoleZeroAnalysis {
    pub settings: PoleZeroSettings,
}

impl PoleZeroAnalysis {
    pub fn new(settings: PoleZeroSettings) -> Self {
        Self { settings }
    }

    pub fn run<P, Z>(
        &self,
        pole_oracle: P,
        zero_oracle: Z,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PoleZeroResult>
    where
        P: TransferOracle,
        Z: TransferOracle,
    {
        PoleZeroRunner::new(pole_oracle, zero_oracle, &self.settings)?.run(sink)
    }
}

/// Poles and zeros of `H(s) = numerator(s) / denominator(s)`.
pub fn analyze_rational(
    h: &RationalFunction,
    settings: &PoleZeroSettings,
    sink: &mut dyn DiagnosticSink,
) -> Result<PoleZeroResult> {
    PoleZeroAnalysis::new(*settings).run(h.pole_oracle(), h.zero_oracle(), sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::oracle::{Evaluation, FnOracle, OracleError};
    use num_complex::Complex64;

    fn example() -> RationalFunction {
        // (s + 1) / ((s - 2)(s - 5))
        RationalFunction::from_coefficients(vec![1.0, 1.0], vec![10.0, -7.0, 1.0])
            .expect("rational")
    }

    #[test]
    fn poles_then_zeros() {
        let result = analyze_rational(&example(), &PoleZeroSettings::default(), &mut NullSink)
            .expect("analysis");
        assert_eq!(result.status, SearchStatus::Ok);
        let poles: Vec<f64> = result.poles.iter().map(|r| r.value.re).collect();
        assert_eq!(poles.len(), 2);
        assert!((poles[0] - 2.0).abs() < 1e-9);
        assert!((poles[1] - 5.0).abs() < 1e-9);
        assert_eq!(result.zeros.len(), 1);
        assert!((result.zeros[0].value.re + 1.0).abs() < 1e-9);
    }

    #[test]
    fn kind_limits_the_searches() {
        let settings = PoleZeroSettings {
            kind: PzKind::Poles,
            ..PoleZeroSettings::default()
        };
        let result = analyze_rational(&example(), &settings, &mut NullSink).expect("analysis");
        assert_eq!(result.poles.len(), 2);
        assert!(result.zeros.is_empty());
        assert!(result.zero_search.is_none());
    }

    #[test]
    fn cancelled_pole_search_skips_zeros() {
        let flag = Arc::new(AtomicBool::new(true));
        let h = example();
        let settings = PoleZeroSettings::default();
        let mut runner = PoleZeroRunner::new(h.pole_oracle(), h.zero_oracle(), &settings)
            .expect("runner")
            .with_interrupt(flag);
        assert!(runner.step(&mut NullSink).expect("step"));
        let result = runner.result().expect("finished");
        assert_eq!(result.status, SearchStatus::Cancelled);
        assert!(result.zero_search.is_none());
        assert!(result.poles.is_empty());
    }

    #[test]
    fn progress_tracks_the_current_phase() {
        let h = example();
        let settings = PoleZeroSettings::default();
        let mut runner =
            PoleZeroRunner::new(h.pole_oracle(), h.zero_oracle(), &settings).expect("runner");
        assert_eq!(runner.progress().phase, Some(SearchKind::Poles));
        assert!(runner.result().is_none());
        let mut steps = 0;
        while !runner.step(&mut NullSink).expect("step") {
            steps += 1;
            assert!(steps < 1000, "analysis did not terminate");
        }
        let progress = runner.progress();
        assert!(progress.done);
        assert_eq!(progress.phase, None);
        assert_eq!(progress.poles_found, 2);
        assert_eq!(progress.zeros_found, 1);
        assert!(progress.iterations > 0);
    }

    #[test]
    fn oracle_failure_ends_the_analysis() {
        let failing = FnOracle::new(
            2,
            |_s: Complex64| -> std::result::Result<Evaluation, OracleError> {
                Err(OracleError::Allocation)
            },
        );
        let zeros = FnOracle::new(1, |s: Complex64| Ok(Evaluation::from_complex(s)));
        let mut runner =
            PoleZeroRunner::new(failing, zeros, &PoleZeroSettings::default()).expect("runner");
        assert!(runner.step(&mut NullSink).is_err());
        assert!(runner.is_done());
        assert!(runner.result().is_none());
    }
}
