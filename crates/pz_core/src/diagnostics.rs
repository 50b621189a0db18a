//! Observational trace of a root search.
//!
//! Sinks only watch; nothing they record feeds back into the search.

use crate::scaled::ScaledComplex;
use crate::search::{SearchKind, SearchStatus, Strategy, Trap};
use num_complex::Complex64;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TraceEvent {
    StrategyChosen {
        kind: SearchKind,
        iteration: usize,
        strategy: Strategy,
        trap: Trap,
    },
    TrialEvaluated {
        kind: SearchKind,
        s: Complex64,
        deflated: ScaledComplex,
    },
    RootConfirmed {
        kind: SearchKind,
        value: Complex64,
        multiplicity: usize,
        pruned: usize,
    },
    Minimum {
        kind: SearchKind,
        s: Complex64,
    },
    Aberration {
        kind: SearchKind,
        s: Complex64,
        count: usize,
    },
    /// Retries converged onto a point that is not a root and already had its chance.
    Stalled {
        kind: SearchKind,
        s: Complex64,
        count: usize,
    },
    Terminated {
        kind: SearchKind,
        status: SearchStatus,
        roots: usize,
        iterations: usize,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::StrategyChosen {
                kind,
                iteration,
                strategy,
                trap,
            } => write!(
                f,
                "{kind} search iteration {iteration}: {strategy} (trap {})",
                trap.code()
            ),
            TraceEvent::TrialEvaluated { kind, s, deflated } => write!(
                f,
                "{kind} trial at {s}: {} * 2^{}",
                deflated.mantissa, deflated.exponent
            ),
            TraceEvent::RootConfirmed {
                kind,
                value,
                multiplicity,
                pruned,
            } => write!(
                f,
                "{kind} found at {value} (multiplicity {multiplicity}, pruned {pruned})"
            ),
            TraceEvent::Minimum { kind, s } => {
                write!(f, "{kind} search: magnitude minimum at {s}")
            }
            TraceEvent::Aberration { kind, s, count } => {
                write!(f, "{kind} search: numerical aberration #{count} at {s}")
            }
            TraceEvent::Stalled { kind, s, count } => {
                write!(f, "{kind} search: stalled #{count} at {s}")
            }
            TraceEvent::Terminated {
                kind,
                status,
                roots,
                iterations,
            } => write!(
                f,
                "{kind} search finished: {status}, {roots} roots after {iterations} iterations"
            ),
        }
    }
}

/// Receives trace events from a running search.
pub trait DiagnosticSink {
    fn record(&mut self, event: &TraceEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _event: &TraceEvent) {}
}

impl DiagnosticSink for Vec<TraceEvent> {
    fn record(&mut self, event: &TraceEvent) {
        self.push(event.clone());
    }
}

/// Forwards events to `tracing` at trace level, and root/termination events at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::RootConfirmed { .. } | TraceEvent::Terminated { .. } => {
                tracing::debug!(target: "pz_core::trace", "{event}");
            }
            _ => tracing::trace!(target: "pz_core::trace", "{event}"),
        }
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn record(&mut self, event: &TraceEvent) {
        (**self).record(event);
    }
}
