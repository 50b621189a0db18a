//! The `pz_core` crate locates the poles and zeros of a linearized network.
//!
//! It samples a transfer-function oracle in the complex frequency plane and
//! converges on its roots one at a time, deflating each confirmed root out of
//! the samples it keeps.
//!
//! Key components:
//! - **Scaled arithmetic**: mantissa/exponent numbers that keep long products of
//!   deflation factors in range.
//! - **Search**: the trial repository, strategy selector, interpolators and the
//!   stepped [`RootSearch`] driver.
//! - **Oracles**: the [`TransferOracle`] trait, plus polynomial, rational and
//!   nodal-network implementations.
//! - **Analysis**: pole search followed by zero search, in one shot or stepped.
pub mod analysis;
pub mod diagnostics;
pub mod error;
pub mod network;
pub mod oracle;
pub mod polynomial;
pub mod scaled;
pub mod search;

pub use analysis::{
    analyze_rational, PoleZeroAnalysis, PoleZeroProgress, PoleZeroResult, PoleZeroRunner,
    PoleZeroSettings, PzKind,
};
pub use diagnostics::{DiagnosticSink, NullSink, TraceEvent, TracingSink};
pub use error::{PzError, Result};
pub use network::{LinearNetwork, NetworkOracle};
pub use oracle::{Evaluation, FnOracle, OracleError, TransferOracle};
pub use polynomial::{Polynomial, PolynomialOracle, RationalFunction};
pub use scaled::{ScaledComplex, ScaledReal};
pub use search::{
    Root, RootSearch, RootSearchOutcome, SearchKind, SearchSettings, SearchStats, SearchStatus,
};
