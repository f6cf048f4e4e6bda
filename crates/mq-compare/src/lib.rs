//! Differential debugging of MQ arithmetic coder traces.
//!
//! Parses `[MQE #n BEFORE|AFTER]` encoder and `[MQC #n BEFORE|AFTER]`
//! decoder trace lines, aligns the two streams operation by operation and
//! reports the first operation where their coder state diverges.

pub mod align;
pub mod config;
pub mod diff;
pub mod error;
pub mod report;
pub mod snapshot;
pub mod source;
pub mod trace;

pub use config::{AlignmentMode, CompareOptions, HarnessConfig};
pub use diff::{Divergence, DivergenceComparator, DivergenceKind, Termination, Verdict};
pub use error::{AlignmentError, Error, Result, SourceError};
pub use report::ComparisonReport;
pub use snapshot::StateSnapshot;
pub use source::{CommandSource, FileSource, TextSource, TraceSource};
pub use trace::{ParsedTrace, Phase, Side, TraceLine};

/// Read a trace from `source`, parse it and compare the two streams.
pub fn run(source: &mut dyn TraceSource, options: CompareOptions) -> Result<ComparisonReport> {
    tracing::debug!(source = %source.describe(), "reading trace");
    let text = source.read_trace()?;
    let trace = trace::parse_text(&text);
    let report = DivergenceComparator::new(options).compare(&trace)?;
    Ok(report)
}
