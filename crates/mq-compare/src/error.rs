//! Error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::trace::{Phase, Side};

/// Structural problems found while pairing lines by operation index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("{side} operation #{index}: {phase} marker appears more than once")]
    DuplicatePhase { side: Side, index: u64, phase: Phase },

    #[error("{side} operation #{index}: {phase} marker is missing")]
    MissingPhase { side: Side, index: u64, phase: Phase },

    #[error("{side} operation #{index}: AFTER marker precedes BEFORE marker")]
    PhaseOrder { side: Side, index: u64 },

    #[error("{side} stream skips from operation #{previous} to #{next}")]
    IndexGap { side: Side, previous: u64, next: u64 },

    #[error(
        "operation {position}: encoder is at #{encoder_index} but decoder is at #{decoder_index}"
    )]
    IndexMismatch {
        /// 1-based position within the comparison window.
        position: usize,
        encoder_index: u64,
        decoder_index: u64,
    },
}

/// Failures producing the raw trace text.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("working directory {} does not exist", path.display())]
    WorkingDir { path: PathBuf },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read trace file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save captured output to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure of a full source-to-report run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("streams are misaligned: {0}")]
    Alignment(#[from] AlignmentError),
}

pub type Result<T> = std::result::Result<T, Error>;
