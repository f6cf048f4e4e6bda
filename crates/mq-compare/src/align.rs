//! Grouping of trace lines into BEFORE/AFTER operation records.
//!
//! Two policies are available. Positional pairing takes lines two at a time
//! and trusts the stream to alternate. Indexed pairing keys every line by
//! the operation number in its tag and refuses streams with duplicate,
//! orphaned, reordered or skipped markers.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::AlignmentMode;
use crate::error::AlignmentError;
use crate::trace::{ParsedTrace, Phase, Side, TraceLine};

/// One coding operation as seen by one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRecord<'a> {
    pub before: &'a TraceLine,
    pub after: &'a TraceLine,
}

impl OperationRecord<'_> {
    /// Operation number taken from the BEFORE tag.
    pub fn index(&self) -> u64 {
        self.before.index
    }
}

/// Operation records for both sides, in operation order.
#[derive(Debug, Clone, Default)]
pub struct AlignedOperations<'a> {
    pub encoder: Vec<OperationRecord<'a>>,
    pub decoder: Vec<OperationRecord<'a>>,
}

impl<'a> AlignedOperations<'a> {
    pub fn build(trace: &'a ParsedTrace, mode: AlignmentMode) -> Result<Self, AlignmentError> {
        Self::from_streams(&trace.encoder, &trace.decoder, mode)
    }

    pub fn from_streams(
        encoder: &'a [TraceLine],
        decoder: &'a [TraceLine],
        mode: AlignmentMode,
    ) -> Result<Self, AlignmentError> {
        let aligned = Self {
            encoder: pair(Side::Encoder, encoder, mode)?,
            decoder: pair(Side::Decoder, decoder, mode)?,
        };
        debug!(
            %mode,
            encoder_ops = aligned.encoder.len(),
            decoder_ops = aligned.decoder.len(),
            "aligned operations"
        );
        Ok(aligned)
    }
}

pub fn pair(
    side: Side,
    lines: &[TraceLine],
    mode: AlignmentMode,
) -> Result<Vec<OperationRecord<'_>>, AlignmentError> {
    match mode {
        AlignmentMode::Positional => Ok(pair_positional(lines)),
        AlignmentMode::Indexed => pair_indexed(side, lines),
    }
}

/// Pair lines `2i` and `2i + 1`. A trailing unpaired line is ignored.
pub fn pair_positional(lines: &[TraceLine]) -> Vec<OperationRecord<'_>> {
    lines
        .chunks_exact(2)
        .map(|pair| OperationRecord {
            before: &pair[0],
            after: &pair[1],
        })
        .collect()
}

#[derive(Default)]
struct Slot {
    before: Option<usize>,
    after: Option<usize>,
}

/// Pair lines by tag index, ordered by index.
///
/// Every index must have exactly one BEFORE followed by exactly one AFTER,
/// and indices must be consecutive.
pub fn pair_indexed(
    side: Side,
    lines: &[TraceLine],
) -> Result<Vec<OperationRecord<'_>>, AlignmentError> {
    let mut slots: BTreeMap<u64, Slot> = BTreeMap::new();

    for (pos, line) in lines.iter().enumerate() {
        let slot = slots.entry(line.index).or_default();
        let target = match line.phase {
            Phase::Before => &mut slot.before,
            Phase::After => &mut slot.after,
        };
        if target.is_some() {
            return Err(AlignmentError::DuplicatePhase {
                side,
                index: line.index,
                phase: line.phase,
            });
        }
        *target = Some(pos);
    }

    let mut records = Vec::with_capacity(slots.len());
    let mut previous: Option<u64> = None;

    for (&index, slot) in &slots {
        if let Some(prev) = previous
            && index != prev + 1
        {
            return Err(AlignmentError::IndexGap {
                side,
                previous: prev,
                next: index,
            });
        }
        let missing = |phase| AlignmentError::MissingPhase { side, index, phase };
        let before = slot.before.ok_or_else(|| missing(Phase::Before))?;
        let after = slot.after.ok_or_else(|| missing(Phase::After))?;
        if after < before {
            return Err(AlignmentError::PhaseOrder { side, index });
        }
        records.push(OperationRecord {
            before: &lines[before],
            after: &lines[after],
        });
        previous = Some(index);
    }

    Ok(records)
}
