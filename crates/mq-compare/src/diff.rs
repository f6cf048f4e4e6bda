//! Operation-by-operation comparison of encoder and decoder traces.
//!
//! Walks both aligned streams in lockstep over a bounded window and stops
//! at the first operation whose post-operation state differs.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::align::{AlignedOperations, OperationRecord};
use crate::config::{AlignmentMode, CompareOptions};
use crate::error::AlignmentError;
use crate::report::ComparisonReport;
use crate::snapshot::{RegisterState, StateSnapshot, decoded_bit};
use crate::trace::{ParsedTrace, TraceLine};

/// What differs at a divergent operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DivergenceKind {
    /// `newState`/`newMPS` after the operation.
    Snapshot {
        encoder: StateSnapshot,
        decoder: StateSnapshot,
    },
    /// Context label used for the operation.
    Context { encoder: u64, decoder: u64 },
    /// Probability state going into the operation.
    CoderState {
        encoder: StateSnapshot,
        decoder: StateSnapshot,
    },
    /// A register going into the operation.
    Register { encoder: u32, decoder: u32 },
    /// Bit the encoder coded vs. bit the decoder recovered.
    Bit { encoder: u8, decoder: u8 },
}

impl core::fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DivergenceKind::Snapshot { encoder, decoder } => {
                write!(f, "STATE MISMATCH: enc={} dec={}", encoder, decoder)
            }
            DivergenceKind::Context { encoder, decoder } => {
                write!(f, "CONTEXT MISMATCH: enc ctx={} dec ctx={}", encoder, decoder)
            }
            DivergenceKind::CoderState { encoder, decoder } => write!(
                f,
                "STATE MISMATCH BEFORE OPERATION (same context): enc={} dec={}",
                encoder, decoder
            ),
            DivergenceKind::Register { encoder, decoder } => write!(
                f,
                "A REGISTER MISMATCH (same context, same state): enc A=0x{:04x} dec A=0x{:04x}",
                encoder, decoder
            ),
            DivergenceKind::Bit { encoder, decoder } => write!(
                f,
                "BIT MISMATCH (same context, state and A): enc bit={} dec bit={}",
                encoder, decoder
            ),
        }
    }
}

/// First point where the two coders disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// 1-based position within the comparison window.
    pub operation: usize,
    pub encoder_index: u64,
    pub decoder_index: u64,
    pub kind: DivergenceKind,
}

impl core::fmt::Display for Divergence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "operation #{}: {}", self.operation, self.kind)
    }
}

/// Outcome for a single examined operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Match { snapshot: StateSnapshot },
    /// At least one AFTER payload had no state fields.
    Skipped,
    Mismatch { kind: DivergenceKind },
}

/// Payloads and verdict for one examined operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBlock {
    pub operation: usize,
    pub encoder_index: u64,
    pub decoder_index: u64,
    pub enc_before: String,
    pub enc_after: String,
    pub dec_before: String,
    pub dec_after: String,
    pub verdict: Verdict,
}

impl OperationBlock {
    fn new(
        operation: usize,
        enc: &OperationRecord<'_>,
        dec: &OperationRecord<'_>,
        verdict: Verdict,
    ) -> Self {
        Self {
            operation,
            encoder_index: enc.index(),
            decoder_index: dec.index(),
            enc_before: enc.before.payload.clone(),
            enc_after: enc.after.payload.clone(),
            dec_before: dec.before.payload.clone(),
            dec_after: dec.after.payload.clone(),
            verdict,
        }
    }
}

/// How a comparison run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every operation in the window was examined without a mismatch.
    Exhausted,
    /// Stopped at the first mismatching operation.
    Diverged,
}

#[derive(Debug, Clone, Default)]
pub struct DivergenceComparator {
    options: CompareOptions,
}

impl DivergenceComparator {
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    pub fn compare(&self, trace: &ParsedTrace) -> Result<ComparisonReport, AlignmentError> {
        self.compare_streams(&trace.encoder, &trace.decoder)
    }

    /// Compare the two streams and stop at the first divergence.
    ///
    /// At most `min(encoder ops, decoder ops, window)` operations are
    /// examined.
    pub fn compare_streams(
        &self,
        encoder: &[TraceLine],
        decoder: &[TraceLine],
    ) -> Result<ComparisonReport, AlignmentError> {
        let aligned = AlignedOperations::from_streams(encoder, decoder, self.options.alignment)?;
        let limit = aligned
            .encoder
            .len()
            .min(aligned.decoder.len())
            .min(self.options.window);

        let mut report = ComparisonReport::new(
            self.options,
            aligned.encoder.len(),
            aligned.decoder.len(),
            limit,
        );

        let pairs = aligned.encoder.iter().zip(&aligned.decoder).take(limit);
        for (i, (enc, dec)) in pairs.enumerate() {
            let operation = i + 1;
            if self.options.alignment == AlignmentMode::Indexed && enc.index() != dec.index() {
                return Err(AlignmentError::IndexMismatch {
                    position: operation,
                    encoder_index: enc.index(),
                    decoder_index: dec.index(),
                });
            }

            let verdict = self.judge(enc, dec);
            let mismatch = match &verdict {
                Verdict::Mismatch { kind } => Some(kind.clone()),
                _ => None,
            };
            report.push(OperationBlock::new(operation, enc, dec, verdict));

            if let Some(kind) = mismatch {
                let divergence = Divergence {
                    operation,
                    encoder_index: enc.index(),
                    decoder_index: dec.index(),
                    kind,
                };
                info!(%divergence, "first divergence found");
                report.finish(Termination::Diverged, Some(divergence));
                return Ok(report);
            }
        }

        debug!(examined = report.examined(), "no divergence within window");
        report.finish(Termination::Exhausted, None);
        Ok(report)
    }

    fn judge(&self, enc: &OperationRecord<'_>, dec: &OperationRecord<'_>) -> Verdict {
        if self.options.check_registers
            && let Some(kind) = register_divergence(enc, dec)
        {
            return Verdict::Mismatch { kind };
        }

        let enc_state = StateSnapshot::extract(&enc.after.payload);
        let dec_state = StateSnapshot::extract(&dec.after.payload);
        match (enc_state, dec_state) {
            (Some(e), Some(d)) if e == d => Verdict::Match { snapshot: e },
            (Some(e), Some(d)) => Verdict::Mismatch {
                kind: DivergenceKind::Snapshot {
                    encoder: e,
                    decoder: d,
                },
            },
            _ => Verdict::Skipped,
        }
    }
}

/// Compare with default options.
pub fn compare(
    encoder: &[TraceLine],
    decoder: &[TraceLine],
) -> Result<ComparisonReport, AlignmentError> {
    DivergenceComparator::default().compare_streams(encoder, decoder)
}

/// Check the BEFORE register dumps in priority order: context, state, A, bit.
///
/// Returns `None` when either side lacks a register dump.
fn register_divergence(
    enc: &OperationRecord<'_>,
    dec: &OperationRecord<'_>,
) -> Option<DivergenceKind> {
    let e = RegisterState::extract(&enc.before.payload)?;
    let d = RegisterState::extract(&dec.before.payload)?;

    if e.context != d.context {
        return Some(DivergenceKind::Context {
            encoder: e.context,
            decoder: d.context,
        });
    }
    if e.state != d.state || e.mps != d.mps {
        return Some(DivergenceKind::CoderState {
            encoder: StateSnapshot::new(e.state, e.mps),
            decoder: StateSnapshot::new(d.state, d.mps),
        });
    }
    if e.a != d.a {
        return Some(DivergenceKind::Register {
            encoder: e.a,
            decoder: d.a,
        });
    }

    let enc_bit = e.bit?;
    let dec_bit = decoded_bit(&dec.after.payload)?;
    (enc_bit != dec_bit).then_some(DivergenceKind::Bit {
        encoder: enc_bit,
        decoder: dec_bit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Phase;

    fn op(index: u64, before: &str, after: &str) -> [TraceLine; 2] {
        [
            TraceLine::new(index, Phase::Before, before),
            TraceLine::new(index, Phase::After, after),
        ]
    }

    fn stream(ops: &[(&str, &str)]) -> Vec<TraceLine> {
        ops.iter()
            .enumerate()
            .flat_map(|(i, (before, after))| op(i as u64 + 1, before, after))
            .collect()
    }

    #[test]
    fn test_identical_streams_exhaust() {
        let s = stream(&[("b", "newState=1 newMPS=0"), ("b", "newState=2 newMPS=0")]);
        let report = compare(&s, &s).unwrap();
        assert_eq!(report.termination, Termination::Exhausted);
        assert_eq!(report.examined(), 2);
        assert!(report.divergence.is_none());
    }

    #[test]
    fn test_snapshot_mismatch_stops() {
        let enc = stream(&[("b", "newState=1 newMPS=0"), ("b", "newState=2 newMPS=0")]);
        let dec = stream(&[("b", "newState=1 newMPS=1"), ("b", "newState=2 newMPS=0")]);
        let report = compare(&enc, &dec).unwrap();
        assert_eq!(report.termination, Termination::Diverged);
        assert_eq!(report.examined(), 1);
        let div = report.divergence.unwrap();
        assert_eq!(div.operation, 1);
        assert_eq!(
            div.kind,
            DivergenceKind::Snapshot {
                encoder: StateSnapshot::new(1, 0),
                decoder: StateSnapshot::new(1, 1),
            }
        );
    }

    #[test]
    fn test_missing_snapshot_is_skipped() {
        let enc = stream(&[("b", "bit=1"), ("b", "newState=2 newMPS=0")]);
        let dec = stream(&[("b", "newState=9 newMPS=1"), ("b", "newState=2 newMPS=0")]);
        let report = compare(&enc, &dec).unwrap();
        assert_eq!(report.blocks[0].verdict, Verdict::Skipped);
        assert_eq!(
            report.blocks[1].verdict,
            Verdict::Match {
                snapshot: StateSnapshot::new(2, 0)
            }
        );
    }

    #[test]
    fn test_oversized_snapshot_values_diverge() {
        let enc = stream(&[("b", "newState=5 newMPS=1"), ("b", "newState=6 newMPS=1")]);
        let dec = stream(&[("b", "newState=5 newMPS=257"), ("b", "newState=6 newMPS=1")]);
        let report = compare(&enc, &dec).unwrap();
        assert_eq!(report.termination, Termination::Diverged);
        assert_eq!(
            report.divergence.unwrap().kind,
            DivergenceKind::Snapshot {
                encoder: StateSnapshot::new(5, 1),
                decoder: StateSnapshot::new(5, 257),
            }
        );

        let dec = stream(&[("b", "newState=99999999999 newMPS=1")]);
        let report = compare(&enc[..2], &dec).unwrap();
        assert!(!report.passed());
        assert_eq!(report.examined(), 1);
    }

    #[test]
    fn test_register_checks_off_by_default() {
        let enc = stream(&[("ctx=1 state=0 mps=0 A=0x8000 C=0x0 ct=12", "newState=1 newMPS=0")]);
        let dec = stream(&[("ctx=2 state=0 mps=0 A=0x8000 C=0x0 ct=12", "newState=1 newMPS=0")]);
        let report = compare(&enc, &dec).unwrap();
        assert_eq!(report.termination, Termination::Exhausted);
    }

    #[test]
    fn test_register_priority() {
        let comparator =
            DivergenceComparator::new(CompareOptions::default().with_register_checks(true));
        let enc = stream(&[(
            "bit=1 ctx=3 state=4 mps=0 A=0x8000 C=0x0 ct=12",
            "newState=5 newMPS=0",
        )]);

        let cases = [
            ("ctx=9 state=7 mps=0 A=0x9000 C=0x0 ct=1", "bit=0", "context"),
            ("ctx=3 state=7 mps=0 A=0x9000 C=0x0 ct=1", "bit=0", "coder_state"),
            ("ctx=3 state=4 mps=0 A=0x9000 C=0x0 ct=1", "bit=0", "register"),
            ("ctx=3 state=4 mps=0 A=0x8000 C=0x0 ct=1", "bit=0", "bit"),
        ];
        for (before, after, expected) in cases {
            let dec = stream(&[(before, after)]);
            let report = comparator.compare_streams(&enc, &dec).unwrap();
            let kind = report.divergence.expect("divergence").kind;
            let tag = serde_json::to_value(kind).unwrap()["kind"].clone();
            assert_eq!(tag, expected, "decoder before={before}");
        }
    }

    #[test]
    fn test_register_match_falls_through_to_snapshot() {
        let comparator =
            DivergenceComparator::new(CompareOptions::default().with_register_checks(true));
        let enc = stream(&[(
            "bit=1 ctx=3 state=4 mps=0 A=0x8000 C=0x0 ct=12",
            "newState=5 newMPS=0",
        )]);
        let dec = stream(&[(
            "ctx=3 state=4 mps=0 A=0x8000 C=0x7fff00 ct=5",
            "bit=1 newState=5 newMPS=1",
        )]);
        let report = comparator.compare_streams(&enc, &dec).unwrap();
        assert!(matches!(
            report.divergence.unwrap().kind,
            DivergenceKind::Snapshot { .. }
        ));
    }

    #[test]
    fn test_indexed_mismatch_between_sides() {
        let enc = stream(&[("b", "newState=1 newMPS=0")]);
        let dec = op(2, "b", "newState=1 newMPS=0").to_vec();
        let err = compare(&enc, &dec).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::IndexMismatch {
                position: 1,
                encoder_index: 1,
                decoder_index: 2
            }
        );

        let positional = DivergenceComparator::new(
            CompareOptions::default().with_alignment(AlignmentMode::Positional),
        );
        assert!(positional.compare_streams(&enc, &dec).is_ok());
    }

    #[test]
    fn test_divergence_display() {
        let div = Divergence {
            operation: 3,
            encoder_index: 3,
            decoder_index: 3,
            kind: DivergenceKind::Register {
                encoder: 0x8000,
                decoder: 0x5601,
            },
        };
        assert_eq!(
            div.to_string(),
            "operation #3: A REGISTER MISMATCH (same context, same state): enc A=0x8000 dec A=0x5601"
        );
    }
}
