//! Trace line extraction.
//!
//! Projects free-form harness output onto typed `TraceLine` records using
//! two fixed tag grammars, one per coder side:
//!
//! ```text
//! [MQE #<index> <BEFORE|AFTER>]<payload>   encoder
//! [MQC #<index> <BEFORE|AFTER>]<payload>   decoder
//! ```
//!
//! Lines matching neither grammar are dropped without a record.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

static ENCODER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[MQE #(\d+) (BEFORE|AFTER)\](.+)").expect("encoder tag pattern is valid")
});

static DECODER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[MQC #(\d+) (BEFORE|AFTER)\](.+)").expect("decoder tag pattern is valid")
});

/// Which coder implementation emitted a line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Side {
    #[strum(serialize = "encoder")]
    Encoder,
    #[strum(serialize = "decoder")]
    Decoder,
}

impl Side {
    /// Tag prefix used by this side's instrumentation.
    pub fn tag(self) -> &'static str {
        match self {
            Side::Encoder => "MQE",
            Side::Decoder => "MQC",
        }
    }

    fn grammar(self) -> &'static Regex {
        match self {
            Side::Encoder => &*ENCODER_TAG,
            Side::Decoder => &*DECODER_TAG,
        }
    }
}

/// Marker position relative to the coding operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Phase {
    #[strum(serialize = "BEFORE")]
    Before,
    #[strum(serialize = "AFTER")]
    After,
}

/// One tagged line of a coder trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
    /// Operation number embedded in the tag.
    pub index: u64,
    pub phase: Phase,
    /// Remainder of the line after the tag, trimmed.
    pub payload: String,
}

impl TraceLine {
    pub fn new(index: u64, phase: Phase, payload: impl Into<String>) -> Self {
        Self {
            index,
            phase,
            payload: payload.into(),
        }
    }
}

/// Both streams extracted from one harness run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTrace {
    pub encoder: Vec<TraceLine>,
    pub decoder: Vec<TraceLine>,
}

impl ParsedTrace {
    pub fn stream(&self, side: Side) -> &[TraceLine] {
        match side {
            Side::Encoder => &self.encoder,
            Side::Decoder => &self.decoder,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty() && self.decoder.is_empty()
    }
}

/// Match a single line against both grammars.
///
/// Returns `None` for untagged lines, and for tagged lines whose index does
/// not fit in a `u64`.
pub fn parse_line(line: &str) -> Option<(Side, TraceLine)> {
    [Side::Encoder, Side::Decoder].into_iter().find_map(|side| {
        let caps = side.grammar().captures(line)?;
        let index = caps[1].parse::<u64>().ok()?;
        let phase = Phase::from_str(&caps[2]).ok()?;
        let payload = caps[3].trim();
        Some((side, TraceLine::new(index, phase, payload)))
    })
}

/// Split tagged lines into the encoder and decoder streams, in input order.
pub fn parse<I, S>(lines: I) -> ParsedTrace
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut trace = ParsedTrace::default();
    let mut dropped = 0usize;

    for line in lines {
        match parse_line(line.as_ref()) {
            Some((Side::Encoder, record)) => trace.encoder.push(record),
            Some((Side::Decoder, record)) => trace.decoder.push(record),
            None => dropped += 1,
        }
    }

    debug!(
        encoder_lines = trace.encoder.len(),
        decoder_lines = trace.decoder.len(),
        dropped,
        "parsed trace"
    );
    trace
}

/// Convenience wrapper over [`parse`] for a whole captured output.
pub fn parse_text(text: &str) -> ParsedTrace {
    parse(text.lines())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let trace = parse(Vec::<String>::new());
        assert!(trace.encoder.is_empty());
        assert!(trace.decoder.is_empty());
    }

    #[test]
    fn test_encoder_line() {
        let trace = parse(["[MQE #7 BEFORE] foo"]);
        assert_eq!(trace.encoder, vec![TraceLine::new(7, Phase::Before, "foo")]);
        assert!(trace.decoder.is_empty());
    }

    #[test]
    fn test_decoder_line_keeps_inner_spacing() {
        let (side, line) =
            parse_line("[MQC #12 AFTER]   bit=1 newState=3  newMPS=0  ").unwrap();
        assert_eq!(side, Side::Decoder);
        assert_eq!(line.index, 12);
        assert_eq!(line.phase, Phase::After);
        assert_eq!(line.payload, "bit=1 newState=3  newMPS=0");
    }

    #[test]
    fn test_tag_must_start_line() {
        assert!(parse_line("t1_test.go:42: [MQE #1 BEFORE] bit=0").is_none());
    }

    #[test]
    fn test_empty_remainder_is_not_a_match() {
        assert!(parse_line("[MQE #1 AFTER]").is_none());
    }

    #[test]
    fn test_malformed_tags_dropped() {
        for line in [
            "[MQE #x BEFORE] a",
            "[MQE 1 BEFORE] a",
            "[MQE #1 DURING] a",
            "[MQC #1 AFTER ] bit=1",
            "[MQX #1 AFTER] a",
            "[MQE #99999999999999999999999 AFTER] overflow",
        ] {
            assert!(parse_line(line).is_none(), "{line} should not match");
        }
    }

    #[test]
    fn test_leading_zero_index() {
        let (_, line) = parse_line("[MQE #01 BEFORE] bit=1 ctx=17").unwrap();
        assert_eq!(line.index, 1);
    }

    #[test]
    fn test_order_preserved_per_side() {
        let text = "\
[MQE #1 BEFORE] a
noise
[MQC #1 BEFORE] x
[MQE #1 AFTER] b
[MQC #1 AFTER] y
[MQE #2 BEFORE] c
";
        let trace = parse_text(text);
        let payloads: Vec<_> = trace.encoder.iter().map(|l| l.payload.as_str()).collect();
        assert_eq!(payloads, vec!["a", "b", "c"]);
        let payloads: Vec<_> = trace.decoder.iter().map(|l| l.payload.as_str()).collect();
        assert_eq!(payloads, vec!["x", "y"]);
    }

    #[test]
    fn test_crlf_lines() {
        let trace = parse_text("[MQE #3 AFTER] newState=4 newMPS=1\r\n");
        assert_eq!(trace.encoder[0].payload, "newState=4 newMPS=1");
    }

    #[test]
    fn test_side_tags() {
        assert_eq!(Side::Encoder.tag(), "MQE");
        assert_eq!(Side::Decoder.tag(), "MQC");
        assert_eq!(Side::Decoder.to_string(), "decoder");
        assert_eq!(Phase::After.to_string(), "AFTER");
    }
}
