//! Comparison reporting: collects per-operation blocks and renders them as
//! human-readable text or JSON.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::CompareOptions;
use crate::diff::{Divergence, OperationBlock, Termination, Verdict};

/// Result of one encoder/decoder comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub options: CompareOptions,
    /// Operations available on the encoder side.
    pub encoder_ops: usize,
    /// Operations available on the decoder side.
    pub decoder_ops: usize,
    /// Operations the run was allowed to examine: the smaller of both
    /// sides' counts and the configured window.
    pub limit: usize,
    pub blocks: Vec<OperationBlock>,
    pub termination: Termination,
    pub divergence: Option<Divergence>,
}

impl ComparisonReport {
    pub(crate) fn new(
        options: CompareOptions,
        encoder_ops: usize,
        decoder_ops: usize,
        limit: usize,
    ) -> Self {
        Self {
            options,
            encoder_ops,
            decoder_ops,
            limit,
            blocks: Vec::with_capacity(limit),
            termination: Termination::Exhausted,
            divergence: None,
        }
    }

    pub(crate) fn push(&mut self, block: OperationBlock) {
        self.blocks.push(block);
    }

    pub(crate) fn finish(&mut self, termination: Termination, divergence: Option<Divergence>) {
        self.termination = termination;
        self.divergence = divergence;
    }

    /// Operations actually examined.
    pub fn examined(&self) -> usize {
        self.blocks.len()
    }

    pub fn matched(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Match { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Skipped))
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.blocks.iter().filter(|b| pred(&b.verdict)).count()
    }

    /// True if no divergence was found within the window.
    pub fn passed(&self) -> bool {
        self.termination == Termination::Exhausted
    }

    /// Full text report: header, one block per examined operation, summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> core::fmt::Result {
        writeln!(out, "Encoder operations: {}", self.encoder_ops)?;
        writeln!(out, "Decoder operations: {}", self.decoder_ops)?;
        writeln!(out)?;

        for block in &self.blocks {
            writeln!(out, "=== Operation #{} ===", block.operation)?;
            if block.encoder_index != block.decoder_index {
                writeln!(
                    out,
                    "(encoder tag #{}, decoder tag #{})",
                    block.encoder_index, block.decoder_index
                )?;
            }
            writeln!(out, "ENC BEFORE: {}", block.enc_before)?;
            writeln!(out, "ENC AFTER:  {}", block.enc_after)?;
            writeln!(out, "DEC BEFORE: {}", block.dec_before)?;
            writeln!(out, "DEC AFTER:  {}", block.dec_after)?;
            match &block.verdict {
                Verdict::Match { snapshot } => writeln!(out, "✓ States match: {}", snapshot)?,
                Verdict::Mismatch { kind } => writeln!(out, "❌ {}", kind)?,
                Verdict::Skipped => {}
            }
            writeln!(out)?;
        }

        self.write_summary(out)
    }

    fn write_summary(&self, out: &mut String) -> core::fmt::Result {
        writeln!(out, "============================================================")?;
        writeln!(
            out,
            "Result: {}",
            if self.passed() { "NO DIVERGENCE" } else { "DIVERGED" }
        )?;
        writeln!(
            out,
            "Examined {}/{} operations ({} matched, {} skipped, window={}, alignment={})",
            self.examined(),
            self.limit,
            self.matched(),
            self.skipped(),
            self.options.window,
            self.options.alignment
        )?;
        if let Some(div) = &self.divergence {
            writeln!(out, "First divergence at {}", div)?;
        }
        writeln!(out, "============================================================")
    }

    /// Print the full text report to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}
