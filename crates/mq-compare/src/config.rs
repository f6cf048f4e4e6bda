//! Comparison and harness settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Number of operations examined when nothing else is configured.
pub const DEFAULT_WINDOW: usize = 50;

/// How BEFORE/AFTER lines are grouped into operations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlignmentMode {
    /// Pair by the operation index in each tag and reject malformed streams.
    #[default]
    Indexed,
    /// Pair consecutive lines, trusting strict BEFORE/AFTER alternation.
    Positional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Upper bound on examined operations.
    pub window: usize,
    pub alignment: AlignmentMode,
    /// Also compare context, state, A register and bit from BEFORE payloads.
    pub check_registers: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            alignment: AlignmentMode::default(),
            check_registers: false,
        }
    }
}

impl CompareOptions {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentMode) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_register_checks(mut self, enabled: bool) -> Self {
        self.check_registers = enabled;
        self
    }
}

/// External command that produces the MQ trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Where to keep a copy of the captured output, if anywhere.
    pub save_to: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: "go".into(),
            args: vec!["test".into(), "-run".into(), "TestSimple5x5Debug".into()],
            working_dir: PathBuf::from("jpeg2000/t1"),
            save_to: None,
        }
    }
}
