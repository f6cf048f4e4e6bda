//! Producers of raw trace text.
//!
//! The comparison core only needs a string; where it comes from is behind
//! the [`TraceSource`] trait so tests can feed synthetic traces.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::SourceError;

pub trait TraceSource {
    /// Produce the full trace text. Blocks until it is available.
    fn read_trace(&mut self) -> Result<String, SourceError>;

    /// Short human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// Trace already held in memory.
#[derive(Debug, Clone, Default)]
pub struct TextSource {
    text: String,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TraceSource for TextSource {
    fn read_trace(&mut self) -> Result<String, SourceError> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        format!("<memory, {} bytes>", self.text.len())
    }
}

/// Previously captured harness output on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TraceSource for FileSource {
    fn read_trace(&mut self) -> Result<String, SourceError> {
        let bytes = fs::read(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Runs the instrumented test harness and captures what it prints.
///
/// Output is stdout followed by stderr. A failing exit status is logged but
/// not treated as an error, since a failing coder test still prints its
/// trace.
#[derive(Debug, Clone)]
pub struct CommandSource {
    config: HarnessConfig,
}

impl CommandSource {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn persist(path: &Path, text: &str) -> Result<(), SourceError> {
        fs::write(path, text).map_err(|source| SourceError::Persist {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl TraceSource for CommandSource {
    fn read_trace(&mut self) -> Result<String, SourceError> {
        let HarnessConfig {
            program,
            args,
            working_dir,
            save_to,
        } = &self.config;

        if !working_dir.is_dir() {
            return Err(SourceError::WorkingDir {
                path: working_dir.clone(),
            });
        }

        debug!(%program, ?args, dir = %working_dir.display(), "running trace harness");
        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .output()
            .map_err(|source| SourceError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            warn!(status = %output.status, "trace harness exited unsuccessfully");
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if let Some(path) = save_to {
            Self::persist(path, &text)?;
            debug!(path = %path.display(), "saved harness output");
        }

        Ok(text)
    }

    fn describe(&self) -> String {
        let mut cmd = self.config.program.clone();
        for arg in &self.config.args {
            cmd.push(' ');
            cmd.push_str(arg);
        }
        format!("`{}` in {}", cmd, self.config.working_dir.display())
    }
}
