//! Diagnostic output shared by `convert` and `check`.

use anyhow::{bail, Result};
use pinmux_core::Diagnostic;

/// How a command reports its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Diagnostics on stderr, a short summary on stdout.
    Human,
    /// One JSON document on stdout.
    Json,
}

impl ReportFormat {
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name.unwrap_or("human") {
            "human" => Ok(ReportFormat::Human),
            "json" => Ok(ReportFormat::Json),
            other => bail!("unknown report format: {other} (expected human or json)"),
        }
    }
}

/// Print diagnostics to stderr in declaration order, each prefixed with its source.
pub fn print_diagnostics(source: &str, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{source}: {diagnostic}");
    }
}
