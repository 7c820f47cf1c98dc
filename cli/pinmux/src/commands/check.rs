//! `pinmux check`: validate board definitions without writing anything.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pinmux_caps::CapabilityCache;
use pinmux_core::DiagnosticSummary;

use crate::commands::report::print_diagnostics;
use crate::config::PinmuxConfig;

/// Validate every input, sharing capability tables between boards of the same MCU.
pub fn run(
    project_dir: &Path,
    config: &PinmuxConfig,
    inputs: &[PathBuf],
    mcu: Option<&str>,
    tables: Option<&Path>,
) -> Result<()> {
    let mut cache = CapabilityCache::new(config.table_loader(project_dir, tables)?);
    let mut failed = 0usize;

    for input in inputs {
        match check_one(config, &mut cache, input, mcu) {
            Ok(summary) => {
                if summary.has_errors() {
                    failed += 1;
                }
                println!("{}: {summary}", input.display());
            }
            Err(e) => {
                failed += 1;
                eprintln!("error: {}: {e:#}", input.display());
            }
        }
    }

    tracing::info!("checked {} board(s) with {} table(s)", inputs.len(), cache.len());
    if failed > 0 {
        bail!("{failed} of {} board definition(s) failed validation", inputs.len());
    }
    println!("All {} board definition(s) valid", inputs.len());
    Ok(())
}

fn check_one(
    config: &PinmuxConfig,
    cache: &mut CapabilityCache,
    input: &Path,
    mcu: Option<&str>,
) -> Result<DiagnosticSummary> {
    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let parsed = pinmux_board::parse_with(&text, &config.parse_options());
    let Some(mcu) = mcu.or(parsed.model.mcu()) else {
        bail!("no MCU named; pass --mcu");
    };
    let table = cache
        .get(mcu)
        .with_context(|| format!("loading capability table for {mcu}"))?;

    let resolution = pinmux_resolve::resolve(&parsed.model, &table.model);
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(resolution.diagnostics);
    print_diagnostics(&input.display().to_string(), &diagnostics);
    Ok(DiagnosticSummary::of(&diagnostics))
}
