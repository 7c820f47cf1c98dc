//! `pinmux convert`: one board definition to one header.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pinmux_core::{source_digest, DiagnosticSummary};
use pinmux_gen::{generate, write_artifact, GeneratorOptions};
use serde_json::json;

use crate::commands::report::{print_diagnostics, ReportFormat};
use crate::config::PinmuxConfig;

/// Command-line arguments of one conversion.
#[derive(Debug)]
pub struct ConvertRequest<'a> {
    pub input: &'a Path,
    /// Explicit output path; defaults to `<stem>.h`.
    pub output: Option<&'a Path>,
    /// MCU override for boards without a header comment.
    pub mcu: Option<&'a str>,
    /// Table root override.
    pub tables: Option<&'a Path>,
    pub force: bool,
    pub report: Option<&'a str>,
}

impl<'a> ConvertRequest<'a> {
    pub fn new(input: &'a Path) -> Self {
        Self {
            input,
            output: None,
            mcu: None,
            tables: None,
            force: false,
            report: None,
        }
    }
}

/// Convert a board definition, writing the header unless errors were found.
pub fn run(project_dir: &Path, config: &PinmuxConfig, request: &ConvertRequest) -> Result<()> {
    let format = ReportFormat::parse(request.report)?;
    let input = request.input;
    if !input.is_file() {
        bail!("board definition not found: {}", input.display());
    }

    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let parsed = pinmux_board::parse_with(&text, &config.parse_options());

    let mcu = match request.mcu.or(parsed.model.mcu()) {
        Some(mcu) => mcu.to_string(),
        None => bail!(
            "{} does not name its MCU; pass --mcu (e.g. --mcu STM32F411)",
            input.display()
        ),
    };
    let loader = config.table_loader(project_dir, request.tables)?;
    let table = loader
        .load(&mcu)
        .with_context(|| format!("loading capability table for {mcu}"))?;

    let resolution = pinmux_resolve::resolve(&parsed.model, &table.model);
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(resolution.diagnostics.iter().cloned());
    let summary = DiagnosticSummary::of(&diagnostics);

    let options = GeneratorOptions {
        source_name: input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        source_digest: Some(source_digest([text.as_bytes(), table.digest.as_slice()])),
        ..GeneratorOptions::default()
    };
    let header = generate(&resolution.board, &options);

    let output = match request.output {
        Some(path) => path.to_path_buf(),
        None => config.default_output(project_dir, input),
    };
    let write = !summary.has_errors() || request.force || config.output.force;
    if write {
        write_artifact(&output, &header)
            .with_context(|| format!("writing header for {}", input.display()))?;
    }

    let board = &resolution.board.config;
    match format {
        ReportFormat::Human => {
            let source = input.display().to_string();
            for issue in &table.issues {
                eprintln!("warning: {}: {issue}", table.path.display());
            }
            print_diagnostics(&source, &diagnostics);
            println!("Board:        {}", board.board_name().unwrap_or("(unnamed)"));
            println!("Manufacturer: {}", board.manufacturer_id().unwrap_or("(unknown)"));
            println!("MCU:          {} ({})", table.model.mcu(), table.path.display());
            if write {
                println!("Generated {}", output.display());
            }
            println!("{summary}");
        }
        ReportFormat::Json => {
            let report = json!({
                "input": input.display().to_string(),
                "output": output.display().to_string(),
                "written": write,
                "board": board.board_name(),
                "manufacturer": board.manufacturer_id(),
                "mcu": table.model.mcu(),
                "table": table.path.display().to_string(),
                "table_issues": table.issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "summary": summary,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if summary.has_errors() {
        if write {
            bail!(
                "{} error(s) in {}; header written anyway to {}",
                summary.errors,
                input.display(),
                output.display()
            );
        }
        bail!(
            "{} error(s) in {}; no header written (use --force to write anyway)",
            summary.errors,
            input.display()
        );
    }
    Ok(())
}
