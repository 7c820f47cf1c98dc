//! `pinmux.toml` project configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pinmux_board::{DuplicatePolicy, ParseOptions};
use pinmux_caps::TableLoader;
use serde::{Deserialize, Serialize};

/// Name of the configuration file searched for.
pub const CONFIG_FILE: &str = "pinmux.toml";

/// The top-level configuration of a pinmux project. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinmuxConfig {
    /// Where capability tables live.
    #[serde(default)]
    pub tables: TablesConfig,
    /// Per-MCU table overrides, keyed by MCU identifier.
    #[serde(default)]
    pub mcu: BTreeMap<String, McuConfig>,
    /// Board-definition parser settings.
    #[serde(default)]
    pub parser: ParserConfig,
    /// Header output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Table root, relative to the project directory.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McuConfig {
    /// Table files tried before the built-in variant paths, relative to the table root.
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for headers when no output path is given.
    #[serde(default)]
    pub dir: Option<String>,
    /// Write headers even when validation reports errors.
    #[serde(default)]
    pub force: bool,
}

impl PinmuxConfig {
    /// Search upward from `start_dir` for a `pinmux.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let config: PinmuxConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a configuration from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pinmux.toml")
    }

    /// Root directory for capability tables.
    pub fn tables_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(self.tables.dir.as_deref().unwrap_or("tables"))
    }

    /// A table loader rooted at `override_root` (a `--tables` flag) or the
    /// configured root, with every `[mcu.*]` override registered.
    pub fn table_loader(&self, project_dir: &Path, override_root: Option<&Path>) -> Result<TableLoader> {
        let root = match override_root {
            Some(dir) => dir.to_path_buf(),
            None => self.tables_root(project_dir),
        };
        let mut loader = TableLoader::new(root);
        for (mcu, entry) in &self.mcu {
            let paths = entry.tables.iter().map(PathBuf::from).collect();
            loader = loader
                .with_tables(mcu, paths)
                .with_context(|| format!("[mcu.{mcu}] in {CONFIG_FILE}"))?;
        }
        Ok(loader)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            duplicates: self.parser.duplicates,
        }
    }

    /// Default location of the header generated from `input`.
    ///
    /// `<output.dir>/<stem>.h` when an output directory is configured,
    /// otherwise `<stem>.h` next to the input.
    pub fn default_output(&self, project_dir: &Path, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "board".to_string());
        let file = format!("{stem}.h");
        match self.output.dir.as_deref() {
            Some(dir) => project_dir.join(dir).join(file),
            None => input.with_file_name(file),
        }
    }

    /// A typical project configuration.
    #[cfg(test)]
    pub fn template() -> &'static str {
        r#"[tables]
dir = "tables"

[parser]
duplicates = "last-wins"

[output]
dir = "out"
force = false
"#
    }
}
