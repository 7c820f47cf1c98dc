//! Locating and loading capability tables for an MCU.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pinmux_core::{source_digest, SourceDigest};

use crate::error::{CapsError, Result};
use crate::model::CapabilityModel;
use crate::table::TableIssue;

/// File name of an Arduino-core capability table.
pub const TABLE_FILE: &str = "PeripheralPins.c";

/// Arduino-core variant directories per supported MCU, tried in order.
const BUILTIN_VARIANTS: &[(&str, &[&str])] = &[
    ("STM32F405", &["STM32F4xx/F405RG"]),
    ("STM32F411", &["STM32F4xx/F411C(C-E)(U-Y)"]),
    ("STM32F745", &["STM32F7xx/F74xZ(G-I)"]),
    (
        "STM32H743",
        &[
            "STM32H7xx/H742V(G-I)(H-T)_H743V(G-I)(H-T)_H750VBT_H753VI(H-T)",
            "STM32H7xx/H742Z(G-I)T_H743Z(G-I)T_H747A(G-I)I_H747I(G-I)T_H750ZBT_H753ZIT_H757AII_H757IIT",
            "STM32H7xx/H742I(G-I)(K-T)_H743I(G-I)(K-T)_H750IB(K-T)_H753II(K-T)",
        ],
    ),
];

/// Built-in variant directories for a normalized MCU identifier.
pub fn builtin_variants(mcu: &str) -> &'static [&'static str] {
    BUILTIN_VARIANTS
        .iter()
        .find(|(name, _)| *name == mcu)
        .map(|(_, variants)| *variants)
        .unwrap_or(&[])
}

/// Normalize an MCU identifier.
///
/// Uppercases, adds a missing `STM32` prefix (`f411` becomes `STM32F411`),
/// and reduces full part numbers to a supported family
/// (`STM32F411CEU6` becomes `STM32F411`).
pub fn normalize_mcu(id: &str) -> Result<String> {
    let upper = id.trim().to_ascii_uppercase();
    if upper.is_empty() || !upper.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(CapsError::UnknownMcu { id: id.to_string() });
    }

    let mut chars = upper.chars();
    let short_form = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.next().is_some_and(|c| c.is_ascii_digit());
    let full = if short_form && !upper.starts_with("STM32") {
        format!("STM32{upper}")
    } else {
        upper
    };

    Ok(BUILTIN_VARIANTS
        .iter()
        .map(|(name, _)| *name)
        .find(|name| full.starts_with(name))
        .map_or(full, str::to_string))
}

/// A loaded table plus everything learned while reading it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub model: CapabilityModel,
    pub issues: Vec<TableIssue>,
    pub path: PathBuf,
    /// Digest of the table text.
    pub digest: SourceDigest,
}

/// Resolves MCU identifiers to table files under a root directory.
#[derive(Debug, Clone)]
pub struct TableLoader {
    root: PathBuf,
    configured: BTreeMap<String, Vec<PathBuf>>,
}

impl TableLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            configured: BTreeMap::new(),
        }
    }

    /// Register table paths for an MCU; tried before the built-in ones.
    /// Relative paths are taken relative to the root.
    pub fn with_tables(mut self, mcu: &str, paths: Vec<PathBuf>) -> Result<Self> {
        let mcu = normalize_mcu(mcu)?;
        self.configured.entry(mcu).or_default().extend(paths);
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every MCU with configured or built-in tables, sorted.
    pub fn known_mcus(&self) -> Vec<String> {
        let mut mcus: Vec<String> = BUILTIN_VARIANTS
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(self.configured.keys().cloned())
            .collect();
        mcus.sort();
        mcus.dedup();
        mcus
    }

    /// Candidate table paths for an MCU, in search order.
    pub fn candidates(&self, mcu: &str) -> Result<Vec<PathBuf>> {
        let mcu = normalize_mcu(mcu)?;
        let configured = self
            .configured
            .get(&mcu)
            .into_iter()
            .flatten()
            .map(|p| self.root.join(p));
        let builtin = builtin_variants(&mcu)
            .iter()
            .map(|variant| self.root.join(variant).join(TABLE_FILE));
        let fallback = std::iter::once(self.root.join(&mcu).join(TABLE_FILE));

        let mut paths: Vec<PathBuf> = Vec::new();
        for path in configured.chain(builtin).chain(fallback) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Load the first existing table for an MCU.
    pub fn load(&self, mcu: &str) -> Result<LoadedTable> {
        let normalized = normalize_mcu(mcu)?;
        let tried = self.candidates(&normalized)?;
        match tried.iter().find(|p| p.is_file()) {
            Some(path) => load_table_file(&normalized, path),
            None => Err(CapsError::NotFound {
                mcu: normalized,
                tried,
            }),
        }
    }
}

/// Load a specific table file.
pub fn load_table_file(mcu: &str, path: &Path) -> Result<LoadedTable> {
    if !path.is_file() {
        return Err(CapsError::NotFound {
            mcu: mcu.to_string(),
            tried: vec![path.to_path_buf()],
        });
    }
    let text = std::fs::read_to_string(path)?;
    let (model, issues) = CapabilityModel::parse(mcu, &text);
    if model.sections().is_empty() {
        return Err(CapsError::empty(path));
    }

    tracing::info!(
        "loaded {} capability entries for {} from {}",
        model.len(),
        mcu,
        path.display()
    );
    for issue in &issues {
        tracing::warn!("{}: {issue}", path.display());
    }

    Ok(LoadedTable {
        model,
        issues,
        path: path.to_path_buf(),
        digest: source_digest([text.as_bytes()]),
    })
}
