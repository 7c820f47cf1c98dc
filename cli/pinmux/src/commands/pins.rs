//! `pinmux pins`: what a pin can be routed to on an MCU.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use pinmux_caps::CapabilityEntry;
use pinmux_core::{PeripheralKind, Pin};

use crate::config::PinmuxConfig;

/// Print every capability-table mapping of one pin.
pub fn run(
    project_dir: &Path,
    config: &PinmuxConfig,
    mcu: &str,
    pin: &str,
    kind: Option<&str>,
    tables: Option<&Path>,
) -> Result<()> {
    let pin = parse_pin(pin)?;
    let kinds = match kind {
        Some(name) => vec![PeripheralKind::from_name(name).with_context(|| {
            format!("unknown peripheral kind: {name} (expected timer, spi, i2c, uart or adc)")
        })?],
        None => PeripheralKind::all().to_vec(),
    };

    let table = config
        .table_loader(project_dir, tables)?
        .load(mcu)
        .with_context(|| format!("loading capability table for {mcu}"))?;
    let model = &table.model;
    if !model.knows_pin(pin) {
        bail!("{pin} does not exist on {}", model.mcu());
    }

    let entries: Vec<&CapabilityEntry> = kinds
        .iter()
        .flat_map(|kind| model.entries_for_pin(pin, *kind))
        .collect();

    println!("{pin} on {} ({})", model.mcu(), table.path.display());
    if entries.is_empty() {
        println!("  GPIO only");
    }
    for entry in entries {
        println!("  {entry}");
    }
    Ok(())
}

/// Accepts board (`B00`), Arduino (`PB_0`), and short (`PB0`) spellings.
pub(crate) fn parse_pin(token: &str) -> Result<Pin> {
    let upper = token.trim().to_ascii_uppercase();
    let bare = match upper.strip_prefix('P') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => rest.replace('_', ""),
        _ => upper,
    };

    let mut chars = bare.chars();
    let port = chars
        .next()
        .filter(char::is_ascii_alphabetic)
        .ok_or_else(|| anyhow!("invalid pin: {token}"))?;
    let number: u8 = chars
        .as_str()
        .parse()
        .map_err(|_| anyhow!("invalid pin: {token}"))?;
    Pin::new(port, number).with_context(|| format!("invalid pin: {token}"))
}
