//! Settings that steer resolution: bus instance overrides and device bus
//! selections.

use pinmux_board::ConfigModel;
use pinmux_core::{Diagnostic, DiagnosticKind, InstanceSelector, PeripheralKind};

use crate::ir::ResolvedBus;

/// Device settings that name a bus by its board-definition index.
pub const DEVICE_BUS_SETTINGS: &[(&str, PeripheralKind)] = &[
    ("gyro_1_spibus", PeripheralKind::Spi),
    ("gyro_2_spibus", PeripheralKind::Spi),
    ("flash_spi_bus", PeripheralKind::Spi),
    ("sdcard_spi_bus", PeripheralKind::Spi),
    ("max7456_spi_bus", PeripheralKind::Spi),
    ("baro_spi_device", PeripheralKind::Spi),
    ("baro_i2c_device", PeripheralKind::I2c),
    ("mag_i2c_device", PeripheralKind::I2c),
];

fn override_key(kind: PeripheralKind, index: u8) -> Option<String> {
    let family = match kind {
        PeripheralKind::Spi => "spi",
        PeripheralKind::I2c => "i2c",
        PeripheralKind::Uart => "uart",
        PeripheralKind::Timer | PeripheralKind::Adc => return None,
    };
    Some(format!("bus_{family}_{index}"))
}

fn setting_line(config: &ConfigModel, key: &str) -> Option<usize> {
    config.settings().iter().find(|s| s.key == key).map(|s| s.line)
}

/// The instance a bus resource must resolve to.
///
/// `set bus_<spi|i2c|uart>_<index> = <N | NAME>` selects it explicitly;
/// otherwise the resource index names the instance (`SPI_MOSI 3` is SPI3).
pub(crate) fn desired_instance(
    config: &ConfigModel,
    kind: PeripheralKind,
    index: u8,
    diagnostics: &mut Vec<Diagnostic>,
) -> InstanceSelector {
    let implied = InstanceSelector::new(kind, index);
    let Some(key) = override_key(kind, index) else {
        return implied;
    };
    let Some(value) = config.setting(&key) else {
        return implied;
    };

    match InstanceSelector::parse_value(kind, value) {
        Some(selector) => {
            tracing::debug!("{key} selects {selector}");
            selector
        }
        None => {
            let mut d = Diagnostic::warning(
                DiagnosticKind::SyntaxIssue,
                format!("{key} = {value} does not name a {kind} instance; using {implied}"),
            );
            if let Some(line) = setting_line(config, &key) {
                d = d.with_line(line);
            }
            diagnostics.push(d);
            implied
        }
    }
}

/// Warn about device settings that select a bus with no resolved pins.
pub(crate) fn check_device_buses(
    config: &ConfigModel,
    buses: &[ResolvedBus],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (key, kind) in DEVICE_BUS_SETTINGS {
        let Some(value) = config.setting(key) else {
            continue;
        };
        let line = setting_line(config, key);
        let located = |d: Diagnostic| match line {
            Some(line) => d.with_line(line),
            None => d,
        };

        match value.trim().parse::<u8>() {
            // Zero and NONE both mean "no device".
            Ok(0) => {}
            Ok(index) => {
                if !buses.iter().any(|b| b.kind() == *kind && b.index == index) {
                    diagnostics.push(located(Diagnostic::warning(
                        DiagnosticKind::UnresolvedBusReference,
                        format!("{key} = {index} selects {kind} bus {index}, which has no resolved pins"),
                    )));
                }
            }
            Err(_) if value.trim().eq_ignore_ascii_case("NONE") => {}
            Err(_) => diagnostics.push(located(Diagnostic::warning(
                DiagnosticKind::SyntaxIssue,
                format!("{key} = {value} is not a bus number"),
            ))),
        }
    }
}
