//! Bus-pin resolution: SPI, I2C, and UART signal pins.

use std::collections::BTreeMap;

use pinmux_board::{ConfigModel, ResourceAssignment};
use pinmux_caps::CapabilityModel;
use pinmux_core::{
    Diagnostic, DiagnosticKind, InstanceSelector, PeripheralKind, ResourceRef, ResourceType, Signal,
};

use crate::ir::{ResolvedBus, ValidatedAssignment};
use crate::outcome::Outcome;
use crate::settings;

/// Resolve one bus signal pin against the desired instance.
///
/// The matching entry is authoritative whether it is the default mapping
/// or an alternate; no other instance is ever substituted.
pub(crate) fn resolve_bus_pin(
    caps: &CapabilityModel,
    assignment: &ResourceAssignment,
    signal: Signal,
    desired: &InstanceSelector,
) -> Outcome<ValidatedAssignment> {
    let pin = assignment.pin;
    let kind = signal.kind();
    let fail = |kind: DiagnosticKind, message: String| {
        Outcome::dropped(
            Diagnostic::error(kind, message)
                .with_resource(assignment.identity())
                .with_pin(pin)
                .with_line(assignment.line),
        )
    };

    let entries = caps.entries_for_pin(pin, kind);
    if entries.is_empty() {
        return fail(
            DiagnosticKind::UnsupportedPin,
            format!("{pin} cannot be routed to any {kind} peripheral on {}", caps.mcu()),
        );
    }

    let carrying: Vec<_> = entries.iter().filter(|e| e.signal() == Some(signal)).collect();
    if carrying.is_empty() {
        let offered: Vec<String> = entries.iter().map(|e| e.label()).collect();
        return fail(
            DiagnosticKind::UnsupportedPin,
            format!("{pin} has no {signal} mapping; it can serve {}", offered.join(", ")),
        );
    }

    match caps.find_variant_for_signal(pin, signal, desired) {
        Some(entry) => {
            tracing::debug!("{} -> {} via {}", assignment.identity(), entry.label(), entry.pin);
            Outcome::resolved(ValidatedAssignment::peripheral(assignment.clone(), entry.clone()))
        }
        None => {
            let available: Vec<String> = carrying
                .iter()
                .map(|e| format!("{} via {}", e.instance, e.pin))
                .collect();
            fail(
                DiagnosticKind::InstanceMismatch,
                format!(
                    "{pin} cannot reach {desired} as {signal}; available: {}",
                    available.join(", ")
                ),
            )
        }
    }
}

fn bus_signal(assignment: &ResourceAssignment) -> Option<Signal> {
    match assignment.resource {
        ResourceType::Bus(signal) => Some(signal),
        _ => None,
    }
}

/// Resolve every bus resource and check bus completeness.
///
/// Returns the resolved buses (ordered by kind, then index) and the
/// identities of bus resources that were dropped.
pub(crate) fn resolve_buses(
    config: &ConfigModel,
    caps: &CapabilityModel,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<ResolvedBus>, Vec<ResourceRef>) {
    let mut declared: BTreeMap<(PeripheralKind, u8), Vec<(&ResourceAssignment, Signal)>> =
        BTreeMap::new();
    for assignment in config.resources() {
        if let Some(signal) = bus_signal(assignment) {
            declared
                .entry((signal.kind(), assignment.index))
                .or_default()
                .push((assignment, signal));
        }
    }

    let mut buses = Vec::new();
    let mut dropped = Vec::new();

    for ((kind, index), members) in declared {
        let selector = settings::desired_instance(config, kind, index, diagnostics);

        let mut pins = Vec::new();
        for (assignment, signal) in &members {
            match resolve_bus_pin(caps, assignment, *signal, &selector).collect_into(diagnostics) {
                Some(node) => pins.push(node),
                None => dropped.push(assignment.identity()),
            }
        }

        check_completeness(kind, index, &members, diagnostics);

        if let Some(instance) = pins
            .first()
            .and_then(|p: &ValidatedAssignment| p.entry())
            .map(|e| e.instance.clone())
        {
            tracing::debug!("{kind} {index} resolved to {instance} with {} pin(s)", pins.len());
            buses.push(ResolvedBus {
                index,
                selector,
                instance,
                pins,
            });
        }
    }

    check_instance_conflicts(&buses, diagnostics);
    (buses, dropped)
}

/// Flag peripheral instances claimed by more than one board bus index.
///
/// Happens when a `bus_*` override points a bus at an instance another
/// index already uses. One diagnostic per contested instance.
fn check_instance_conflicts(buses: &[ResolvedBus], diagnostics: &mut Vec<Diagnostic>) {
    let mut claims: BTreeMap<(PeripheralKind, &str), Vec<&ResolvedBus>> = BTreeMap::new();
    for bus in buses {
        claims
            .entry((bus.kind(), bus.instance.name()))
            .or_default()
            .push(bus);
    }

    for ((kind, instance), claimants) in claims {
        let [_, second, ..] = claimants.as_slice() else {
            continue;
        };
        let indices: Vec<String> = claimants.iter().map(|b| b.index.to_string()).collect();
        let mut diagnostic = Diagnostic::error(
            DiagnosticKind::BusInstanceConflict,
            format!(
                "{instance} is claimed by {kind} buses {}; each bus index needs its own instance",
                indices.join(" and ")
            ),
        );
        if let Some(pin) = second.pins.first() {
            diagnostic = diagnostic
                .with_resource(pin.identity())
                .with_pin(pin.pin())
                .with_line(pin.source.line);
        }
        diagnostics.push(diagnostic);
    }
}

/// SPI and I2C buses need every signal; a UART with one direction is
/// usable but suspicious.
fn check_completeness(
    kind: PeripheralKind,
    index: u8,
    members: &[(&ResourceAssignment, Signal)],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let missing: Vec<Signal> = Signal::required_for(kind)
        .iter()
        .copied()
        .filter(|s| !members.iter().any(|(_, declared)| declared == s))
        .collect();
    let Some(first_missing) = missing.first() else {
        return;
    };

    let names: Vec<String> = missing
        .iter()
        .map(|s| ResourceType::Bus(*s).keyword().to_string())
        .collect();
    let message = format!("{kind} bus {index} has no {} resource", names.join(" or "));
    let diagnostic = if kind == PeripheralKind::Uart {
        Diagnostic::warning(DiagnosticKind::IncompleteBus, message)
    } else {
        Diagnostic::error(DiagnosticKind::IncompleteBus, message)
    };
    diagnostics.push(diagnostic.with_resource(ResourceRef::new(ResourceType::Bus(*first_missing), index)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinmux_caps::{CapabilityEntry, PinFunction};
    use pinmux_core::{PeripheralInstance, Pin, PinVariant};

    fn bus_entry(pin: &str, variant: Option<u8>, instance: &str, signal: Signal) -> CapabilityEntry {
        let base = Pin::parse_board_token(pin).unwrap();
        CapabilityEntry {
            pin: PinVariant { base, variant },
            kind: signal.kind(),
            instance: PeripheralInstance::parse(instance).unwrap(),
            af: Some(5),
            function: PinFunction::Bus(signal),
        }
    }

    fn caps() -> CapabilityModel {
        CapabilityModel::from_entries(
            "TEST",
            [
                bus_entry("A07", None, "SPI1", Signal::SpiMosi),
                bus_entry("A06", None, "SPI1", Signal::SpiMiso),
                bus_entry("A05", None, "SPI1", Signal::SpiSclk),
                bus_entry("B05", None, "SPI1", Signal::SpiMosi),
                bus_entry("B05", Some(1), "SPI3", Signal::SpiMosi),
                bus_entry("B04", None, "SPI1", Signal::SpiMiso),
                bus_entry("B04", Some(1), "SPI3", Signal::SpiMiso),
                bus_entry("B03", None, "SPI1", Signal::SpiSclk),
                bus_entry("B03", Some(1), "SPI3", Signal::SpiSclk),
                bus_entry("B06", None, "USART1", Signal::UartTx),
                bus_entry("B08", None, "I2C1", Signal::I2cScl),
            ],
        )
        .0
    }

    fn run(text: &str) -> (Vec<ResolvedBus>, Vec<ResourceRef>, Vec<Diagnostic>) {
        let config = pinmux_board::parse(text).model;
        let mut diags = Vec::new();
        let (buses, dropped) = resolve_buses(&config, &caps(), &mut diags);
        (buses, dropped, diags)
    }

    #[test]
    fn complete_spi_bus() {
        let (buses, dropped, diags) =
            run("resource SPI_SCK 1 A05\nresource SPI_MISO 1 A06\nresource SPI_MOSI 1 A07");
        assert!(diags.is_empty(), "{diags:?}");
        assert!(dropped.is_empty());
        assert_eq!(buses.len(), 1);
        assert_eq!(buses[0].instance.name(), "SPI1");
        assert!(buses[0].is_complete());
        assert_eq!(
            buses[0].pin_for(Signal::SpiMosi).unwrap().pin_variant().canonical(),
            "PA_7"
        );
    }

    #[test]
    fn alternate_variant_for_spi3() {
        let (buses, _, diags) =
            run("resource SPI_SCK 3 B03\nresource SPI_MISO 3 B04\nresource SPI_MOSI 3 B05");
        assert!(diags.is_empty(), "{diags:?}");
        let bus = &buses[0];
        assert_eq!(bus.instance.name(), "SPI3");
        assert!(bus.pins.iter().all(|p| p.pin_variant().variant == Some(1)));
    }

    #[test]
    fn instance_mismatch_lists_available() {
        let (buses, dropped, diags) = run("resource SPI_MOSI 2 A07");
        assert!(buses.is_empty());
        assert_eq!(dropped.len(), 1);
        let mismatch: Vec<_> = diags
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InstanceMismatch)
            .collect();
        assert_eq!(mismatch.len(), 1);
        assert!(mismatch[0].message.contains("SPI1 via PA_7"));
        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::IncompleteBus && d.is_error()));
    }

    #[test]
    fn wrong_signal_is_unsupported() {
        let (_, _, diags) = run("resource SPI_MISO 1 A07");
        assert!(diags
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnsupportedPin && d.message.contains("SPI1_MOSI")));
    }

    #[test]
    fn pin_without_kind_is_unsupported() {
        let (_, dropped, diags) = run("resource I2C_SDA 1 C13\nresource I2C_SCL 1 B08");
        assert_eq!(dropped, vec![ResourceRef::new(ResourceType::Bus(Signal::I2cSda), 1)]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnsupportedPin);
    }

    #[test]
    fn partial_uart_is_warning() {
        let (buses, _, diags) = run("resource SERIAL_TX 1 B06");
        assert_eq!(buses.len(), 1);
        assert_eq!(buses[0].instance.name(), "USART1");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::IncompleteBus);
        assert!(!diags[0].is_error());
    }

    #[test]
    fn two_indices_on_one_instance_conflict() {
        let (buses, _, diags) = run(
            "resource SPI_SCK 1 A05\nresource SPI_MISO 1 A06\nresource SPI_MOSI 1 A07\n\
             resource SPI_SCK 2 B03\nresource SPI_MISO 2 B04\nresource SPI_MOSI 2 B05\n\
             set bus_spi_2 = 1",
        );
        assert_eq!(buses.len(), 2);
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].kind, DiagnosticKind::BusInstanceConflict);
        assert!(diags[0].is_error());
        assert!(
            diags[0].message.contains("SPI1 is claimed by SPI buses 1 and 2"),
            "{}",
            diags[0].message
        );
        assert_eq!(diags[0].resource.as_ref().map(|r| r.index), Some(2));
    }

    #[test]
    fn distinct_instances_do_not_conflict() {
        let (buses, _, diags) = run(
            "resource SPI_SCK 1 A05\nresource SPI_MISO 1 A06\nresource SPI_MOSI 1 A07\n\
             resource SPI_SCK 3 B03\nresource SPI_MISO 3 B04\nresource SPI_MOSI 3 B05",
        );
        assert_eq!(buses.len(), 2);
        assert!(diags.is_empty(), "{diags:?}");
    }
}
