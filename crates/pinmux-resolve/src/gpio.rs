//! Single-purpose GPIO resources: chip selects, interrupts, LEDs, ADC inputs.

use pinmux_board::{ConfigModel, ResourceAssignment};
use pinmux_caps::CapabilityModel;
use pinmux_core::{Diagnostic, DiagnosticKind, GpioRole, PeripheralKind, ResourceRef, ResourceType};

use crate::ir::ValidatedAssignment;
use crate::outcome::Outcome;

/// Verify one GPIO resource exists in the capability table.
///
/// Analog roles need an ADC input and are dropped without one. Digital
/// roles only need a pin the package has; an unknown pin is kept with a
/// warning.
pub(crate) fn resolve_gpio(
    caps: &CapabilityModel,
    assignment: &ResourceAssignment,
    role: GpioRole,
) -> Outcome<ValidatedAssignment> {
    let pin = assignment.pin;
    let locate = |d: Diagnostic| {
        d.with_resource(assignment.identity())
            .with_pin(pin)
            .with_line(assignment.line)
    };

    if role.is_analog() {
        return match caps.analog_entry(pin) {
            Some(entry) => {
                tracing::debug!("{} -> {}", assignment.identity(), entry.label());
                Outcome::resolved(ValidatedAssignment::peripheral(assignment.clone(), entry.clone()))
            }
            None => {
                let mut capable: Vec<String> = caps
                    .entries()
                    .iter()
                    .filter(|e| e.kind == PeripheralKind::Adc)
                    .map(|e| e.pin.base.to_string())
                    .collect();
                capable.sort();
                capable.dedup();
                let hint = if capable.is_empty() {
                    format!("{} lists no ADC inputs", caps.mcu())
                } else {
                    format!("ADC-capable pins: {}", capable.join(", "))
                };
                Outcome::dropped(locate(Diagnostic::error(
                    DiagnosticKind::UnsupportedPin,
                    format!("{pin} has no ADC input; {hint}"),
                )))
            }
        };
    }

    let node = ValidatedAssignment::gpio(assignment.clone());
    if caps.knows_pin(pin) {
        Outcome::resolved(node)
    } else {
        Outcome::resolved(node).with(locate(Diagnostic::warning(
            DiagnosticKind::UnknownPin,
            format!("{pin} does not appear in the {} capability table", caps.mcu()),
        )))
    }
}

/// Resolve every GPIO resource in declaration order.
pub(crate) fn resolve_gpio_resources(
    config: &ConfigModel,
    caps: &CapabilityModel,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<ValidatedAssignment>, Vec<ResourceRef>) {
    let mut resolved = Vec::new();
    let mut dropped = Vec::new();
    for assignment in config.resources() {
        let ResourceType::Gpio(role) = assignment.resource else {
            continue;
        };
        match resolve_gpio(caps, assignment, role).collect_into(diagnostics) {
            Some(node) => resolved.push(node),
            None => dropped.push(assignment.identity()),
        }
    }
    (resolved, dropped)
}
