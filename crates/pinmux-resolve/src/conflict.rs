//! Global pin-uniqueness check.

use std::collections::BTreeMap;

use pinmux_board::{ConfigModel, ResourceAssignment};
use pinmux_core::{Diagnostic, DiagnosticKind, Pin};

/// Report every physical pin claimed by more than one modeled resource.
///
/// Exactly one `PinConflict` per contested pin, naming every claimant.
/// Claims are taken from the board definition, so a pin is reported even
/// when one of its claimants failed to resolve. Unmodeled resources never
/// conflict.
pub(crate) fn check_pin_conflicts(config: &ConfigModel, diagnostics: &mut Vec<Diagnostic>) {
    let mut claims: BTreeMap<Pin, Vec<&ResourceAssignment>> = BTreeMap::new();
    for assignment in config.resources().iter().filter(|a| a.resource.is_modeled()) {
        claims.entry(assignment.pin).or_default().push(assignment);
    }

    for (pin, claimants) in claims {
        let [first, second, ..] = claimants.as_slice() else {
            continue;
        };
        let names: Vec<String> = claimants
            .iter()
            .map(|a| format!("{} (line {})", a.identity(), a.line))
            .collect();
        diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::PinConflict,
                format!("{pin} is used by {} resources: {}", claimants.len(), names.join(", ")),
            )
            .with_resource(first.identity())
            .with_pin(pin)
            .with_line(second.line),
        );
    }
}
