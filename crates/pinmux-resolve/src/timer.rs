//! Timer-bearing outputs: AF-based variant selection and bank grouping.

use std::collections::BTreeMap;

use pinmux_board::{ConfigModel, ResourceAssignment};
use pinmux_caps::CapabilityModel;
use pinmux_core::{Diagnostic, DiagnosticKind, OutputFamily, PeripheralKind, ResourceRef, ResourceType};

use crate::ir::{FamilyTimings, TimerBank, ValidatedAssignment};
use crate::outcome::Outcome;

/// Families in processing order.
const FAMILIES: [OutputFamily; 3] = [OutputFamily::Motor, OutputFamily::Servo, OutputFamily::LedStrip];

/// Resolve one timer output through its `timer <PIN> AF<N>` annotation.
pub(crate) fn resolve_timer_output(
    config: &ConfigModel,
    caps: &CapabilityModel,
    assignment: &ResourceAssignment,
) -> Outcome<ValidatedAssignment> {
    let pin = assignment.pin;
    let locate = |d: Diagnostic| {
        d.with_resource(assignment.identity())
            .with_pin(pin)
            .with_line(assignment.line)
    };

    let Some(annotation) = config.timer_for(pin) else {
        return Outcome::dropped(locate(Diagnostic::error(
            DiagnosticKind::MissingTimer,
            format!("no `timer {pin} AF<n>` line selects a timer for this output"),
        )));
    };

    let entries = caps.entries_for_pin(pin, PeripheralKind::Timer);
    if entries.is_empty() {
        return Outcome::dropped(locate(Diagnostic::error(
            DiagnosticKind::UnsupportedPin,
            format!("{pin} has no timer channel on {}", caps.mcu()),
        )));
    }

    let matching: Vec<_> = entries
        .iter()
        .filter(|e| e.af == Some(annotation.af))
        .collect();
    let valid = || {
        entries
            .iter()
            .map(|e| match e.af {
                Some(af) => format!("AF{af} ({} via {})", e.label(), e.pin),
                None => format!("{} via {}", e.label(), e.pin),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let entry = match matching.as_slice() {
        [] => {
            return Outcome::dropped(locate(Diagnostic::error(
                DiagnosticKind::NoMatchingVariant,
                format!("{pin} has no timer mapping on AF{}; valid: {}", annotation.af, valid()),
            )));
        }
        [entry] => *entry,
        _ => {
            return Outcome::dropped(locate(Diagnostic::error(
                DiagnosticKind::AmbiguousMapping,
                format!(
                    "AF{} on {pin} matches {} timer mappings: {}",
                    annotation.af,
                    matching.len(),
                    matching.iter().map(|e| e.label()).collect::<Vec<_>>().join(", ")
                ),
            )));
        }
    };

    tracing::debug!("{} -> {} via {}", assignment.identity(), entry.label(), entry.pin);
    let mut outcome = Outcome::resolved(ValidatedAssignment::peripheral(assignment.clone(), (*entry).clone()));

    if let Some(advisory) = &annotation.advisory {
        let agrees = advisory.timer == entry.instance.name()
            && entry.timer_channel() == Some(advisory.channel);
        if !agrees {
            outcome = outcome.with(locate(Diagnostic::warning(
                DiagnosticKind::AdvisoryMismatch,
                format!(
                    "comment names {} CH{} but AF{} on {} is {}",
                    advisory.timer,
                    advisory.channel,
                    annotation.af,
                    entry.pin,
                    entry.label()
                ),
            )));
        }
    }
    outcome
}

/// Resolve every timer output in (family, index) order.
pub(crate) fn resolve_timer_outputs(
    config: &ConfigModel,
    caps: &CapabilityModel,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<ValidatedAssignment>, Vec<ResourceRef>) {
    let mut resolved = Vec::new();
    let mut dropped = Vec::new();

    for family in FAMILIES {
        let resource = ResourceType::Timer(family);
        let mut outputs: Vec<&ResourceAssignment> = config.resources_of(&resource).collect();
        outputs.sort_by_key(|a| a.index);

        for assignment in outputs {
            match resolve_timer_output(config, caps, assignment).collect_into(diagnostics) {
                Some(node) => resolved.push(node),
                None => dropped.push(assignment.identity()),
            }
        }
    }
    (resolved, dropped)
}

/// Partition resolved outputs into banks by timer instance.
///
/// Banks appear in order of first use; channels are ordered by family,
/// then resource index.
pub fn build_banks(outputs: Vec<ValidatedAssignment>) -> Vec<TimerBank> {
    let mut banks: Vec<TimerBank> = Vec::new();
    for output in outputs {
        let Some(instance) = output.entry().map(|e| e.instance.clone()) else {
            continue;
        };
        match banks.iter_mut().find(|b| b.instance == instance) {
            Some(bank) => bank.channels.push(output),
            None => banks.push(TimerBank {
                instance,
                channels: vec![output],
            }),
        }
    }
    for bank in &mut banks {
        bank.channels.sort_by_key(|c| (c.family(), c.index()));
    }
    banks
}

/// Flag banks whose families need different timer frequencies.
pub(crate) fn check_bank_frequencies(
    banks: &[TimerBank],
    timings: &FamilyTimings,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for bank in banks {
        let present: Vec<OutputFamily> = FAMILIES
            .into_iter()
            .filter(|f| bank.has_family(*f))
            .collect();
        let Some((first, rest)) = present.split_first() else {
            continue;
        };
        let base = timings.of(*first);
        for family in rest {
            let other = timings.of(*family);
            if other.frequency_hz == base.frequency_hz {
                continue;
            }
            let mut d = Diagnostic::error(
                DiagnosticKind::TimerFrequencyConflict,
                format!(
                    "{} drives {} outputs at {} Hz ({}) and {} outputs at {} Hz ({}); move one family to another timer",
                    bank.instance,
                    first.keyword(),
                    base.frequency_hz,
                    base.protocol,
                    family.keyword(),
                    other.frequency_hz,
                    other.protocol
                ),
            );
            if let Some(channel) = bank.channels_of(*family).next() {
                d = d
                    .with_resource(channel.identity())
                    .with_pin(channel.pin())
                    .with_line(channel.source.line);
            }
            diagnostics.push(d);
        }
    }
}

/// Flag timer channels driven by more than one output.
///
/// One diagnostic per contested channel, naming every output on it. A
/// complementary `CHnN` output shares the compare register of `CHn`.
pub(crate) fn check_channel_conflicts(banks: &[TimerBank], diagnostics: &mut Vec<Diagnostic>) {
    for bank in banks {
        let mut by_channel: BTreeMap<u8, Vec<&ValidatedAssignment>> = BTreeMap::new();
        for output in &bank.channels {
            if let Some(channel) = output.entry().and_then(|e| e.timer_channel()) {
                by_channel.entry(channel).or_default().push(output);
            }
        }

        for (channel, outputs) in by_channel {
            let [_, second, ..] = outputs.as_slice() else {
                continue;
            };
            let names: Vec<String> = outputs
                .iter()
                .map(|o| format!("{} ({})", o.identity(), o.pin()))
                .collect();
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::TimerChannelConflict,
                    format!(
                        "{} CH{channel} is driven by {} outputs: {}; each output needs its own channel",
                        bank.instance,
                        outputs.len(),
                        names.join(", ")
                    ),
                )
                .with_resource(second.identity())
                .with_pin(second.pin())
                .with_line(second.source.line),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OutputProtocol, OutputTiming};
    use pinmux_caps::{CapabilityEntry, PinFunction};
    use pinmux_core::{PeripheralInstance, Pin, PinVariant};

    fn tim(pin: &str, variant: Option<u8>, instance: &str, af: u8, channel: u8) -> CapabilityEntry {
        CapabilityEntry {
            pin: PinVariant {
                base: Pin::parse_board_token(pin).unwrap(),
                variant,
            },
            kind: PeripheralKind::Timer,
            instance: PeripheralInstance::parse(instance).unwrap(),
            af: Some(af),
            function: PinFunction::Timer {
                channel,
                complementary: false,
            },
        }
    }

    fn caps() -> CapabilityModel {
        CapabilityModel::from_entries(
            "TEST",
            [
                tim("A08", None, "TIM1", 1, 1),
                tim("A09", None, "TIM1", 1, 2),
                tim("A10", None, "TIM1", 1, 3),
                tim("B00", None, "TIM1", 1, 2),
                tim("B00", Some(1), "TIM3", 2, 3),
                tim("B04", None, "TIM3", 2, 1),
                tim("B05", None, "TIM3", 2, 2),
                tim("B05", Some(1), "TIM3", 2, 2),
                tim("A00", None, "TIM2", 1, 1),
                tim("A15", None, "TIM2", 1, 1),
                tim("A05", None, "TIM2", 1, 1),
                tim("A01", None, "TIM2", 1, 2),
            ],
        )
        .0
    }

    fn run(text: &str) -> (Vec<ValidatedAssignment>, Vec<ResourceRef>, Vec<Diagnostic>) {
        let config = pinmux_board::parse(text).model;
        let mut diags = Vec::new();
        let (resolved, dropped) = resolve_timer_outputs(&config, &caps(), &mut diags);
        (resolved, dropped, diags)
    }

    #[test]
    fn alternate_selected_by_af() {
        let (resolved, _, diags) = run("resource MOTOR 4 B00\ntimer B00 AF2");
        assert!(diags.is_empty(), "{diags:?}");
        let entry = resolved[0].entry().unwrap();
        assert_eq!(entry.pin.canonical(), "PB_0_ALT1");
        assert_eq!(entry.instance.name(), "TIM3");
        assert_eq!(entry.timer_channel(), Some(3));
    }

    #[test]
    fn missing_timer_annotation() {
        let (resolved, dropped, diags) = run("resource MOTOR 1 A08");
        assert!(resolved.is_empty());
        assert_eq!(dropped.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MissingTimer);
    }

    #[test]
    fn no_matching_af_lists_valid_ids() {
        let (_, _, diags) = run("resource MOTOR 1 B00\ntimer B00 AF3");
        assert_eq!(diags[0].kind, DiagnosticKind::NoMatchingVariant);
        assert!(diags[0].message.contains("AF1 (TIM1_CH2 via PB_0)"));
        assert!(diags[0].message.contains("AF2 (TIM3_CH3 via PB_0_ALT1)"));
    }

    #[test]
    fn ambiguous_af() {
        let (resolved, _, diags) = run("resource SERVO 1 B05\ntimer B05 AF2");
        assert!(resolved.is_empty());
        assert_eq!(diags[0].kind, DiagnosticKind::AmbiguousMapping);
    }

    #[test]
    fn advisory_mismatch_is_warning() {
        let (resolved, _, diags) =
            run("resource MOTOR 1 B00\ntimer B00 AF2\n# pin B00: TIM1 CH2N (AF1)");
        assert_eq!(resolved.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::AdvisoryMismatch);
        assert!(!diags[0].is_error());
    }

    #[test]
    fn banks_partition_by_instance() {
        let (resolved, _, _) = run(
            "resource MOTOR 1 A08\nresource MOTOR 2 A09\nresource MOTOR 3 A10\nresource MOTOR 4 B00\nresource MOTOR 5 B04\n\
             timer A08 AF1\ntimer A09 AF1\ntimer A10 AF1\ntimer B00 AF2\ntimer B04 AF2",
        );
        let banks = build_banks(resolved);
        assert_eq!(banks.len(), 2);
        assert_eq!(banks[0].instance.name(), "TIM1");
        assert_eq!(banks[0].channels.len(), 3);
        assert_eq!(banks[1].instance.name(), "TIM3");
        let indices: Vec<u8> = banks[1].channels.iter().map(|c| c.index()).collect();
        assert_eq!(indices, vec![4, 5]);
        for bank in &banks {
            for channel in &bank.channels {
                assert_eq!(channel.entry().unwrap().instance, bank.instance);
            }
        }
    }

    #[test]
    fn mixed_family_frequency_conflict() {
        let (resolved, _, _) = run("resource MOTOR 1 B04\nresource SERVO 1 B00\ntimer B04 AF2\ntimer B00 AF2");
        let banks = build_banks(resolved);
        assert_eq!(banks.len(), 1);
        let timings = FamilyTimings {
            motor: OutputTiming::nominal(OutputProtocol::Oneshot125),
            servo: OutputTiming::nominal(OutputProtocol::Pwm),
            led_strip: OutputTiming::nominal(OutputProtocol::Ws2812),
        };
        let mut diags = Vec::new();
        check_bank_frequencies(&banks, &timings, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::TimerFrequencyConflict);

        let same = FamilyTimings {
            servo: OutputTiming::nominal(OutputProtocol::Oneshot125),
            ..timings
        };
        let mut diags = Vec::new();
        check_bank_frequencies(&banks, &same, &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn shared_channel_names_every_output() {
        let (resolved, _, diags) = run(
            "resource MOTOR 1 A00\nresource MOTOR 2 A15\nresource MOTOR 3 A05\nresource MOTOR 4 A01\n\
             timer A00 AF1\ntimer A15 AF1\ntimer A05 AF1\ntimer A01 AF1",
        );
        assert!(diags.is_empty(), "{diags:?}");
        let banks = build_banks(resolved);
        assert_eq!(banks.len(), 1);

        let mut diags = Vec::new();
        check_channel_conflicts(&banks, &mut diags);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::TimerChannelConflict);
        assert!(diags[0].is_error());
        assert!(diags[0].message.starts_with("TIM2 CH1 is driven by 3 outputs"), "{}", diags[0].message);
        for name in ["MOTOR 1 (A00)", "MOTOR 2 (A15)", "MOTOR 3 (A05)"] {
            assert!(diags[0].message.contains(name), "{name}: {}", diags[0].message);
        }
        assert!(!diags[0].message.contains("MOTOR 4"));
    }

    #[test]
    fn complementary_output_shares_its_channel() {
        let (resolved, _, _) = run("resource MOTOR 1 A09\nresource SERVO 1 B00\ntimer A09 AF1\ntimer B00 AF1");
        let mut diags = Vec::new();
        check_channel_conflicts(&build_banks(resolved), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("TIM1 CH2"));
    }

    #[test]
    fn distinct_channels_do_not_conflict() {
        let (resolved, _, _) = run(
            "resource MOTOR 1 A08\nresource MOTOR 2 A09\nresource MOTOR 3 A10\ntimer A08 AF1\ntimer A09 AF1\ntimer A10 AF1",
        );
        let mut diags = Vec::new();
        check_channel_conflicts(&build_banks(resolved), &mut diags);
        assert!(diags.is_empty(), "{diags:?}");
    }
}
