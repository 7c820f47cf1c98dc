//! Resolution entry points.

use pinmux_board::ConfigModel;
use pinmux_caps::CapabilityModel;
use pinmux_core::{OutputFamily, ResourceType};

use crate::bus::resolve_buses;
use crate::conflict::check_pin_conflicts;
use crate::gpio::resolve_gpio_resources;
use crate::ir::{FamilyTimings, Resolution, ResolvedBoard};
use crate::protocol::{family_timing, OutputProtocol};
use crate::settings::check_device_buses;
use crate::timer::{build_banks, check_bank_frequencies, check_channel_conflicts, resolve_timer_outputs};

/// Resolver options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Protocol used when `motor_pwm_protocol` is absent or unknown.
    pub motor_protocol: OutputProtocol,
    /// Protocol used when `servo_pwm_protocol` is absent or unknown.
    pub servo_protocol: OutputProtocol,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            motor_protocol: OutputProtocol::Oneshot125,
            servo_protocol: OutputProtocol::Pwm,
        }
    }
}

/// Resolve a board against a capability model with default options.
pub fn resolve(config: &ConfigModel, caps: &CapabilityModel) -> Resolution {
    resolve_with(config, caps, &ResolveOptions::default())
}

/// Resolve a board against a capability model.
///
/// Runs every pass and always returns the best-effort board together with
/// the full diagnostic list. Whether errors block generation is up to the
/// caller.
pub fn resolve_with(
    config: &ConfigModel,
    caps: &CapabilityModel,
    options: &ResolveOptions,
) -> Resolution {
    let mut diagnostics = Vec::new();

    let (buses, mut dropped) = resolve_buses(config, caps, &mut diagnostics);
    check_device_buses(config, &buses, &mut diagnostics);

    let timings = FamilyTimings {
        motor: family_timing(config, OutputFamily::Motor, options.motor_protocol, &mut diagnostics),
        servo: family_timing(config, OutputFamily::Servo, options.servo_protocol, &mut diagnostics),
        led_strip: family_timing(config, OutputFamily::LedStrip, options.motor_protocol, &mut diagnostics),
    };
    let (outputs, dropped_outputs) = resolve_timer_outputs(config, caps, &mut diagnostics);
    dropped.extend(dropped_outputs);
    let timer_banks = build_banks(outputs);
    check_bank_frequencies(&timer_banks, &timings, &mut diagnostics);
    check_channel_conflicts(&timer_banks, &mut diagnostics);

    let (gpio, dropped_gpio) = resolve_gpio_resources(config, caps, &mut diagnostics);
    dropped.extend(dropped_gpio);

    check_pin_conflicts(config, &mut diagnostics);

    let unmodeled = config
        .resources()
        .iter()
        .filter(|r| matches!(r.resource, ResourceType::Unmodeled(_)))
        .count();

    let board = ResolvedBoard {
        mcu: caps.mcu().to_string(),
        config: config.clone(),
        buses,
        timer_banks,
        gpio,
        timings,
        dropped,
    };
    let resolution = Resolution { board, diagnostics };

    tracing::info!(
        "resolved {} assignment(s) into {} bus(es) and {} timer bank(s); {} dropped, {} unmodeled; {}",
        resolution.board.validated_count(),
        resolution.board.buses.len(),
        resolution.board.timer_banks.len(),
        resolution.board.dropped.len(),
        unmodeled,
        resolution.summary()
    );
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinmux_core::{Diagnostic, DiagnosticKind, GpioRole, PeripheralKind, ResourceRef, Signal};

    const TABLE: &str = r#"
WEAK const PinMap PinMap_ADC[] = {
  {PA_0,      ADC1, STM_PIN_DATA_EXT(STM_MODE_ANALOG, GPIO_NOPULL, 0, 0, 0)}, // ADC1_IN0
  {PA_1,      ADC1, STM_PIN_DATA_EXT(STM_MODE_ANALOG, GPIO_NOPULL, 0, 1, 0)}, // ADC1_IN1
  {NC,        NP,   0}
};
WEAK const PinMap PinMap_SPI_MOSI[] = {
  {PA_7,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {PB_5,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {NC,        NP,   0}
};
WEAK const PinMap PinMap_SPI_MISO[] = {
  {PA_6,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {PB_4,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {NC,        NP,   0}
};
WEAK const PinMap PinMap_SPI_SCLK[] = {
  {PA_5,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {PB_3,      SPI1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF5_SPI1)},
  {NC,        NP,   0}
};
WEAK const PinMap PinMap_TIM[] = {
  {PA_0,      TIM2, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM2, 1, 0)}, // TIM2_CH1
  {PA_5,      TIM2, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM2, 1, 0)}, // TIM2_CH1
  {PA_8,      TIM1, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 1, 0)}, // TIM1_CH1
  {PA_9,      TIM1, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 2, 0)}, // TIM1_CH2
  {PA_10,     TIM1, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 3, 0)}, // TIM1_CH3
  {PB_0,      TIM1, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 2, 1)}, // TIM1_CH2N
  {PB_0_ALT1, TIM3, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 3, 0)}, // TIM3_CH3
  {PB_4,      TIM3, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)}, // TIM3_CH1
  {PA_15,     TIM2, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM2, 1, 0)}, // TIM2_CH1
  {NC,        NP,   0}
};
"#;

    fn caps() -> CapabilityModel {
        let (caps, issues) = CapabilityModel::parse("STM32F411", TABLE);
        assert!(issues.is_empty(), "{issues:?}");
        caps
    }

    fn run(text: &str) -> Resolution {
        let parsed = pinmux_board::parse(text);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        resolve(&parsed.model, &caps())
    }

    fn of_kind(diags: &[Diagnostic], kind: DiagnosticKind) -> Vec<&Diagnostic> {
        diags.iter().filter(|d| d.kind == kind).collect()
    }

    #[test]
    fn motor_on_alternate_variant() {
        let res = run("resource MOTOR 4 B00\ntimer B00 AF2");
        assert!(res.diagnostics.is_empty(), "{:?}", res.diagnostics);
        let bank = &res.board.timer_banks[0];
        let motor = &bank.channels[0];
        assert_eq!(motor.pin_variant().canonical(), "PB_0_ALT1");
        assert_eq!(bank.instance.name(), "TIM3");
        assert_eq!(motor.entry().unwrap().timer_channel(), Some(3));
    }

    #[test]
    fn bus_override_to_missing_instance() {
        let res = run("resource SPI_MOSI 3 A07\nset bus_spi_3 = 3");
        assert_eq!(of_kind(&res.diagnostics, DiagnosticKind::InstanceMismatch).len(), 1);
        let identity = ResourceRef::new(ResourceType::Bus(Signal::SpiMosi), 3);
        assert!(res.board.find(&identity).is_none());
        assert!(res.board.dropped.contains(&identity));
        assert!(res.board.bus(PeripheralKind::Spi, 3).is_none());
    }

    #[test]
    fn bus_override_onto_claimed_instance() {
        let res = run(
            "resource SPI_SCK 1 A05\nresource SPI_MISO 1 A06\nresource SPI_MOSI 1 A07\n\
             resource SPI_SCK 2 B03\nresource SPI_MISO 2 B04\nresource SPI_MOSI 2 B05\n\
             set bus_spi_2 = 1",
        );
        let conflicts = of_kind(&res.diagnostics, DiagnosticKind::BusInstanceConflict);
        assert_eq!(conflicts.len(), 1, "{:?}", res.diagnostics);
        assert!(conflicts[0].message.contains("SPI1"));
        assert!(conflicts[0].message.contains("1 and 2"));
        assert!(res.has_errors());
    }

    #[test]
    fn motors_sharing_one_timer_channel() {
        let res = run(
            "resource MOTOR 1 A00\nresource MOTOR 2 A15\nresource MOTOR 3 A05\n\
             timer A00 AF1\ntimer A15 AF1\ntimer A05 AF1",
        );
        let conflicts = of_kind(&res.diagnostics, DiagnosticKind::TimerChannelConflict);
        assert_eq!(conflicts.len(), 1, "{:?}", res.diagnostics);
        for name in ["MOTOR 1", "MOTOR 2", "MOTOR 3"] {
            assert!(conflicts[0].message.contains(name), "{}", conflicts[0].message);
        }
        assert_eq!(res.board.timer_banks.len(), 1);
        assert_eq!(res.diagnostics.len(), 1, "{:?}", res.diagnostics);
    }

    #[test]
    fn shared_chip_select_conflict() {
        let res = run("resource GYRO_CS 1 A04\nresource FLASH_CS 1 A04");
        let conflicts = of_kind(&res.diagnostics, DiagnosticKind::PinConflict);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].message.contains("GYRO_CS 1"));
        assert!(conflicts[0].message.contains("FLASH_CS 1"));
    }

    #[test]
    fn five_motors_two_banks() {
        let res = run(
            "resource MOTOR 1 A08\nresource MOTOR 2 A09\nresource MOTOR 3 A10\nresource MOTOR 4 B00\nresource MOTOR 5 B04\n\
             timer A08 AF1\ntimer A09 AF1\ntimer A10 AF1\ntimer B00 AF2\ntimer B04 AF2",
        );
        assert!(!res.has_errors(), "{:?}", res.diagnostics);
        let sizes: Vec<usize> = res.board.timer_banks.iter().map(|b| b.channels.len()).collect();
        assert_eq!(sizes, vec![3, 2]);
        let channels: Vec<(String, u8)> = res
            .board
            .timer_banks
            .iter()
            .flat_map(|b| b.channels.iter())
            .map(|c| {
                let e = c.entry().unwrap();
                (e.instance.name().to_string(), e.timer_channel().unwrap())
            })
            .collect();
        assert_eq!(
            channels,
            vec![
                ("TIM1".to_string(), 1),
                ("TIM1".to_string(), 2),
                ("TIM1".to_string(), 3),
                ("TIM3".to_string(), 3),
                ("TIM3".to_string(), 1),
            ]
        );
    }

    #[test]
    fn every_timer_output_in_exactly_one_bank() {
        let res = run(
            "resource MOTOR 2 A09\nresource SERVO 1 A08\nresource MOTOR 1 B04\nresource LED_STRIP 1 A10\n\
             timer A09 AF1\ntimer A08 AF1\ntimer B04 AF2\ntimer A10 AF1\nset servo_pwm_protocol = ONESHOT125",
        );
        let total: usize = res.board.timer_banks.iter().map(|b| b.channels.len()).sum();
        assert_eq!(total, 4);
        for bank in &res.board.timer_banks {
            for c in &bank.channels {
                assert_eq!(c.entry().unwrap().instance, bank.instance);
                let count = res
                    .board
                    .timer_banks
                    .iter()
                    .filter(|b| b.channels.contains(c))
                    .count();
                assert_eq!(count, 1);
            }
        }
        let names: Vec<&str> = res.board.timer_banks.iter().map(|b| b.instance.name()).collect();
        // Motor 1 on B04 is processed first.
        assert_eq!(names, vec!["TIM3", "TIM1"]);
        // LED strip shares TIM1 with motors at a different frequency.
        assert_eq!(of_kind(&res.diagnostics, DiagnosticKind::TimerFrequencyConflict).len(), 1);
    }

    #[test]
    fn full_board_resolves_cleanly() {
        let res = run(
            "resource SPI_SCK 1 A05\nresource SPI_MISO 1 A06\nresource SPI_MOSI 1 A07\nresource GYRO_CS 1 A04\n\
             resource ADC_BATT 1 A00\nresource ADC_CURR 1 A01\nresource MOTOR 1 A08\ntimer A08 AF1\n\
             set gyro_1_spibus = 1\nset motor_pwm_protocol = DSHOT600",
        );
        assert!(res.diagnostics.is_empty(), "{:?}", res.diagnostics);
        assert!(res.board.bus(PeripheralKind::Spi, 1).unwrap().is_complete());
        assert_eq!(res.board.gpio.len(), 3);
        assert!(res.board.first_gpio(GpioRole::AdcBatt).is_some());
        assert_eq!(res.board.timings.motor.protocol, OutputProtocol::Dshot600);
        assert_eq!(res.board.validated_count(), 7);
    }

    #[test]
    fn errors_accumulate_across_passes() {
        let res = run(
            "resource SPI_MOSI 2 A07\nresource MOTOR 1 A08\nresource ADC_BATT 1 A05\nresource LED 1 A08\n\
             set flash_spi_bus = 2",
        );
        for kind in [
            DiagnosticKind::InstanceMismatch,
            DiagnosticKind::IncompleteBus,
            DiagnosticKind::UnresolvedBusReference,
            DiagnosticKind::MissingTimer,
            DiagnosticKind::UnsupportedPin,
            DiagnosticKind::PinConflict,
        ] {
            assert_eq!(of_kind(&res.diagnostics, kind).len(), 1, "{kind:?}: {:?}", res.diagnostics);
        }
        assert_eq!(res.board.dropped.len(), 3);
        assert_eq!(res.board.gpio.len(), 1);
    }

    #[test]
    fn custom_default_protocol() {
        let parsed = pinmux_board::parse("set motor_pwm_protocol = BOGUS");
        let options = ResolveOptions {
            motor_protocol: OutputProtocol::Dshot300,
            ..ResolveOptions::default()
        };
        let res = resolve_with(&parsed.model, &caps(), &options);
        assert_eq!(res.board.timings.motor.protocol, OutputProtocol::Dshot300);
        assert_eq!(of_kind(&res.diagnostics, DiagnosticKind::UnknownProtocol).len(), 1);
    }

    #[test]
    fn empty_board() {
        let res = run("");
        assert!(res.diagnostics.is_empty());
        assert_eq!(res.board.validated_count(), 0);
    }

    #[test]
    fn ir_serializes() {
        let res = run("resource MOTOR 4 B00\ntimer B00 AF2");
        let json = serde_json::to_value(&res.board).unwrap();
        assert_eq!(json["timer_banks"][0]["instance"], "TIM3");
        assert_eq!(json["timer_banks"][0]["channels"][0]["resolved"]["Peripheral"]["pin"], "PB_0_ALT1");
    }
}
