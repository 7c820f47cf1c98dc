//! Output protocols and the timing they impose on a timer.

use std::fmt;

use pinmux_board::ConfigModel;
use pinmux_core::{Diagnostic, DiagnosticKind, OutputFamily};
use serde::Serialize;

/// Motor/servo/LED output protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputProtocol {
    Pwm,
    Oneshot125,
    Oneshot42,
    Multishot,
    Brushed,
    Dshot150,
    Dshot300,
    Dshot600,
    Ws2812,
}

impl OutputProtocol {
    /// Parse a protocol name as written in `motor_pwm_protocol`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PWM" | "STANDARD" => Some(OutputProtocol::Pwm),
            "ONESHOT125" => Some(OutputProtocol::Oneshot125),
            "ONESHOT42" => Some(OutputProtocol::Oneshot42),
            "MULTISHOT" => Some(OutputProtocol::Multishot),
            "BRUSHED" => Some(OutputProtocol::Brushed),
            "DSHOT150" => Some(OutputProtocol::Dshot150),
            "DSHOT300" => Some(OutputProtocol::Dshot300),
            "DSHOT600" => Some(OutputProtocol::Dshot600),
            "WS2812" => Some(OutputProtocol::Ws2812),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputProtocol::Pwm => "PWM",
            OutputProtocol::Oneshot125 => "ONESHOT125",
            OutputProtocol::Oneshot42 => "ONESHOT42",
            OutputProtocol::Multishot => "MULTISHOT",
            OutputProtocol::Brushed => "BRUSHED",
            OutputProtocol::Dshot150 => "DSHOT150",
            OutputProtocol::Dshot300 => "DSHOT300",
            OutputProtocol::Dshot600 => "DSHOT600",
            OutputProtocol::Ws2812 => "WS2812",
        }
    }

    /// Timer update rate the protocol is driven at.
    pub fn nominal_frequency_hz(&self) -> u32 {
        match self {
            OutputProtocol::Pwm => 50,
            OutputProtocol::Oneshot125 => 1_000,
            OutputProtocol::Oneshot42 => 2_000,
            OutputProtocol::Multishot => 8_000,
            OutputProtocol::Brushed => 16_000,
            OutputProtocol::Dshot150 | OutputProtocol::Dshot300 | OutputProtocol::Dshot600 => 1_000,
            OutputProtocol::Ws2812 => 800_000,
        }
    }

    /// Pulse-width range in microseconds; `(0, 0)` for protocols that do not
    /// encode values as pulse width.
    pub fn pulse_range_us(&self) -> (u32, u32) {
        match self {
            OutputProtocol::Pwm => (1000, 2000),
            OutputProtocol::Oneshot125 => (125, 250),
            OutputProtocol::Oneshot42 => (42, 84),
            OutputProtocol::Multishot => (5, 25),
            _ => (0, 0),
        }
    }

    /// Whether the protocol is pulse-width based and honors a rate override.
    pub fn is_analog(&self) -> bool {
        matches!(
            self,
            OutputProtocol::Pwm
                | OutputProtocol::Oneshot125
                | OutputProtocol::Oneshot42
                | OutputProtocol::Multishot
                | OutputProtocol::Brushed
        )
    }
}

impl fmt::Display for OutputProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timing shared by every channel of one output family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputTiming {
    pub protocol: OutputProtocol,
    pub frequency_hz: u32,
    pub min_us: u32,
    pub max_us: u32,
}

impl OutputTiming {
    pub fn nominal(protocol: OutputProtocol) -> Self {
        let (min_us, max_us) = protocol.pulse_range_us();
        Self {
            protocol,
            frequency_hz: protocol.nominal_frequency_hz(),
            min_us,
            max_us,
        }
    }
}

/// Setting keys that select a family's protocol and rate.
fn family_settings(family: OutputFamily) -> Option<(&'static str, &'static str)> {
    match family {
        OutputFamily::Motor => Some(("motor_pwm_protocol", "motor_pwm_rate")),
        OutputFamily::Servo => Some(("servo_pwm_protocol", "servo_pwm_rate")),
        OutputFamily::LedStrip => None,
    }
}

fn setting_line(config: &ConfigModel, key: &str) -> Option<usize> {
    config.settings().iter().find(|s| s.key == key).map(|s| s.line)
}

/// Determine the timing of one output family from the board settings.
///
/// Unknown protocol names fall back to `default` with an `UnknownProtocol`
/// warning. LED strips always run WS2812 timing.
pub fn family_timing(
    config: &ConfigModel,
    family: OutputFamily,
    default: OutputProtocol,
    diagnostics: &mut Vec<Diagnostic>,
) -> OutputTiming {
    let Some((protocol_key, rate_key)) = family_settings(family) else {
        return OutputTiming::nominal(OutputProtocol::Ws2812);
    };

    let protocol = match config.setting(protocol_key) {
        None => default,
        Some(name) => OutputProtocol::from_name(name).unwrap_or_else(|| {
            let mut d = Diagnostic::warning(
                DiagnosticKind::UnknownProtocol,
                format!(
                    "{protocol_key} = {name} is not a known protocol; using {default} for {} outputs",
                    family.keyword()
                ),
            );
            if let Some(line) = setting_line(config, protocol_key) {
                d = d.with_line(line);
            }
            diagnostics.push(d);
            default
        }),
    };

    let mut timing = OutputTiming::nominal(protocol);
    if let Some(rate) = config.setting(rate_key) {
        match rate.trim().parse::<u32>() {
            Ok(hz) if hz > 0 => {
                if protocol.is_analog() {
                    timing.frequency_hz = hz;
                } else {
                    tracing::debug!("{rate_key} ignored for {protocol}");
                }
            }
            _ => {
                let mut d = Diagnostic::warning(
                    DiagnosticKind::SyntaxIssue,
                    format!("{rate_key} = {rate} is not a positive rate in Hz; using {} Hz", timing.frequency_hz),
                );
                if let Some(line) = setting_line(config, rate_key) {
                    d = d.with_line(line);
                }
                diagnostics.push(d);
            }
        }
    }
    timing
}
