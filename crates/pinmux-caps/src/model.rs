//! The queryable capability model of one MCU.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use pinmux_core::{InstanceSelector, PeripheralInstance, PeripheralKind, Pin, PinVariant, Signal};
use serde::Serialize;

use crate::table::{self, TableIssue};

/// What a pin does when routed to a peripheral instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PinFunction {
    /// Timer capture/compare channel; `complementary` for `CHxN` outputs.
    Timer { channel: u8, complementary: bool },
    /// A bus signal.
    Bus(Signal),
    /// ADC input channel.
    Analog { channel: u8 },
}

/// One row of a capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityEntry {
    pub pin: PinVariant,
    pub kind: PeripheralKind,
    pub instance: PeripheralInstance,
    /// Alternate-function number, when the table names one.
    pub af: Option<u8>,
    pub function: PinFunction,
}

impl CapabilityEntry {
    /// Timer channel, for timer entries.
    pub fn timer_channel(&self) -> Option<u8> {
        match self.function {
            PinFunction::Timer { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Bus signal, for bus entries.
    pub fn signal(&self) -> Option<Signal> {
        match self.function {
            PinFunction::Bus(signal) => Some(signal),
            _ => None,
        }
    }

    /// Function label as written in table comments (`TIM3_CH1N`, `SPI1_MOSI`, `ADC1_IN8`).
    pub fn label(&self) -> String {
        match self.function {
            PinFunction::Timer {
                channel,
                complementary,
            } => format!(
                "{}_CH{channel}{}",
                self.instance,
                if complementary { "N" } else { "" }
            ),
            PinFunction::Bus(signal) => format!("{}_{}", self.instance, signal.label()),
            PinFunction::Analog { channel } => format!("{}_IN{channel}", self.instance),
        }
    }
}

impl fmt::Display for CapabilityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pin, self.label())?;
        if let Some(af) = self.af {
            write!(f, " (AF{af})")?;
        }
        Ok(())
    }
}

/// How rows of a section are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionRole {
    Timer,
    Bus(Signal),
    Analog,
    /// Rows only add to the known-pin set.
    PinsOnly,
}

fn section_role(name: &str) -> SectionRole {
    match name {
        "TIM" => SectionRole::Timer,
        "SPI_MOSI" => SectionRole::Bus(Signal::SpiMosi),
        "SPI_MISO" => SectionRole::Bus(Signal::SpiMiso),
        "SPI_SCLK" => SectionRole::Bus(Signal::SpiSclk),
        "I2C_SCL" => SectionRole::Bus(Signal::I2cScl),
        "I2C_SDA" => SectionRole::Bus(Signal::I2cSda),
        "UART_TX" => SectionRole::Bus(Signal::UartTx),
        "UART_RX" => SectionRole::Bus(Signal::UartRx),
        "ADC" => SectionRole::Analog,
        _ => SectionRole::PinsOnly,
    }
}

/// Pin-to-peripheral capabilities of one MCU, indexed per peripheral kind.
///
/// Immutable once built. Entries keep table declaration order, so the
/// first entry for a pin and kind is the hardware default mapping.
#[derive(Debug, Clone)]
pub struct CapabilityModel {
    mcu: String,
    entries: Vec<CapabilityEntry>,
    by_pin: BTreeMap<(Pin, PeripheralKind), Vec<usize>>,
    by_instance: BTreeMap<(PeripheralKind, String), Vec<usize>>,
    known_pins: BTreeSet<Pin>,
    sections: Vec<String>,
}

/// Accumulates entries while enforcing per-section variant uniqueness.
struct Builder {
    model: CapabilityModel,
    seen: HashSet<(PinVariant, PeripheralKind, Option<Signal>)>,
    issues: Vec<TableIssue>,
}

impl Builder {
    fn new(mcu: &str) -> Self {
        Builder {
            model: CapabilityModel {
                mcu: mcu.to_string(),
                entries: Vec::new(),
                by_pin: BTreeMap::new(),
                by_instance: BTreeMap::new(),
                known_pins: BTreeSet::new(),
                sections: Vec::new(),
            },
            seen: HashSet::new(),
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, line: usize, message: String) {
        self.issues.push(TableIssue { line, message });
    }

    fn push(&mut self, entry: CapabilityEntry, line: usize) {
        let key = (entry.pin, entry.kind, entry.signal());
        if !self.seen.insert(key) {
            self.issue(
                line,
                format!(
                    "{} is listed twice for {}; keeping the first row",
                    entry.pin,
                    entry
                        .signal()
                        .map_or_else(|| entry.kind.to_string(), |s| s.to_string())
                ),
            );
            return;
        }

        let model = &mut self.model;
        let idx = model.entries.len();
        model.known_pins.insert(entry.pin.base);
        model
            .by_pin
            .entry((entry.pin.base, entry.kind))
            .or_default()
            .push(idx);
        model
            .by_instance
            .entry((entry.kind, entry.instance.name().to_string()))
            .or_default()
            .push(idx);
        model.entries.push(entry);
    }

    fn finish(self) -> (CapabilityModel, Vec<TableIssue>) {
        (self.model, self.issues)
    }
}

impl CapabilityModel {
    /// Build a model from `PeripheralPins.c` text.
    ///
    /// Malformed rows and duplicate variants are skipped and reported.
    pub fn parse(mcu: &str, text: &str) -> (Self, Vec<TableIssue>) {
        let (sections, scan_issues) = table::scan(text);
        let mut builder = Builder::new(mcu);
        builder.issues.extend(scan_issues);

        for section in sections {
            let role = section_role(&section.name);
            builder.model.sections.push(section.name.clone());

            for row in &section.rows {
                if row.fields.first().is_some_and(|f| f == "NC") {
                    break;
                }
                read_row(&mut builder, &section.name, role, row);
            }
        }

        let (model, issues) = builder.finish();
        tracing::debug!(
            mcu = %model.mcu,
            entries = model.entries.len(),
            sections = model.sections.len(),
            issues = issues.len(),
            "parsed capability table"
        );
        (model, issues)
    }

    /// Build a model directly from entries, in declaration order.
    pub fn from_entries(
        mcu: &str,
        entries: impl IntoIterator<Item = CapabilityEntry>,
    ) -> (Self, Vec<TableIssue>) {
        let mut builder = Builder::new(mcu);
        for (i, entry) in entries.into_iter().enumerate() {
            builder.push(entry, i + 1);
        }
        builder.finish()
    }

    /// The MCU this table describes.
    pub fn mcu(&self) -> &str {
        &self.mcu
    }

    /// Number of peripheral entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in declaration order.
    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    /// Names of every `PinMap_*` section read (without the prefix).
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Entries for a physical pin and kind, default mapping first.
    pub fn entries_for_pin(&self, pin: Pin, kind: PeripheralKind) -> Vec<&CapabilityEntry> {
        self.by_pin
            .get(&(pin, kind))
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Entries routed to a named instance (`TIM3`, `USART1`).
    pub fn entries_for_instance(&self, kind: PeripheralKind, instance: &str) -> Vec<&CapabilityEntry> {
        self.by_instance
            .get(&(kind, instance.to_ascii_uppercase()))
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// The mapping of `pin` (default or alternate) that reaches the desired
    /// instance. Never falls back to another instance.
    pub fn find_variant_for_instance(
        &self,
        pin: Pin,
        kind: PeripheralKind,
        desired: &InstanceSelector,
    ) -> Option<&CapabilityEntry> {
        self.entries_for_pin(pin, kind)
            .into_iter()
            .find(|e| e.instance.matches(desired))
    }

    /// Like [`find_variant_for_instance`](Self::find_variant_for_instance),
    /// restricted to entries carrying one bus signal.
    pub fn find_variant_for_signal(
        &self,
        pin: Pin,
        signal: Signal,
        desired: &InstanceSelector,
    ) -> Option<&CapabilityEntry> {
        self.entries_for_pin(pin, signal.kind())
            .into_iter()
            .find(|e| e.signal() == Some(signal) && e.instance.matches(desired))
    }

    /// The default ADC mapping of a pin.
    pub fn analog_entry(&self, pin: Pin) -> Option<&CapabilityEntry> {
        self.entries_for_pin(pin, PeripheralKind::Adc).into_iter().next()
    }

    /// Whether the package has this pin.
    ///
    /// A pin is known when any section lists it, or when any section lists
    /// another pin of the same GPIO port. Tables only list pins with
    /// peripheral functions, so plain GPIO pins are known by their port.
    /// PC13 to PC15 sit in the backup domain, are bonded out on every
    /// package, and rarely appear in any section.
    pub fn knows_pin(&self, pin: Pin) -> bool {
        let backup_domain = pin.port() == 'C' && (13..=15).contains(&pin.number());
        backup_domain
            || self.known_pins.contains(&pin)
            || self.known_pins.iter().any(|p| p.port() == pin.port())
    }

    /// Distinct instances of a kind, ordered by prefix then number.
    pub fn instances(&self, kind: PeripheralKind) -> Vec<&PeripheralInstance> {
        let mut instances: Vec<&PeripheralInstance> = self
            .by_instance
            .range((kind, String::new())..)
            .take_while(|((k, _), _)| *k == kind)
            .filter_map(|(_, idxs)| idxs.first().map(|&i| &self.entries[i].instance))
            .collect();
        instances.sort_by(|a, b| (a.prefix(), a.number()).cmp(&(b.prefix(), b.number())));
        instances
    }
}

fn read_row(builder: &mut Builder, section: &str, role: SectionRole, row: &table::RawRow) {
    let line = row.line;
    let Some(pin_field) = row.fields.first() else {
        builder.issue(line, format!("empty row in PinMap_{section}"));
        return;
    };
    let pin = match PinVariant::parse_table_name(pin_field) {
        Ok(pin) => pin,
        Err(e) => {
            builder.issue(line, e.to_string());
            return;
        }
    };
    builder.model.known_pins.insert(pin.base);

    let kind = match role {
        SectionRole::PinsOnly => return,
        SectionRole::Timer => PeripheralKind::Timer,
        SectionRole::Bus(signal) => signal.kind(),
        SectionRole::Analog => PeripheralKind::Adc,
    };

    let Some(instance_field) = row.fields.get(1) else {
        builder.issue(line, format!("{pin_field} has no peripheral instance"));
        return;
    };
    let instance = match PeripheralInstance::parse(instance_field) {
        Ok(instance) => instance,
        Err(e) => {
            builder.issue(line, e.to_string());
            return;
        }
    };

    let args = row
        .fields
        .get(2)
        .and_then(|f| table::parse_call(f))
        .map(|(_, args)| args)
        .unwrap_or_default();
    let af = args.get(2).and_then(|a| table::parse_af(a));
    let number_arg = |i: usize| args.get(i).and_then(|a| a.parse::<u8>().ok());

    let function = match role {
        SectionRole::Timer => match number_arg(3) {
            Some(channel) => PinFunction::Timer {
                channel,
                complementary: number_arg(4) == Some(1),
            },
            None => {
                builder.issue(line, format!("{pin_field} {instance}: timer row without a channel"));
                return;
            }
        },
        SectionRole::Analog => match number_arg(3) {
            Some(channel) => PinFunction::Analog { channel },
            None => {
                builder.issue(line, format!("{pin_field} {instance}: ADC row without a channel"));
                return;
            }
        },
        SectionRole::Bus(signal) => PinFunction::Bus(signal),
        SectionRole::PinsOnly => return,
    };

    builder.push(
        CapabilityEntry {
            pin,
            kind,
            instance,
            af,
            function,
        },
        line,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
WEAK const PinMap PinMap_ADC[] = {
  {PA_0,       ADC1, STM_PIN_DATA_EXT(STM_MODE_ANALOG, GPIO_NOPULL, 0, 0, 0)}, // ADC1_IN0
  {PB_0,       ADC1, STM_PIN_DATA_EXT(STM_MODE_ANALOG, GPIO_NOPULL, 0, 8, 0)}, // ADC1_IN8
  {NC,    NP,    0}
};

WEAK const PinMap PinMap_I2C_SDA[] = {
  {PB_8,       I2C3, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF9_I2C3)},
  {PB_9,       I2C1, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF4_I2C1)},
  {PB_9_ALT1,  I2C2, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF9_I2C2)},
  {NC,    NP,    0}
};

WEAK const PinMap PinMap_I2C_SCL[] = {
  {PB_8,       I2C1, STM_PIN_DATA(STM_MODE_AF_OD, GPIO_NOPULL, GPIO_AF4_I2C1)},
  {NC,    NP,    0}
};

WEAK const PinMap PinMap_TIM[] = {
  {PB_0,       TIM1, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM1, 2, 1)}, // TIM1_CH2N
  {PB_0_ALT1,  TIM3, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 3, 0)}, // TIM3_CH3
  {PB_4,       TIM3, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)}, // TIM3_CH1
  {PB_4,       TIM3, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3, 1, 0)}, // duplicate
  {PB_5,       TIM3, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF2_TIM3)},
  {PB_10,      TIM2, STM_PIN_DATA_EXT(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF1_TIM2, 3, 0)}, // TIM2_CH3
  {NC,    NP,    0}
};

WEAK const PinMap PinMap_UART_TX[] = {
  {PA_9,       USART1, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF7_USART1)},
  {PA_2,       USART2, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_PULLUP, GPIO_AF7_USART2)},
  {NC,    NP,    0}
};

WEAK const PinMap PinMap_USB_OTG_FS[] = {
  {PA_12,      USB_OTG_FS, STM_PIN_DATA(STM_MODE_AF_PP, GPIO_NOPULL, GPIO_AF10_OTG_FS)}, // USB_OTG_FS_DP
  {NC,    NP,    0}
};
"#;

    fn model() -> (CapabilityModel, Vec<TableIssue>) {
        CapabilityModel::parse("STM32F411", TABLE)
    }

    fn pin(s: &str) -> Pin {
        Pin::parse_board_token(s).unwrap()
    }

    #[test]
    fn parse_counts_and_issues() {
        let (model, issues) = model();
        assert_eq!(model.mcu(), "STM32F411");
        assert_eq!(model.sections().len(), 6);
        // PB_4 duplicate and PB_5 without a channel.
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert_eq!(model.len(), 12);
    }

    #[test]
    fn default_first_then_alternate() {
        let (model, _) = model();
        let entries = model.entries_for_pin(pin("B00"), PeripheralKind::Timer);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].pin.is_default());
        assert_eq!(entries[0].instance.name(), "TIM1");
        assert_eq!(entries[0].af, Some(1));
        assert_eq!(
            entries[0].function,
            PinFunction::Timer {
                channel: 2,
                complementary: true
            }
        );
        assert_eq!(entries[1].pin.canonical(), "PB_0_ALT1");
        assert_eq!(entries[1].label(), "TIM3_CH3");
    }

    #[test]
    fn variant_for_instance_picks_alternate() {
        let (model, _) = model();
        let tim3 = InstanceSelector::new(PeripheralKind::Timer, 3);
        let entry = model
            .find_variant_for_instance(pin("B00"), PeripheralKind::Timer, &tim3)
            .unwrap();
        assert_eq!(entry.pin.variant, Some(1));
        assert_eq!(entry.timer_channel(), Some(3));

        let tim4 = InstanceSelector::new(PeripheralKind::Timer, 4);
        assert!(model
            .find_variant_for_instance(pin("B00"), PeripheralKind::Timer, &tim4)
            .is_none());
    }

    #[test]
    fn signal_lookup_respects_section() {
        let (model, _) = model();
        let i2c1 = InstanceSelector::new(PeripheralKind::I2c, 1);
        let i2c3 = InstanceSelector::new(PeripheralKind::I2c, 3);
        assert!(model
            .find_variant_for_signal(pin("B08"), Signal::I2cScl, &i2c1)
            .is_some());
        assert!(model
            .find_variant_for_signal(pin("B08"), Signal::I2cSda, &i2c1)
            .is_none());
        assert!(model
            .find_variant_for_signal(pin("B08"), Signal::I2cSda, &i2c3)
            .is_some());
    }

    #[test]
    fn uart_selector_matches_usart_rows() {
        let (model, _) = model();
        let uart1 = InstanceSelector::new(PeripheralKind::Uart, 1);
        let tx = model
            .find_variant_for_signal(pin("A09"), Signal::UartTx, &uart1)
            .unwrap();
        assert_eq!(tx.instance.name(), "USART1");
        assert_eq!(tx.af, Some(7));
    }

    #[test]
    fn entries_for_instance_and_listing() {
        let (model, _) = model();
        assert_eq!(model.entries_for_instance(PeripheralKind::Timer, "TIM3").len(), 2);
        assert_eq!(model.entries_for_instance(PeripheralKind::Timer, "tim3").len(), 2);
        let names: Vec<&str> = model
            .instances(PeripheralKind::Timer)
            .iter()
            .map(|i| i.name())
            .collect();
        assert_eq!(names, vec!["TIM1", "TIM2", "TIM3"]);
    }

    #[test]
    fn analog_and_known_pins() {
        let (model, _) = model();
        let adc = model.analog_entry(pin("B00")).unwrap();
        assert_eq!(adc.label(), "ADC1_IN8");
        assert!(model.analog_entry(pin("B09")).is_none());

        assert!(model.knows_pin(pin("A12")));
        assert!(model.knows_pin(pin("A15")));
        assert!(model.knows_pin(pin("C13")));
        assert!(!model.knows_pin(pin("C06")));
        assert!(!model.knows_pin(pin("H01")));
    }

    #[test]
    fn from_entries_rejects_duplicate_default() {
        let entry = CapabilityEntry {
            pin: PinVariant::default_of(pin("A07")),
            kind: PeripheralKind::Spi,
            instance: PeripheralInstance::parse("SPI1").unwrap(),
            af: Some(5),
            function: PinFunction::Bus(Signal::SpiMosi),
        };
        let (model, issues) = CapabilityModel::from_entries("TEST", [entry.clone(), entry]);
        assert_eq!(model.len(), 1);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn empty_text() {
        let (model, issues) = CapabilityModel::parse("X", "");
        assert!(model.is_empty());
        assert!(model.sections().is_empty());
        assert!(issues.is_empty());
    }
}
