//! The validated intermediate representation produced by resolution.

use pinmux_board::{ConfigModel, ResourceAssignment};
use pinmux_caps::CapabilityEntry;
use pinmux_core::{
    Diagnostic, DiagnosticSummary, GpioRole, InstanceSelector, OutputFamily, PeripheralInstance,
    PeripheralKind, Pin, PinVariant, ResourceRef, ResourceType, Signal,
};
use serde::Serialize;

use crate::protocol::OutputTiming;

/// What an assignment resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolved {
    /// A specific capability-table mapping (bus signal, timer channel, ADC input).
    Peripheral(CapabilityEntry),
    /// A plain GPIO pin with no peripheral routing.
    Gpio,
}

/// A resource assignment that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedAssignment {
    pub source: ResourceAssignment,
    pub resolved: Resolved,
}

impl ValidatedAssignment {
    pub fn peripheral(source: ResourceAssignment, entry: CapabilityEntry) -> Self {
        Self {
            source,
            resolved: Resolved::Peripheral(entry),
        }
    }

    pub fn gpio(source: ResourceAssignment) -> Self {
        Self {
            source,
            resolved: Resolved::Gpio,
        }
    }

    /// The capability entry, for peripheral resolutions.
    pub fn entry(&self) -> Option<&CapabilityEntry> {
        match &self.resolved {
            Resolved::Peripheral(entry) => Some(entry),
            Resolved::Gpio => None,
        }
    }

    /// The pin variant to emit. Plain GPIO uses the default mapping.
    pub fn pin_variant(&self) -> PinVariant {
        self.entry()
            .map_or_else(|| PinVariant::default_of(self.source.pin), |e| e.pin)
    }

    pub fn pin(&self) -> Pin {
        self.source.pin
    }

    pub fn index(&self) -> u8 {
        self.source.index
    }

    pub fn identity(&self) -> ResourceRef {
        self.source.identity()
    }

    /// Output family, for timer-bearing resources.
    pub fn family(&self) -> Option<OutputFamily> {
        match self.source.resource {
            ResourceType::Timer(family) => Some(family),
            _ => None,
        }
    }
}

/// One serial bus with the pins that resolved for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBus {
    /// Resource index the board definition used for this bus.
    pub index: u8,
    /// The instance every pin was matched against.
    pub selector: InstanceSelector,
    /// The concrete instance name from the table (`USART1`).
    pub instance: PeripheralInstance,
    /// Resolved signal pins, in declaration order.
    pub pins: Vec<ValidatedAssignment>,
}

impl ResolvedBus {
    pub fn kind(&self) -> PeripheralKind {
        self.selector.kind
    }

    /// The resolved pin carrying a signal.
    pub fn pin_for(&self, signal: Signal) -> Option<&ValidatedAssignment> {
        self.pins
            .iter()
            .find(|p| p.entry().and_then(CapabilityEntry::signal) == Some(signal))
    }

    /// Whether every required signal resolved.
    pub fn is_complete(&self) -> bool {
        Signal::required_for(self.kind())
            .iter()
            .all(|s| self.pin_for(*s).is_some())
    }
}

/// Output channels sharing one timer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerBank {
    pub instance: PeripheralInstance,
    /// Channels ordered by family, then resource index.
    pub channels: Vec<ValidatedAssignment>,
}

impl TimerBank {
    /// Channels of one family, by resource index.
    pub fn channels_of(&self, family: OutputFamily) -> impl Iterator<Item = &ValidatedAssignment> {
        self.channels
            .iter()
            .filter(move |c| c.family() == Some(family))
    }

    pub fn has_family(&self, family: OutputFamily) -> bool {
        self.channels_of(family).next().is_some()
    }
}

/// Per-family output timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FamilyTimings {
    pub motor: OutputTiming,
    pub servo: OutputTiming,
    pub led_strip: OutputTiming,
}

impl FamilyTimings {
    pub fn of(&self, family: OutputFamily) -> &OutputTiming {
        match family {
            OutputFamily::Motor => &self.motor,
            OutputFamily::Servo => &self.servo,
            OutputFamily::LedStrip => &self.led_strip,
        }
    }
}

/// The validated board: everything the generator needs.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBoard {
    /// MCU of the capability table used.
    pub mcu: String,
    /// The parsed board definition (settings, metadata, hints, passthrough).
    pub config: ConfigModel,
    /// Buses ordered by kind, then index.
    pub buses: Vec<ResolvedBus>,
    /// Banks in order of first appearance.
    pub timer_banks: Vec<TimerBank>,
    /// Single-purpose GPIO and ADC resources, in declaration order.
    pub gpio: Vec<ValidatedAssignment>,
    pub timings: FamilyTimings,
    /// Modeled resources that failed to resolve.
    pub dropped: Vec<ResourceRef>,
}

impl ResolvedBoard {
    /// The bus a board definition refers to by kind and index.
    pub fn bus(&self, kind: PeripheralKind, index: u8) -> Option<&ResolvedBus> {
        self.buses
            .iter()
            .find(|b| b.kind() == kind && b.index == index)
    }

    pub fn buses_of(&self, kind: PeripheralKind) -> impl Iterator<Item = &ResolvedBus> {
        self.buses.iter().filter(move |b| b.kind() == kind)
    }

    /// Resolved GPIO resources of one role, by index.
    pub fn gpio_of(&self, role: GpioRole) -> Vec<&ValidatedAssignment> {
        let mut found: Vec<&ValidatedAssignment> = self
            .gpio
            .iter()
            .filter(|g| g.source.resource == ResourceType::Gpio(role))
            .collect();
        found.sort_by_key(|g| g.index());
        found
    }

    /// The first resolved GPIO resource of a role.
    pub fn first_gpio(&self, role: GpioRole) -> Option<&ValidatedAssignment> {
        self.gpio_of(role).into_iter().next()
    }

    /// Banks that drive at least one output of a family.
    pub fn banks_for(&self, family: OutputFamily) -> impl Iterator<Item = &TimerBank> {
        self.timer_banks
            .iter()
            .filter(move |b| b.has_family(family))
    }

    /// Dropped resources of one type, by index.
    pub fn dropped_of(&self, resource: &ResourceType) -> Vec<u8> {
        let mut indices: Vec<u8> = self
            .dropped
            .iter()
            .filter(|r| &r.resource == resource)
            .map(|r| r.index)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Number of validated assignments across buses, banks, and GPIO.
    pub fn validated_count(&self) -> usize {
        self.buses.iter().map(|b| b.pins.len()).sum::<usize>()
            + self.timer_banks.iter().map(|b| b.channels.len()).sum::<usize>()
            + self.gpio.len()
    }

    /// The validated assignment of one resource.
    pub fn find(&self, identity: &ResourceRef) -> Option<&ValidatedAssignment> {
        self.buses
            .iter()
            .flat_map(|b| b.pins.iter())
            .chain(self.timer_banks.iter().flat_map(|b| b.channels.iter()))
            .chain(self.gpio.iter())
            .find(|va| &va.identity() == identity)
    }
}

/// Best-effort IR plus every diagnostic found.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub board: ResolvedBoard,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn summary(&self) -> DiagnosticSummary {
        DiagnosticSummary::of(&self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}
