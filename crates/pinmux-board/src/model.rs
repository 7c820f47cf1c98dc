//! In-memory model of a parsed board definition.

use pinmux_core::{Pin, ResourceRef, ResourceType};
use serde::Serialize;

use crate::hints::ChipHints;

/// A `resource <TYPE> <INDEX> <PIN>` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAssignment {
    pub resource: ResourceType,
    /// 1-based resource index.
    pub index: u8,
    pub pin: Pin,
    /// 1-based source line.
    pub line: usize,
}

impl ResourceAssignment {
    /// The `(type, index)` identity of this assignment.
    pub fn identity(&self) -> ResourceRef {
        ResourceRef::new(self.resource.clone(), self.index)
    }
}

/// Timer and channel named by a `# pin B04: TIM3 CH1` comment.
///
/// Advisory only; the resolver derives the real channel from the
/// capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryChannel {
    pub timer: String,
    pub channel: u8,
}

/// A `timer <PIN> AF<N>` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerAnnotation {
    pub pin: Pin,
    /// Alternate-function number.
    pub af: u8,
    pub advisory: Option<AdvisoryChannel>,
    pub line: usize,
}

/// A `set <KEY> = <VALUE>` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// A structurally valid statement the parser does not model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passthrough {
    /// Leading keyword, lowercased.
    pub keyword: String,
    /// The full trimmed line.
    pub text: String,
    pub line: usize,
}

/// Descriptive board metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardMetadata {
    /// MCU named in the `# Betaflight / STM32F411 ...` header.
    pub mcu: Option<String>,
    pub board_name: Option<String>,
    pub manufacturer_id: Option<String>,
}

/// A parsed board definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigModel {
    pub(crate) resources: Vec<ResourceAssignment>,
    pub(crate) timers: Vec<TimerAnnotation>,
    pub(crate) settings: Vec<Setting>,
    pub(crate) chip_hints: ChipHints,
    pub(crate) passthrough: Vec<Passthrough>,
    pub(crate) metadata: BoardMetadata,
}

impl ConfigModel {
    /// Whether the definition contained no statements at all.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
            && self.timers.is_empty()
            && self.settings.is_empty()
            && self.passthrough.is_empty()
            && self.chip_hints.is_empty()
    }

    /// All resource assignments, in declaration order.
    pub fn resources(&self) -> &[ResourceAssignment] {
        &self.resources
    }

    /// All assignments of one resource type.
    pub fn resources_of<'a>(
        &'a self,
        resource: &'a ResourceType,
    ) -> impl Iterator<Item = &'a ResourceAssignment> + 'a {
        self.resources.iter().filter(move |r| &r.resource == resource)
    }

    /// Look up one resource by type and index.
    pub fn resource(&self, resource: &ResourceType, index: u8) -> Option<&ResourceAssignment> {
        self.resources
            .iter()
            .find(|r| &r.resource == resource && r.index == index)
    }

    /// All timer annotations, one per pin.
    pub fn timers(&self) -> &[TimerAnnotation] {
        &self.timers
    }

    /// The timer annotation for a pin.
    pub fn timer_for(&self, pin: Pin) -> Option<&TimerAnnotation> {
        self.timers.iter().find(|t| t.pin == pin)
    }

    /// All settings, one per key.
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// The value of a setting.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.value.as_str())
    }

    /// Chip/category hints from `#define USE_*` lines.
    pub fn chip_hints(&self) -> &ChipHints {
        &self.chip_hints
    }

    /// Unmodeled statements, in order.
    pub fn passthrough(&self) -> &[Passthrough] {
        &self.passthrough
    }

    pub fn metadata(&self) -> &BoardMetadata {
        &self.metadata
    }

    pub fn mcu(&self) -> Option<&str> {
        self.metadata.mcu.as_deref()
    }

    pub fn board_name(&self) -> Option<&str> {
        self.metadata.board_name.as_deref()
    }

    pub fn manufacturer_id(&self) -> Option<&str> {
        self.metadata.manufacturer_id.as_deref()
    }
}
