//! Resolver and validator for board definitions.
//!
//! Cross-references a parsed [`ConfigModel`](pinmux_board::ConfigModel)
//! with a [`CapabilityModel`](pinmux_caps::CapabilityModel):
//! - **Bus pins** resolve to the pin variant reaching the desired instance
//! - **Timer outputs** resolve through their alternate-function annotation
//!   and are grouped into [`TimerBank`]s
//! - **GPIO** resources are checked for existence
//! - **Pins** claimed twice are reported once per pin
//!
//! Nothing here aborts. [`resolve`] returns a [`Resolution`] holding the
//! best-effort [`ResolvedBoard`] and every [`Diagnostic`](pinmux_core::Diagnostic).

mod bus;
mod conflict;
mod gpio;
pub mod ir;
mod outcome;
pub mod protocol;
mod resolve;
pub mod settings;
mod timer;

pub use ir::{
    FamilyTimings, Resolution, Resolved, ResolvedBoard, ResolvedBus, TimerBank, ValidatedAssignment,
};
pub use protocol::{OutputProtocol, OutputTiming};
pub use resolve::{resolve, resolve_with, ResolveOptions};
pub use settings::DEVICE_BUS_SETTINGS;
pub use timer::build_banks;
