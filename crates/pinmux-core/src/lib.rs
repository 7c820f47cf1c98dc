//! Shared vocabulary for the pinmux board-configuration transpiler.
//!
//! Every stage of the pipeline (board parser, capability model, resolver,
//! generator) speaks in terms of the types defined here:
//! - **Pins:** [`Pin`] (a physical port/number pair) and [`PinVariant`]
//!   (a pin plus an optional alternate-function variant tag)
//! - **Peripherals:** [`PeripheralKind`], bus [`Signal`]s, and
//!   [`PeripheralInstance`] names such as `TIM3` or `USART1`
//! - **Resources:** the closed [`ResourceType`] sum the resolver reasons about
//! - **Diagnostics:** accumulated, never-thrown validation findings

pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod peripheral;
pub mod pin;
pub mod resource;

pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSummary, Severity};
pub use error::{CoreError, Result};
pub use hash::{hash_hex, source_digest, SourceDigest};
pub use peripheral::{InstanceSelector, PeripheralInstance, PeripheralKind, Signal};
pub use pin::{normalize_pin_token, Pin, PinVariant};
pub use resource::{GpioRole, OutputFamily, ResourceCategory, ResourceRef, ResourceType};
