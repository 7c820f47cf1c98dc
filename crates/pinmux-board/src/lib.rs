//! Board-definition parser.
//!
//! Turns Betaflight unified-target `.config` text into a [`ConfigModel`]:
//! resource-to-pin assignments, timer alternate-function annotations,
//! settings, chip hints, and opaque passthrough statements. Parsing never
//! fails on content; problems with individual lines are reported as
//! warnings in [`ParseOutput::diagnostics`].

pub mod error;
pub mod hints;
pub mod model;
pub mod parse;

pub use error::{BoardError, Result};
pub use hints::{ChipHint, ChipHints};
pub use model::{
    AdvisoryChannel, BoardMetadata, ConfigModel, Passthrough, ResourceAssignment, Setting,
    TimerAnnotation,
};
pub use parse::{load_board, parse, parse_with, DuplicatePolicy, ParseOptions, ParseOutput};
