//! MCU pin capability model.
//!
//! Parses Arduino-core `PeripheralPins.c` tables into a [`CapabilityModel`]
//! that answers which peripheral instances a pin can reach, and through
//! which alternate-function variant (`PB_0` vs `PB_0_ALT1`). Tables are
//! located per MCU by a [`TableLoader`] and shared through a
//! [`CapabilityCache`].

pub mod cache;
pub mod error;
pub mod loader;
pub mod model;
pub mod table;

pub use cache::CapabilityCache;
pub use error::{CapsError, Result};
pub use loader::{builtin_variants, load_table_file, normalize_mcu, LoadedTable, TableLoader, TABLE_FILE};
pub use model::{CapabilityEntry, CapabilityModel, PinFunction};
pub use table::TableIssue;
