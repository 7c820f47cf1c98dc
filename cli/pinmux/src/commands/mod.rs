//! CLI command implementations.

pub mod check;
pub mod convert;
pub mod pins;
pub mod report;
pub mod tables;
