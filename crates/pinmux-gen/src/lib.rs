//! Header generator.
//!
//! Renders a [`ResolvedBoard`](pinmux_resolve::ResolvedBoard) as a C++
//! `BoardConfig` header. Generation is a pure function of the resolved
//! board and the [`GeneratorOptions`]; it never validates and never fails.
//! Only [`write_artifact`] touches the filesystem.

pub mod artifact;
mod banks;
mod emit;
pub mod error;
pub mod generate;
mod sections;

pub use artifact::write_artifact;
pub use error::{GenError, Result};
pub use generate::{generate, GeneratorOptions};
