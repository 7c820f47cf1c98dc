//! `pinmux tables`: which capability tables are available.

use std::path::Path;

use anyhow::Result;
use pinmux_caps::CapsError;

use crate::config::PinmuxConfig;

pub fn run(project_dir: &Path, config: &PinmuxConfig, tables: Option<&Path>) -> Result<()> {
    let loader = config.table_loader(project_dir, tables)?;
    println!("Capability tables under {}:", loader.root().display());
    for mcu in loader.known_mcus() {
        match loader.load(&mcu) {
            Ok(table) => {
                let path = table.path.strip_prefix(loader.root()).unwrap_or(table.path.as_path());
                println!("  {mcu:<12} {:>4} entries  {}", table.model.len(), path.display());
            }
            Err(CapsError::NotFound { .. }) => println!("  {mcu:<12} missing"),
            Err(e) => eprintln!("warning: {mcu}: {e}"),
        }
    }
    Ok(())
}
