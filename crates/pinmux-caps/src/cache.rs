//! Per-MCU cache of loaded capability tables.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::loader::{normalize_mcu, LoadedTable, TableLoader};

/// Loads each MCU's table once and hands out shared read-only copies.
#[derive(Debug)]
pub struct CapabilityCache {
    loader: TableLoader,
    tables: HashMap<String, Arc<LoadedTable>>,
}

impl CapabilityCache {
    pub fn new(loader: TableLoader) -> Self {
        Self {
            loader,
            tables: HashMap::new(),
        }
    }

    pub fn loader(&self) -> &TableLoader {
        &self.loader
    }

    /// The table for an MCU, loading it on first use.
    pub fn get(&mut self, mcu: &str) -> Result<Arc<LoadedTable>> {
        let key = normalize_mcu(mcu)?;
        if let Some(table) = self.tables.get(&key) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.loader.load(&key)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of tables loaded so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
