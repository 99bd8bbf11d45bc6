//! `HashMap`-backed table layer.

use std::collections::HashMap;

use super::{Backend, CacheRow};
use crate::Result;

/// Non-durable [`Backend`] for tests. Rows live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    cache: HashMap<String, CacheRow>,
    facts: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn upsert_cache_row(&mut self, row: &CacheRow) -> Result<()> {
        self.cache.insert(row.input.clone(), row.clone());
        Ok(())
    }

    fn lookup_cache_row(&mut self, input: &str) -> Result<Option<CacheRow>> {
        Ok(self.cache.get(input).cloned())
    }

    fn upsert_fact_row(&mut self, name: &str, value: &str) -> Result<()> {
        self.facts.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn lookup_fact_row(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self.facts.get(name).cloned())
    }
}
