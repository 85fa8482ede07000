use std::cell::RefCell;
use std::collections::HashMap;

use crate::cache::{CacheIndex, CacheRecord};
use crate::Result;

/// In-memory metadata index. Useful for tests and for short-lived processes
/// that do not want index state to outlive them.
#[derive(Default)]
pub struct InMemoryIndex {
    records: RefCell<HashMap<String, CacheRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheIndex for InMemoryIndex {
    fn get(&self, id: &str) -> Result<Option<CacheRecord>> {
        Ok(self.records.borrow().get(id).cloned())
    }

    fn upsert(&self, record: CacheRecord) -> Result<()> {
        self.records.borrow_mut().insert(record.id.clone(), record);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records.borrow_mut().remove(id);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<CacheRecord>> {
        Ok(self.records.borrow().values().cloned().collect())
    }
}
