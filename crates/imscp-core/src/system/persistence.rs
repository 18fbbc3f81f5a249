use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StoreError;

/// Persistence platform trait: key-value string storage.
///
/// The store only holds raw strings. Encoding session state as JSON is the
/// bridge's job, so backends stay free of any serde contract for values.
///
/// Implementations: in-memory map, a localStorage-style JSON file.
pub trait Persistence {
    /// Write a string value under key, replacing any previous value.
    fn save(&mut self, key: &str, data: &str) -> Result<(), StoreError>;

    /// Read a string value by key. Returns `None` if not found.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a key from storage. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// A store shared between the bridge's listeners and the caller.
///
/// Dispatch is single-threaded, so `Rc<RefCell<_>>` is enough.
impl<P: Persistence> Persistence for Rc<RefCell<P>> {
    fn save(&mut self, key: &str, data: &str) -> Result<(), StoreError> {
        self.borrow_mut().save(key, data)
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.borrow().load(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.borrow_mut().remove(key)
    }
}

/// Volatile store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Persistence for MemoryStore {
    fn save(&mut self, key: &str, data: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
