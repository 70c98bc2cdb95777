//! Store
//!
//! In-memory key-value mapping owned by the server.
//!
//! Only the dispatcher mutates it, one request at a time, so it carries no
//! internal locking.

use std::collections::HashMap;
use std::fmt;

/// In-memory key → value map
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl Store {
    /// Create a new empty Store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert only if `key` is absent
    ///
    /// Returns false, leaving the stored value untouched, when the key exists.
    pub fn insert_if_absent(&mut self, key: &[u8], value: &[u8]) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_vec(), value.to_vec());
        true
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Remove `key`, returning its value if it was present
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate payload size in bytes (keys plus values)
    pub fn size_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Iterate entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Multi-line dump used for diagnostics
impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store status:")?;
        for (key, value) in self.iter() {
            write!(
                f,
                "\n\tItem: {}: {}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(value)
            )?;
        }
        Ok(())
    }
}
