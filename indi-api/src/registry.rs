//! The thread-safe property cache: a map from `(device, property)` to
//! the live property handle, used both to route incoming
//! `newXxxVector` commands to the right vector and to reject writes to
//! read-only properties before a driver callback ever sees them.
//!
//! Grounded on the `ROSC` cache in `indidriver.c`
//! (`rosc_add_unique`/`rosc_find`), which exists for exactly one
//! reason: insure RO properties are never modified. The same single
//! global `pthread_mutex_t` there becomes a single `Mutex<HashMap<..>>`
//! here; `quick_xml`-decoded reads never need more concurrency than
//! that mutex allows.

use crate::property::{Handle, Permission};
use crate::types::name::Key;
use crate::types::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct PropertyRegistry {
    entries: Mutex<HashMap<Key, Handle>>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        PropertyRegistry {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `handle` under `key` unless an entry is already
    /// present, in which case the call is a silent no-op -- a driver
    /// that calls `IDDefXxx` twice for the same property (redefining
    /// it after `getProperties`) must not clobber the live handle
    /// clients already hold a reference to.
    ///
    /// Returns `true` if this call actually inserted the entry.
    pub fn register_unique(&self, key: Key, handle: Handle) -> bool {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        if entries.contains_key(&key) {
            false
        } else {
            entries.insert(key, handle);
            true
        }
    }

    pub fn lookup(&self, key: &Key) -> Option<Handle> {
        let entries = self.entries.lock().expect("registry mutex poisoned");
        entries.get(key).cloned()
    }

    pub fn contains(&self, key: &Key) -> bool {
        let entries = self.entries.lock().expect("registry mutex poisoned");
        entries.contains_key(key)
    }

    /// Looks up `key` and reports its permission, failing with
    /// `Error::UnknownProperty` if it has never been Defined -- the
    /// first of the two authorization checks required before any
    /// `newXxxVector` handler runs.
    pub fn permission(&self, key: &Key) -> Result<Permission> {
        let handle = self
            .lookup(key)
            .ok_or_else(|| Error::UnknownProperty(key.property.to_string(), key.device.to_string()))?;
        Ok(match handle {
            Handle::Text(v) => v.lock().expect("vector mutex poisoned").permission,
            Handle::Number(v) => v.lock().expect("vector mutex poisoned").permission,
            Handle::Switch(v) => v.lock().expect("vector mutex poisoned").permission,
            Handle::Blob(v) => v.lock().expect("vector mutex poisoned").permission,
        })
    }

    /// The second authorization check: fails with `Error::ReadOnly`
    /// if the property is registered but not writable by clients.
    pub fn check_writable(&self, key: &Key) -> Result<()> {
        if self.permission(key)?.is_read_only() {
            return Err(Error::ReadOnly(key.property.to_string()));
        }
        Ok(())
    }

    /// Removes `key` from the registry, returning the handle if it was
    /// present. Used when a driver retracts a property via `IDDelete`.
    pub fn remove(&self, key: &Key) -> Option<Handle> {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
