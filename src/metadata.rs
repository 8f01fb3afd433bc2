//! Key-value metadata accessors.
//!
//! Every cf array carries a JSON key-value map in its container group
//! attributes; the group-level metadata array carries the group's map the
//! same way. [`MetadataMap`] buffers edits and writes them back on
//! [`flush`](MetadataMap::flush), [`close`](MetadataMap::close) or drop.
//!
//! Attribute-scoped metadata shares the array's map under the reserved key
//! prefix `__attr.<name>.`; [`ArrayMetadata`] hides those keys and
//! [`AttrMetadata`] scopes reads and writes to one attribute's prefix.

use serde_json::Value;
use zarrs::storage::ReadableWritableListableStorage;

use crate::{storage, Error, Result};

/// Key prefix separating attribute-scoped metadata from array metadata.
pub const ATTR_METADATA_PREFIX: &str = "__attr.";

fn attr_prefix(attr_name: &str) -> String {
    format!("{ATTR_METADATA_PREFIX}{attr_name}.")
}

/// The key-value metadata of one cf array, buffered in memory.
///
/// Dropping a dirty map flushes it best-effort and logs on failure; call
/// [`MetadataMap::close`] to observe write errors.
pub struct MetadataMap {
    storage: ReadableWritableListableStorage,
    path: String,
    entries: serde_json::Map<String, Value>,
    dirty: bool,
}

impl MetadataMap {
    pub(crate) fn open(
        storage: &ReadableWritableListableStorage,
        path: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        let entries = storage::read_meta(storage, &path)?;
        Ok(Self {
            storage: storage.clone(),
            path,
            entries,
            dirty: false,
        })
    }

    /// Path of the array this map belongs to.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a key; reserved attribute-prefixed keys go through
    /// [`AttrMetadata`] instead.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if key.starts_with(ATTR_METADATA_PREFIX) {
            return Err(Error::schema(format!(
                "key {key:?} uses the reserved attribute-metadata prefix"
            )));
        }
        self.insert_raw(key, value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert_raw(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
        self.dirty = true;
    }

    /// Write buffered edits back to the store.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            storage::write_meta(&self.storage, &self.path, &self.entries)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Flush and consume the map.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

impl Drop for MetadataMap {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::warn!("failed to flush metadata for {}: {err}", self.path);
        }
    }
}

impl std::fmt::Debug for MetadataMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataMap")
            .field("path", &self.path)
            .field("len", &self.entries.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// View over a [`MetadataMap`] hiding attribute-scoped keys.
#[derive(Debug)]
pub struct ArrayMetadata<'a> {
    meta: &'a mut MetadataMap,
}

impl<'a> ArrayMetadata<'a> {
    pub(crate) fn new(meta: &'a mut MetadataMap) -> Self {
        Self { meta }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        if key.starts_with(ATTR_METADATA_PREFIX) {
            return None;
        }
        self.meta.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.meta.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if key.starts_with(ATTR_METADATA_PREFIX) {
            return None;
        }
        self.meta.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.meta
            .keys()
            .filter(|key| !key.starts_with(ATTR_METADATA_PREFIX))
    }

    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().next().is_none()
    }
}

/// View over a [`MetadataMap`] scoped to one attribute's key prefix.
#[derive(Debug)]
pub struct AttrMetadata<'a> {
    meta: &'a mut MetadataMap,
    prefix: String,
}

impl<'a> AttrMetadata<'a> {
    pub(crate) fn new(meta: &'a mut MetadataMap, attr_name: &str) -> Self {
        Self {
            meta,
            prefix: attr_prefix(attr_name),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(&format!("{}{key}", self.prefix))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.meta
            .insert_raw(format!("{}{}", self.prefix, key.into()), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.meta.remove(&format!("{}{key}", self.prefix))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.meta
            .keys()
            .filter_map(|key| key.strip_prefix(self.prefix.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().next().is_none()
    }
}
