// SPDX-License-Identifier: GPL-3.0-only

//! Key/value appliance configuration ("sysconfig")
//!
//! The document is a set of scopes, each mapping keys to either a string or a
//! list of strings:
//!
//! ```json
//! { "storage": { "physical": "block", "block_devices": ["/dev/sda"] },
//!   "filesystem": { "storagemount": "/var/opi" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    List(Vec<String>),
}

pub type Scope = BTreeMap<String, ConfigValue>;

/// Access to the persisted appliance configuration.
///
/// Writes are persisted before they return.
pub trait ConfigStore: Send {
    fn has_scope(&self, scope: &str) -> bool;

    fn has_key(&self, scope: &str, key: &str) -> bool;

    fn get_string(&self, scope: &str, key: &str) -> Option<String>;

    /// A list value, or a single string value as a one element list
    fn get_list(&self, scope: &str, key: &str) -> Option<Vec<String>>;

    fn put_string(&mut self, scope: &str, key: &str, value: &str) -> Result<()>;

    fn put_list(&mut self, scope: &str, key: &str, values: &[String]) -> Result<()>;

    /// Removing a key that is not there is not an error
    fn remove_key(&mut self, scope: &str, key: &str) -> Result<()>;
}

/// In-memory configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryConfigStore {
    scopes: BTreeMap<String, Scope>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn scope(&self, scope: &str) -> Option<&Scope> {
        self.scopes.get(scope)
    }

    fn value(&self, scope: &str, key: &str) -> Option<&ConfigValue> {
        self.scopes.get(scope)?.get(key)
    }

    fn insert(&mut self, scope: &str, key: &str, value: ConfigValue) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn remove(&mut self, scope: &str, key: &str) -> bool {
        self.scopes
            .get_mut(scope)
            .is_some_and(|keys| keys.remove(key).is_some())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    fn has_key(&self, scope: &str, key: &str) -> bool {
        self.value(scope, key).is_some()
    }

    fn get_string(&self, scope: &str, key: &str) -> Option<String> {
        match self.value(scope, key)? {
            ConfigValue::String(value) => Some(value.clone()),
            ConfigValue::List(_) => None,
        }
    }

    fn get_list(&self, scope: &str, key: &str) -> Option<Vec<String>> {
        match self.value(scope, key)? {
            ConfigValue::String(value) => Some(vec![value.clone()]),
            ConfigValue::List(values) => Some(values.clone()),
        }
    }

    fn put_string(&mut self, scope: &str, key: &str, value: &str) -> Result<()> {
        self.insert(scope, key, ConfigValue::String(value.to_string()));
        Ok(())
    }

    fn put_list(&mut self, scope: &str, key: &str, values: &[String]) -> Result<()> {
        self.insert(scope, key, ConfigValue::List(values.to_vec()));
        Ok(())
    }

    fn remove_key(&mut self, scope: &str, key: &str) -> Result<()> {
        self.remove(scope, key);
        Ok(())
    }
}

/// Configuration document persisted as a JSON file.
///
/// Every mutation rewrites the file through a temporary sibling and a rename
/// so readers never observe a partial document.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    document: MemoryConfigStore,
}

impl JsonConfigStore {
    /// Open `path`, starting from an empty document when it does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            MemoryConfigStore::from_json(&fs::read_to_string(&path)?)?
        } else {
            debug!("No configuration at {}, starting empty", path.display());
            MemoryConfigStore::new()
        };

        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, self.document.to_json()?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&mut self, change: impl FnOnce(&mut MemoryConfigStore)) -> Result<()> {
        let previous = self.document.clone();
        change(&mut self.document);
        if let Err(e) = self.persist() {
            self.document = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn has_scope(&self, scope: &str) -> bool {
        self.document.has_scope(scope)
    }

    fn has_key(&self, scope: &str, key: &str) -> bool {
        self.document.has_key(scope, key)
    }

    fn get_string(&self, scope: &str, key: &str) -> Option<String> {
        self.document.get_string(scope, key)
    }

    fn get_list(&self, scope: &str, key: &str) -> Option<Vec<String>> {
        self.document.get_list(scope, key)
    }

    fn put_string(&mut self, scope: &str, key: &str, value: &str) -> Result<()> {
        self.update(|doc| {
            doc.insert(scope, key, ConfigValue::String(value.to_string()))
        })
    }

    fn put_list(&mut self, scope: &str, key: &str, values: &[String]) -> Result<()> {
        self.update(|doc| {
            doc.insert(scope, key, ConfigValue::List(values.to_vec()))
        })
    }

    fn remove_key(&mut self, scope: &str, key: &str) -> Result<()> {
        if !self.document.has_key(scope, key) {
            return Ok(());
        }
        self.update(|doc| {
            doc.remove(scope, key);
        })
    }
}
