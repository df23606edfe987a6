use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use tracing::{debug, error};

use crate::columns::ColumnSpec;
use crate::domain::ListError;

/// Key-value collaborator behind the persisted column-visibility
/// preferences. One entry per view name, value = JSON map of column key to
/// boolean. Injected rather than baked in so tests can swap it out.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, ListError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ListError>;
}

/// In-memory store for tests and for callers that do not want durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &str) -> Option<&String> {
        self.entries.get(key)
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ListError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ListError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: a single JSON object mapping view names to their
/// visibility maps. Every `set` rewrites the file (write-through, no
/// batching).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, serde_json::Value>, ListError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ListError> {
        let all = self.read_all()?;
        Ok(all.get(key).map(|v| v.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ListError> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), serde_json::from_str(value)?);
        fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

/// Per-view-name map of column key -> visible, seeded from the column
/// defaults on first mount and persisted write-through on every toggle.
///
/// Persistence is best-effort: read and write failures are logged and
/// swallowed, the in-memory map stays authoritative for the session. A
/// stale persisted map is used verbatim, so columns added after it was
/// written render hidden until toggled on.
pub struct ColumnVisibility {
    view_name: String,
    map: BTreeMap<String, bool>,
    store: Box<dyn PreferenceStore>,
}

impl ColumnVisibility {
    pub fn load<T>(
        store: Box<dyn PreferenceStore>,
        view_name: impl Into<String>,
        columns: &[ColumnSpec<T>],
    ) -> Self {
        let view_name = view_name.into();
        let persisted = match store.get(&view_name) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Failed to read visibility preferences for {view_name}: {e}");
                None
            }
        };
        let map = match persisted {
            Some(raw) => match serde_json::from_str::<BTreeMap<String, bool>>(&raw) {
                Ok(map) => {
                    debug!("Loaded visibility preferences for {view_name}: {map:?}");
                    map
                }
                Err(e) => {
                    error!("Corrupt visibility preferences for {view_name}: {e}");
                    Self::defaults(columns)
                }
            },
            None => Self::defaults(columns),
        };
        let mut vis = Self { view_name, map, store };
        if vis.map == Self::defaults(columns) {
            // First mount for this view name: persist the seeded defaults.
            vis.persist();
        }
        vis
    }

    fn defaults<T>(columns: &[ColumnSpec<T>]) -> BTreeMap<String, bool> {
        columns
            .iter()
            .map(|c| (c.key.clone(), c.default_visible))
            .collect()
    }

    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    /// Columns missing from the map count as hidden.
    pub fn is_visible(&self, column_key: &str) -> bool {
        self.map.get(column_key).copied().unwrap_or(false)
    }

    pub fn set_visible(&mut self, column_key: &str, visible: bool) {
        self.map.insert(column_key.to_string(), visible);
        self.persist();
    }

    pub fn toggle(&mut self, column_key: &str) {
        let next = !self.is_visible(column_key);
        self.set_visible(column_key, next);
    }

    fn persist(&mut self) {
        let raw = match serde_json::to_string(&self.map) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to serialize visibility preferences: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.view_name, &raw) {
            error!(
                "Failed to persist visibility preferences for {}: {e}",
                self.view_name
            );
        }
    }
}
