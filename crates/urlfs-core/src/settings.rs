//! Persistent keyed settings store.
//!
//! Sections hold typed attributes (strings, booleans, integers,
//! timestamps) and FIFO queues of child values; the plug-in layer uses
//! sections keyed by settings identifiers and queues of URL strings.
//! The store is JSON on disk, written atomically (temp file + rename)
//! on `flush`. Handles are cheap clones sharing one store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Value {
    Bool(bool),
    Int(i64),
    String(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Section {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    queues: BTreeMap<String, VecDeque<Value>>,
}

impl Section {
    fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.queues.is_empty()
    }
}

#[derive(Default)]
struct Inner {
    path: Option<PathBuf>,
    sections: BTreeMap<String, Section>,
    dirty: bool,
}

/// Shared settings store handle.
#[derive(Clone, Default)]
pub struct Settings {
    inner: Arc<Mutex<Inner>>,
}

impl Settings {
    /// Store without a backing file; `flush` is a no-op.
    pub fn in_memory() -> Settings {
        Settings::default()
    }

    /// Open (or start empty at) a JSON settings file. A corrupt file is
    /// logged and treated as empty rather than failing the caller.
    pub fn open(path: impl AsRef<Path>) -> Settings {
        let path = path.as_ref().to_path_buf();
        let sections = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(sections) => sections,
                Err(err) => {
                    tracing::warn!("settings file {} unreadable: {}", path.display(), err);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Settings {
            inner: Arc::new(Mutex::new(Inner {
                path: Some(path),
                sections,
                dirty: false,
            })),
        }
    }

    /// Open the store named `name` under the XDG state directory.
    pub fn open_default(name: &str) -> Result<Settings> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("urlfs")?;
        let state_dir = xdg_dirs.get_state_home();
        fs::create_dir_all(&state_dir)
            .with_context(|| format!("creating state dir {}", state_dir.display()))?;
        Ok(Settings::open(state_dir.join(format!("{}.json", name))))
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.lock().unwrap().path.clone()
    }

    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.get(section, key)? {
            Value::String(s) => Some(s),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
        }
    }

    pub fn set_string(&self, section: &str, key: &str, value: &str) {
        self.set(section, key, Value::String(value.to_string()));
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get(section, key)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn set_bool(&self, section: &str, key: &str, value: bool) {
        self.set(section, key, Value::Bool(value));
    }

    pub fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        match self.get(section, key)? {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn set_int(&self, section: &str, key: &str, value: i64) {
        self.set(section, key, Value::Int(value));
    }

    /// Timestamps are stored as nanoseconds since the Unix epoch, so an
    /// exact modification time survives a round trip.
    pub fn get_time(&self, section: &str, key: &str) -> Option<SystemTime> {
        let nanos = self.get_int(section, key)?;
        u64::try_from(nanos)
            .ok()
            .map(|n| SystemTime::UNIX_EPOCH + Duration::from_nanos(n))
    }

    pub fn set_time(&self, section: &str, key: &str, time: SystemTime) {
        let nanos = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos().min(i64::MAX as u128) as i64)
            .unwrap_or(0);
        self.set_int(section, key, nanos);
    }

    pub fn remove_attribute(&self, section: &str, key: &str) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if let Some(s) = inner.sections.get_mut(section) {
            if s.attributes.remove(key).is_some() {
                inner.dirty = true;
            }
        }
    }

    /// Append a value to a section's FIFO queue.
    pub fn queue(&self, section: &str, key: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sections
            .entry(section.to_string())
            .or_default()
            .queues
            .entry(key.to_string())
            .or_default()
            .push_back(Value::String(value.to_string()));
        inner.dirty = true;
    }

    /// Pop the front of a section's FIFO queue.
    pub fn unqueue(&self, section: &str, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        let value = inner
            .sections
            .get_mut(section)?
            .queues
            .get_mut(key)?
            .pop_front()?;
        inner.dirty = true;
        match value {
            Value::String(s) => Some(s),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
        }
    }

    /// Snapshot of a queue without consuming it.
    pub fn queue_items(&self, section: &str, key: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .sections
            .get(section)
            .and_then(|s| s.queues.get(key))
            .map(|q| {
                q.iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear_queue(&self, section: &str, key: &str) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if let Some(s) = inner.sections.get_mut(section) {
            if s.queues.remove(key).is_some() {
                inner.dirty = true;
            }
        }
    }

    /// Whether the section exists with any content.
    pub fn contains(&self, section: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .sections
            .get(section)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// Drop a whole section.
    pub fn remove(&self, section: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.sections.remove(section).is_some() {
            inner.dirty = true;
        }
    }

    pub fn section_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().sections.keys().cloned().collect()
    }

    /// Drop every section.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.sections.is_empty() {
            inner.sections.clear();
            inner.dirty = true;
        }
    }

    /// Write pending changes to disk: serialize to a temp file, then
    /// rename over the target. A store without a path always succeeds.
    pub fn flush(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(path) = inner.path.clone() else {
            return true;
        };
        if !inner.dirty {
            return true;
        }

        let data = match serde_json::to_string_pretty(&inner.sections) {
            Ok(data) => data,
            Err(err) => {
                tracing::error!("settings serialization failed: {}", err);
                return false;
            }
        };

        let mut temp = path.clone().into_os_string();
        temp.push(".part");
        let temp = PathBuf::from(temp);
        if let Err(err) = fs::write(&temp, data).and_then(|_| fs::rename(&temp, &path)) {
            tracing::error!("settings flush to {} failed: {}", path.display(), err);
            let _ = fs::remove_file(&temp);
            return false;
        }
        inner.dirty = false;
        true
    }

    fn get(&self, section: &str, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .unwrap()
            .sections
            .get(section)?
            .attributes
            .get(key)
            .cloned()
    }

    fn set(&self, section: &str, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sections
            .entry(section.to_string())
            .or_default()
            .attributes
            .insert(key.to_string(), value);
        inner.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_attributes_roundtrip() {
        let settings = Settings::in_memory();
        settings.set_string("sec", "name", "value");
        settings.set_bool("sec", "flag", true);
        settings.set_int("sec", "count", -7);

        assert_eq!(settings.get_string("sec", "name").as_deref(), Some("value"));
        assert_eq!(settings.get_bool("sec", "flag"), Some(true));
        assert_eq!(settings.get_int("sec", "count"), Some(-7));
        assert_eq!(settings.get_bool("sec", "name"), None); // wrong type
        assert_eq!(settings.get_string("other", "name"), None);
    }

    #[test]
    fn time_roundtrip_is_exact() {
        let settings = Settings::in_memory();
        let stamp = SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        settings.set_time("sec", "modified", stamp);
        assert_eq!(settings.get_time("sec", "modified"), Some(stamp));
    }

    #[test]
    fn queues_are_fifo() {
        let settings = Settings::in_memory();
        settings.queue("sec", "paths", "first");
        settings.queue("sec", "paths", "second");

        assert_eq!(settings.queue_items("sec", "paths"), vec!["first", "second"]);
        assert_eq!(settings.unqueue("sec", "paths").as_deref(), Some("first"));
        assert_eq!(settings.unqueue("sec", "paths").as_deref(), Some("second"));
        assert_eq!(settings.unqueue("sec", "paths"), None);
    }

    #[test]
    fn remove_drops_a_section() {
        let settings = Settings::in_memory();
        settings.set_bool("gone", "x", true);
        assert!(settings.contains("gone"));
        settings.remove("gone");
        assert!(!settings.contains("gone"));
    }

    #[test]
    fn flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let settings = Settings::open(&path);
        settings.set_string("a/b.so", "name", "b");
        settings.queue("Plugins Paths", "paths", "file:///opt/plugins/");
        assert!(settings.flush());

        let reopened = Settings::open(&path);
        assert_eq!(reopened.get_string("a/b.so", "name").as_deref(), Some("b"));
        assert_eq!(
            reopened.queue_items("Plugins Paths", "paths"),
            vec!["file:///opt/plugins/"]
        );
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{ not json").unwrap();

        let settings = Settings::open(&path);
        assert!(settings.section_keys().is_empty());
    }

    #[test]
    fn clones_share_the_store() {
        let settings = Settings::in_memory();
        let other = settings.clone();
        settings.set_int("shared", "n", 1);
        assert_eq!(other.get_int("shared", "n"), Some(1));
    }
}
