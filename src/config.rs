use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TRIGGER_KEY: &str = "Control";

pub const KEY_ENDPOINT: &str = "endpointBaseUrl";
pub const KEY_CREDENTIAL: &str = "credential";
pub const KEY_MODEL: &str = "modelId";
pub const KEY_TRIGGER: &str = "triggerKey";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub endpoint_base_url: String,
    pub credential: String,
    pub model_id: String,
    pub trigger_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_base_url: String::new(),
            credential: String::new(),
            model_id: DEFAULT_MODEL.to_string(),
            trigger_key: DEFAULT_TRIGGER_KEY.to_string(),
        }
    }
}

impl Settings {
    /// Endpoint and credential are both required before any request goes out.
    pub fn is_configured(&self) -> bool {
        !self.endpoint_base_url.trim().is_empty() && !self.credential.trim().is_empty()
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map.clone())).unwrap_or_default()
    }
}

pub fn settings_path() -> PathBuf {
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    let dir = exe.parent().unwrap_or(Path::new("."));
    dir.join("settings.json")
}

/// A changed key and its new value, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChange {
    pub key: String,
    pub new_value: Value,
}

struct Inner {
    values: Map<String, Value>,
    overrides: Map<String, Value>,
    subscribers: Vec<Sender<SettingsChange>>,
}

/// Flat key-value settings shared by the overlay and the network worker.
///
/// Values live in a JSON object on disk (when a path is set). Keys not known
/// to [`Settings`] are kept untouched so older or newer builds can share
/// the file.
pub struct SettingsStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl SettingsStore {
    pub fn in_memory() -> Self {
        Self::with_values(None, Map::new())
    }

    /// Opens the store at `path`. A missing or unreadable file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Map<String, Value>>(&s) {
                Ok(map) => {
                    info!("Loaded settings from {}", path.display());
                    map
                }
                Err(e) => {
                    warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self::with_values(Some(path), values)
    }

    fn with_values(path: Option<PathBuf>, values: Map<String, Value>) -> Self {
        Self {
            path,
            inner: Mutex::new(Inner {
                values,
                overrides: Map::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Layers `OPENAI_BASE_URL`, `OPENAI_API_KEY` and `OPENAI_MODEL` over the
    /// stored values. Overrides are never written to disk.
    pub fn apply_env_overrides(&self) {
        let vars = [
            ("OPENAI_BASE_URL", KEY_ENDPOINT),
            ("OPENAI_API_KEY", KEY_CREDENTIAL),
            ("OPENAI_MODEL", KEY_MODEL),
        ];
        let mut inner = self.lock();
        for (var, key) in vars {
            if let Ok(v) = std::env::var(var) {
                if !v.is_empty() {
                    info!("Setting {} overridden by {}", key, var);
                    inner.overrides.insert(key.to_string(), Value::String(v));
                }
            }
        }
    }

    /// Bulk read; every key missing from the store, or stored with the wrong
    /// JSON type, takes its default. Other keys are unaffected.
    pub fn get_with_defaults(&self) -> Settings {
        let inner = self.lock();
        let mut merged = Settings::default().to_map();
        for (k, v) in inner.values.iter().chain(inner.overrides.iter()) {
            let Some(default) = merged.get(k) else {
                continue;
            };
            if std::mem::discriminant(default) == std::mem::discriminant(v) {
                merged.insert(k.clone(), v.clone());
            } else {
                warn!("Setting {} has an unexpected type; using its default", k);
            }
        }
        Settings::from_map(&merged)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.lock();
        inner
            .overrides
            .get(key)
            .or_else(|| inner.values.get(key))
            .cloned()
    }

    /// Bulk write of all settings keys. Subscribers hear about keys whose value changed.
    pub fn set(&self, settings: &Settings) -> Result<()> {
        let changes = {
            let mut inner = self.lock();
            let mut changes = Vec::new();
            for (k, v) in settings.to_map() {
                if inner.values.get(&k) != Some(&v) {
                    changes.push(SettingsChange {
                        key: k.clone(),
                        new_value: v.clone(),
                    });
                }
                inner.values.insert(k, v);
            }
            self.persist(&inner.values)?;
            changes
        };
        info!("Settings saved ({} changed)", changes.len());
        self.notify(changes);
        Ok(())
    }

    /// Install-time seeding: writes defaults for absent keys only.
    /// Returns how many keys were added.
    pub fn seed_defaults(&self) -> Result<usize> {
        let mut inner = self.lock();
        let mut added = 0;
        for (k, v) in Settings::default().to_map() {
            if !inner.values.contains_key(&k) {
                inner.values.insert(k, v);
                added += 1;
            }
        }
        if added > 0 {
            self.persist(&inner.values)?;
            info!("Seeded {} default settings", added);
        }
        Ok(added)
    }

    pub fn subscribe(&self) -> Receiver<SettingsChange> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    fn notify(&self, changes: Vec<SettingsChange>) {
        if changes.is_empty() {
            return;
        }
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|tx| changes.iter().all(|c| tx.send(c.clone()).is_ok()));
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(path) = &self.path {
            let s = serde_json::to_string_pretty(values)?;
            fs::write(path, s)?;
        }
        Ok(())
    }
}
