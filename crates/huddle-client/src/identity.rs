//! Display identity: the durable name/pic pair and the per-room session user.
//!
//! Two key-value stores back it. The durable one survives restarts and holds
//! `rtc_myName` / `rtc_myPic`. The volatile one lives as long as the current
//! surface and holds `rtc_joined_<roomId>`, the serialized [`User`] most
//! recently used to join that room, so a reload rejoins with the same id.
//!
//! Storage failures never abort a join. Reads degrade to "absent", writes
//! are logged and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use huddle_common::{StorageError, User};
use tracing::{debug, warn};

pub const NAME_KEY: &str = "rtc_myName";
pub const PIC_KEY: &str = "rtc_myPic";
const SESSION_KEY_PREFIX: &str = "rtc_joined_";

fn session_key(room_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{room_id}")
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store. Used as the volatile scope and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// A JSON object on disk. Every write rewrites the whole file through a
/// temporary sibling so a crash never leaves it half-written.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _g = lock(&self.guard);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = lock(&self.guard);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = lock(&self.guard);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

/// The saved display identity. An empty name means none has been chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub pic: Option<String>,
}

impl Profile {
    pub fn new(name: &str, pic: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            pic: pic.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Clone)]
pub struct IdentityStore {
    durable: Arc<dyn KeyValueStore>,
    volatile: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore").finish_non_exhaustive()
    }
}

impl IdentityStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, volatile: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, volatile }
    }

    /// Both scopes in memory. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Durable scope in a file, volatile scope in memory.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)), Arc::new(MemoryStore::new()))
    }

    /// The saved name and pic. Missing or unreadable entries come back empty.
    pub fn load(&self) -> Profile {
        let name = read(&*self.durable, NAME_KEY).unwrap_or_default();
        let pic = read(&*self.durable, PIC_KEY).filter(|p| !p.is_empty());
        Profile { name, pic }
    }

    /// Persist the display identity. An absent pic is stored as empty.
    pub fn save(&self, name: &str, pic: Option<&str>) {
        write(&*self.durable, NAME_KEY, name);
        write(&*self.durable, PIC_KEY, pic.unwrap_or(""));
    }

    /// The user last used to join `room_id` from this surface, if any.
    pub fn load_session_user(&self, room_id: &str) -> Option<User> {
        let key = session_key(room_id);
        let raw = read(&*self.volatile, &key)?;
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(key = %key, error = %e, "Ignoring corrupt session entry");
                None
            }
        }
    }

    pub fn save_session_user(&self, room_id: &str, user: &User) {
        match serde_json::to_string(user) {
            Ok(json) => write(&*self.volatile, &session_key(room_id), &json),
            Err(e) => warn!(error = %e, "Failed to encode session user"),
        }
    }

    pub fn clear_session_user(&self, room_id: &str) {
        let key = session_key(room_id);
        if let Err(e) = self.volatile.remove(&key) {
            warn!(key = %key, error = %e, "Failed to clear session entry");
        }
    }
}

fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Storage read failed, treating as absent");
            None
        }
    }
}

fn write(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!(key, error = %e, "Storage write failed");
    }
}
