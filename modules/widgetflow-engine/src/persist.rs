//! Key/value storage adapters and the per-component persistence policy.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::traits::Merge;

/// External key/value storage. Read at bootstrap, written after commits.
///
/// Implemented by [`FileStorage`] (one JSON file per key) and
/// [`MemoryStorage`] (tests). Also implemented for `Arc<T>` so a test can
/// keep a handle for assertions.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// One file per key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe_key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage (tests)
// ---------------------------------------------------------------------------

/// In-memory storage that counts writes. Thread-safe.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a value, as if written by an earlier session.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Persistence policy
// ---------------------------------------------------------------------------

type EncodeFn<S> = Box<dyn Fn(&S) -> serde_json::Result<String> + Send + Sync>;
type DecodeFn<S> = Box<dyn Fn(&str) -> serde_json::Result<<S as Merge>::Delta> + Send + Sync>;

/// Which slice of state a component persists, and under which key.
///
/// The slice is stored as plain JSON with no version field; changing its
/// shape breaks data written by older builds.
pub struct Persistence<S: Merge> {
    key: String,
    encode: EncodeFn<S>,
    decode: DecodeFn<S>,
}

impl<S: Merge> Persistence<S> {
    /// Persist the value `read` extracts; on bootstrap `write` turns the
    /// stored value back into a delta.
    pub fn json<T, R, W>(key: impl Into<String>, read: R, write: W) -> Self
    where
        T: Serialize + DeserializeOwned,
        R: Fn(&S) -> T + Send + Sync + 'static,
        W: Fn(T) -> S::Delta + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            encode: Box::new(move |state| serde_json::to_string(&read(state))),
            decode: Box::new(move |raw| serde_json::from_str::<T>(raw).map(&write)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn encode(&self, state: &S) -> serde_json::Result<String> {
        (self.encode)(state)
    }

    pub fn decode(&self, raw: &str) -> serde_json::Result<S::Delta> {
        (self.decode)(raw)
    }
}
