//! Directory-backed state store that survives restarts

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{MonitorState, StateStore, StoreError};

const STATE_EXT: &str = "state";

/// Longest key stored under its hex encoding (2 * 120 + ".state" < 255)
const MAX_HEX_KEY_LEN: usize = 120;

/// On-disk record. The key is stored alongside the state so `keys()` does not
/// depend on decoding file names.
#[derive(Serialize, Deserialize)]
struct StateRecord {
    key: String,
    state: MonitorState,
}

/// One JSON document per key inside `data_dir`
pub struct FileBackend {
    data_dir: PathBuf,
    /// Per-key write locks
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            data_dir,
            locks: DashMap::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Short keys are hex-encoded into a flat, collision-free file name. Keys
    /// whose encoding would exceed the file-name limit use a fixed-width hash
    /// instead; the record itself carries the key, so `get` can tell a hash
    /// collision from a hit.
    fn key_path(&self, key: &str) -> PathBuf {
        let name = if key.len() <= MAX_HEX_KEY_LEN {
            key.bytes().map(|b| format!("{:02x}", b)).collect::<String>()
        } else {
            format!("h-{:016x}", fxhash::hash64(key.as_bytes()))
        };
        self.data_dir.join(format!("{}.{}", name, STATE_EXT))
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_record(path: &Path) -> Result<Option<StateRecord>, StoreError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::Deserialization {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

impl StateStore for FileBackend {
    fn get(&self, key: &str) -> Result<Option<MonitorState>, StoreError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();

        Ok(Self::read_record(&self.key_path(key))?
            .filter(|r| r.key == key)
            .map(|r| r.state))
    }

    fn set(&self, key: &str, state: &MonitorState) -> Result<(), StoreError> {
        let record = StateRecord {
            key: key.to_string(),
            state: state.clone(),
        };
        let data =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.key_path(key);
        let tmp_path = path.with_extension("tmp");

        let lock = self.key_lock(key);
        let _guard = lock.lock();

        // Write then rename so a crash never leaves a half-written record
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        {
            let lock = self.key_lock(key);
            let _guard = lock.lock();

            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.locks.remove(key);

        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == STATE_EXT) {
                match Self::read_record(&path) {
                    Ok(Some(record)) => keys.push(record.key),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable state record");
                    }
                }
            }
        }

        Ok(keys)
    }

    fn name(&self) -> &str {
        "File"
    }
}
