//! Two-tier embedding cache: a bounded in-memory LRU backed by a per-key
//! JSON file on disk, keyed by the sha256 hex digest of the source text
//! (§4.C). The memory tier absorbs hot repeats within a process; the file
//! tier survives process restarts and eviction.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::Result;

struct LruMap {
    entries: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl LruMap {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &str) -> Option<Vec<f32>> {
        if let Some(value) = self.entries.get(key).cloned() {
            self.touch(key);
            Some(value)
        } else {
            None
        }
    }

    fn put(&mut self, key: String, value: Vec<f32>) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(key.to_string());
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Content-hash-keyed embedding cache. Cheap to clone references to: the
/// inner state is behind a `Mutex`, and file I/O happens outside the lock.
pub struct EmbeddingCache {
    dir: PathBuf,
    memory: Mutex<LruMap>,
}

impl EmbeddingCache {
    pub fn new(dir: impl Into<PathBuf>, max_memory_items: usize) -> Self {
        Self {
            dir: dir.into(),
            memory: Mutex::new(LruMap::new(max_memory_items.max(1))),
        }
    }

    /// Hash `text` to its cache key (sha256 hex, lowercase).
    pub fn key_for(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a cached embedding for `text`, checking memory first and
    /// falling back to the file tier (which also repopulates memory on hit).
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::key_for(text);
        if let Some(hit) = self.memory.lock().get(&key) {
            return Some(hit);
        }
        let from_disk = self.read_file(&key)?;
        self.memory.lock().put(key, from_disk.clone());
        Some(from_disk)
    }

    /// Store an embedding for `text` in both tiers. The file write is
    /// durable (write-temp, fsync, rename); a failure there still leaves
    /// the memory tier populated for the remainder of the process.
    pub fn set(&self, text: &str, embedding: Vec<f32>) -> Result<()> {
        let key = Self::key_for(text);
        self.memory.lock().put(key.clone(), embedding.clone());
        self.write_file(&key, &embedding)
    }

    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_file(&self, key: &str) -> Option<Vec<f32>> {
        let path = self.file_path(key);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Vec<f32>>(&text) {
            Ok(embedding) => Some(embedding),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "dropping malformed embedding cache file");
                None
            }
        }
    }

    fn write_file(&self, key: &str, embedding: &[f32]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_path(key);
        let tmp_path = self.dir.join(format!(".{key}.tmp"));
        let body = serde_json::to_vec(embedding)?;
        {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            tmp.write_all(&body)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
