//! Flat-file vector index: `id -> (embedding, file_path)`, persisted as a
//! compact binary blob with durable-replace writes (§4.B).
//!
//! Mirrors the teacher's `IndexStore::{load,save}` load-or-default shape,
//! generalized from its JSON format to a binary one and from "overwrite in
//! place" to "write-temp, fsync, rename" so a crash mid-write never leaves a
//! half-written index on disk.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::EMBEDDING_DIM;
use crate::error::{Result, VectorStoreError};
use crate::record::ChunkRecord;

const FORMAT_VERSION: u32 = 1;
const INDEX_FILE_NAME: &str = "vector_index.bin";

/// One in-memory index entry: an embedding plus the chunk-record file it was
/// loaded from (or will be written to).
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub file_path: PathBuf,
}

/// In-memory vector index guarded for concurrent reads and exclusive writes.
pub struct VectorIndex {
    path: PathBuf,
    entries: RwLock<HashMap<String, IndexEntry>>,
}

impl VectorIndex {
    /// Load `<store_root>/vector_index.bin`. On any I/O or parse failure the
    /// index is rebuilt from the `ChunkRecord` JSON files under
    /// `store_root` (and, for backward compatibility, `store_root/documents`),
    /// then immediately persisted so the next open is fast.
    pub fn load_or_rebuild(store_root: &Path) -> Result<Self> {
        let path = store_root.join(INDEX_FILE_NAME);
        match read_binary(&path) {
            Ok(entries) => Ok(Self {
                path,
                entries: RwLock::new(entries),
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "vector index unreadable, rebuilding from chunk records");
                let entries = rebuild_from_records(store_root)?;
                let index = Self {
                    path,
                    entries: RwLock::new(entries),
                };
                index.persist()?;
                Ok(index)
            }
        }
    }

    /// Create a fresh, empty index file at `store_root`.
    pub fn create(store_root: &Path) -> Result<Self> {
        let index = Self {
            path: store_root.join(INDEX_FILE_NAME),
            entries: RwLock::new(HashMap::new()),
        };
        index.persist()?;
        Ok(index)
    }

    pub fn insert(&self, id: String, embedding: Vec<f32>, file_path: PathBuf) {
        self.entries.write().insert(id, IndexEntry { embedding, file_path });
    }

    /// Remove `id`'s entry. Returns whether an entry was actually removed.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.write().remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Snapshot of every `(id, embedding)` pair, for search scoring.
    pub fn snapshot(&self) -> Vec<(String, Vec<f32>)> {
        self.entries.read().iter().map(|(id, entry)| (id.clone(), entry.embedding.clone())).collect()
    }

    /// Read and parse the chunk-record file this entry points at. Returns
    /// `Ok(None)` when `id` is unknown, the file is missing, or the file
    /// fails to parse (logged as a warning, not returned as an error — a
    /// single bad record shouldn't fail an otherwise-successful lookup).
    pub fn hydrate(&self, id: &str) -> Result<Option<ChunkRecord>> {
        let Some(entry) = self.get(id) else {
            return Ok(None);
        };
        match std::fs::read_to_string(&entry.file_path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(record) => Ok(Some(record)),
                Err(err) => {
                    tracing::warn!(path = %entry.file_path.display(), error = %err, "skipping malformed chunk record");
                    Ok(None)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Discard the in-memory contents and rebuild them from the chunk
    /// record files under `store_root`, then persist. Used by `Store`'s
    /// explicit `rebuild_index` operation, as opposed to the implicit
    /// rebuild `load_or_rebuild` performs on a corrupt file.
    pub fn reload_from_records(&self, store_root: &Path) -> Result<()> {
        let fresh = rebuild_from_records(store_root)?;
        *self.entries.write() = fresh;
        self.persist()
    }

    /// Write the current contents to disk via write-temp/fsync/rename.
    pub fn persist(&self) -> Result<()> {
        let entries = self.entries.read();
        let mut buf = Vec::new();
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (id, entry) in entries.iter() {
            write_string(&mut buf, id);
            write_string(&mut buf, &entry.file_path.to_string_lossy());
            buf.extend_from_slice(&(entry.embedding.len() as u32).to_le_bytes());
            for value in &entry.embedding {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        drop(entries);
        durable_write(&self.path, &buf)
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_binary(path: &Path) -> Result<HashMap<String, IndexEntry>> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut cursor = 0usize;
    let version = read_u32(&buf, &mut cursor)?;
    if version != FORMAT_VERSION {
        return Err(VectorStoreError::invalid_input(format!(
            "unsupported vector index format version {version}"
        )));
    }
    let count = read_u32(&buf, &mut cursor)? as usize;
    let mut entries = HashMap::with_capacity(count);
    for _ in 0..count {
        let id = read_string(&buf, &mut cursor)?;
        let file_path = PathBuf::from(read_string(&buf, &mut cursor)?);
        let dim = read_u32(&buf, &mut cursor)? as usize;
        let mut embedding = Vec::with_capacity(dim);
        for _ in 0..dim {
            let bytes = read_bytes(&buf, &mut cursor, 4)?;
            embedding.push(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        }
        entries.insert(id, IndexEntry { embedding, file_path });
    }
    Ok(entries)
}

fn read_string(buf: &[u8], cursor: &mut usize) -> Result<String> {
    let len = read_u32(buf, cursor)? as usize;
    let bytes = read_bytes(buf, cursor, len)?;
    String::from_utf8(bytes).map_err(|err| VectorStoreError::invalid_input(format!("non-utf8 string in vector index: {err}")))
}

fn read_u32(buf: &[u8], cursor: &mut usize) -> Result<u32> {
    let bytes = read_bytes(buf, cursor, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_bytes(buf: &[u8], cursor: &mut usize, len: usize) -> Result<Vec<u8>> {
    if *cursor + len > buf.len() {
        return Err(VectorStoreError::invalid_input("vector index truncated"));
    }
    let slice = buf[*cursor..*cursor + len].to_vec();
    *cursor += len;
    Ok(slice)
}

/// Scan every `*.json` chunk record under `store_root` (and the legacy
/// `documents/` subdirectory) and rebuild the in-memory map from their
/// embeddings. Unreadable or malformed records are skipped with a warning
/// rather than aborting the rebuild.
fn rebuild_from_records(store_root: &Path) -> Result<HashMap<String, IndexEntry>> {
    let mut entries = HashMap::new();
    let mut dirs = vec![store_root.to_path_buf()];
    let documents_dir = store_root.join("documents");
    if documents_dir.is_dir() {
        dirs.push(documents_dir);
    }

    for dir in dirs {
        let Ok(read_dir) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some("config.json") {
                continue;
            }
            match std::fs::read_to_string(&path).ok().and_then(|text| serde_json::from_str::<ChunkRecord>(&text).ok()) {
                Some(record) if !record.embedding.is_empty() && record.embedding.len() == EMBEDDING_DIM => {
                    entries.insert(record.id, IndexEntry { embedding: record.embedding, file_path: path });
                }
                Some(_) => {
                    tracing::warn!(path = %path.display(), "skipping chunk record with missing or mismatched embedding during rebuild");
                }
                None => {
                    tracing::warn!(path = %path.display(), "skipping unreadable chunk record during rebuild");
                }
            }
        }
    }

    tracing::info!(count = entries.len(), dimension = EMBEDDING_DIM, "rebuilt vector index from chunk records");
    Ok(entries)
}

/// Write-temp, fsync, rename: a reader never observes a partially written
/// index file, even across a crash.
fn durable_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("vector_index")
    ));
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(data)?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_insert_then_persist_round_trips() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::create(dir.path()).unwrap();
        index.insert("a".to_string(), vec![1.0, 2.0, 3.0], dir.path().join("a.json"));
        index.insert("b".to_string(), vec![4.0, 5.0, 6.0], dir.path().join("b.json"));
        index.persist().unwrap();

        let reloaded = VectorIndex::load_or_rebuild(dir.path()).unwrap();
        assert_eq!(reloaded.count(), 2);
        let a = reloaded.get("a").unwrap();
        assert_eq!(a.embedding, vec![1.0, 2.0, 3.0]);
        assert_eq!(a.file_path, dir.path().join("a.json"));
    }

    #[test]
    fn hydrate_reads_the_stored_file_path() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::create(dir.path()).unwrap();
        let record = ChunkRecord::new("rec-1", "hello", vec![0.1; EMBEDDING_DIM], serde_json::json!({}));
        let record_path = dir.path().join("rec-1.json");
        std::fs::write(&record_path, serde_json::to_string(&record).unwrap()).unwrap();
        index.insert("rec-1".to_string(), record.embedding.clone(), record_path);

        let hydrated = index.hydrate("rec-1").unwrap().unwrap();
        assert_eq!(hydrated.content, "hello");
        assert!(index.hydrate("missing").unwrap().is_none());
    }

    #[test]
    fn corrupt_index_file_triggers_rebuild_from_records() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("vector_index.bin"), b"corrupted data").unwrap();
        let embedding = vec![0.1; EMBEDDING_DIM];
        let record = ChunkRecord::new("rec-1", "hello", embedding.clone(), serde_json::json!({}));
        std::fs::write(dir.path().join("rec-1.json"), serde_json::to_string(&record).unwrap()).unwrap();

        let index = VectorIndex::load_or_rebuild(dir.path()).unwrap();
        assert_eq!(index.count(), 1);
        assert_eq!(index.get("rec-1").unwrap().embedding, embedding);
    }

    #[test]
    fn missing_index_file_rebuilds_empty_when_no_records_exist() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::load_or_rebuild(dir.path()).unwrap();
        assert_eq!(index.count(), 0);
    }

    #[test]
    fn remove_and_clear_behave() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::create(dir.path()).unwrap();
        index.insert("a".to_string(), vec![1.0], dir.path().join("a.json"));
        assert!(index.contains("a"));
        assert!(index.remove("a"));
        assert!(!index.remove("a"), "removing twice should report nothing removed the second time");
        assert!(!index.contains("a"));
        index.insert("b".to_string(), vec![1.0], dir.path().join("b.json"));
        index.clear();
        assert_eq!(index.count(), 0);
    }
}
