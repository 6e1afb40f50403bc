// src/storage/jsonl.rs
use crate::storage::engine::{LogEngine, LogStore};
use crate::storage::entry::JsonlEntry;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const DUMP_SUFFIX: &str = ".dump";
const BACKUP_SUFFIX: &str = ".bak";

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Opens JSONL databases as [`JsonlStore`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlEngine;

impl LogEngine for JsonlEngine {
    type Store = JsonlStore;

    async fn open(&self, path: &Path) -> Result<JsonlStore> {
        JsonlStore::open(path).await
    }
}

/// A JSONL key/value journal replayed into memory.
pub struct JsonlStore {
    path: PathBuf,
    file: File,
    entries: BTreeMap<String, Value>,
    // lines currently in the journal, superseded ones included
    journal_lines: usize,
}

impl JsonlStore {
    /// Attaches to an existing journal. A missing file is an error, unless
    /// it can be restored from the backup of an interrupted compaction.
    pub async fn open<P: AsRef<Path>>(path_p: P) -> Result<Self> {
        let path = path_p.as_ref().to_path_buf();
        Self::recover_interrupted_compaction(&path).await?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&path)
            .await?;
        let mut content = String::new();
        file.read_to_string(&mut content).await?;

        let mut entries = BTreeMap::new();
        let mut journal_lines = 0;
        let pieces: Vec<&str> = content.split('\n').collect();
        let last_piece = pieces.len() - 1;

        for (idx, raw) in pieces.into_iter().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonlEntry>(line) {
                Ok(entry) => {
                    journal_lines += 1;
                    match entry.value {
                        Some(value) => {
                            entries.insert(entry.key, value);
                        }
                        None => {
                            entries.remove(&entry.key);
                        }
                    }
                }
                // A final line without newline is a torn write; compaction drops it.
                Err(e) if idx == last_piece => {
                    log::warn!(
                        "{}: ignoring incomplete last line {} ({})",
                        path.display(),
                        idx + 1,
                        e
                    );
                }
                Err(source) => {
                    return Err(Error::CorruptEntry {
                        path,
                        line: idx + 1,
                        source,
                    })
                }
            }
        }

        log::debug!(
            "Opened {} with {} live key(s) from {} journal line(s)",
            path.display(),
            entries.len(),
            journal_lines
        );
        Ok(JsonlStore {
            path,
            file,
            entries,
            journal_lines,
        })
    }

    // A crash during compress can leave the journal only in `.bak`, or leave
    // a half-written `.dump` behind.
    async fn recover_interrupted_compaction(path: &Path) -> Result<()> {
        let backup = sibling(path, BACKUP_SUFFIX);
        let dump = sibling(path, DUMP_SUFFIX);

        if fs::try_exists(&backup).await? {
            if fs::try_exists(path).await? {
                log::warn!("Removing stale backup {}", backup.display());
                fs::remove_file(&backup).await?;
            } else {
                log::warn!("Restoring {} from {}", path.display(), backup.display());
                fs::rename(&backup, path).await?;
            }
        }
        if fs::try_exists(&dump).await? {
            log::warn!("Removing incomplete dump {}", dump.display());
            fs::remove_file(&dump).await?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn journal_lines(&self) -> usize {
        self.journal_lines
    }

    /// Creates an empty journal at `path`, or attaches to the one already there.
    pub async fn create<P: AsRef<Path>>(path_p: P) -> Result<Self> {
        let path = path_p.as_ref();
        // a leftover backup is the real journal; open restores it
        if !fs::try_exists(sibling(path, BACKUP_SUFFIX)).await? {
            OpenOptions::new().create(true).append(true).open(path).await?;
        }
        Self::open(path).await
    }

    /// Appends a mutation to the journal and applies it.
    pub async fn append(&mut self, entry: JsonlEntry) -> Result<()> {
        let mut line = serde_json::to_vec(&entry).map_err(std::io::Error::from)?;
        line.push(b'\n');
        self.file.write_all(&line).await?;
        match entry.value {
            Some(value) => {
                self.entries.insert(entry.key, value);
            }
            None => {
                self.entries.remove(&entry.key);
            }
        }
        self.journal_lines += 1;
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for (key, value) in &self.entries {
            serde_json::to_writer(&mut buf, &JsonlEntry::set(key.clone(), value.clone()))
                .map_err(std::io::Error::from)?;
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

impl LogStore for JsonlStore {
    async fn compress(&mut self) -> Result<()> {
        let dump = sibling(&self.path, DUMP_SUFFIX);
        let backup = sibling(&self.path, BACKUP_SUFFIX);
        let before = self.journal_lines;

        let mut out = File::create(&dump).await?;
        out.write_all(&self.snapshot()?).await?;
        out.sync_all().await?;
        drop(out);

        self.file.flush().await?;
        fs::rename(&self.path, &backup).await?;
        fs::rename(&dump, &self.path).await?;
        fs::remove_file(&backup).await?;

        self.file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        self.journal_lines = self.entries.len();
        log::debug!(
            "Compressed {}: {} journal line(s) -> {}",
            self.path.display(),
            before,
            self.journal_lines
        );
        Ok(())
    }

    async fn close(mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_compress_keeps_only_final_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");
        std::fs::write(
            &path,
            concat!(
                "{\"k\":\"a\",\"v\":1}\n",
                "{\"k\":\"b\",\"v\":{\"val\":true}}\n",
                "{\"k\":\"a\",\"v\":2}\n",
                "\n",
                "{\"k\":\"c\",\"v\":null}\n",
                "{\"k\":\"b\"}\n",
            ),
        )
        .unwrap();

        let mut store = JsonlEngine.open(&path).await.unwrap();
        assert_eq!(store.journal_lines(), 5);
        assert_eq!(store.len(), 2);
        store.compress().await.unwrap();
        store.close().await.unwrap();

        let compacted = std::fs::read_to_string(&path).unwrap();
        assert_eq!(compacted, "{\"k\":\"a\",\"v\":2}\n{\"k\":\"c\",\"v\":null}\n");
        assert!(!sibling(&path, DUMP_SUFFIX).exists());
        assert!(!sibling(&path, BACKUP_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_compress_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("objects.jsonl");

        let mut store = JsonlStore::create(&path).await.unwrap();
        for i in 0..10 {
            store
                .append(JsonlEntry::set("system.config", json!({ "rev": i })))
                .await
                .unwrap();
        }
        store.append(JsonlEntry::set("system.host.pi", json!({}))).await.unwrap();
        store.compress().await.unwrap();
        let first = std::fs::read(&path).unwrap();
        store.compress().await.unwrap();
        store.close().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);

        let reopened = JsonlStore::open(&path).await.unwrap();
        assert_eq!(reopened.journal_lines(), 2);
        assert_eq!(reopened.get("system.config"), Some(&json!({ "rev": 9 })));
    }

    #[tokio::test]
    async fn test_appends_after_compress_land_in_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");

        let mut store = JsonlStore::create(&path).await.unwrap();
        store.append(JsonlEntry::set("x", json!(1))).await.unwrap();
        store.append(JsonlEntry::set("x", json!(2))).await.unwrap();
        store.compress().await.unwrap();
        store.append(JsonlEntry::delete("x")).await.unwrap();
        store.close().await.unwrap();

        let reopened = JsonlStore::open(&path).await.unwrap();
        assert!(reopened.is_empty());
        assert_eq!(reopened.journal_lines(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_line_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");
        std::fs::write(&path, "{\"k\":\"a\",\"v\":1}\nnot json\n{\"k\":\"b\",\"v\":2}\n").unwrap();

        let err = JsonlEngine.open(&path).await.err().unwrap();
        assert_matches!(err, Error::CorruptEntry { line: 2, .. });
    }

    #[tokio::test]
    async fn test_torn_last_line_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");
        std::fs::write(&path, "{\"k\":\"a\",\"v\":1}\n{\"k\":\"b\",\"v\":").unwrap();

        let mut store = JsonlEngine.open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        store.compress().await.unwrap();
        store.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"k\":\"a\",\"v\":1}\n");
    }

    #[tokio::test]
    async fn test_open_restores_backup_and_drops_dump() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("objects.jsonl");
        std::fs::write(sibling(&path, BACKUP_SUFFIX), "{\"k\":\"a\",\"v\":1}\n").unwrap();
        std::fs::write(sibling(&path, DUMP_SUFFIX), "{\"k\":\"a\"").unwrap();

        let store = JsonlStore::open(&path).await.unwrap();
        assert_eq!(store.get("a"), Some(&json!(1)));
        assert!(path.exists());
        assert!(!sibling(&path, BACKUP_SUFFIX).exists());
        assert!(!sibling(&path, DUMP_SUFFIX).exists());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_discards_stale_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("objects.jsonl");
        std::fs::write(&path, "{\"k\":\"live\",\"v\":true}\n").unwrap();
        std::fs::write(sibling(&path, BACKUP_SUFFIX), "{\"k\":\"old\",\"v\":true}\n").unwrap();

        let store = JsonlStore::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("old").is_none());
        assert!(!sibling(&path, BACKUP_SUFFIX).exists());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_file_fails_without_creating_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");

        let err = JsonlEngine.open(&path).await.err().unwrap();
        assert_matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_create_starts_an_empty_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.jsonl");

        let store = JsonlStore::create(&path).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.journal_lines(), 0);
        store.close().await.unwrap();
        assert!(path.exists());
    }
}
