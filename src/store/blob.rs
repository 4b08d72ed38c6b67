//! Sharded on-disk blob store
//!
//! Layout: `<root>/<shard>/<signature>/<blob>` where the shard is the first
//! two characters of the signature, fanning entries across up to 256
//! subdirectories. Writes land in `<root>/tmp/` first and are committed with
//! a single atomic rename, so no reader ever observes a partially written
//! blob at its final path. There is no fsync; losing unrenamed data on a
//! crash is acceptable for a cache.

use crate::StoreError;
use crate::config::StoreConfig;
use crate::protocol::is_valid_token;
use crate::store::index::{CacheIndex, IndexEntry};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

/// Name of the temp directory under the store root; skipped by index scans
/// because it is not two characters long.
const TMP_DIR: &str = "tmp";

/// An open blob ready to be streamed to a client
#[derive(Debug)]
pub struct Blob {
    pub file: fs::File,
    pub size: u64,
}

/// Filesystem-backed blob store with an in-memory signature index
pub struct BlobStore {
    root: PathBuf,
    index: CacheIndex,
    tmp_seq: AtomicU64,
}

impl BlobStore {
    /// Open the store root, creating it on demand, and rebuild the index
    /// from a full scan of the shard tree.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.root)?;
        std::fs::create_dir_all(config.root.join(TMP_DIR))?;

        let index = CacheIndex::new();
        index.initialize(&config.root)?;
        info!(
            root = %config.root.display(),
            entries = index.len(),
            "Blob store opened"
        );

        Ok(Self {
            root: config.root.clone(),
            index,
            tmp_seq: AtomicU64::new(0),
        })
    }

    /// Store a blob, reading exactly `size` bytes from `reader`.
    ///
    /// The payload goes to a private temp file first and is moved into place
    /// with one rename. If the entry directory vanished concurrently (raced
    /// with eviction or reset) the write is dropped silently; the caller can
    /// always recompute the value.
    pub async fn put<R: AsyncRead + Unpin>(
        &self,
        signature: &str,
        name: &str,
        size: u64,
        reader: R,
    ) -> Result<(), StoreError> {
        self.validate(signature, name)?;

        let tmp_path = self.next_tmp_path();
        let mut tmp = fs::File::create(&tmp_path).await?;
        let mut limited = reader.take(size);

        let copied = match tokio::io::copy(&mut limited, &mut tmp).await {
            Ok(n) => n,
            Err(e) => {
                drop(tmp);
                let _ = fs::remove_file(&tmp_path).await;
                return Err(e.into());
            }
        };
        drop(tmp);

        if copied < size {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::ShortPayload {
                got: copied,
                expected: size,
            });
        }

        let dir = self.entry_dir(signature);
        if let Err(e) = fs::create_dir_all(&dir).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        match fs::rename(&tmp_path, dir.join(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Entry directory removed between create and rename; the
                // value is only a cache, so drop the write.
                debug!(signature, name, "entry directory vanished, dropping write");
                let _ = fs::remove_file(&tmp_path).await;
                return Ok(());
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(e.into());
            }
        }

        self.refresh_entry(signature).await;
        Ok(())
    }

    /// Fetch a blob and refresh its entry's LRU clock.
    ///
    /// Returns `None` when the blob does not exist; that is a miss, not an
    /// error.
    pub async fn get(&self, signature: &str, name: &str) -> Result<Option<Blob>, StoreError> {
        self.validate(signature, name)?;

        let dir = self.entry_dir(signature);
        let file = match fs::File::open(dir.join(name)).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        // The directory mtime is the LRU clock across restarts; the index
        // touch keeps the running process consistent. Both best-effort.
        let _ = std::fs::File::open(&dir).and_then(|d| d.set_modified(SystemTime::now()));
        self.index.touch(signature);

        Ok(Some(Blob { file, size }))
    }

    /// All currently indexed signatures; memory only, no disk access
    pub fn signatures(&self) -> Vec<String> {
        self.index.signatures()
    }

    /// Immutable index snapshot for the eviction manager
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.index.snapshot()
    }

    /// Drop an entry from the index; called after its directory is deleted
    pub fn forget(&self, signature: &str) {
        self.index.forget(signature);
    }

    /// Delete an entry directory wholesale. A directory that already
    /// disappeared is not an error; the return value says whether anything
    /// was actually deleted.
    pub async fn remove_entry(&self, signature: &str) -> Result<bool, StoreError> {
        match fs::remove_dir_all(self.entry_dir(signature)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Empty the store.
    ///
    /// Every shard directory is renamed out of the way (cheap metadata
    /// operation), so the store is immediately empty to new requests; the
    /// renamed copies are deleted in a background task.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.index.clear();

        let mut renamed = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Ok(Some(entry)) = dir.next_entry().await {
            if entry.file_name().len() != 2 {
                continue;
            }
            let Ok(shard) = entry.file_name().into_string() else {
                continue;
            };
            let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
            let target = self.root.join(format!("{shard}_rm{seq}"));
            if fs::rename(entry.path(), &target).await.is_ok() {
                renamed.push(target);
            }
        }

        info!(shards = renamed.len(), "Store reset, deleting in background");
        tokio::spawn(async move {
            for dir in renamed {
                let _ = fs::remove_dir_all(&dir).await;
            }
        });

        Ok(())
    }

    /// Directory holding all blobs of one entry
    fn entry_dir(&self, signature: &str) -> PathBuf {
        self.root.join(&signature[..2]).join(signature)
    }

    /// Store root, used by tests and diagnostics
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn next_tmp_path(&self) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(TMP_DIR)
            .join(format!("{}-{seq}.part", std::process::id()))
    }

    /// Re-list an entry directory and record its aggregate size.
    ///
    /// Best-effort: the directory may have been evicted since the rename, in
    /// which case the stale index entry (if any) will be corrected by the
    /// next pass or rebuild.
    async fn refresh_entry(&self, signature: &str) {
        let dir = self.entry_dir(signature);
        let Ok(meta) = fs::metadata(&dir).await else {
            return;
        };
        let Ok(mut blobs) = fs::read_dir(&dir).await else {
            return;
        };

        let mut total_size = 0u64;
        while let Ok(Some(blob)) = blobs.next_entry().await {
            if let Ok(m) = blob.metadata().await {
                total_size += m.len();
            }
        }

        let last_access = meta.modified().unwrap_or_else(|_| SystemTime::now());
        self.index.record(signature, last_access, total_size);
    }

    /// Overwrite an index entry directly; lets tests shape eviction order
    /// without sleeping between puts.
    #[cfg(test)]
    pub(crate) fn record_for_tests(&self, signature: &str, at: SystemTime, size: u64) {
        self.index.record(signature, at, size);
    }

    fn validate(&self, signature: &str, name: &str) -> Result<(), StoreError> {
        if !is_valid_token(signature) || signature.len() < 2 {
            return Err(StoreError::InvalidQuery(signature.to_string()));
        }
        if !is_valid_token(name) {
            return Err(StoreError::InvalidQuery(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn test_store(tmp: &TempDir) -> BlobStore {
        BlobStore::open(&StoreConfig {
            root: tmp.path().to_path_buf(),
            ..StoreConfig::default()
        })
        .unwrap()
    }

    async fn read_blob(blob: Blob) -> Vec<u8> {
        let mut data = Vec::new();
        let mut file = blob.file;
        file.read_to_end(&mut data).await.unwrap();
        data
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let payload = b"object file contents";
        store
            .put("f3a9c2d1", "obj_main", payload.len() as u64, &payload[..])
            .await
            .unwrap();

        let blob = store.get("f3a9c2d1", "obj_main").await.unwrap().unwrap();
        assert_eq!(blob.size, payload.len() as u64);
        assert_eq!(read_blob(blob).await, payload);

        // physical layout: <root>/f3/f3a9c2d1/obj_main
        assert!(tmp.path().join("f3").join("f3a9c2d1").join("obj_main").is_file());
    }

    #[tokio::test]
    async fn test_get_miss() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        assert!(store.get("deadbeef", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_bad_tokens() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let err = store.put("../etc", "x", 1, &b"y"[..]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));

        let err = store.put("abcd", "a/b", 1, &b"y"[..]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));

        let err = store.put("a", "name", 1, &b"y"[..]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_put_short_payload() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let err = store.put("abcd", "name", 10, &b"short"[..]).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ShortPayload {
                got: 5,
                expected: 10
            }
        ));
        assert!(store.get("abcd", "name").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_tracks_entry_size() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.put("aa11", "one", 300, &vec![0u8; 300][..]).await.unwrap();
        store.put("aa11", "two", 100, &vec![0u8; 100][..]).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].total_size, 400);
    }

    #[tokio::test]
    async fn test_reset_empties_store() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.put("aa11", "one", 3, &b"one"[..]).await.unwrap();
        store.put("bb22", "two", 3, &b"two"[..]).await.unwrap();
        assert_eq!(store.signatures().len(), 2);

        store.reset().await.unwrap();

        assert!(store.signatures().is_empty());
        assert!(store.get("aa11", "one").await.unwrap().is_none());
        assert!(store.get("bb22", "two").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_usable_after_reset() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.put("aa11", "one", 3, &b"old"[..]).await.unwrap();
        store.reset().await.unwrap();

        store.put("aa11", "one", 3, &b"new"[..]).await.unwrap();
        let blob = store.get("aa11", "one").await.unwrap().unwrap();
        assert_eq!(read_blob(blob).await, b"new");
    }

    #[tokio::test]
    async fn test_remove_entry_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.put("aa11", "one", 3, &b"one"[..]).await.unwrap();
        assert!(store.remove_entry("aa11").await.unwrap());
        assert!(!store.remove_entry("aa11").await.unwrap());
        assert!(store.get("aa11", "one").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_rebuild_after_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = test_store(&tmp);
            store.put("f3a9", "obj", 400, &vec![7u8; 400][..]).await.unwrap();
        }

        let store = test_store(&tmp);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].signature, "f3a9");
        assert_eq!(snap[0].total_size, 400);
    }

    #[tokio::test]
    async fn test_get_refreshes_last_access() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.put("aa11", "one", 3, &b"one"[..]).await.unwrap();
        let before = store.snapshot()[0].last_access;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.get("aa11", "one").await.unwrap().unwrap();

        let after = store.snapshot()[0].last_access;
        assert!(after > before);
    }
}
