//! In-memory cache index
//!
//! Maps every known signature to its last-access time and aggregate byte
//! size. The filesystem is the single source of truth; this index is a
//! derived accelerator, rebuilt by a full shard-tree scan at startup and
//! never persisted. Entries may lag the filesystem slightly between rebuilds.

use crate::protocol::{MIN_SIGNATURE_LENGTH, is_valid_token};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

/// Metadata tracked per cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub last_access: SystemTime,
    pub total_size: u64,
}

/// Snapshot row handed to the eviction manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub signature: String,
    pub last_access: SystemTime,
    pub total_size: u64,
}

/// Process-wide signature index
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: Mutex<HashMap<String, EntryMeta>>,
}

impl CacheIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from a full scan of the two-level shard tree.
    ///
    /// Only two-character directory names are shards; anything else under the
    /// root (the temp dir, half-deleted `_rm` shards) is skipped. Directory
    /// names that would not have passed the wire-side signature validation
    /// (too short, bytes outside the whitelist) are skipped too, so every
    /// indexed signature is safe to turn back into a shard path. Files that
    /// vanish mid-scan are ignored.
    pub fn initialize(&self, root: &Path) -> std::io::Result<()> {
        let mut scanned = HashMap::new();

        for shard in std::fs::read_dir(root)? {
            let shard = match shard {
                Ok(d) => d,
                Err(_) => continue,
            };
            if shard.file_name().len() != 2 {
                continue;
            }
            let entries = match std::fs::read_dir(shard.path()) {
                Ok(e) => e,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let Ok(signature) = entry.file_name().into_string() else {
                    continue;
                };
                if !is_valid_token(&signature) || signature.len() < MIN_SIGNATURE_LENGTH {
                    continue;
                }
                let Ok(meta) = entry.metadata() else {
                    continue;
                };
                if !meta.is_dir() {
                    continue;
                }

                let mut total_size = 0u64;
                if let Ok(blobs) = std::fs::read_dir(entry.path()) {
                    for blob in blobs.flatten() {
                        if let Ok(m) = blob.metadata() {
                            total_size += m.len();
                        }
                    }
                }

                let last_access = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                scanned.insert(
                    signature,
                    EntryMeta {
                        last_access,
                        total_size,
                    },
                );
            }
        }

        *self.entries.lock() = scanned;
        Ok(())
    }

    /// Refresh an entry's last-access time; called after a successful get
    pub fn touch(&self, signature: &str) {
        if let Some(meta) = self.entries.lock().get_mut(signature) {
            meta.last_access = SystemTime::now();
        }
    }

    /// Insert or overwrite an entry; called after a successful put
    pub fn record(&self, signature: &str, last_access: SystemTime, total_size: u64) {
        self.entries.lock().insert(
            signature.to_string(),
            EntryMeta {
                last_access,
                total_size,
            },
        );
    }

    /// Remove an entry; called by eviction and reset
    pub fn forget(&self, signature: &str) {
        self.entries.lock().remove(signature);
    }

    /// Drop every entry at once
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// All currently indexed signatures
    pub fn signatures(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Immutable copy of all entries, taken without blocking writers for
    /// longer than the copy itself
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.entries
            .lock()
            .iter()
            .map(|(signature, meta)| IndexEntry {
                signature: signature.clone(),
                last_access: meta.last_access,
                total_size: meta.total_size,
            })
            .collect()
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no entries are indexed
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_record_touch_forget() {
        let index = CacheIndex::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);

        index.record("f3a9", t0, 400);
        assert_eq!(index.len(), 1);

        let snap = index.snapshot();
        assert_eq!(snap[0].signature, "f3a9");
        assert_eq!(snap[0].last_access, t0);
        assert_eq!(snap[0].total_size, 400);

        index.touch("f3a9");
        let snap = index.snapshot();
        assert!(snap[0].last_access > t0);

        index.forget("f3a9");
        assert!(index.is_empty());
    }

    #[test]
    fn test_touch_unknown_signature_is_noop() {
        let index = CacheIndex::new();
        index.touch("missing");
        assert!(index.is_empty());
    }

    #[test]
    fn test_record_overwrites_size() {
        let index = CacheIndex::new();
        let t = SystemTime::now();
        index.record("ab12", t, 100);
        index.record("ab12", t, 250);
        assert_eq!(index.snapshot()[0].total_size, 250);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_initialize_scans_shard_tree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        // <root>/f3/f3a9c2/{one,two} plus noise that must be skipped
        let entry = root.join("f3").join("f3a9c2");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join("one"), vec![0u8; 300]).unwrap();
        std::fs::write(entry.join("two"), vec![0u8; 100]).unwrap();

        std::fs::create_dir_all(root.join("tmp")).unwrap();
        std::fs::create_dir_all(root.join("ab_rm").join("abcdef")).unwrap();
        std::fs::write(root.join("stray"), b"x").unwrap();

        let index = CacheIndex::new();
        index.initialize(root).unwrap();

        let snap = index.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].signature, "f3a9c2");
        assert_eq!(snap[0].total_size, 400);
    }

    #[test]
    fn test_initialize_skips_unusable_signature_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        // a signature shorter than a shard prefix, or with bytes outside the
        // header whitelist, can never be addressed over the wire and must not
        // be indexed
        std::fs::create_dir_all(root.join("aa").join("x")).unwrap();
        std::fs::write(root.join("aa").join("x").join("blob"), b"junk").unwrap();
        std::fs::create_dir_all(root.join("aa").join("a.b")).unwrap();
        std::fs::create_dir_all(root.join("aa").join("aa11")).unwrap();
        std::fs::write(root.join("aa").join("aa11").join("one"), vec![0u8; 50]).unwrap();

        let index = CacheIndex::new();
        index.initialize(root).unwrap();

        let snap = index.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].signature, "aa11");
    }

    #[test]
    fn test_initialize_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let index = CacheIndex::new();
        index.record("gone", SystemTime::now(), 10);

        index.initialize(tmp.path()).unwrap();
        assert!(index.is_empty());
    }
}
