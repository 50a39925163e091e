use std::path::Path;

use crate::error::ContentError;
use crate::storage::protocol::{FileEntry, FileKey, split_storage_key, storage_key, validate_key};

/// Blob persistence for one storage node: a thin layer over an embedded
/// ordered key/value store.
///
/// Keys are `videoId/filename`; payloads are opaque bytes. The store is
/// internally thread-safe and its iterators run against a point-in-time view,
/// so scans may proceed concurrently with writes.
pub struct BlobStore {
    db: sled::Db,
}

impl BlobStore {
    /// Opens (creating if missing) the store under `path`. Each node owns
    /// exactly one directory.
    pub fn open(path: &Path) -> Result<Self, ContentError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Overwrites a single key. Durability is left to the store's background
    /// sync; batch writes are the synced path.
    pub fn put(&self, video_id: &str, filename: &str, data: &[u8]) -> Result<(), ContentError> {
        validate_key(video_id, filename)?;
        self.db.insert(storage_key(video_id, filename).as_bytes(), data)?;
        Ok(())
    }

    /// Applies all entries as one atomic batch and syncs it to disk before
    /// returning. Returns the number of entries committed.
    pub async fn put_batch(&self, entries: &[FileEntry]) -> Result<u64, ContentError> {
        for entry in entries {
            validate_key(&entry.video_id, &entry.filename)?;
        }
        let mut batch = sled::Batch::default();
        for entry in entries {
            batch.insert(entry.key().as_bytes(), entry.data.as_slice());
        }
        self.db.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(entries.len() as u64)
    }

    pub fn get(&self, video_id: &str, filename: &str) -> Result<Option<Vec<u8>>, ContentError> {
        let value = self.db.get(storage_key(video_id, filename).as_bytes())?;
        Ok(value.map(|v| v.to_vec()))
    }

    /// Deletes the given keys without forcing a sync; used after a transfer,
    /// when the payloads already exist on the peer.
    pub fn remove_keys<'a, I>(&self, keys: I) -> Result<(), ContentError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.db.remove(key.as_bytes())?;
        }
        Ok(())
    }

    /// Scans every user entry in the store.
    ///
    /// Keys without a separator are bookkeeping, not user data, and are
    /// skipped. If the iterator fails mid-stream, the entries accumulated so
    /// far are returned together with the error so the caller can retry the
    /// whole scan idempotently.
    pub fn scan(&self) -> (Vec<FileEntry>, Option<ContentError>) {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            match item {
                Ok((key, value)) => {
                    let Ok(key) = std::str::from_utf8(&key) else {
                        continue;
                    };
                    let Some((video_id, filename)) = split_storage_key(key) else {
                        continue;
                    };
                    entries.push(FileEntry {
                        video_id: video_id.to_string(),
                        filename: filename.to_string(),
                        data: value.to_vec(),
                    });
                }
                Err(e) => return (entries, Some(ContentError::Store(e))),
            }
        }
        (entries, None)
    }

    /// Scans keys only, with the same partial-failure semantics as [`scan`].
    ///
    /// [`scan`]: BlobStore::scan
    pub fn list(&self) -> (Vec<FileKey>, Option<ContentError>) {
        let mut keys = Vec::new();
        for item in self.db.iter() {
            match item {
                Ok((key, _)) => {
                    let Ok(key) = std::str::from_utf8(&key) else {
                        continue;
                    };
                    let Some((video_id, filename)) = split_storage_key(key) else {
                        continue;
                    };
                    keys.push(FileKey {
                        video_id: video_id.to_string(),
                        filename: filename.to_string(),
                    });
                }
                Err(e) => return (keys, Some(ContentError::Store(e))),
            }
        }
        (keys, None)
    }

    /// Forces all pending writes to disk.
    pub async fn flush(&self) -> Result<(), ContentError> {
        self.db.flush_async().await?;
        Ok(())
    }
}
