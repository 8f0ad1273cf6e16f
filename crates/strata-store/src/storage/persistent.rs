use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strata_core::{serialize, Hash};
use tracing::{debug, info, warn};

use super::memory::{range_of, SnapshotIterator};
use crate::cache::CacheStore;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::merkle::compute_state_root;
use crate::types::{assert_valid_key, Domain, Store, StoreIterator};

/// Identifies a committed version of a [`FileStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitId {
    pub version: u64,
    pub hash: Hash,
}

/// On-disk layout of a committed version
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u64,
    root: Hash,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct FileState {
    /// Committed data
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Staged writes, `None` is a staged delete
    pending_writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    last_commit: CommitId,
}

/// File-backed storage using a single snapshot file.
///
/// Writes are staged in memory and become durable on [`FileStore::commit`],
/// which rewrites the snapshot through a temporary file and a rename.
#[derive(Debug)]
pub struct FileStore {
    config: StoreConfig,
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileStore {
    /// Open the store described by `config`, loading its last commit if any
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let path = config.snapshot_path();

        let (data, last_commit) = if path.exists() {
            load_snapshot(&path, config.verify_on_open)?
        } else {
            (BTreeMap::new(), CommitId::default())
        };

        info!(
            path = %path.display(),
            version = last_commit.version,
            keys = data.len(),
            "Opened file store"
        );

        Ok(FileStore {
            config,
            path,
            state: RwLock::new(FileState {
                data,
                pending_writes: BTreeMap::new(),
                last_commit,
            }),
        })
    }

    /// Open a store in `dir` with default settings
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreConfig::builder().data_dir(dir).build())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn last_commit_id(&self) -> CommitId {
        self.state.read().last_commit
    }

    /// Number of staged writes not yet committed
    pub fn pending_len(&self) -> usize {
        self.state.read().pending_writes.len()
    }

    /// Apply staged writes and persist them as the next version.
    ///
    /// On error nothing changes: the staged writes stay staged and the
    /// previous snapshot is left in place.
    pub fn commit(&self) -> Result<CommitId> {
        let mut state = self.state.write();

        let mut next = state.data.clone();
        for (key, value) in &state.pending_writes {
            match value {
                Some(v) => {
                    next.insert(key.clone(), v.clone());
                }
                None => {
                    next.remove(key);
                }
            }
        }

        let root = compute_state_root(next.iter().map(|(k, v)| (k.as_slice(), v.as_slice())));
        let commit_id = CommitId {
            version: state.last_commit.version + 1,
            hash: root,
        };
        let snapshot = Snapshot {
            version: commit_id.version,
            root,
            entries: next.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        self.flush_to_disk(&snapshot)?;

        let applied = state.pending_writes.len();
        state.data = next;
        state.pending_writes.clear();
        state.last_commit = commit_id;

        debug!(
            version = commit_id.version,
            root = %commit_id.hash,
            applied,
            "Committed file store"
        );
        Ok(commit_id)
    }

    /// Drop all staged writes
    pub fn rollback(&self) {
        let mut state = self.state.write();
        let dropped = state.pending_writes.len();
        state.pending_writes.clear();
        debug!(dropped, "Rolled back staged writes");
    }

    fn flush_to_disk(&self, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.config.data_dir)?;

        let bytes = serialize::to_bytes(snapshot)?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            if self.config.sync_on_commit {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn snapshot(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        ascending: bool,
    ) -> SnapshotIterator {
        let domain = Domain::new(start, end);
        let state = self.state.read();

        let mut view: BTreeMap<Vec<u8>, Vec<u8>> = range_of(&state.data, &domain)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in range_of(&state.pending_writes, &domain) {
            match value {
                Some(v) => {
                    view.insert(key.clone(), v.clone());
                }
                None => {
                    view.remove(key);
                }
            }
        }

        let items: VecDeque<_> = view.into_iter().collect();
        SnapshotIterator::new(domain, items, ascending)
    }
}

fn load_snapshot(path: &Path, verify: bool) -> Result<(BTreeMap<Vec<u8>, Vec<u8>>, CommitId)> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Ok((BTreeMap::new(), CommitId::default()));
    }

    let snapshot: Snapshot =
        serialize::from_bytes(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;

    if verify {
        let actual = compute_state_root(
            snapshot
                .entries
                .iter()
                .map(|(k, v)| (k.as_slice(), v.as_slice())),
        );
        if actual != snapshot.root {
            warn!(
                path = %path.display(),
                expected = %snapshot.root,
                actual = %actual,
                "Snapshot state root mismatch"
            );
            return Err(StoreError::InvalidStateRoot {
                expected: snapshot.root,
                actual,
            });
        }
    }

    let commit_id = CommitId {
        version: snapshot.version,
        hash: snapshot.root,
    };
    Ok((snapshot.entries.into_iter().collect(), commit_id))
}

impl Store for FileStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        assert_valid_key(key);
        let state = self.state.read();
        if let Some(pending) = state.pending_writes.get(key) {
            return pending.clone();
        }
        state.data.get(key).cloned()
    }

    fn set(&self, key: &[u8], value: &[u8]) {
        assert_valid_key(key);
        self.state
            .write()
            .pending_writes
            .insert(key.to_vec(), Some(value.to_vec()));
    }

    fn delete(&self, key: &[u8]) {
        assert_valid_key(key);
        self.state.write().pending_writes.insert(key.to_vec(), None);
    }

    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Box<dyn StoreIterator> {
        Box::new(self.snapshot(start, end, true))
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn StoreIterator> {
        Box::new(self.snapshot(start, end, false))
    }

    fn cache_wrap(&self) -> CacheStore<'_> {
        CacheStore::new(self)
    }
}
