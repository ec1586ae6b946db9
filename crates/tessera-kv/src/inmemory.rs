//! Deterministic in-memory MVCC engine.
//!
//! Every transaction reads from an immutable snapshot of the committed map
//! taken when it was created, layered under its own buffered writes.
//! Commits are validated optimistically. A commit fails with `not_committed`
//! when any commit newer than its read version wrote a range it read
//! without `snapshot`. The first committer wins.
//!
//! Faults can be injected to exercise retry paths: forced conflicts and
//! arbitrary errors on the next commits.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use tessera_constants::store::MAX_CONFLICT_HISTORY;
use tessera_constants::store::MAX_TRANSACTION_MUTATIONS;
use tessera_constants::store::PROCESS_BEHIND_BACKOFF_MS;
use tessera_layer::SubspaceContext;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::trace;

use crate::error::StoreError;
use crate::error::codes;
use crate::traits::Database;
use crate::traits::KeyValue;
use crate::traits::RangeOptions;
use crate::traits::RangeResult;
use crate::traits::Transaction;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Half-open key range `[begin, end)`.
type KeyRange = (Vec<u8>, Vec<u8>);

/// Range holding exactly `key`.
fn single_key_range(key: &[u8]) -> KeyRange {
    let mut end = key.to_vec();
    end.push(0x00);
    (key.to_vec(), end)
}

fn ranges_intersect(a: &KeyRange, b: &KeyRange) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn in_range(key: &[u8], begin: &[u8], end: &[u8]) -> bool {
    key >= begin && key < end
}

// =============================================================================
// Store State
// =============================================================================

/// Write ranges of one committed transaction.
struct CommitRecord {
    version: u64,
    writes: Vec<KeyRange>,
}

struct StoreState {
    data: Arc<Map>,
    version: u64,
    history: VecDeque<CommitRecord>,
    /// Read versions below this can no longer be validated.
    history_floor: u64,
}

#[derive(Default)]
struct Faults {
    conflicts: u32,
    errors: VecDeque<StoreError>,
}

/// Counters describing store activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub transactions: u64,
    pub commits: u64,
    pub conflicts: u64,
}

struct Inner {
    state: Mutex<StoreState>,
    faults: Mutex<Faults>,
    transactions: AtomicU64,
    commits: AtomicU64,
    conflicts: AtomicU64,
}

/// A deterministic in-memory transactional store.
///
/// Cheap to clone; clones share the same data.
#[derive(Clone)]
pub struct DeterministicStore {
    inner: Arc<Inner>,
}

impl Default for DeterministicStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    data: Arc::new(Map::new()),
                    version: 0,
                    history: VecDeque::new(),
                    history_floor: 0,
                }),
                faults: Mutex::new(Faults::default()),
                transactions: AtomicU64::new(0),
                commits: AtomicU64::new(0),
                conflicts: AtomicU64::new(0),
            }),
        }
    }

    /// Fail the next `count` mutating commits with `not_committed`.
    pub async fn inject_conflicts(&self, count: u32) {
        self.inner.faults.lock().await.conflicts += count;
    }

    /// Fail the next mutating commit with `error`. Queued errors fire in order.
    pub async fn inject_commit_error(&self, error: StoreError) {
        self.inner.faults.lock().await.errors.push_back(error);
    }

    /// Latest committed version.
    pub async fn version(&self) -> u64 {
        self.inner.state.lock().await.version
    }

    /// Committed value of `key`, outside any transaction.
    pub async fn committed_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.state.lock().await.data.get(key).cloned()
    }

    /// Committed entries in `[begin, end)`, outside any transaction.
    pub async fn committed_range(&self, begin: &[u8], end: &[u8]) -> Vec<KeyValue> {
        if begin >= end {
            return Vec::new();
        }
        let state = self.inner.state.lock().await;
        state
            .data
            .range(begin.to_vec()..end.to_vec())
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.clone(),
            })
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            transactions: self.inner.transactions.load(Ordering::Relaxed),
            commits: self.inner.commits.load(Ordering::Relaxed),
            conflicts: self.inner.conflicts.load(Ordering::Relaxed),
        }
    }

    async fn begin(&self, read_only: bool) -> DeterministicTransaction {
        let id = self.inner.transactions.fetch_add(1, Ordering::Relaxed) + 1;
        let state = self.inner.state.lock().await;
        trace!(tx = id, read_version = state.version, read_only, "begin transaction");
        DeterministicTransaction {
            inner: Arc::clone(&self.inner),
            read_version: state.version,
            snapshot: Arc::clone(&state.data),
            mutations: Vec::new(),
            read_conflicts: std::sync::Mutex::new(Vec::new()),
            read_only,
            context: SubspaceContext::named(format!("tx-{id}")),
            committed: false,
        }
    }
}

#[async_trait]
impl Database for DeterministicStore {
    type Transaction = DeterministicTransaction;

    async fn create_transaction(&self) -> Result<DeterministicTransaction, StoreError> {
        Ok(self.begin(false).await)
    }

    async fn create_read_transaction(&self) -> Result<DeterministicTransaction, StoreError> {
        Ok(self.begin(true).await)
    }

    fn backoff_hint(&self, error: &StoreError) -> Option<Duration> {
        (error.code() == codes::PROCESS_BEHIND).then(|| Duration::from_millis(PROCESS_BEHIND_BACKOFF_MS))
    }
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone)]
enum Mutation {
    Set(Vec<u8>, Vec<u8>),
    Clear(Vec<u8>),
    ClearRange(Vec<u8>, Vec<u8>),
    /// Key carries a trailing 4-byte little-endian placeholder offset.
    SetVersionstamped(Vec<u8>, Vec<u8>),
}

/// One attempt against a [`DeterministicStore`].
pub struct DeterministicTransaction {
    inner: Arc<Inner>,
    read_version: u64,
    snapshot: Arc<Map>,
    mutations: Vec<Mutation>,
    read_conflicts: std::sync::Mutex<Vec<KeyRange>>,
    read_only: bool,
    context: SubspaceContext,
    committed: bool,
}

impl DeterministicTransaction {
    pub fn read_version(&self) -> u64 {
        self.read_version
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Write `value` under a key whose versionstamp placeholder is filled in
    /// at commit.
    ///
    /// `key` is the output of `pack_with_versionstamp`. The key is not
    /// visible to this transaction's own reads.
    pub fn set_versionstamped_key(&mut self, key: &[u8], value: &[u8]) {
        self.mutations.push(Mutation::SetVersionstamped(key.to_vec(), value.to_vec()));
    }

    fn add_read_conflict(&self, range: KeyRange) {
        if self.read_only {
            return;
        }
        // Never held across an await; a poisoned lock still holds valid ranges.
        let mut conflicts = self.read_conflicts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        conflicts.push(range);
    }

    /// Value of `key` after this transaction's buffered writes, or `None` if
    /// the writes do not decide it.
    fn overlay(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        for mutation in self.mutations.iter().rev() {
            match mutation {
                Mutation::Set(k, v) if k.as_slice() == key => return Some(Some(v.clone())),
                Mutation::Clear(k) if k.as_slice() == key => return Some(None),
                Mutation::ClearRange(b, e) if in_range(key, b, e) => return Some(None),
                _ => {}
            }
        }
        None
    }

    fn write_ranges(mutations: &[Mutation]) -> Vec<KeyRange> {
        mutations
            .iter()
            .map(|m| match m {
                Mutation::Set(k, _) | Mutation::Clear(k) | Mutation::SetVersionstamped(k, _) => single_key_range(k),
                Mutation::ClearRange(b, e) => (b.clone(), e.clone()),
            })
            .collect()
    }
}

/// Resolve a versionstamped key: overwrite the 10 placeholder bytes at the
/// trailing offset with the commit version and drop the offset suffix.
fn stamp_key(raw: &[u8], version: u64) -> Result<Vec<u8>, StoreError> {
    let Some(split) = raw.len().checked_sub(4) else {
        return Err(StoreError::invalid_operation("versionstamped key shorter than its offset"));
    };
    let (key, offset_bytes) = raw.split_at(split);
    let offset = u32::from_le_bytes([offset_bytes[0], offset_bytes[1], offset_bytes[2], offset_bytes[3]]) as usize;
    if offset + 10 > key.len() {
        return Err(StoreError::invalid_operation("versionstamp offset outside key"));
    }
    let mut key = key.to_vec();
    key[offset..offset + 8].copy_from_slice(&version.to_be_bytes());
    key[offset + 8..offset + 10].copy_from_slice(&0u16.to_be_bytes());
    Ok(key)
}

#[async_trait]
impl Transaction for DeterministicTransaction {
    fn context(&self) -> &SubspaceContext {
        &self.context
    }

    async fn get(&self, key: &[u8], snapshot: bool) -> Result<Option<Vec<u8>>, StoreError> {
        if !snapshot {
            self.add_read_conflict(single_key_range(key));
        }
        if let Some(decided) = self.overlay(key) {
            return Ok(decided);
        }
        Ok(self.snapshot.get(key).cloned())
    }

    async fn get_range(&self, begin: &[u8], end: &[u8], options: RangeOptions) -> Result<RangeResult, StoreError> {
        if begin >= end {
            return Ok(RangeResult::default());
        }

        let mut view: Map = self.snapshot.range(begin.to_vec()..end.to_vec()).map(|(k, v)| (k.clone(), v.clone())).collect();
        for mutation in &self.mutations {
            match mutation {
                Mutation::Set(k, v) if in_range(k, begin, end) => {
                    view.insert(k.clone(), v.clone());
                }
                Mutation::Clear(k) => {
                    view.remove(k);
                }
                Mutation::ClearRange(b, e) => view.retain(|k, _| !in_range(k, b, e)),
                _ => {}
            }
        }

        let limit = if options.limit == 0 {
            usize::MAX
        } else {
            options.limit as usize
        };
        let total = view.len();
        let to_entry = |(key, value): (Vec<u8>, Vec<u8>)| KeyValue { key, value };
        let entries: Vec<KeyValue> = if options.reverse {
            view.into_iter().rev().take(limit).map(to_entry).collect()
        } else {
            view.into_iter().take(limit).map(to_entry).collect()
        };
        let more = total > entries.len();

        if !options.snapshot {
            // A truncated page only conflicts on the part of the range it covered.
            let covered = match (more, entries.last()) {
                (true, Some(last)) if options.reverse => (last.key.clone(), end.to_vec()),
                (true, Some(last)) => (begin.to_vec(), single_key_range(&last.key).1),
                _ => (begin.to_vec(), end.to_vec()),
            };
            self.add_read_conflict(covered);
        }

        Ok(RangeResult { entries, more })
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.mutations.push(Mutation::Set(key.to_vec(), value.to_vec()));
    }

    fn clear(&mut self, key: &[u8]) {
        self.mutations.push(Mutation::Clear(key.to_vec()));
    }

    fn clear_range(&mut self, begin: &[u8], end: &[u8]) {
        if begin < end {
            self.mutations.push(Mutation::ClearRange(begin.to_vec(), end.to_vec()));
        }
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.mutations.is_empty() {
            self.committed = true;
            return Ok(());
        }
        if self.read_only {
            return Err(StoreError::invalid_operation("mutations in a read-only transaction"));
        }
        if self.mutations.len() > MAX_TRANSACTION_MUTATIONS {
            return Err(StoreError::transaction_too_large(format!(
                "{} mutations exceeds limit of {}",
                self.mutations.len(),
                MAX_TRANSACTION_MUTATIONS
            )));
        }

        {
            let mut faults = self.inner.faults.lock().await;
            if let Some(error) = faults.errors.pop_front() {
                debug!(code = error.code(), "injected commit error");
                return Err(error);
            }
            if faults.conflicts > 0 {
                faults.conflicts -= 1;
                self.inner.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(read_version = self.read_version, "injected commit conflict");
                return Err(StoreError::not_committed());
            }
        }

        let mut state = self.inner.state.lock().await;

        if self.read_version < state.history_floor {
            return Err(StoreError::transaction_too_old());
        }

        let read_conflicts = std::mem::take(&mut *self.read_conflicts.lock().unwrap_or_else(|p| p.into_inner()));
        let conflicted = state
            .history
            .iter()
            .filter(|record| record.version > self.read_version)
            .any(|record| record.writes.iter().any(|w| read_conflicts.iter().any(|r| ranges_intersect(w, r))));
        if conflicted {
            self.inner.conflicts.fetch_add(1, Ordering::Relaxed);
            debug!(read_version = self.read_version, commit_version = state.version, "commit conflict");
            return Err(StoreError::not_committed());
        }

        let version = state.version + 1;
        let mut mutations = std::mem::take(&mut self.mutations);
        for mutation in &mut mutations {
            if let Mutation::SetVersionstamped(key, value) = mutation {
                let stamped = stamp_key(key, version)?;
                let value = std::mem::take(value);
                *mutation = Mutation::Set(stamped, value);
            }
        }

        let data = Arc::make_mut(&mut state.data);
        for mutation in &mutations {
            match mutation {
                Mutation::Set(k, v) => {
                    data.insert(k.clone(), v.clone());
                }
                Mutation::Clear(k) => {
                    data.remove(k);
                }
                Mutation::ClearRange(b, e) => data.retain(|k, _| !in_range(k, b, e)),
                Mutation::SetVersionstamped(..) => {}
            }
        }

        state.version = version;
        state.history.push_back(CommitRecord {
            version,
            writes: Self::write_ranges(&mutations),
        });
        while state.history.len() > MAX_CONFLICT_HISTORY {
            if let Some(evicted) = state.history.pop_front() {
                state.history_floor = evicted.version;
            }
        }

        self.committed = true;
        self.inner.commits.fetch_add(1, Ordering::Relaxed);
        debug!(version, mutations = mutations.len(), "committed transaction");
        Ok(())
    }
}

impl Drop for DeterministicTransaction {
    fn drop(&mut self) {
        if !self.committed {
            self.context.invalidate();
        }
    }
}
