//! High-Contention Allocator (HCA) for directory prefix allocation.
//!
//! Hands out small unique integers to concurrent transactions without
//! funnelling them through a single counter key.
//!
//! # Algorithm
//!
//! The allocator keeps a window `[start, start + size)` under its counters key:
//!
//! 1. Read the window with a snapshot read (no conflict on the hot key)
//! 2. Probe random candidates in the window; a candidate is claimed by a
//!    conflicting read of its `recent` key followed by a write, so two
//!    transactions claiming the same candidate cannot both commit
//! 3. After [`HCA_MAX_PROBES_PER_WINDOW`] occupied probes, advance the window
//!    past itself and double it, clearing the claims below the new start
//!
//! Claims commit atomically with the caller's transaction. A transaction that
//! does not commit releases its claim.
//!
//! # Keys
//!
//! - `hca.pack(("counters",))` -> `(start, size)`
//! - `hca.pack(("recent", candidate))` -> empty
//!
//! # References
//!
//! - [High-Contention Allocator](https://ananthakumaran.in/2018/08/05/high-contention-allocator.html)
//! - [FoundationDB Directory Layer](https://apple.github.io/foundationdb/developer-guide.html)

use futures::FutureExt;
use rand::Rng;
use snafu::ResultExt;
use snafu::Snafu;
use tessera_constants::allocator::HCA_COUNTERS_KEY;
use tessera_constants::allocator::HCA_INITIAL_WINDOW_SIZE;
use tessera_constants::allocator::HCA_MAX_PROBES_PER_WINDOW;
use tessera_constants::allocator::HCA_MAX_WINDOW_ADVANCES;
use tessera_constants::allocator::HCA_RECENT_PREFIX;
use tessera_kv::Database;
use tessera_kv::StoreError;
use tessera_kv::Transaction;
use tessera_layer::Subspace;
use tessera_layer::Tuple;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::retry::RetryableError;
use crate::retry::TransactionMode;
use crate::retry::TransactionRunner;
use crate::verified::advance_window;
use crate::verified::candidate_in_window;
use crate::verified::is_valid_window_size;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during allocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocationError {
    /// Every window within the advance bound was occupied, or the next window
    /// would overflow `i64`.
    #[snafu(display("allocator window exhausted after {advances} advances at start {start}"))]
    WindowExhausted {
        /// Window advances made in this call.
        advances: u32,
        /// Start of the last window probed.
        start: i64,
    },

    /// Invalid state read from storage.
    #[snafu(display("corrupted allocator state: {reason}"))]
    CorruptedState {
        /// Description of the corruption.
        reason: String,
    },

    /// Store error during allocation.
    #[snafu(display("store error: {source}"))]
    Store {
        /// The underlying store error.
        source: StoreError,
    },
}

impl From<StoreError> for AllocationError {
    fn from(source: StoreError) -> Self {
        AllocationError::Store { source }
    }
}

impl RetryableError for AllocationError {
    fn store_error(&self) -> Option<&StoreError> {
        match self {
            AllocationError::Store { source } => Some(source),
            _ => None,
        }
    }
}

// =============================================================================
// High-Contention Allocator
// =============================================================================

/// High-Contention Allocator over one subspace.
///
/// Holds no in-process state: two allocators over the same subspace, in the
/// same process or not, never hand out the same integer.
///
/// # Example
///
/// ```ignore
/// use tessera_core::HighContentionAllocator;
/// use tessera_layer::Subspace;
///
/// let allocator = HighContentionAllocator::new(Subspace::from_bytes(b"hca".to_vec()));
/// let id = allocator.allocate(&mut tr).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HighContentionAllocator {
    /// Subspace for counters and claims.
    subspace: Subspace,
}

impl HighContentionAllocator {
    /// Create an allocator storing its state under `subspace`.
    pub fn new(subspace: Subspace) -> Self {
        Self { subspace }
    }

    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    /// Allocate a unique non-negative integer inside `tr`.
    ///
    /// The claim becomes durable only when `tr` commits.
    ///
    /// # Errors
    ///
    /// - `Store` for store failures, including conflicts detected later at commit
    /// - `CorruptedState` if the counters key does not hold a valid window
    /// - `WindowExhausted` if the advance bound is reached
    pub async fn allocate<Tx: Transaction>(&self, tr: &mut Tx) -> Result<i64, AllocationError> {
        let counters_key = self.counters_key();
        let (mut start, mut size) = self.read_window(tr, &counters_key, true).await?;

        for advances in 0..=HCA_MAX_WINDOW_ADVANCES {
            // Generate all offsets upfront to avoid holding the RNG across await.
            let offsets: Vec<u64> = {
                let mut rng = rand::rng();
                (0..HCA_MAX_PROBES_PER_WINDOW).map(|_| rng.random_range(0..size)).collect()
            };

            for offset in offsets {
                let Some(candidate) = candidate_in_window(start, size, offset) else {
                    return WindowExhaustedSnafu { advances, start }.fail();
                };
                let key = self.recent_key(candidate);
                if tr.get(&key, false).await?.is_none() {
                    tr.set(&key, &[]);
                    debug!(candidate, start, size, advances, "allocated candidate");
                    return Ok(candidate);
                }
            }

            if advances == HCA_MAX_WINDOW_ADVANCES {
                break;
            }

            // Conflicting read: concurrent advances of the same window cannot both commit.
            let (current_start, current_size) = self.read_window(tr, &counters_key, false).await?;
            if current_start > start {
                start = current_start;
                size = current_size;
                continue;
            }

            let Some((next_start, next_size)) = advance_window(start, size) else {
                return WindowExhaustedSnafu { advances, start }.fail();
            };
            tr.set(&counters_key, &encode_window(next_start, next_size));
            let (recent_begin, _) = self.subspace.range_of(&Tuple::new().push(HCA_RECENT_PREFIX));
            tr.clear_range(&recent_begin, &self.recent_key(next_start));
            debug!(from = start, to = next_start, size = next_size, "advanced allocator window");

            start = next_start;
            size = next_size;
        }

        WindowExhaustedSnafu {
            advances: HCA_MAX_WINDOW_ADVANCES,
            start,
        }
        .fail()
    }

    /// Allocate in a transaction of its own, retried by `runner`.
    pub async fn allocate_standalone<D: Database>(
        &self,
        runner: &TransactionRunner<D>,
        cancel: &CancellationToken,
    ) -> Result<i64, AllocationError> {
        let allocator = self.clone();
        runner
            .run(TransactionMode::ReadWrite, cancel, move |tr| {
                let allocator = allocator.clone();
                async move { allocator.allocate(tr).await }.boxed()
            })
            .await
    }

    // -------------------------------------------------------------------------
    // Internal Methods
    // -------------------------------------------------------------------------

    async fn read_window<Tx: Transaction>(
        &self,
        tr: &Tx,
        counters_key: &[u8],
        snapshot: bool,
    ) -> Result<(i64, u64), AllocationError> {
        match tr.get(counters_key, snapshot).await? {
            Some(raw) => decode_window(&raw),
            None => Ok((0, HCA_INITIAL_WINDOW_SIZE)),
        }
    }

    fn counters_key(&self) -> Vec<u8> {
        self.subspace.pack(&Tuple::new().push(HCA_COUNTERS_KEY))
    }

    fn recent_key(&self, candidate: i64) -> Vec<u8> {
        self.subspace.pack(&Tuple::new().push(HCA_RECENT_PREFIX).push(candidate))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn encode_window(start: i64, size: u64) -> Vec<u8> {
    Tuple::new().push(start).push(size).pack()
}

fn decode_window(raw: &[u8]) -> Result<(i64, u64), AllocationError> {
    let tuple = Tuple::unpack(raw).map_err(|e| AllocationError::CorruptedState {
        reason: format!("counters are not a tuple: {e}"),
    })?;
    let start = tuple.get(0).and_then(|e| e.as_i64()).filter(|start| *start >= 0);
    let size = tuple.get(1).and_then(|e| e.as_int()).and_then(|size| u64::try_from(size).ok());

    match (start, size) {
        (Some(start), Some(size)) if tuple.len() == 2 && is_valid_window_size(size) => Ok((start, size)),
        _ => CorruptedStateSnafu {
            reason: format!("counters hold an invalid window: {tuple:?}"),
        }
        .fail(),
    }
}
