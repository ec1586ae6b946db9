//! Transactional retry driver.
//!
//! [`TransactionRunner::run`] executes an operation against a fresh
//! transaction, commits it, and on a retryable store error backs off and
//! starts over with a new transaction. The failed transaction is dropped,
//! never reused, so its buffered writes and its subspace context die with it.
//!
//! # State Machine
//!
//! ```text
//! Starting -> Executing -> Committing -> Done
//!                 |             |
//!                 +-------------+--> Retrying -> Starting
//!                 |             |
//!                 +-------------+--> Failed
//! ```
//!
//! Each transition is logged at `trace` level; every retry is logged at
//! `warn` with the store error code and the chosen delay.
//!
//! # Cancellation
//!
//! The in-flight attempt and the backoff sleep both race the caller's
//! [`CancellationToken`] and the optional overall timeout. Cancellation
//! surfaces as `operation_cancelled` (1101), a timeout as
//! `transaction_timed_out` (1031).

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use futures::stream;
use rand::Rng;
use tessera_constants::retry::DEFAULT_INITIAL_BACKOFF_MS;
use tessera_constants::retry::DEFAULT_MAX_BACKOFF_MS;
use tessera_constants::store::RANGE_PAGE_SIZE;
use tessera_kv::Database;
use tessera_kv::KeyValue;
use tessera_kv::RangeOptions;
use tessera_kv::StoreError;
use tessera_kv::Transaction;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use tracing::warn;

use crate::verified::compute_backoff_with_jitter;
use crate::verified::is_attempt_budget_exhausted;

// ============================================================================
// Error Classification
// ============================================================================

/// Errors an operation run by [`TransactionRunner`] may return.
///
/// The driver only needs two things from an operation's error type: a way to
/// wrap the store failures it raises itself (transaction creation, commit,
/// cancellation, timeout), and a way to find a store error wrapped inside a
/// layer error so it can decide whether to retry.
pub trait RetryableError: From<StoreError> + Send + 'static {
    /// The store error at the root of this error, if any.
    fn store_error(&self) -> Option<&StoreError>;
}

impl RetryableError for StoreError {
    fn store_error(&self) -> Option<&StoreError> {
        Some(self)
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Whether a run needs to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// Uses the store's read transaction; committing mutations fails.
    ReadOnly,
    /// Fresh read-write transaction per attempt.
    #[default]
    ReadWrite,
}

/// Backoff curve and limits for [`TransactionRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Cap on the policy delay.
    pub max_backoff: Duration,
    /// Total attempts allowed, `None` for unbounded.
    pub max_attempts: Option<u32>,
    /// Wall-clock budget for the whole run, `None` for unbounded.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Override the backoff curve.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Limit the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Limit the total run time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Phase of a run, as logged by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Creating the attempt's transaction.
    Starting,
    /// Running the caller's operation.
    Executing,
    /// Committing the attempt's transaction.
    Committing,
    /// Waiting out the backoff after a retryable error.
    Retrying,
    /// Committed; the run returns the operation's value.
    Done,
    /// A non-retryable error ended the run.
    Failed,
}

// ============================================================================
// Runner
// ============================================================================

/// Runs closures against fresh transactions until one commits.
///
/// Cheap to clone; clones share the database handle.
pub struct TransactionRunner<D: Database> {
    db: Arc<D>,
    policy: RetryPolicy,
}

impl<D: Database> Clone for TransactionRunner<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            policy: self.policy.clone(),
        }
    }
}

impl<D: Database> std::fmt::Debug for TransactionRunner<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionRunner").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl<D: Database> TransactionRunner<D> {
    /// Runner with the default policy: 10ms initial backoff, 1s cap, no limits.
    pub fn new(db: Arc<D>) -> Self {
        Self::with_policy(db, RetryPolicy::default())
    }

    /// Runner with an explicit policy.
    pub fn with_policy(db: Arc<D>, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying database.
    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    /// Run `op` until it commits, fails permanently, is cancelled, or times out.
    ///
    /// `op` is called once per attempt with that attempt's transaction. It
    /// must not keep borrows of its captured state in the returned future;
    /// clone what the future needs instead.
    ///
    /// # Errors
    ///
    /// - The operation's own error if it is not a retryable store error
    /// - `operation_cancelled` if `cancel` fires
    /// - `transaction_timed_out` if the policy timeout elapses
    /// - The last retryable error once `max_attempts` is used up
    pub async fn run<T, E, F>(&self, mode: TransactionMode, cancel: &CancellationToken, mut op: F) -> Result<T, E>
    where
        T: Send,
        E: RetryableError,
        F: for<'a> FnMut(&'a mut D::Transaction) -> BoxFuture<'a, Result<T, E>> + Send,
    {
        let deadline = self.policy.timeout.map(|timeout| Instant::now() + timeout);
        let initial_ms = duration_ms(self.policy.initial_backoff);
        let max_ms = duration_ms(self.policy.max_backoff);

        let mut attempt: u32 = 0;
        let mut previous_delay_ms: u64 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            trace!(attempt, state = ?AttemptState::Starting, "transaction attempt");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(attempt, state = ?AttemptState::Failed, "transaction cancelled");
                    return Err(StoreError::operation_cancelled().into());
                }
                _ = deadline_elapsed(deadline) => {
                    trace!(attempt, state = ?AttemptState::Failed, "transaction timed out");
                    return Err(StoreError::transaction_timed_out().into());
                }
                result = self.attempt(mode, attempt, &mut op) => result,
            };

            let error = match outcome {
                Ok(value) => {
                    trace!(attempt, state = ?AttemptState::Done, "transaction committed");
                    return Ok(value);
                }
                Err(error) => error,
            };

            let Some(store_error) = error.store_error().filter(|e| e.is_retryable()).cloned() else {
                trace!(attempt, state = ?AttemptState::Failed, "transaction failed");
                return Err(error);
            };

            if is_attempt_budget_exhausted(attempt, self.policy.max_attempts) {
                warn!(attempt, code = store_error.code(), "transaction attempt budget exhausted");
                return Err(error);
            }

            let hint_ms = self.db.backoff_hint(&store_error).map(duration_ms);
            let jitter_seed = rand::rng().random::<u64>();
            let backoff =
                compute_backoff_with_jitter(attempt, previous_delay_ms, initial_ms, max_ms, hint_ms, jitter_seed);
            previous_delay_ms = backoff.delay_ms;

            warn!(
                attempt,
                code = store_error.code(),
                delay_ms = backoff.sleep_ms,
                maybe_committed = store_error.is_maybe_committed(),
                "retrying transaction"
            );
            trace!(attempt, state = ?AttemptState::Retrying, "transaction backing off");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(attempt, state = ?AttemptState::Failed, "transaction cancelled during backoff");
                    return Err(StoreError::operation_cancelled().into());
                }
                _ = deadline_elapsed(deadline) => {
                    trace!(attempt, state = ?AttemptState::Failed, "transaction timed out during backoff");
                    return Err(StoreError::transaction_timed_out().into());
                }
                _ = tokio::time::sleep(Duration::from_millis(backoff.sleep_ms)) => {}
            }
        }
    }

    /// One attempt: fresh transaction, operation, commit.
    async fn attempt<T, E, F>(&self, mode: TransactionMode, attempt: u32, op: &mut F) -> Result<T, E>
    where
        E: RetryableError,
        F: for<'a> FnMut(&'a mut D::Transaction) -> BoxFuture<'a, Result<T, E>>,
    {
        let mut tr = match mode {
            TransactionMode::ReadOnly => self.db.create_read_transaction().await?,
            TransactionMode::ReadWrite => self.db.create_transaction().await?,
        };

        trace!(attempt, state = ?AttemptState::Executing, "transaction attempt");
        let value = op(&mut tr).await?;

        trace!(attempt, state = ?AttemptState::Committing, "transaction attempt");
        tr.commit().await?;
        Ok(value)
    }
}

/// Resolves once `deadline` passes; never resolves without one.
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Range Paging
// ============================================================================

struct RangeCursor {
    begin: Vec<u8>,
    end: Vec<u8>,
    exhausted: bool,
}

/// Lazily page through `[begin, end)` inside `tr`.
///
/// `options.limit` is the page size (0 selects the default page size); the
/// stream itself is unbounded and yields every key in the range, in reverse
/// order if `options.reverse` is set. Pages are fetched only as the stream
/// is polled.
pub fn range_stream<'a, Tx: Transaction>(
    tr: &'a Tx,
    begin: Vec<u8>,
    end: Vec<u8>,
    options: RangeOptions,
) -> impl Stream<Item = Result<KeyValue, StoreError>> + Send + 'a {
    let page_size = if options.limit == 0 { RANGE_PAGE_SIZE } else { options.limit };
    let page_options = options.with_limit(page_size);
    let cursor = RangeCursor {
        begin,
        end,
        exhausted: false,
    };

    stream::try_unfold(cursor, move |mut cursor| async move {
        if cursor.exhausted || cursor.begin >= cursor.end {
            return Ok::<_, StoreError>(None);
        }

        let page = tr.get_range(&cursor.begin, &cursor.end, page_options).await?;
        match page.entries.last() {
            Some(last) if page.more => {
                if page_options.reverse {
                    cursor.end = last.key.clone();
                } else {
                    cursor.begin = key_after(&last.key);
                }
            }
            _ => cursor.exhausted = true,
        }
        Ok(Some((page.entries, cursor)))
    })
    .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<KeyValue, StoreError>)))
    .try_flatten()
}

/// Smallest key strictly greater than `key`.
fn key_after(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}

/// Collect a whole range through [`range_stream`], failing past `max` rows.
pub(crate) async fn collect_range<Tx: Transaction>(
    tr: &Tx,
    begin: Vec<u8>,
    end: Vec<u8>,
    max: u32,
) -> Result<Option<Vec<KeyValue>>, StoreError> {
    let limit = max as usize;
    let rows: Vec<KeyValue> = range_stream(tr, begin, end, RangeOptions::default())
        .take(limit.saturating_add(1))
        .try_collect()
        .await?;
    if rows.len() > limit {
        return Ok(None);
    }
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use futures::FutureExt;
    use tessera_kv::DeterministicStore;
    use tessera_kv::codes;

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_run_commits() {
        let store = Arc::new(DeterministicStore::new());
        let runner = TransactionRunner::new(Arc::clone(&store));
        let cancel = CancellationToken::new();

        let value = runner
            .run(TransactionMode::ReadWrite, &cancel, |tr| {
                async move {
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(7)
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(store.committed_value(b"k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_run_retries_injected_conflicts() {
        let store = Arc::new(DeterministicStore::new());
        store.inject_conflicts(3).await;
        let runner = TransactionRunner::with_policy(Arc::clone(&store), fast_policy());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        runner
            .run(TransactionMode::ReadWrite, &CancellationToken::new(), move |tr| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(store.committed_value(b"k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let store = Arc::new(DeterministicStore::new());
        let runner = TransactionRunner::with_policy(store, fast_policy());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&attempts);
        let err = runner
            .run(TransactionMode::ReadWrite, &CancellationToken::new(), move |_tr| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(StoreError::invalid_operation("bad"))
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::CLIENT_INVALID_OPERATION);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_max_attempts_returns_last_error() {
        let store = Arc::new(DeterministicStore::new());
        store.inject_conflicts(10).await;
        let runner = TransactionRunner::with_policy(store, fast_policy().with_max_attempts(3));

        let err = runner
            .run(TransactionMode::ReadWrite, &CancellationToken::new(), |tr| {
                async move {
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::NOT_COMMITTED);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = Arc::new(DeterministicStore::new());
        let runner = TransactionRunner::new(Arc::clone(&store));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner
            .run(TransactionMode::ReadWrite, &cancel, |tr| {
                async move {
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::OPERATION_CANCELLED);
        assert_eq!(store.committed_value(b"k").await, None);
    }

    #[tokio::test]
    async fn test_timeout() {
        let store = Arc::new(DeterministicStore::new());
        store.inject_conflicts(u32::MAX).await;
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_millis(5), Duration::from_millis(5))
            .with_timeout(Duration::from_millis(50));
        let runner = TransactionRunner::with_policy(store, policy);

        let err = runner
            .run(TransactionMode::ReadWrite, &CancellationToken::new(), |tr| {
                async move {
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::TRANSACTION_TIMED_OUT);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let store = Arc::new(DeterministicStore::new());
        let runner = TransactionRunner::new(store);

        let err = runner
            .run(TransactionMode::ReadOnly, &CancellationToken::new(), |tr| {
                async move {
                    tr.set(b"k", b"v");
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::CLIENT_INVALID_OPERATION);
    }

    #[tokio::test]
    async fn test_range_stream_pages() {
        let store = Arc::new(DeterministicStore::new());
        let runner = TransactionRunner::new(Arc::clone(&store));
        let cancel = CancellationToken::new();

        runner
            .run(TransactionMode::ReadWrite, &cancel, |tr| {
                async move {
                    for i in 0u8..25 {
                        tr.set(&[b'r', i], &[i]);
                    }
                    Ok::<_, StoreError>(())
                }
                .boxed()
            })
            .await
            .unwrap();

        let tr = store.create_transaction().await.unwrap();
        let forward: Vec<KeyValue> =
            range_stream(&tr, b"r".to_vec(), b"s".to_vec(), RangeOptions::default().with_limit(4))
                .try_collect()
                .await
                .unwrap();
        assert_eq!(forward.len(), 25);
        assert!(forward.windows(2).all(|w| w[0].key < w[1].key));

        let reverse: Vec<KeyValue> =
            range_stream(&tr, b"r".to_vec(), b"s".to_vec(), RangeOptions::default().with_limit(7).reversed())
                .try_collect()
                .await
                .unwrap();
        assert_eq!(reverse.len(), 25);
        assert!(reverse.windows(2).all(|w| w[0].key > w[1].key));

        let unique: HashSet<_> = forward.iter().map(|kv| kv.key.clone()).collect();
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_collect_range_bound() {
        let store = Arc::new(DeterministicStore::new());
        let mut tr = store.create_transaction().await.unwrap();
        for i in 0u8..10 {
            tr.set(&[b'c', i], b"");
        }

        let all = collect_range(&tr, b"c".to_vec(), b"d".to_vec(), 10).await.unwrap();
        assert_eq!(all.map(|rows| rows.len()), Some(10));

        let over = collect_range(&tr, b"c".to_vec(), b"d".to_vec(), 9).await.unwrap();
        assert!(over.is_none());
    }
}
