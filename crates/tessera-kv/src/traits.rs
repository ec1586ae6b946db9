//! The store boundary: databases hand out transactions, transactions read
//! and buffer writes, and `commit` consumes the transaction.

use std::time::Duration;

use async_trait::async_trait;
use tessera_constants::store::RANGE_PAGE_SIZE;
use tessera_layer::SubspaceContext;

use crate::error::StoreError;

/// One key-value pair returned by a range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Options for [`Transaction::get_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOptions {
    /// Maximum entries to return in one call.
    pub limit: u32,
    /// Return entries in descending key order.
    pub reverse: bool,
    /// Skip read-conflict tracking for this read.
    pub snapshot: bool,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            limit: RANGE_PAGE_SIZE,
            reverse: false,
            snapshot: false,
        }
    }
}

impl RangeOptions {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn snapshot(mut self) -> Self {
        self.snapshot = true;
        self
    }
}

/// One page of a range read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeResult {
    pub entries: Vec<KeyValue>,
    /// More entries exist in the requested range beyond this page.
    pub more: bool,
}

/// A single transaction attempt.
///
/// Reads see the transaction's own buffered writes. Non-snapshot reads add
/// read conflicts; a commit fails with a retryable conflict error when a
/// newer commit wrote anything this transaction read.
#[async_trait]
pub trait Transaction: Send + Sync + Sized {
    /// Validity handle for subspaces resolved in this transaction.
    ///
    /// Invalidated when the transaction is dropped without a successful commit.
    fn context(&self) -> &SubspaceContext;

    async fn get(&self, key: &[u8], snapshot: bool) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read keys in `[begin, end)`, at most `options.limit` of them.
    async fn get_range(&self, begin: &[u8], end: &[u8], options: RangeOptions) -> Result<RangeResult, StoreError>;

    fn set(&mut self, key: &[u8], value: &[u8]);

    fn clear(&mut self, key: &[u8]);

    /// Clear every key in `[begin, end)`.
    fn clear_range(&mut self, begin: &[u8], end: &[u8]);

    /// Atomically apply the buffered writes.
    async fn commit(self) -> Result<(), StoreError>;
}

/// A handle that creates transactions.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    type Transaction: Transaction + 'static;

    /// A read-write transaction at the current read version.
    async fn create_transaction(&self) -> Result<Self::Transaction, StoreError>;

    /// A transaction for read-only work.
    ///
    /// Engines with a cheaper snapshot path override this; the default is a
    /// regular transaction.
    async fn create_read_transaction(&self) -> Result<Self::Transaction, StoreError> {
        self.create_transaction().await
    }

    /// Minimum wait the engine asks for before retrying after `error`.
    ///
    /// The retry driver never sleeps less than this. Engines without load
    /// feedback return `None`.
    fn backoff_hint(&self, _error: &StoreError) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::DeterministicStore;
    use crate::inmemory::DeterministicTransaction;

    /// Engine that keeps every provided method.
    struct NoFeedback(DeterministicStore);

    #[async_trait]
    impl Database for NoFeedback {
        type Transaction = DeterministicTransaction;

        async fn create_transaction(&self) -> Result<DeterministicTransaction, StoreError> {
            self.0.create_transaction().await
        }
    }

    #[tokio::test]
    async fn test_default_backoff_hint_is_none() {
        let store = NoFeedback(DeterministicStore::new());
        let behind = StoreError::process_behind();

        assert_eq!(store.backoff_hint(&behind), None);
        assert!(store.0.backoff_hint(&behind).is_some());

        let tr = store.create_read_transaction().await.unwrap();
        assert_eq!(tr.get(b"missing", false).await.unwrap(), None);
    }
}
