//! Store error type and FoundationDB error codes.

use snafu::Snafu;

/// FoundationDB error codes used across the store boundary.
pub mod codes {
    /// Read version is older than the store's retained history.
    pub const TRANSACTION_TOO_OLD: i32 = 1007;
    /// Read version is ahead of what the storage servers have.
    pub const FUTURE_VERSION: i32 = 1009;
    /// Commit lost a read/write conflict.
    pub const NOT_COMMITTED: i32 = 1020;
    /// The commit may or may not have been applied.
    pub const COMMIT_UNKNOWN_RESULT: i32 = 1021;
    /// Overall transaction deadline elapsed.
    pub const TRANSACTION_TIMED_OUT: i32 = 1031;
    /// Storage is lagging; back off and retry.
    pub const PROCESS_BEHIND: i32 = 1037;
    /// The operation was cancelled by the caller.
    pub const OPERATION_CANCELLED: i32 = 1101;
    /// Operation not permitted on this transaction.
    pub const CLIENT_INVALID_OPERATION: i32 = 2000;
    /// Transaction exceeds the engine's size limit.
    pub const TRANSACTION_TOO_LARGE: i32 = 2101;

    /// Codes a fresh transaction attempt can be expected to get past.
    pub fn is_retryable(code: i32) -> bool {
        matches!(
            code,
            TRANSACTION_TOO_OLD | FUTURE_VERSION | NOT_COMMITTED | COMMIT_UNKNOWN_RESULT | PROCESS_BEHIND
        )
    }
}

/// Error reported by a store operation.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum StoreError {
    /// A fresh attempt may succeed.
    #[snafu(display("retryable store error {code}: {message}"))]
    Retryable {
        /// FoundationDB error code.
        code: i32,
        /// Human-readable description.
        message: String,
    },

    /// Retrying will not help.
    #[snafu(display("store error {code}: {message}"))]
    Fatal {
        /// FoundationDB error code.
        code: i32,
        /// Human-readable description.
        message: String,
    },
}

impl StoreError {
    /// Classify an error code into the matching variant.
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        if codes::is_retryable(code) {
            StoreError::Retryable { code, message }
        } else {
            StoreError::Fatal { code, message }
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            StoreError::Retryable { code, .. } | StoreError::Fatal { code, .. } => *code,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable { .. })
    }

    /// Whether the failed commit might still have been applied.
    pub fn is_maybe_committed(&self) -> bool {
        self.code() == codes::COMMIT_UNKNOWN_RESULT
    }

    pub fn transaction_too_old() -> Self {
        Self::from_code(codes::TRANSACTION_TOO_OLD, "transaction is too old to perform reads or be committed")
    }

    pub fn future_version() -> Self {
        Self::from_code(codes::FUTURE_VERSION, "request for future version")
    }

    pub fn not_committed() -> Self {
        Self::from_code(codes::NOT_COMMITTED, "transaction not committed due to conflict with another transaction")
    }

    pub fn commit_unknown_result() -> Self {
        Self::from_code(codes::COMMIT_UNKNOWN_RESULT, "transaction may or may not have committed")
    }

    pub fn transaction_timed_out() -> Self {
        Self::from_code(codes::TRANSACTION_TIMED_OUT, "operation aborted because the transaction timed out")
    }

    pub fn process_behind() -> Self {
        Self::from_code(codes::PROCESS_BEHIND, "storage process does not have recent mutations")
    }

    pub fn operation_cancelled() -> Self {
        Self::from_code(codes::OPERATION_CANCELLED, "asynchronous operation cancelled")
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::from_code(codes::CLIENT_INVALID_OPERATION, message)
    }

    pub fn transaction_too_large(message: impl Into<String>) -> Self {
        Self::from_code(codes::TRANSACTION_TOO_LARGE, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = StoreError::not_committed();
        assert!(err.is_retryable());
        assert_eq!(err.code(), 1020);
    }

    #[test]
    fn cancellation_and_timeout_are_fatal() {
        assert!(!StoreError::operation_cancelled().is_retryable());
        assert!(!StoreError::transaction_timed_out().is_retryable());
        assert!(!StoreError::invalid_operation("read-only").is_retryable());
    }

    #[test]
    fn unknown_result_is_retryable_and_flagged() {
        let err = StoreError::commit_unknown_result();
        assert!(err.is_retryable());
        assert!(err.is_maybe_committed());
        assert!(!StoreError::not_committed().is_maybe_committed());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(StoreError::from_code(2000, "bad").to_string(), "store error 2000: bad");
        assert!(StoreError::transaction_too_old().to_string().contains("1007"));
    }
}
