//! Store boundary and in-memory engine constants.

/// Rows requested per page by the lazy range stream.
pub const RANGE_PAGE_SIZE: u32 = 256;

/// Commits remembered by the in-memory engine for conflict detection.
///
/// A transaction whose read version predates the oldest remembered commit
/// fails with `transaction_too_old` and is retried with a fresh snapshot.
pub const MAX_CONFLICT_HISTORY: usize = 4096;

/// Mutations buffered by one in-memory transaction before commit.
pub const MAX_TRANSACTION_MUTATIONS: usize = 100_000;

/// Backoff floor the in-memory engine reports after `process_behind`.
pub const PROCESS_BEHIND_BACKOFF_MS: u64 = 50;
