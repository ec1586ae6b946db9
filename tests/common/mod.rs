//! Shared helpers for the workspace integration tests.

use std::sync::Arc;
use std::time::Duration;

use tessera::DeterministicStore;
use tessera::Directory;
use tessera::RetryPolicy;
use tessera::TransactionRunner;

/// Upper bound for any single integration test.
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tessera=info,tessera_core=info,tessera_kv=warn")
        .with_test_writer()
        .try_init();
}

/// Fast backoff so conflict-heavy tests finish quickly.
#[allow(dead_code)]
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(20))
}

#[allow(dead_code)]
pub fn setup_runner() -> (Arc<DeterministicStore>, TransactionRunner<DeterministicStore>) {
    let store = Arc::new(DeterministicStore::new());
    let runner = TransactionRunner::with_policy(Arc::clone(&store), fast_policy());
    (store, runner)
}

#[allow(dead_code)]
pub fn setup_directory() -> (Arc<DeterministicStore>, Directory<DeterministicStore>) {
    let (store, runner) = setup_runner();
    (store, Directory::new(runner))
}
