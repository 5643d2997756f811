//! Shared helpers for the integration tests.

pub mod builders;
pub mod fake_executor;
pub mod recording_notifier;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub use builders::{test_context, ConfigFileBuilder};
pub use fake_executor::FakeExecutor;
pub use recording_notifier::RecordingNotifier;

/// Upper bound for any single async test body.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route `tracing` output into the test harness capture.
///
/// Filtered by `ASSETPIPE_LOG`, falling back to `warn`. Output shows up for
/// failing tests, or for all of them with `--nocapture`.
pub fn init_tracing() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let filter = EnvFilter::try_from_env("ASSETPIPE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub async fn with_timeout<T>(fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(value) => value,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}
