//! Service-specific tests
//!
//! Each service has its own test file; shared timing helpers live here.


pub mod common {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Upper bound for anything that involves a real child process
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to run async operations with timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }
}
