//! Page-automation driver boundary
//!
//! The orchestration core talks to a real browser exclusively through the
//! [`PageDriver`] capability trait. Concrete backends (WebDriver, CDP) live
//! outside this crate; the worker treats every driver failure uniformly as an
//! infrastructure failure, so [`DriverError`] only needs enough structure for
//! diagnostics.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a page-automation backend
#[derive(Error, Debug)]
pub enum DriverError {
    /// Navigation to a URL failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// No element matched the selector
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// An explicit wait expired
    #[error("timed out waiting for {selector}")]
    Timeout { selector: String },

    /// The browser session itself is gone or was never available
    #[error("browser session error: {0}")]
    Session(String),
}

/// Result type for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Capability set the crawl worker consumes to drive one browser session.
///
/// All operations may fail with a [`DriverError`]; callers treat any failure
/// as terminal for the running phase. Implementations are expected to hold
/// one logical browser session for the lifetime of the value.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;
    async fn wait_visible(&self, selector: &str) -> DriverResult<()>;
    async fn click(&self, selector: &str) -> DriverResult<()>;
    async fn send_keys(&self, selector: &str, text: &str) -> DriverResult<()>;
    async fn read_text(&self, selector: &str) -> DriverResult<String>;
    async fn read_attribute(&self, selector: &str, attr: &str) -> DriverResult<String>;
    async fn count_nodes(&self, selector: &str) -> DriverResult<usize>;
    async fn current_location(&self) -> DriverResult<String>;

    /// Fixed pause to accommodate asynchronous page rendering
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Creates a fresh browser session per scrape session
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self) -> DriverResult<Box<dyn PageDriver>>;
}

/// Factory for deployments with no automation backend wired in.
///
/// Every session started against it terminates as an infrastructure failure.
/// TODO: replace with a WebDriver-backed PageDriver adapter once the target
/// deployment settles on a browser backend.
pub struct NullDriverFactory;

#[async_trait]
impl DriverFactory for NullDriverFactory {
    async fn create(&self) -> DriverResult<Box<dyn PageDriver>> {
        Err(DriverError::Session(
            "no page-automation backend configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_factory_always_fails() {
        let factory = NullDriverFactory;
        let err = factory.create().await.err().expect("must fail");
        assert!(matches!(err, DriverError::Session(_)));
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::ElementNotFound {
            selector: "#login".to_string(),
        };
        assert_eq!(err.to_string(), "element not found: #login");
    }
}
