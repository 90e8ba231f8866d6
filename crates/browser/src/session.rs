//! Capability traits the session engine drives a browser through.

use async_trait::async_trait;

/// Errors from the browser automation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Failed to reach the automation endpoint or open a session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint rejected or failed a command on a live session.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// One live browser page, owned by exactly one session task.
///
/// These are capability calls: the engine treats them as opaque I/O and the
/// implementation decides how they map onto a real browser.
#[async_trait]
pub trait AutomationSession: Send + Sync {
    /// Navigate the page to `url`.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// The page's current navigation location.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Full-page screenshot as raw image bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// The rendered document markup.
    async fn markup(&self) -> Result<String, BrowserError>;

    /// Fill the first element matching a CSS selector with `value`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Click the first element matching a CSS selector.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Whether any element matches the CSS selector.
    async fn query_selector(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Tear the session down, releasing the underlying browser resources.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens a fresh, isolated [`AutomationSession`] for one job.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AutomationSession>, BrowserError>;
}
