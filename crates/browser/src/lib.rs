//! Browser automation capability seam and its WebDriver implementation.
//!
//! The session engine only sees [`AutomationSession`](session::AutomationSession);
//! everything about how a real browser is driven lives behind it.

pub mod client;
pub mod session;

pub use client::{WebDriverClient, WebDriverSession};
pub use session::{AutomationSession, BrowserError, SessionFactory};
