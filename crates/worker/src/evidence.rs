//! Filesystem store for challenge evidence (screenshots and page markup).

use std::path::PathBuf;

use chrono::Utc;

/// Writes evidence artifacts under a configured root directory.
///
/// File names combine the caller's prefix with a millisecond timestamp, so
/// interim and final evidence for the same record never collide. A write
/// failure is fatal for the owning job and propagates to its fault path.
pub struct EvidenceStore {
    root: PathBuf,
}

impl EvidenceStore {
    /// Create the store, creating the root directory if it is absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Persist screenshot bytes, returning the addressable path.
    pub async fn save_screenshot(
        &self,
        content: &[u8],
        prefix: &str,
    ) -> Result<String, std::io::Error> {
        let path = self.root.join(format!("{prefix}_{}.png", timestamp()));
        tokio::fs::write(&path, content).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Persist page markup, returning the addressable path.
    pub async fn save_markup(&self, html: &str, prefix: &str) -> Result<String, std::io::Error> {
        let path = self.root.join(format!("{prefix}_{}.html", timestamp()));
        tokio::fs::write(&path, html).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}
