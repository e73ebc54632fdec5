use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::storage::{TokenRecord, TokenStore};

/// Plaintext [`TokenStore`]: one `<username>.token` file per user in a directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    /// Store under the platform cache directory (created if missing).
    pub fn default_location() -> Result<Self> {
        let proj = ProjectDirs::from("org", "mangadex", "mangadex-client")
            .ok_or_else(|| Error::Config("unable to determine cache directory for the token store".into()))?;
        let dir = proj.cache_dir().join("tokens");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, username: &str) -> PathBuf {
        // Usernames are restricted server-side, but keep path separators out anyway.
        let safe: String = username
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.token"))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, username: &str) -> Result<Option<TokenRecord>> {
        match tokio::fs::read_to_string(self.path_for(username)).await {
            Ok(text) => Ok(Some(text.parse()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, username: &str, record: &TokenRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(username), record.to_string()).await?;
        Ok(())
    }

    async fn remove(&self, username: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(username)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
