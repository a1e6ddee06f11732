//! The session store is injected wherever the login flags are needed instead
//! of being read as ambient global state. The file-backed implementation is
//! the moral equivalent of the browser's local storage: two flags that
//! survive a restart and vanish on logout.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use shared::protocol::Session;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Session>;
    async fn store(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Session>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Session> {
        Ok(self.inner.read().await.clone())
    }

    async fn store(&self, session: &Session) -> Result<()> {
        *self.inner.write().await = session.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = Session::default();
        Ok(())
    }
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create session directory '{}'",
                    parent.display()
                )
            })?;
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file '{}'", self.path.display()))?;
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("malformed session file '{}'", self.path.display()))?;
        Ok(session)
    }

    async fn store(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string_pretty(session).context("failed to encode session")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write session file '{}'", self.path.display()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("failed to remove session file '{}'", self.path.display())
            })?;
        }
        Ok(())
    }
}
