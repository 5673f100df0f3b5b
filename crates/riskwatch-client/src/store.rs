//! Session persistence
//!
//! The client never touches the filesystem itself; callers supply a
//! [`SessionStore`] that keeps the most recent credential.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use riskwatch_types::Credential;

use crate::Result;

/// Storage for the most recent credential
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored credential, if any
    async fn load(&self) -> Result<Option<Credential>>;

    /// Replace the stored credential
    async fn save(&self, credential: &Credential) -> Result<()>;
}

/// In-memory store for tests and short-lived processes
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `credential`
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(credential))),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Credential>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        *self.inner.write().await = Some(credential.clone());
        Ok(())
    }
}
