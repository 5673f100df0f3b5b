//! JSON file session store
//!
//! Keeps the most recent credential in one file. Field names match what
//! earlier tooling wrote (`username`, `password`, `jwtToken`, `loginUrl`),
//! so existing account files keep loading.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use riskwatch_client::{ClientError, SessionStore};
use riskwatch_types::Credential;

/// Credential file under the user's config directory
pub fn default_store_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("riskwatch").join("account.json"))
}

/// [`SessionStore`] backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store at `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Credential>, ClientError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Store(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let credential = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::Store(format!("corrupt account file {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "credential loaded");
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ClientError::Store(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_vec_pretty(credential)?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            ClientError::Store(format!("failed to write {}: {e}", self.path.display()))
        })?;
        restrict_to_owner(&self.path).await?;
        debug!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

// The file holds the password and bearer token.
#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<(), ClientError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| ClientError::Store(format!("failed to restrict {}: {e}", path.display())))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<(), ClientError> {
    Ok(())
}
