//! One [`IndexService`] per workspace path.
//!
//! The registry is an explicit object owned by the composition root and
//! passed around by handle; there is no process-wide instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{IndexConfig, IndexSettings};
use crate::errors::Result;
use crate::service::IndexService;

pub struct IndexRegistry {
    config: IndexConfig,
    settings: IndexSettings,
    services: Mutex<HashMap<PathBuf, Arc<IndexService>>>,
}

impl IndexRegistry {
    /// New services start from `config` and share `settings`.
    pub fn new(config: IndexConfig, settings: IndexSettings) -> Self {
        Self {
            config,
            settings,
            services: Mutex::new(HashMap::new()),
        }
    }

    /// Existing service for `workspace`, or a new initialized one.
    pub async fn get_or_create(&self, workspace: impl AsRef<Path>) -> Result<Arc<IndexService>> {
        let key = workspace_key(workspace.as_ref());
        let mut services = self.services.lock().await;
        if let Some(svc) = services.get(&key) {
            return Ok(Arc::clone(svc));
        }
        let svc = self.build(&key).await?;
        services.insert(key, Arc::clone(&svc));
        Ok(svc)
    }

    /// New initialized service; an existing one for the same path is
    /// destroyed and replaced.
    pub async fn create(&self, workspace: impl AsRef<Path>) -> Result<Arc<IndexService>> {
        let key = workspace_key(workspace.as_ref());
        let mut services = self.services.lock().await;
        if let Some(old) = services.remove(&key) {
            debug!(target: "index_service::registry", workspace = %key.display(), "replacing service");
            old.destroy().await;
        }
        let svc = self.build(&key).await?;
        services.insert(key, Arc::clone(&svc));
        Ok(svc)
    }

    pub async fn get(&self, workspace: impl AsRef<Path>) -> Option<Arc<IndexService>> {
        let key = workspace_key(workspace.as_ref());
        self.services.lock().await.get(&key).cloned()
    }

    /// Destroys and forgets the service. Returns whether one existed.
    pub async fn destroy(&self, workspace: impl AsRef<Path>) -> bool {
        let key = workspace_key(workspace.as_ref());
        let removed = self.services.lock().await.remove(&key);
        match removed {
            Some(svc) => {
                svc.destroy().await;
                true
            }
            None => false,
        }
    }

    pub async fn destroy_all(&self) {
        let drained: Vec<Arc<IndexService>> =
            self.services.lock().await.drain().map(|(_, s)| s).collect();
        for svc in &drained {
            svc.destroy().await;
        }
        info!(target: "index_service::registry", count = drained.len(), "all services destroyed");
    }

    pub async fn workspaces(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.services.lock().await.keys().cloned().collect();
        out.sort();
        out
    }

    async fn build(&self, workspace: &Path) -> Result<Arc<IndexService>> {
        let svc = Arc::new(IndexService::new(
            workspace,
            self.config.clone(),
            self.settings.clone(),
        ));
        svc.initialize().await?;
        info!(target: "index_service::registry", workspace = %workspace.display(), "service created");
        Ok(svc)
    }
}

/// Canonical path when it resolves, the input otherwise.
fn workspace_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
