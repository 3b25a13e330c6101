//! Object store backends for uploaded profile photos

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

use super::traits::ObjectStore;
use crate::error::{AuthGatewayError, Result};

/// Unique object name for an upload, keeping the original file extension
pub fn unique_blob_name(file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}{}", uuid::Uuid::new_v4(), extension)
}

/// Writes objects under a local directory and serves them from a base URL
pub struct LocalObjectStore {
    root: PathBuf,
    container: String,
    public_base: Url,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, container: &str, public_base_url: &str) -> Result<Self> {
        // A base without a trailing slash would have its last segment replaced on join
        let normalized = if public_base_url.ends_with('/') {
            public_base_url.to_string()
        } else {
            format!("{}/", public_base_url)
        };
        let public_base = Url::parse(&normalized).map_err(|e| {
            AuthGatewayError::ConfigError(format!(
                "Invalid object store public URL '{}': {}",
                public_base_url, e
            ))
        })?;

        if container.is_empty() || container.contains('/') || container.contains("..") {
            return Err(AuthGatewayError::ConfigError(format!(
                "Invalid object store container name '{}'",
                container
            )));
        }

        Ok(Self {
            root: root.into(),
            container: container.to_string(),
            public_base,
        })
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root.join(&self.container).join(name)
    }
}

fn validate_object_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AuthGatewayError::StorageError(format!(
            "Invalid object name '{}'",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, data: Vec<u8>, name: &str) -> Result<String> {
        validate_object_name(name)?;

        let directory = self.root.join(&self.container);
        tokio::fs::create_dir_all(&directory).await?;
        tokio::fs::write(self.object_path(name), &data).await?;

        let url = self
            .public_base
            .join(&format!("{}/{}", self.container, name))
            .map_err(|e| AuthGatewayError::StorageError(format!("Failed to build object URL: {}", e)))?;

        log::debug!("Stored {} bytes as {}", data.len(), url);
        Ok(url.to_string())
    }
}

/// Keeps objects in memory, for tests and local runs
pub struct MemoryObjectStore {
    container: String,
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(name).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, data: Vec<u8>, name: &str) -> Result<String> {
        validate_object_name(name)?;
        self.objects.write().await.insert(name.to_string(), data);
        Ok(format!("memory://{}/{}", self.container, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_names_keep_lowercased_extension() {
        let name = unique_blob_name(Some("Holiday.JPG"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);

        let bare = unique_blob_name(Some("README"));
        assert_eq!(bare.len(), 36);
        assert_ne!(unique_blob_name(None), unique_blob_name(None));
    }

    #[tokio::test]
    async fn memory_store_keeps_bytes() {
        let store = MemoryObjectStore::new("profilepictures");
        let url = store.upload(vec![1, 2, 3], "a.png").await.unwrap();
        assert_eq!(url, "memory://profilepictures/a.png");
        assert_eq!(store.get("a.png").await, Some(vec![1, 2, 3]));
        assert_eq!(store.object_count().await, 1);
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let store = MemoryObjectStore::new("profilepictures");
        assert!(store.upload(vec![], "../etc/passwd").await.is_err());
        assert!(store.upload(vec![], "").await.is_err());
    }

    #[tokio::test]
    async fn local_store_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            LocalObjectStore::new(dir.path(), "profilepictures", "https://cdn.example.com/media")
                .unwrap();

        let url = store.upload(b"png-bytes".to_vec(), "p.png").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/media/profilepictures/p.png");

        let written = tokio::fs::read(dir.path().join("profilepictures").join("p.png"))
            .await
            .unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[test]
    fn local_store_rejects_bad_configuration() {
        assert!(LocalObjectStore::new("/tmp", "pics", "not a url").is_err());
        assert!(LocalObjectStore::new("/tmp", "../pics", "http://localhost/").is_err());
    }
}
