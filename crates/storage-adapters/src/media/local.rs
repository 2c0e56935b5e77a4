//! # Local filesystem media storage
//!
//! Files are sharded by the SHA-256 of their content: `ab/cd/<hash>-<id>.<ext>`.
//! The trailing id keeps identical uploads from sharing one file, so deleting
//! one problem's image never removes another's.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use domains::models::{ImageAsset, Upload};
use domains::ports::MediaStorage;
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use super::extension_for;

pub struct LocalMediaStorage {
    /// Root directory for all uploads, e.g. `./data/uploads`.
    root: PathBuf,
    /// Public URL prefix `root` is served under, e.g. `/uploads`.
    url_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sharded_id(&self, bytes: &[u8]) -> String {
        let hash = hex::encode(Sha256::digest(bytes));
        format!(
            "{}/{}/{}-{}.{}",
            &hash[0..2],
            &hash[2..4],
            hash,
            Uuid::now_v7().simple(),
            extension_for(bytes)
        )
    }

    /// Resolves a public id under `root`, refusing anything that could escape it.
    fn resolve(&self, public_id: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(public_id);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            bail!("refusing media id outside the upload root: {public_id}");
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn upload(&self, upload: Upload) -> anyhow::Result<ImageAsset> {
        let public_id = self.sharded_id(&upload.bytes);
        let target = self.resolve(&public_id)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&target, &upload.bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;

        tracing::debug!(public_id = %public_id, size = upload.bytes.len(), "stored upload");

        Ok(ImageAsset {
            url: format!("{}/{}", self.url_prefix, public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        let target = self.resolve(public_id)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(public_id, "media already gone");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("removing {}", target.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

    fn storage() -> LocalMediaStorage {
        let root = std::env::temp_dir().join(format!("civic-media-{}", Uuid::now_v7()));
        LocalMediaStorage::new(root, "/uploads/")
    }

    fn png() -> Upload {
        Upload {
            bytes: Bytes::from_static(PNG),
            content_type: Some(mime::IMAGE_PNG),
            file_name: Some("pothole.png".into()),
        }
    }

    #[tokio::test]
    async fn upload_writes_a_sharded_file_and_delete_removes_it() {
        let storage = storage();
        let asset = storage.upload(png()).await.unwrap();

        let hash = hex::encode(Sha256::digest(PNG));
        assert!(asset.public_id.starts_with(&format!("{}/{}/{}", &hash[0..2], &hash[2..4], hash)));
        assert!(asset.public_id.ends_with(".png"));
        assert_eq!(asset.url, format!("/uploads/{}", asset.public_id));

        let path = storage.root().join(&asset.public_id);
        assert_eq!(fs::read(&path).await.unwrap(), PNG);

        storage.delete(&asset.public_id).await.unwrap();
        assert!(!path.exists());

        // Second delete is a no-op.
        storage.delete(&asset.public_id).await.unwrap();
        let _ = fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn identical_uploads_get_distinct_ids() {
        let storage = storage();
        let a = storage.upload(png()).await.unwrap();
        let b = storage.upload(png()).await.unwrap();
        assert_ne!(a.public_id, b.public_id);

        storage.delete(&a.public_id).await.unwrap();
        assert!(storage.root().join(&b.public_id).exists());
        let _ = fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn traversal_ids_are_rejected() {
        let storage = storage();
        assert!(storage.delete("../etc/passwd").await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }
}
