//! Filesystem-backed image storage served back under `/uploads`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use crate::application::repos::{ImageStorage, StorageError, StoredImage};

/// URL prefix the public router serves stored files under.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug)]
pub struct LocalImageStorage {
    root: PathBuf,
}

impl LocalImageStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Read a stored object back into memory.
    pub async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let absolute = self.resolve(key)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(
        &self,
        key: &str,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<StoredImage, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&bytes).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        Ok(StoredImage {
            key: key.to_string(),
            url: format!("{PUBLIC_PREFIX}/{key}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stored_images_round_trip_through_the_public_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalImageStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store(
                "blog-images/1-panel.png",
                "image/png",
                Bytes::from_static(b"png-bytes"),
            )
            .await
            .expect("store");

        assert_eq!(stored.url, "/uploads/blog-images/1-panel.png");
        assert!(dir.path().join("blog-images/1-panel.png").exists());
        assert_eq!(
            storage.read(&stored.key).await.expect("read"),
            Bytes::from_static(b"png-bytes")
        );
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalImageStorage::new(dir.path().to_path_buf()).expect("storage");

        for key in ["../escape.png", "/etc/passwd", ""] {
            assert!(matches!(
                storage.read(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalImageStorage::new(dir.path().to_path_buf()).expect("storage");
        assert!(matches!(
            storage.store("blog-images/x.png", "image/png", Bytes::new()).await,
            Err(StorageError::EmptyPayload)
        ));
    }
}
