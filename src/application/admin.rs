//! Admin create/edit flows: resolve the image source, sanitize content, then hit the repository.

use std::{path::Path, sync::Arc};

use slug::slugify;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::domain::posts::{ImageSource, PostFields, PostId, PostPatch, UploadedImage};

use super::{
    posts::{PostError, PostRepository},
    repos::{ImageStorage, StorageError},
    sanitize::sanitize_post_html,
};

const SOURCE: &str = "solar_leveling::application::admin";

/// Folder every uploaded post image lives under.
pub const IMAGE_PREFIX: &str = "blog-images";

#[derive(Debug, Error)]
pub enum AdminPostError {
    #[error("image upload failed")]
    Upload(#[source] StorageError),
    #[error(transparent)]
    Post(#[from] PostError),
}

/// What the admin form submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image: ImageSource,
}

#[derive(Clone)]
pub struct AdminPostService {
    posts: PostRepository,
    images: Arc<dyn ImageStorage>,
}

impl AdminPostService {
    pub fn new(posts: PostRepository, images: Arc<dyn ImageStorage>) -> Self {
        Self { posts, images }
    }

    pub fn posts(&self) -> &PostRepository {
        &self.posts
    }

    /// Create a post. The upload completes before the document is written so the stored post
    /// never points at an object that does not exist yet.
    pub async fn create(&self, draft: PostDraft) -> Result<PostId, AdminPostError> {
        let mut fields = PostFields {
            title: draft.title.trim().to_string(),
            content: sanitize_post_html(&draft.content),
            image_url: None,
        };
        fields.validate().map_err(PostError::from)?;

        fields.image_url = self.resolve_image(draft.image).await?;
        let id = self.posts.create_post(fields).await?;
        info!(target: SOURCE, post_id = %id, "post created");
        Ok(id)
    }

    /// Replace the editable fields of `id`. An empty image source clears the image.
    pub async fn update(&self, id: &str, draft: PostDraft) -> Result<(), AdminPostError> {
        let id = PostId::parse(id).map_err(PostError::from)?;
        let mut patch = PostPatch {
            title: Some(draft.title.trim().to_string()),
            content: Some(sanitize_post_html(&draft.content)),
            image_url: None,
        };
        patch.validate().map_err(PostError::from)?;

        patch.image_url = Some(self.resolve_image(draft.image).await?.unwrap_or_default());
        self.posts.update_post(id.as_str(), patch).await?;
        info!(target: SOURCE, post_id = %id, "post updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AdminPostError> {
        self.posts.delete_post(id).await?;
        info!(target: SOURCE, post_id = %id, "post deleted");
        Ok(())
    }

    async fn resolve_image(&self, image: ImageSource) -> Result<Option<String>, AdminPostError> {
        match image {
            ImageSource::None => Ok(None),
            ImageSource::LinkedUrl(url) => Ok(Some(url)),
            ImageSource::Uploaded(upload) => self.upload(upload).await.map(Some),
        }
    }

    async fn upload(&self, upload: UploadedImage) -> Result<String, AdminPostError> {
        let key = image_key(&upload.filename, OffsetDateTime::now_utc());
        let stored = self
            .images
            .store(&key, &upload.content_type, upload.bytes)
            .await
            .map_err(AdminPostError::Upload)?;
        info!(target: SOURCE, key = %stored.key, "image uploaded");
        Ok(stored.url)
    }
}

/// `blog-images/{unix millis}-{slugged filename}`.
pub fn image_key(filename: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{IMAGE_PREFIX}/{millis}-{}", sanitize_filename(filename))
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
