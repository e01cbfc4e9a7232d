//! Post repository adapter: the only component that talks to the document store.

use std::{sync::Arc, time::Instant};

use serde_json::Value;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use crate::domain::{
    error::DomainError,
    posts::{BlogPost, COLLECTION, PostDocument, PostFields, PostId, PostPatch, sort_newest_first},
};

use super::repos::{DocumentStore, StoreError};

const SOURCE: &str = "solar_leveling::application::posts";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("failed to fetch posts")]
    Fetch(#[source] StoreError),
    #[error("failed to create post")]
    Create(#[source] StoreError),
    #[error("failed to update post")]
    Update(#[source] StoreError),
    #[error("failed to delete post")]
    Delete(#[source] StoreError),
    #[error(transparent)]
    Validation(#[from] DomainError),
}

/// Result of a single-post read. A missing post is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostLookup {
    Found(BlogPost),
    NotFound,
}

impl PostLookup {
    pub fn into_option(self) -> Option<BlogPost> {
        match self {
            Self::Found(post) => Some(post),
            Self::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct PostRepository {
    store: Arc<dyn DocumentStore>,
}

impl PostRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Every post, newest first. An empty or missing collection yields an empty list.
    pub async fn list_posts(&self) -> Result<Vec<BlogPost>, PostError> {
        let started = Instant::now();
        let collection = self.store.get(COLLECTION).await.map_err(|err| {
            warn!(target: SOURCE, error = %err, "listing posts failed");
            PostError::Fetch(err)
        })?;

        let entries = match collection {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(entries)) => entries,
            Some(other) => {
                let err = StoreError::Decode(format!(
                    "expected an object keyed by post id, found {}",
                    json_kind(&other)
                ));
                warn!(target: SOURCE, error = %err, "listing posts failed");
                return Err(PostError::Fetch(err));
            }
        };

        let mut posts = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let id = match PostId::parse(&key) {
                Ok(id) => id,
                Err(err) => {
                    warn!(target: SOURCE, key = %key, error = %err, "skipping entry with unusable key");
                    continue;
                }
            };
            match serde_json::from_value::<PostDocument>(value) {
                Ok(document) => posts.push(document.into_post(id)),
                Err(err) => {
                    warn!(target: SOURCE, post_id = %id, error = %err, "skipping malformed post");
                }
            }
        }
        sort_newest_first(&mut posts);

        debug!(
            target: SOURCE,
            count = posts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "listed posts"
        );
        Ok(posts)
    }

    pub async fn get_post(&self, raw_id: &str) -> Result<PostLookup, PostError> {
        let Ok(id) = PostId::parse(raw_id) else {
            return Ok(PostLookup::NotFound);
        };
        let started = Instant::now();

        let document = self
            .store
            .get(&document_path(&id))
            .await
            .map_err(|err| {
                warn!(target: SOURCE, post_id = %id, error = %err, "fetching post failed");
                PostError::Fetch(err)
            })?;

        let lookup = match document {
            None | Some(Value::Null) => PostLookup::NotFound,
            Some(value) => {
                let document: PostDocument = serde_json::from_value(value)
                    .map_err(|err| PostError::Fetch(StoreError::decode(err)))?;
                PostLookup::Found(document.into_post(id.clone()))
            }
        };

        debug!(
            target: SOURCE,
            post_id = %id,
            found = matches!(lookup, PostLookup::Found(_)),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched post"
        );
        Ok(lookup)
    }

    /// Stamp `createdAt`, store the document and return the id the store assigned.
    pub async fn create_post(&self, fields: PostFields) -> Result<PostId, PostError> {
        fields.validate()?;
        let started = Instant::now();

        let document = PostDocument {
            title: fields.title,
            content: fields.content,
            image_url: fields.image_url.filter(|url| !url.trim().is_empty()),
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        let body = serde_json::to_value(&document)
            .map_err(|err| PostError::Create(StoreError::decode(err)))?;

        let key = self.store.push(COLLECTION, body).await.map_err(|err| {
            warn!(target: SOURCE, error = %err, "creating post failed");
            PostError::Create(err)
        })?;
        let id = PostId::parse(&key)
            .map_err(|_| PostError::Create(StoreError::InvalidPath(key.clone())))?;

        debug!(
            target: SOURCE,
            post_id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "created post"
        );
        Ok(id)
    }

    /// Merge the supplied fields and stamp `updatedAt`.
    ///
    /// The store merge does not read first, so patching a missing id creates a partial document.
    pub async fn update_post(&self, raw_id: &str, patch: PostPatch) -> Result<(), PostError> {
        let id = PostId::parse(raw_id)?;
        patch.validate()?;
        let started = Instant::now();

        let mut body = serde_json::to_value(&patch)
            .map_err(|err| PostError::Update(StoreError::decode(err)))?;
        let updated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| PostError::Update(StoreError::decode(err)))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("updatedAt".to_string(), Value::String(updated_at));
        }

        self.store
            .patch(&document_path(&id), body)
            .await
            .map_err(|err| {
                warn!(target: SOURCE, post_id = %id, error = %err, "updating post failed");
                PostError::Update(err)
            })?;

        debug!(
            target: SOURCE,
            post_id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "updated post"
        );
        Ok(())
    }

    /// Remove a post. Deleting an id that does not exist succeeds.
    pub async fn delete_post(&self, raw_id: &str) -> Result<(), PostError> {
        let id = PostId::parse(raw_id)?;
        let started = Instant::now();

        self.store
            .delete(&document_path(&id))
            .await
            .map_err(|err| {
                warn!(target: SOURCE, post_id = %id, error = %err, "deleting post failed");
                PostError::Delete(err)
            })?;

        debug!(
            target: SOURCE,
            post_id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "deleted post"
        );
        Ok(())
    }
}

fn document_path(id: &PostId) -> String {
    format!("{COLLECTION}/{id}")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
