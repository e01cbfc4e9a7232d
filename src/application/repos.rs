//! Traits describing the external collaborators: document store, image storage, mail relay.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store responded with status {0}")]
    Status(u16),
    #[error("store request timed out")]
    Timeout,
    #[error("store transport failed: {0}")]
    Transport(String),
    #[error("store returned an unreadable body: {0}")]
    Decode(String),
    #[error("`{0}` cannot be addressed in the store")]
    InvalidPath(String),
}

impl StoreError {
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A REST-style JSON document tree addressed by slash-separated paths such as
/// `blog-posts` or `blog-posts/{id}`.
///
/// An empty path yields `Ok(None)` rather than an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Append a document under `path` and return the key the store assigned.
    async fn push(&self, path: &str, document: Value) -> Result<String, StoreError>;

    /// Merge the top-level fields of `document` into the document at `path`,
    /// creating it when absent.
    async fn patch(&self, path: &str, document: Value) -> Result<(), StoreError>;

    /// Remove the document at `path`. Removing a missing document succeeds.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("object storage responded with status {0}")]
    Status(u16),
    #[error("object storage transport failed: {0}")]
    Transport(String),
}

/// Location of a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store `bytes` under `key` and return a publicly resolvable URL.
    async fn store(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<StoredImage, StorageError>;
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay credentials are not configured")]
    NotConfigured,
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
    #[error("mail relay transport failed: {0}")]
    Transport(String),
}

/// A notification ready for the relay. The recipient is fixed by the mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub text: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}
