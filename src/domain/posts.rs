//! Blog post entity, its store document shape, and the image source sum type.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// Store collection holding every post document, keyed by post id.
pub const COLLECTION: &str = "blog-posts";

const FORBIDDEN_ID_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Store-assigned post identity.
///
/// Ids become path segments of store URLs, so characters the store treats as path
/// or query syntax are rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed
                .chars()
                .any(|ch| ch.is_control() || FORBIDDEN_ID_CHARS.contains(&ch))
        {
            return Err(DomainError::invalid_id(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPost {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

/// A post as stored in the document tree: every field except the id, which is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl PostDocument {
    pub fn into_post(self, id: PostId) -> BlogPost {
        BlogPost {
            id,
            title: self.title,
            content: self.content,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Author-supplied fields for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl PostFields {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left untouched by the store merge.
///
/// `image_url: Some("")` clears the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PostPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        Ok(())
    }
}

/// Order posts newest first. The sort is stable, so equal timestamps keep store order.
pub fn sort_newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Binary image payload received from the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Where a post's image comes from. Exactly one source can be chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageSource {
    Uploaded(UploadedImage),
    LinkedUrl(String),
    #[default]
    None,
}

impl ImageSource {
    /// Combine the two form inputs. Choosing a file clears the URL, so an upload wins.
    pub fn from_parts(upload: Option<UploadedImage>, url: Option<&str>) -> Self {
        if let Some(upload) = upload.filter(|upload| !upload.bytes.is_empty()) {
            return Self::Uploaded(upload);
        }
        match url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => Self::LinkedUrl(url.to_string()),
            None => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|url| !url.trim().is_empty()))
}
