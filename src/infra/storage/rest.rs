//! Object storage bucket reached over its REST upload API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url, header};
use tracing::debug;
use url::form_urlencoded;

use crate::{
    application::repos::{ImageStorage, StorageError, StoredImage},
    infra::error::InfraError,
};

const SOURCE: &str = "solar_leveling::infra::storage::rest";

#[derive(Debug, Clone)]
pub struct RestImageStorage {
    client: Client,
    bucket_url: Url,
    token: Option<String>,
}

impl RestImageStorage {
    /// `bucket_url` must end with `/`, e.g. `https://host/v0/b/{bucket}/`.
    pub fn new(bucket_url: Url, token: Option<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("solar-leveling/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            bucket_url,
            token,
        })
    }

    fn upload_url(&self, key: &str) -> Result<Url, StorageError> {
        let mut url = self
            .bucket_url
            .join("o")
            .map_err(|_| StorageError::InvalidKey(key.to_string()))?;
        url.query_pairs_mut().append_pair("name", key);
        Ok(url)
    }

    /// Public download URL: the whole key, slashes included, is one encoded path segment.
    fn download_url(&self, key: &str) -> Result<Url, StorageError> {
        let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        let mut url = self
            .bucket_url
            .join(&format!("o/{encoded}"))
            .map_err(|_| StorageError::InvalidKey(key.to_string()))?;
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ImageStorage for RestImageStorage {
    async fn store(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<StoredImage, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }
        let size = bytes.len();
        let mut request = self
            .client
            .post(self.upload_url(key)?)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status(status.as_u16()));
        }

        debug!(target: SOURCE, key = key, size_bytes = size, "object uploaded");
        Ok(StoredImage {
            key: key.to_string(),
            url: self.download_url(key)?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> RestImageStorage {
        RestImageStorage::new(
            Url::parse("https://storage.example.test/v0/b/solar.appspot.com/").expect("url"),
            None,
            Duration::from_secs(1),
        )
        .expect("client")
    }

    #[test]
    fn upload_and_download_urls_encode_the_key() {
        let storage = storage();
        assert_eq!(
            storage
                .upload_url("blog-images/1-panel.png")
                .expect("url")
                .as_str(),
            "https://storage.example.test/v0/b/solar.appspot.com/o?name=blog-images%2F1-panel.png"
        );
        assert_eq!(
            storage
                .download_url("blog-images/1-panel.png")
                .expect("url")
                .as_str(),
            "https://storage.example.test/v0/b/solar.appspot.com/o/blog-images%2F1-panel.png?alt=media"
        );
    }
}
