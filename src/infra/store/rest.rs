use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    application::repos::{DocumentStore, StoreError},
    infra::error::InfraError,
};

use super::{METRIC_STORE_REQUEST_MS, METRIC_STORE_REQUESTS_TOTAL, segments};

const SOURCE: &str = "solar_leveling::infra::store::rest";

/// Client for a realtime-database style REST tree: every node is addressable as
/// `{base}/{path}.json`, POST appends with a generated key, PATCH merges fields.
#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: Client,
    base_url: Url,
    auth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl RestDocumentStore {
    pub fn new(base_url: Url, auth: Option<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("solar-leveling/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        let relative = segments(path).collect::<Vec<_>>().join("/");
        if relative.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let mut url = self
            .base_url
            .join(&format!("{relative}.json"))
            .map_err(|_| StoreError::InvalidPath(path.to_string()))?;
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, StoreError> {
        let url = self.url(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let result = exchange(request).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(StoreError::Status(_)) => "status",
            Err(StoreError::Timeout) => "timeout",
            Err(_) => "error",
        };
        counter!(
            METRIC_STORE_REQUESTS_TOTAL,
            "method" => method.as_str().to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(METRIC_STORE_REQUEST_MS, "method" => method.as_str().to_string())
            .record(elapsed_ms);
        debug!(
            target: SOURCE,
            method = %method,
            path = path,
            outcome = outcome,
            elapsed_ms = elapsed_ms as u64,
            "store round trip"
        );

        result
    }
}

async fn exchange(request: reqwest::RequestBuilder) -> Result<Option<Value>, StoreError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(StoreError::Status(status.as_u16()));
    }
    let bytes = response.bytes().await.map_err(transport_error)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(&bytes).map_err(StoreError::decode)?;
    Ok((!value.is_null()).then_some(value))
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(err.to_string())
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        if segments(path).next().is_none() {
            return Ok(None);
        }
        self.send(Method::GET, path, None).await
    }

    async fn push(&self, path: &str, document: Value) -> Result<String, StoreError> {
        let body = self
            .send(Method::POST, path, Some(&document))
            .await?
            .ok_or_else(|| StoreError::Decode("push response was empty".to_string()))?;
        let response: PushResponse = serde_json::from_value(body).map_err(StoreError::decode)?;
        Ok(response.name)
    }

    async fn patch(&self, path: &str, document: Value) -> Result<(), StoreError> {
        self.send(Method::PATCH, path, Some(&document)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(auth: Option<&str>) -> RestDocumentStore {
        RestDocumentStore::new(
            Url::parse("https://db.example.test/root/").expect("url"),
            auth.map(str::to_string),
            Duration::from_secs(1),
        )
        .expect("client")
    }

    #[test]
    fn urls_append_json_suffix_and_auth() {
        let url = store(Some("tok&en")).url("blog-posts/-Nabc").expect("url");
        assert_eq!(
            url.as_str(),
            "https://db.example.test/root/blog-posts/-Nabc.json?auth=tok%26en"
        );
        let url = store(None).url("/blog-posts/").expect("url");
        assert_eq!(url.as_str(), "https://db.example.test/root/blog-posts.json");
    }

    #[test]
    fn empty_path_cannot_be_addressed() {
        assert!(matches!(
            store(None).url("//"),
            Err(StoreError::InvalidPath(_))
        ));
    }
}
