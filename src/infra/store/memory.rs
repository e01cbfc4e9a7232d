use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{DocumentStore, StoreError};

use super::segments;

/// In-process document tree with the same merge and push semantics as the REST store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    root: RwLock<Map<String, Value>>,
    sequence: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value at `path`. Intended for fixtures.
    pub async fn seed(&self, path: &str, value: Value) {
        let mut root = self.root.write().await;
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            if let Value::Object(map) = value {
                *root = map;
            }
            return;
        };
        if let Some(parent) = descend_mut(&mut root, parents) {
            parent.insert((*last).to_string(), value);
        }
    }

    /// Keys sort in creation order, like the hosted store's push ids.
    fn next_key(&self) -> String {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("-{millis:013x}{sequence:07x}")
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.read().await;
        let mut parts = segments(path).peekable();
        if parts.peek().is_none() {
            return Ok(None);
        }

        let mut current: Option<&Value> = None;
        for part in parts {
            let next = match current {
                None => root.get(part),
                Some(Value::Object(map)) => map.get(part),
                Some(_) => None,
            };
            match next {
                Some(value) => current = Some(value),
                None => return Ok(None),
            }
        }
        Ok(current.cloned())
    }

    async fn push(&self, path: &str, document: Value) -> Result<String, StoreError> {
        let parts: Vec<&str> = segments(path).collect();
        if parts.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let key = self.next_key();
        let mut root = self.root.write().await;
        descend_mut(&mut root, &parts)
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?
            .insert(key.clone(), document);
        Ok(key)
    }

    async fn patch(&self, path: &str, document: Value) -> Result<(), StoreError> {
        let parts: Vec<&str> = segments(path).collect();
        if parts.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let Value::Object(fields) = document else {
            return Err(StoreError::Decode("patch body must be an object".to_string()));
        };

        let mut root = self.root.write().await;
        let target = descend_mut(&mut root, &parts)
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        for (key, value) in fields {
            if value.is_null() {
                target.remove(&key);
            } else {
                target.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };

        let mut root = self.root.write().await;
        let mut map = &mut *root;
        for part in parents {
            match map.get_mut(*part) {
                Some(Value::Object(inner)) => map = inner,
                _ => return Ok(()),
            }
        }
        map.remove(*last);
        Ok(())
    }
}

/// Walk to the object at `parts`, replacing missing or non-object nodes with empty objects.
fn descend_mut<'a>(
    root: &'a mut Map<String, Value>,
    parts: &[&str],
) -> Option<&'a mut Map<String, Value>> {
    let mut map = root;
    for part in parts {
        let slot = map
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        map = slot.as_object_mut()?;
    }
    Some(map)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn push_assigns_ordered_keys() {
        let store = MemoryDocumentStore::new();
        let first = store.push("items", json!({"n": 1})).await.expect("push");
        let second = store.push("items", json!({"n": 2})).await.expect("push");
        assert!(first < second);

        let items = store.get("items").await.expect("get").expect("present");
        assert_eq!(items[&first], json!({"n": 1}));
        assert_eq!(items[&second], json!({"n": 2}));
    }

    #[tokio::test]
    async fn patch_merges_top_level_fields_and_nulls_remove() {
        let store = MemoryDocumentStore::new();
        store
            .seed("items/a", json!({"title": "A", "content": "c", "imageUrl": "x"}))
            .await;
        store
            .patch("items/a", json!({"title": "B", "imageUrl": null}))
            .await
            .expect("patch");

        assert_eq!(
            store.get("items/a").await.expect("get"),
            Some(json!({"title": "B", "content": "c"}))
        );
    }

    #[tokio::test]
    async fn patch_on_missing_path_creates_partial_document() {
        let store = MemoryDocumentStore::new();
        store
            .patch("items/ghost", json!({"title": "Only"}))
            .await
            .expect("patch");
        assert_eq!(
            store.get("items/ghost").await.expect("get"),
            Some(json!({"title": "Only"}))
        );
    }

    #[tokio::test]
    async fn missing_paths_read_as_none() {
        let store = MemoryDocumentStore::new();
        assert_eq!(store.get("").await.expect("get"), None);
        assert_eq!(store.get("items/nope").await.expect("get"), None);
        store.seed("leaf", json!(3)).await;
        assert_eq!(store.get("leaf/deeper").await.expect("get"), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryDocumentStore::new();
        store.seed("items/a", json!({"title": "A"})).await;
        store.delete("items/a").await.expect("delete");
        store.delete("items/a").await.expect("delete again");
        store.delete("nothing/here").await.expect("delete missing parent");
        assert_eq!(store.get("items/a").await.expect("get"), None);
    }
}
