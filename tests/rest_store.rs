use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use solar_leveling::{
    application::{
        posts::{PostError, PostLookup, PostRepository},
        repos::StoreError,
    },
    domain::posts::{PostFields, PostPatch},
    infra::store::RestDocumentStore,
};
use url::Url;

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct FakeStore {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeStore {
    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().expect("calls lock").clone()
    }
}

async fn handle(State(fake): State<FakeStore>, method: Method, uri: Uri, body: Bytes) -> Response {
    let body_json = serde_json::from_slice::<Value>(&body).ok();
    fake.calls.lock().expect("calls lock").push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: body_json.clone(),
    });

    let json = |value: Value| {
        (
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            value.to_string(),
        )
            .into_response()
    };

    match (method.as_str(), uri.path()) {
        ("GET", "/db/blog-posts.json") => json(json!({
            "-Nold": { "title": "Old", "content": "<p>a</p>", "createdAt": "2024-01-01T00:00:00Z" },
            "-Nnew": {
                "title": "New",
                "content": "<p>b</p>",
                "imageUrl": "https://img.example/b.png",
                "createdAt": "2024-02-01T00:00:00Z"
            },
            "-Nbad": { "content": "no title or timestamp" }
        })),
        ("GET", "/db/blog-posts/-Nnew.json") => json(json!({
            "title": "New",
            "content": "<p>b</p>",
            "createdAt": "2024-02-01T00:00:00Z"
        })),
        ("GET", "/db/blog-posts/-Nbroken.json") => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        ("GET", _) => json(Value::Null),
        ("POST", "/db/blog-posts.json") => json(json!({ "name": "-Ncreated" })),
        ("PATCH", _) => json(body_json.unwrap_or(Value::Null)),
        ("DELETE", "/db/blog-posts/-Nlocked.json") => StatusCode::UNAUTHORIZED.into_response(),
        ("DELETE", _) => json(Value::Null),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn spawn_fake() -> (FakeStore, SocketAddr) {
    let fake = FakeStore::default();
    let app = Router::new().fallback(handle).with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake store");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (fake, addr)
}

fn repository(addr: SocketAddr, auth: Option<&str>) -> PostRepository {
    let base = Url::parse(&format!("http://{addr}/db/")).expect("base url");
    let store = RestDocumentStore::new(base, auth.map(str::to_string), Duration::from_secs(5))
        .expect("client");
    PostRepository::new(Arc::new(store))
}

#[tokio::test]
async fn list_reads_the_collection_and_skips_malformed_entries() {
    let (fake, addr) = spawn_fake().await;
    let repo = repository(addr, Some("secret"));

    let posts = repo.list_posts().await.expect("list");

    let titles: Vec<&str> = posts.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, ["New", "Old"]);
    assert_eq!(posts[0].image_url.as_deref(), Some("https://img.example/b.png"));

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].path, "/db/blog-posts.json");
    assert_eq!(calls[0].query.as_deref(), Some("auth=secret"));
}

#[tokio::test]
async fn get_maps_null_to_not_found_and_statuses_to_fetch_errors() {
    let (_, addr) = spawn_fake().await;
    let repo = repository(addr, None);

    let PostLookup::Found(post) = repo.get_post("-Nnew").await.expect("get") else {
        panic!("-Nnew should exist");
    };
    assert_eq!(post.title, "New");

    assert_eq!(
        repo.get_post("-Nmissing").await.expect("get"),
        PostLookup::NotFound
    );

    let err = repo.get_post("-Nbroken").await.expect_err("503");
    assert!(matches!(err, PostError::Fetch(StoreError::Status(503))));
}

#[tokio::test]
async fn create_posts_the_document_and_returns_the_generated_name() {
    let (fake, addr) = spawn_fake().await;
    let repo = repository(addr, None);

    let id = repo
        .create_post(PostFields {
            title: "Fresh".into(),
            content: "<p>hi</p>".into(),
            image_url: None,
        })
        .await
        .expect("create");
    assert_eq!(id.as_str(), "-Ncreated");

    let calls = fake.calls();
    let call = &calls[0];
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.path, "/db/blog-posts.json");
    assert_eq!(call.query, None);
    let body = call.body.as_ref().expect("json body");
    assert_eq!(body["title"], "Fresh");
    assert_eq!(body["content"], "<p>hi</p>");
    assert!(body["createdAt"].is_string());
    assert!(body.get("imageUrl").is_none());
    assert!(body.get("updatedAt").is_none());
}

#[tokio::test]
async fn update_patches_only_supplied_fields() {
    let (fake, addr) = spawn_fake().await;
    let repo = repository(addr, Some("tok"));

    repo.update_post(
        "-Nnew",
        PostPatch {
            title: Some("Renamed".into()),
            ..PostPatch::default()
        },
    )
    .await
    .expect("update");

    let calls = fake.calls();
    let call = &calls[0];
    assert_eq!(call.method, Method::PATCH);
    assert_eq!(call.path, "/db/blog-posts/-Nnew.json");
    assert_eq!(call.query.as_deref(), Some("auth=tok"));
    let body = call.body.as_ref().and_then(Value::as_object).expect("object");
    let mut keys: Vec<&str> = body.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["title", "updatedAt"]);
}

#[tokio::test]
async fn delete_issues_delete_and_maps_rejections() {
    let (fake, addr) = spawn_fake().await;
    let repo = repository(addr, None);

    repo.delete_post("-Nnew").await.expect("delete");
    let err = repo.delete_post("-Nlocked").await.expect_err("401");
    assert!(matches!(err, PostError::Delete(StoreError::Status(401))));

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.method == Method::DELETE));
    assert_eq!(calls[0].path, "/db/blog-posts/-Nnew.json");
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = repository(addr, None)
        .list_posts()
        .await
        .expect_err("connection refused");
    assert!(matches!(err, PostError::Fetch(StoreError::Transport(_))));
}
