use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Form, Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{error::HttpError, posts::PostLookup, repos::StorageError},
    domain::{posts::BlogPost, qualification::QualificationAnswers},
    presentation::views::{
        BlogListTemplate, BlogListView, BlogPostTemplate, BlogPostView, ErrorPageView,
        ErrorTemplate, HomeTemplate, HomeView, LayoutChrome, LayoutContext, PageMetaView,
        PostCard, QuizView, render_not_found_response, render_template_response,
    },
};

use super::HttpState;

pub(super) async fn home(State(state): State<HttpState>) -> Response {
    render_home(
        &state,
        QuizView {
            submitted: false,
            qualified: false,
        },
    )
}

pub(super) async fn qualify(
    State(state): State<HttpState>,
    Form(answers): Form<QualificationAnswers>,
) -> Response {
    render_home(
        &state,
        QuizView {
            submitted: true,
            qualified: answers.is_qualified(),
        },
    )
}

fn render_home(state: &HttpState, quiz: QuizView) -> Response {
    let view = LayoutContext::new(LayoutChrome::for_site(&state.site), HomeView::new(quiz));
    render_template_response(HomeTemplate { view }, StatusCode::OK)
}

pub(super) async fn blog_index(State(state): State<HttpState>) -> Response {
    let site = &state.site;
    let chrome = LayoutChrome::for_site(site)
        .with_meta(PageMetaView::website(
            format!("Blog | {}", site.name),
            "Read our latest articles about solar energy, renewable power, and sustainable living."
                .to_string(),
        ))
        .with_canonical(site, "/blogs");

    match state.posts.list_posts().await {
        Ok(posts) => {
            let cards = posts
                .iter()
                .map(|post| PostCard::from_post(post, site.preview_chars.get()))
                .collect();
            let view = LayoutContext::new(
                chrome,
                BlogListView {
                    posts: cards,
                    error: None,
                },
            );
            render_template_response(BlogListTemplate { view }, StatusCode::OK)
        }
        Err(err) => {
            let http = HttpError::from(err);
            let view = LayoutContext::new(
                chrome,
                BlogListView {
                    posts: Vec::new(),
                    error: Some("Failed to load blog posts. Please try again later.".to_string()),
                },
            );
            let mut response = render_template_response(BlogListTemplate { view }, http.status());
            http.into_report().attach(&mut response);
            response
        }
    }
}

pub(super) async fn blog_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Response {
    let site = &state.site;
    let chrome = LayoutChrome::for_site(site);

    match state.posts.get_post(&id).await {
        Ok(PostLookup::Found(post)) => render_post(chrome, &state, &post),
        Ok(PostLookup::NotFound) => render_not_found_response(
            chrome.with_meta(PageMetaView::not_found_post(&site.name)),
            ErrorPageView::post_not_found(),
        ),
        Err(err) => {
            let http = HttpError::from(err);
            let view = LayoutContext::new(chrome, ErrorPageView::post_unavailable());
            let mut response = render_template_response(ErrorTemplate { view }, http.status());
            http.into_report().attach(&mut response);
            response
        }
    }
}

fn render_post(chrome: LayoutChrome, state: &HttpState, post: &BlogPost) -> Response {
    let chrome = chrome
        .with_meta(PageMetaView::for_post(post, &state.site.name))
        .with_canonical(&state.site, &format!("/blogs/{}", post.id));
    let view = LayoutContext::new(chrome, BlogPostView::from_post(post));
    render_template_response(BlogPostTemplate { view }, StatusCode::OK)
}

pub(super) async fn not_found(State(state): State<HttpState>) -> Response {
    render_not_found_response(
        LayoutChrome::for_site(&state.site),
        ErrorPageView::not_found(),
    )
}

pub(super) async fn serve_upload(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    let Some(storage) = state.uploads.as_ref() else {
        return upload_not_found(SOURCE);
    };

    match storage.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(StorageError::InvalidKey(_)) => upload_not_found(SOURCE),
        Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => upload_not_found(SOURCE),
        Err(err) => {
            error!(
                target: "solar_leveling::http::uploads",
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                &err,
            )
            .into_response()
        }
    }
}

fn upload_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Upload not found",
        "The requested upload is not available",
    )
    .into_response()
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Keys embed a timestamp, so stored objects never change.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
