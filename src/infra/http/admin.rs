//! Admin post screens: list, create, edit and the two-step delete.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Form, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    application::{
        admin::{AdminPostError, PostDraft},
        error::{ErrorReport, HttpError},
        posts::{PostError, PostLookup},
    },
    domain::{
        error::DomainError,
        posts::{ImageSource, UploadedImage},
    },
    presentation::{
        admin::views::{
            AdminChrome, AdminDeleteConfirmTemplate, AdminDeleteConfirmView, AdminLayout,
            AdminMessageTemplate, AdminMessageView, AdminPostFormTemplate, AdminPostFormView,
            AdminPostListTemplate, AdminPostListView, AdminPostRowView,
        },
        views::render_template_response,
    },
};

use super::HttpState;

const SOURCE: &str = "infra::http::admin";
const TARGET: &str = "solar_leveling::http::admin";

/// Header the list page's script sends when deleting inline.
const REQUESTED_WITH: &str = "x-requested-with";

pub(super) fn build_admin_router(state: HttpState) -> Router<HttpState> {
    let body_limit = state.upload_body_limit;
    Router::new()
        .route("/", get(admin_posts))
        .route(
            "/new",
            get(admin_post_new)
                .post(admin_post_create)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/edit/{id}",
            get(admin_post_edit)
                .post(admin_post_update)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/posts/{id}/delete",
            get(admin_post_delete_confirm).post(admin_post_delete),
        )
}

fn chrome(state: &HttpState, title: &str) -> AdminChrome {
    AdminChrome::new(&state.site.name, title)
}

async fn admin_posts(State(state): State<HttpState>) -> Response {
    let (content, failure) = match state.posts.list_posts().await {
        Ok(posts) => {
            let now = OffsetDateTime::now_utc();
            let rows = posts
                .iter()
                .map(|post| AdminPostRowView::from_post(post, now))
                .collect();
            (AdminPostListView { rows, error: None }, None)
        }
        Err(err) => {
            let http = HttpError::from(err);
            (
                AdminPostListView {
                    rows: Vec::new(),
                    error: Some(http.public_message().to_string()),
                },
                Some(http),
            )
        }
    };

    let view = AdminLayout::new(chrome(&state, "Blog Admin"), content);
    match failure {
        None => render_template_response(AdminPostListTemplate { view }, StatusCode::OK),
        Some(http) => {
            let mut response =
                render_template_response(AdminPostListTemplate { view }, http.status());
            http.into_report().attach(&mut response);
            response
        }
    }
}

async fn admin_post_new(State(state): State<HttpState>) -> Response {
    render_form(&state, AdminPostFormView::create(), StatusCode::OK)
}

async fn admin_post_create(State(state): State<HttpState>, mut multipart: Multipart) -> Response {
    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return form_read_failure(&state, AdminPostFormView::create(), err),
    };

    let (echo, draft) = form.into_draft();
    match state.admin.create(draft).await {
        Ok(_) => Redirect::to("/admin").into_response(),
        Err(err) => form_failure(&state, AdminPostFormView::create(), echo, err),
    }
}

async fn admin_post_edit(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.posts.get_post(&id).await {
        Ok(PostLookup::Found(post)) => {
            render_form(&state, AdminPostFormView::edit(&post), StatusCode::OK)
        }
        Ok(PostLookup::NotFound) => post_not_found(&state),
        Err(err) => load_failure(&state, err),
    }
}

async fn admin_post_update(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return form_read_failure(&state, AdminPostFormView::editing(&id), err),
    };

    let (echo, draft) = form.into_draft();
    match state.admin.update(&id, draft).await {
        Ok(()) => Redirect::to("/admin").into_response(),
        Err(err) => form_failure(&state, AdminPostFormView::editing(&id), echo, err),
    }
}

async fn admin_post_delete_confirm(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Response {
    match state.posts.get_post(&id).await {
        Ok(PostLookup::Found(post)) => {
            let view = AdminLayout::new(
                chrome(&state, "Delete post"),
                AdminDeleteConfirmView {
                    action: format!("/admin/posts/{}/delete", post.id),
                    title: post.title,
                },
            );
            render_template_response(AdminDeleteConfirmTemplate { view }, StatusCode::OK)
        }
        Ok(PostLookup::NotFound) => post_not_found(&state),
        Err(err) => load_failure(&state, err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeleteForm {
    confirm: Option<String>,
}

async fn admin_post_delete(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<DeleteForm>,
) -> Response {
    let from_script = headers
        .get(REQUESTED_WITH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("fetch"));

    if form.confirm.as_deref() != Some("yes") {
        if from_script {
            return HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Deletion was not confirmed",
                "missing confirm=yes",
            )
            .into_response();
        }
        return Redirect::to(&format!("/admin/posts/{id}/delete")).into_response();
    }

    match state.admin.delete(&id).await {
        Ok(()) if from_script => StatusCode::NO_CONTENT.into_response(),
        Ok(()) => Redirect::to("/admin").into_response(),
        Err(err) => {
            let http = HttpError::from(err);
            if from_script {
                return http.into_response();
            }
            let status = http.status();
            message_response(
                &state,
                "Failed to delete post",
                http.public_message().to_string(),
                status,
                http.into_report(),
            )
        }
    }
}

/// Fields decoded from the multipart create/edit form.
#[derive(Debug, Default)]
struct PostForm {
    title: String,
    content: String,
    image_url: String,
    upload: Option<UploadedImage>,
}

/// Raw values to put back into the form if the submission fails.
struct FormEcho {
    title: String,
    content: String,
    image_url: String,
}

impl PostForm {
    fn into_draft(self) -> (FormEcho, PostDraft) {
        let image = ImageSource::from_parts(self.upload, Some(&self.image_url));
        // A chosen file replaces the URL, so the URL is not echoed in that case.
        let echoed_url = match &image {
            ImageSource::Uploaded(_) => String::new(),
            _ => self.image_url,
        };
        let echo = FormEcho {
            title: self.title.clone(),
            content: self.content.clone(),
            image_url: echoed_url,
        };
        let draft = PostDraft {
            title: self.title,
            content: self.content,
            image,
        };
        (echo, draft)
    }
}

async fn read_post_form(multipart: &mut Multipart) -> Result<PostForm, MultipartError> {
    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => form.title = field.text().await?,
            Some("content") => form.content = field.text().await?,
            Some("imageUrl") => form.image_url = field.text().await?,
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.upload = Some(UploadedImage {
                        filename,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn render_form(state: &HttpState, form: AdminPostFormView, status: StatusCode) -> Response {
    let view = AdminLayout::new(chrome(state, form.heading), form);
    render_template_response(AdminPostFormTemplate { view }, status)
}

fn form_failure(
    state: &HttpState,
    form: AdminPostFormView,
    echo: FormEcho,
    err: AdminPostError,
) -> Response {
    let message = match &err {
        AdminPostError::Post(PostError::Validation(DomainError::Validation {
            field: "title",
            ..
        })) => "Title is required",
        _ => "",
    };
    let http = HttpError::from(err);
    let message = if message.is_empty() {
        http.public_message()
    } else {
        message
    };

    let form = form.with_values(echo.title, echo.content, echo.image_url, message);
    let mut response = render_form(state, form, http.status());
    http.into_report().attach(&mut response);
    response
}

fn form_read_failure(state: &HttpState, form: AdminPostFormView, err: MultipartError) -> Response {
    let status = err.status();
    warn!(
        target: TARGET,
        status = status.as_u16(),
        error = %err,
        "failed to read post form"
    );
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        let limit_mib = (state.upload_body_limit as u64).div_ceil(1_048_576);
        format!("Image is too large (limit is {limit_mib} MiB)")
    } else {
        "Form data was invalid, please try again".to_string()
    };
    let form = form.with_values(String::new(), String::new(), String::new(), message);
    let mut response = render_form(state, form, status);
    ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
    response
}

fn post_not_found(state: &HttpState) -> Response {
    message_response(
        state,
        "Post not found",
        "The post you are looking for does not exist.".to_string(),
        StatusCode::NOT_FOUND,
        ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "post not found"),
    )
}

fn load_failure(state: &HttpState, err: PostError) -> Response {
    let http = HttpError::from(err);
    let status = http.status();
    message_response(
        state,
        "Failed to load post",
        http.public_message().to_string(),
        status,
        http.into_report(),
    )
}

fn message_response(
    state: &HttpState,
    heading: &'static str,
    message: String,
    status: StatusCode,
    report: ErrorReport,
) -> Response {
    let view = AdminLayout::new(chrome(state, heading), AdminMessageView { heading, message });
    let mut response = render_template_response(AdminMessageTemplate { view }, status);
    report.attach(&mut response);
    response
}
