mod admin;
mod contact;
mod login;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::{
    application::{
        access::AccessGate, admin::AdminPostService, contact::ContactService, posts::PostRepository,
    },
    config::SiteSettings,
    infra::{assets, storage::LocalImageStorage},
};

pub use middleware::RequestContext;

use middleware::{log_responses, require_admin_access, set_request_context};

/// Services shared by every handler. Built once in `main` and cloned per request.
#[derive(Clone)]
pub struct HttpState {
    pub posts: PostRepository,
    pub admin: Arc<AdminPostService>,
    pub contact: Arc<ContactService>,
    pub gate: Arc<AccessGate>,
    /// Present when images are stored on local disk and served from `/uploads`.
    pub uploads: Option<Arc<LocalImageStorage>>,
    pub site: Arc<SiteSettings>,
    pub upload_body_limit: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let mut router = Router::new()
        .route("/", get(public::home))
        .route("/qualify", post(public::qualify))
        .route("/blogs", get(public::blog_index))
        .route("/blogs/{id}", get(public::blog_detail))
        .route("/uploads/{*path}", get(public::serve_upload))
        .route("/static/{*path}", get(assets::serve_static))
        .route("/api/contact", post(contact::submit_contact))
        .nest("/admin", admin::build_admin_router(state.clone()));

    if state.gate.login_enabled() {
        router = router.route("/login", get(login::login_form).post(login::login_submit));
    }

    router
        .fallback(public::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin_access,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
