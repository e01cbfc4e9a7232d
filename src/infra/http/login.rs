use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    application::{
        access::{AUTHENTICATED_COOKIE, SIGNATURE_COOKIE, TIMESTAMP_COOKIE},
        error::{ErrorReport, HttpError},
    },
    presentation::views::{
        LayoutChrome, LayoutContext, LoginTemplate, LoginView, PageMetaView,
        render_template_response,
    },
};

use super::HttpState;

const SOURCE: &str = "infra::http::login";
const TARGET: &str = "solar_leveling::http::login";

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    #[serde(default)]
    password: String,
}

pub(super) async fn login_form(State(state): State<HttpState>) -> Response {
    render_login(&state, None, StatusCode::OK)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.gate.verify_password(&form.password) {
        warn!(target: TARGET, "rejected admin login");
        let status = StatusCode::UNAUTHORIZED;
        let mut response = render_login(&state, Some("Incorrect password"), status);
        ErrorReport::from_message(SOURCE, status, "password mismatch").attach(&mut response);
        return response;
    }

    let session = match state.gate.issue(OffsetDateTime::now_utc()) {
        Ok(session) => session,
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to start session",
                &err,
            )
            .into_response();
        }
    };

    let ttl = state.gate.ttl();
    let session_cookie = |name: &'static str, value: String| {
        Cookie::build((name, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(ttl)
            .build()
    };

    let mut jar = jar
        .add(session_cookie(AUTHENTICATED_COOKIE, "true".to_string()))
        .add(session_cookie(TIMESTAMP_COOKIE, session.timestamp));
    if let Some(signature) = session.signature {
        jar = jar.add(session_cookie(SIGNATURE_COOKIE, signature));
    }

    info!(target: TARGET, "admin session issued");
    (jar, Redirect::to("/admin")).into_response()
}

fn render_login(state: &HttpState, error: Option<&str>, status: StatusCode) -> Response {
    let chrome = LayoutChrome::for_site(&state.site).with_meta(PageMetaView::website(
        format!("Admin Login | {}", state.site.name),
        "Sign in to manage blog posts.".to_string(),
    ));
    let view = LayoutContext::new(
        chrome,
        LoginView {
            error: error.map(str::to_string),
        },
    );
    render_template_response(LoginTemplate { view }, status)
}
