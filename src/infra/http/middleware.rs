use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::OffsetDateTime;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::{
    access::{
        AUTHENTICATED_COOKIE, AccessDecision, SIGNATURE_COOKIE, SessionCookies, TIMESTAMP_COOKIE,
    },
    error::ErrorReport,
};

use super::HttpState;

const RESPONSE_TARGET: &str = "solar_leveling::http::response";
const ACCESS_TARGET: &str = "solar_leveling::http::access";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target: RESPONSE_TARGET,
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target: RESPONSE_TARGET,
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

fn is_admin_path(path: &str) -> bool {
    path.strip_prefix("/admin")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Admin gate: any `/admin` path without a fresh session marker is sent to `/login`,
/// whether or not a route matches it.
pub async fn require_admin_access(
    State(state): State<HttpState>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_admin_path(request.uri().path()) {
        return next.run(request).await;
    }

    let cookies = SessionCookies {
        authenticated: jar.get(AUTHENTICATED_COOKIE).map(Cookie::value),
        timestamp: jar.get(TIMESTAMP_COOKIE).map(Cookie::value),
        signature: jar.get(SIGNATURE_COOKIE).map(Cookie::value),
    };

    match state.gate.evaluate(&cookies, OffsetDateTime::now_utc()) {
        AccessDecision::Granted => next.run(request).await,
        AccessDecision::Denied(reason) => {
            debug!(
                target: ACCESS_TARGET,
                path = %request.uri().path(),
                reason = reason.as_str(),
                "admin access denied"
            );
            Redirect::to("/login").into_response()
        }
    }
}
