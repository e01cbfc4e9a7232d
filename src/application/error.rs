use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::infra::error::InfraError;

use super::{admin::AdminPostError, posts::PostError};

/// Diagnostic attached to failed responses and emitted by the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn into_report(self) -> ErrorReport {
        self.report
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        const SOURCE: &str = "application::error::post_error_to_http";
        match &error {
            PostError::Validation(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Please check the form and try again",
                &error,
            ),
            PostError::Fetch(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Failed to fetch blog posts",
                &error,
            ),
            PostError::Create(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Failed to create post",
                &error,
            ),
            PostError::Update(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Failed to update post",
                &error,
            ),
            PostError::Delete(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Failed to delete post",
                &error,
            ),
        }
    }
}

impl From<AdminPostError> for HttpError {
    fn from(error: AdminPostError) -> Self {
        match error {
            AdminPostError::Post(inner) => inner.into(),
            AdminPostError::Upload(_) => HttpError::from_error(
                "application::error::admin_error_to_http",
                StatusCode::BAD_GATEWAY,
                "Failed to upload image",
                &error,
            ),
        }
    }
}

/// Failure that ends the process; reported once by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
}
