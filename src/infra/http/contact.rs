use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    application::{contact::ContactError, error::ErrorReport, repos::MailError},
    domain::contact::{ContactSubmission, FieldError},
};

use super::HttpState;

const SOURCE: &str = "infra::http::contact";

const RECEIVED: &str = "Form submission received successfully";

#[derive(Debug, Serialize)]
struct ContactResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl ContactResponse {
    fn received() -> Self {
        Self {
            success: true,
            message: Some(RECEIVED),
            error: None,
            errors: Vec::new(),
        }
    }

    fn failed(error: &'static str, errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            errors,
        }
    }
}

pub(super) async fn submit_contact(
    State(state): State<HttpState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Response {
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            let status = StatusCode::BAD_REQUEST;
            let mut response = (
                status,
                Json(ContactResponse::failed(
                    "Invalid form submission",
                    Vec::new(),
                )),
            )
                .into_response();
            ErrorReport::from_error(SOURCE, status, &rejection).attach(&mut response);
            return response;
        }
    };

    match state.contact.submit(submission).await {
        Ok(()) => (StatusCode::OK, Json(ContactResponse::received())).into_response(),
        Err(err) => contact_failure(err),
    }
}

fn contact_failure(err: ContactError) -> Response {
    let (status, body) = match &err {
        ContactError::Invalid(invalid) => (
            StatusCode::BAD_REQUEST,
            ContactResponse::failed(invalid.summary(), invalid.fields.clone()),
        ),
        ContactError::Delivery(MailError::NotConfigured) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ContactResponse::failed("Email service is not configured", Vec::new()),
        ),
        ContactError::Delivery(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ContactResponse::failed("Failed to send message", Vec::new()),
        ),
    };

    let mut response = (status, Json(body)).into_response();
    ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
    response
}
