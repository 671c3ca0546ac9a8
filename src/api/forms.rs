//! Form re-display and one-shot flash messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::Serialize;

use super::error::{ApiError, ErrorBody, ErrorCode};
use crate::engine::{EngineError, FieldErrors};

/// A urlencoded form post whose malformed bodies are answered with the
/// JSON error envelope
pub type FormBody<T> = WithRejection<Form<T>, ApiError>;

/// Cookie holding a message for the next page the browser loads
pub const FLASH_COOKIE: &str = "airdesk_flash";

/// Body of a rejected form post: the error envelope plus what is needed to
/// show the form again.
#[derive(Debug, Serialize)]
pub struct FormRejected<F: Serialize, O: Serialize> {
    pub error: ErrorBody,
    pub form: F,
    pub options: O,
}

impl<F: Serialize, O: Serialize> FormRejected<F, O> {
    pub fn new(errors: FieldErrors, form: F, options: O) -> Self {
        let message = if errors.len() == 1 {
            "Please correct the highlighted field".to_string()
        } else {
            format!("Please correct the {} highlighted fields", errors.len())
        };
        Self {
            error: ErrorBody {
                code: ErrorCode::ValidationError.as_str().to_string(),
                message,
                details: Some(errors.into_map()),
            },
            form,
            options,
        }
    }
}

impl<F: Serialize, O: Serialize> IntoResponse for FormRejected<F, O> {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

/// Split validation failures off an engine result so the caller can
/// re-display the form; every other error becomes an [`ApiError`].
pub fn split_validation<T>(
    result: Result<T, EngineError>,
) -> Result<Result<T, FieldErrors>, ApiError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(EngineError::Validation(errors)) => Ok(Err(errors)),
        Err(other) => Err(other.into()),
    }
}

/// Redirect with a message shown once by the landing page
pub fn flash_redirect(jar: CookieJar, message: &str, to: &str) -> (CookieJar, Redirect) {
    let cookie = Cookie::build((FLASH_COOKIE, hex::encode(message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), Redirect::to(to))
}

/// Read and clear the pending flash message
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(FLASH_COOKIE)
        .and_then(|c| hex::decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match message {
        Some(message) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(message)),
        None => (jar, None),
    }
}
