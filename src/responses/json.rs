use crate::errors::{ResultResp, ServerError};
use astra::{Body, ResponseBuilder};
use serde::Serialize;

pub fn json_response<T: Serialize>(body: &T) -> ResultResp {
    json_with_status(200, body)
}

pub fn json_with_status<T: Serialize>(status: u16, body: &T) -> ResultResp {
    let body = serde_json::to_string(body).map_err(|_| ServerError::InternalError)?;

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)
}

/// Like [`json_with_status`] but also sets a cookie (login/logout).
pub fn json_with_cookie<T: Serialize>(status: u16, body: &T, cookie: &str) -> ResultResp {
    let body = serde_json::to_string(body).map_err(|_| ServerError::InternalError)?;

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .header("Set-Cookie", cookie)
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)
}
