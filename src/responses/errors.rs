use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

pub use crate::errors::ResultResp;

/// Convert a ServerError into the JSON error body the frontend expects.
/// Internal detail (DB messages) is logged, never sent to the caller.
pub fn error_to_response(err: ServerError) -> Response {
    match err {
        ServerError::NotFound => json_error_response(404, "Not Found"),
        ServerError::BadRequest(msg) => json_error_response(400, &msg),
        ServerError::Unauthorized => json_error_response(401, "Authentication required"),
        ServerError::Forbidden => json_error_response(403, "Admin access required"),
        ServerError::DbError(msg) => {
            log::error!("database error: {msg}");
            json_error_response(500, "Server error")
        }
        ServerError::InternalError => json_error_response(500, "Internal Server Error"),
    }
}

pub fn json_error_response(status: u16, message: &str) -> Response {
    let body = json!({ "message": message }).to_string();

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Body::from(body))
        .unwrap()
}
