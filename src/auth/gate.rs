// src/auth/gate.rs
use astra::Request;

use crate::auth::sessions::{self, SessionUser};
use crate::db::connection::Database;
use crate::errors::ServerError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Pull the session token from the cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(req: &Request) -> Option<String> {
    if let Some(value) = req.headers().get("Cookie").and_then(|v| v.to_str().ok()) {
        if let Some(token) = token_from_cookie_header(value) {
            return Some(token);
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn token_from_cookie_header(header: &str) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

/// Resolve the request's credential to a user. Every credential failure
/// (missing, malformed, unknown, expired, revoked) produces the same
/// Unauthorized so callers cannot probe which one it was. An unreachable
/// store is the one exception and stays a server error.
pub fn authenticate(
    db: &Database,
    req: &Request,
    secret: &str,
    now: i64,
) -> Result<SessionUser, ServerError> {
    let Some(token) = session_token(req) else {
        return Err(ServerError::Unauthorized);
    };

    db.with_conn(|conn| sessions::load_user_from_session(conn, secret, &token, now))?
        .ok_or(ServerError::Unauthorized)
}

/// Admin access is decided by the role flag alone.
pub fn require_admin(user: &SessionUser) -> Result<(), ServerError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ServerError::Forbidden)
    }
}
