// src/auth/sessions.rs
use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::token::{generate_token_default, hash_token};
use crate::errors::ServerError;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// Create a session row and return the raw token (only the keyed hash is
/// stored).
pub fn create_session(
    conn: &Connection,
    secret: &str,
    user_id: i64,
    ttl_secs: i64,
    now: i64,
) -> Result<String, ServerError> {
    let raw_token = generate_token_default();
    let hash = hash_token(secret, &raw_token);
    let expires_at = now + ttl_secs;

    conn.execute(
        r#"
        insert into sessions (user_id, token_hash, created_at, expires_at)
        values (?, ?, ?, ?)
        "#,
        params![user_id, hash.as_slice(), now, expires_at],
    )
    .map_err(|e| ServerError::DbError(format!("create session failed: {e}")))?;

    Ok(raw_token)
}

pub fn load_user_from_session(
    conn: &Connection,
    secret: &str,
    raw_token: &str,
    now: i64,
) -> Result<Option<SessionUser>, ServerError> {
    let hash = hash_token(secret, raw_token);

    conn.query_row(
        r#"
        select u.id, u.username, u.email, u.is_admin
        from sessions s
        join users u on u.id = s.user_id
        where s.token_hash = ?
          and s.expires_at > ?
          and s.revoked_at is null
        "#,
        params![hash.as_slice(), now],
        |row| {
            Ok(SessionUser {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                is_admin: row.get::<_, i64>(3)? != 0,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("session lookup failed: {e}")))
}

/// Logout: mark the session revoked. A token that never existed is a no-op.
pub fn revoke_session(
    conn: &Connection,
    secret: &str,
    raw_token: &str,
    now: i64,
) -> Result<(), ServerError> {
    let hash = hash_token(secret, raw_token);
    conn.execute(
        "update sessions set revoked_at = ? where token_hash = ? and revoked_at is null",
        params![now, hash.as_slice()],
    )
    .map_err(|e| ServerError::DbError(format!("revoke session failed: {e}")))?;
    Ok(())
}
