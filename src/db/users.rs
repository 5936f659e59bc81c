// src/db/users.rs
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::ServerError;

/// User row as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: i64,
}

/// Full row used by the auth layer.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Updates applied by the admin panel; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
}

/// The seeded administrator account that must never be renamed or removed.
pub fn is_protected_admin(username: &str) -> bool {
    username.eq_ignore_ascii_case("admin")
}

fn public_from_row(row: &Row) -> rusqlite::Result<PublicUser> {
    Ok(PublicUser {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_admin: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
    })
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    is_admin: bool,
    now: i64,
) -> Result<i64, ServerError> {
    let exists: Option<i64> = conn
        .query_row(
            "select id from users where username = ? or email = ?",
            params![username, email],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| ServerError::DbError(format!("duplicate user check failed: {e}")))?;

    if exists.is_some() {
        return Err(ServerError::BadRequest(
            "Username or email already exists".into(),
        ));
    }

    conn.execute(
        "insert into users (username, email, password_hash, is_admin, created_at)
         values (?, ?, ?, ?, ?)",
        params![username, email, password_hash, is_admin as i64, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert user failed: {e}")))?;

    Ok(conn.last_insert_rowid())
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, ServerError> {
    conn.query_row(
        "select id, username, email, password_hash, is_admin from users where username = ?",
        params![username],
        |r| {
            Ok(UserRow {
                id: r.get(0)?,
                username: r.get(1)?,
                email: r.get(2)?,
                password_hash: r.get(3)?,
                is_admin: r.get::<_, i64>(4)? != 0,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("user lookup failed: {e}")))
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<PublicUser>, ServerError> {
    conn.query_row(
        "select id, username, email, is_admin, created_at from users where id = ?",
        params![id],
        public_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("user by id failed: {e}")))
}

pub fn list_users(conn: &Connection) -> Result<Vec<PublicUser>, ServerError> {
    let mut stmt = conn
        .prepare("select id, username, email, is_admin, created_at from users order by id")
        .map_err(|e| ServerError::DbError(format!("prepare user list failed: {e}")))?;

    let rows = stmt
        .query_map([], public_from_row)
        .map_err(|e| ServerError::DbError(format!("user list failed: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| ServerError::DbError(format!("user row read failed: {e}")))?);
    }
    Ok(out)
}

pub fn update_user(
    conn: &Connection,
    id: i64,
    update: &UserUpdate,
) -> Result<PublicUser, ServerError> {
    let Some(target) = find_by_id(conn, id)? else {
        return Err(ServerError::NotFound);
    };
    if is_protected_admin(&target.username) {
        return Err(ServerError::Forbidden);
    }

    if let Some(username) = &update.username {
        let taken: Option<i64> = conn
            .query_row(
                "select id from users where username = ? and id != ?",
                params![username, id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| ServerError::DbError(format!("username check failed: {e}")))?;
        if taken.is_some() {
            return Err(ServerError::BadRequest(
                "Username or email already exists".into(),
            ));
        }
        conn.execute(
            "update users set username = ? where id = ?",
            params![username, id],
        )
        .map_err(|e| ServerError::DbError(format!("update username failed: {e}")))?;
    }

    if let Some(email) = &update.email {
        let taken: Option<i64> = conn
            .query_row(
                "select id from users where email = ? and id != ?",
                params![email, id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| ServerError::DbError(format!("email check failed: {e}")))?;
        if taken.is_some() {
            return Err(ServerError::BadRequest(
                "Username or email already exists".into(),
            ));
        }
        conn.execute(
            "update users set email = ? where id = ?",
            params![email, id],
        )
        .map_err(|e| ServerError::DbError(format!("update email failed: {e}")))?;
    }

    if let Some(hash) = &update.password_hash {
        conn.execute(
            "update users set password_hash = ? where id = ?",
            params![hash, id],
        )
        .map_err(|e| ServerError::DbError(format!("update password failed: {e}")))?;
    }

    if let Some(is_admin) = update.is_admin {
        conn.execute(
            "update users set is_admin = ? where id = ?",
            params![is_admin as i64, id],
        )
        .map_err(|e| ServerError::DbError(format!("update is_admin failed: {e}")))?;
    }

    find_by_id(conn, id)?.ok_or(ServerError::NotFound)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<(), ServerError> {
    let Some(target) = find_by_id(conn, id)? else {
        return Err(ServerError::NotFound);
    };
    if is_protected_admin(&target.username) {
        return Err(ServerError::Forbidden);
    }

    conn.execute("delete from users where id = ?", params![id])
        .map_err(|e| ServerError::DbError(format!("delete user failed: {e}")))?;
    Ok(())
}
