// src/router.rs
use astra::{Body, Request, Response, ResponseBuilder};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::gate;
use crate::auth::password;
use crate::auth::sessions::{self, SessionUser};
use crate::cities::aggregate::Aggregator;
use crate::cities::categories;
use crate::cities::fetch::ApiClient;
use crate::config::AppConfig;
use crate::db::cities as city_store;
use crate::db::connection::Database;
use crate::db::users;
use crate::errors::{ResultResp, ServerError};
use crate::responses::{json_response, json_with_cookie, json_with_status};
use crate::responses::errors::json_error_response;

pub struct AppState {
    pub db: Database,
    pub cfg: AppConfig,
    pub api: ApiClient,
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str().to_string();
    let raw_path = req.uri().path().trim_end_matches('/').to_string();
    let path = if raw_path.is_empty() {
        "/"
    } else {
        raw_path.as_str()
    };

    // Browser preflight; the CORS headers themselves are added in main.
    if method == "OPTIONS" {
        return ResponseBuilder::new()
            .status(204)
            .body(Body::empty())
            .map_err(|_| ServerError::InternalError);
    }

    match (method.as_str(), path) {
        ("GET", "/cities/search") => cities_search(req, state),
        ("DELETE", p) if p.starts_with("/cities/") => {
            let ident = decode_component(&p["/cities/".len()..]);
            cities_delete(req, state, &ident)
        }

        ("POST", "/auth/signup") => auth_signup(req, state),
        ("POST", "/auth/login") => auth_login(req, state),
        ("POST", "/auth/logout") => auth_logout(req, state),
        ("GET", "/auth/status") => auth_status(req, state),

        ("GET", "/admin/dashboard") => admin_dashboard(req, state),
        ("GET", "/admin/users") => admin_list_users(req, state),
        ("POST", "/admin/users") => admin_create_user(req, state),
        ("PUT", p) if p.starts_with("/admin/users/") => {
            let id = parse_user_id(&p["/admin/users/".len()..])?;
            admin_update_user(req, state, id)
        }
        ("DELETE", p) if p.starts_with("/admin/users/") => {
            let id = parse_user_id(&p["/admin/users/".len()..])?;
            admin_delete_user(req, state, id)
        }

        _ => Err(ServerError::NotFound),
    }
}

// ---------------------------------------------------------------------------
// Cities

fn cities_search(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    gate::authenticate(&state.db, &req, &state.cfg.session_secret, now)?;

    let params = parse_query(&req);
    let city_name = params
        .get("cityName")
        .map(|s| s.trim())
        .unwrap_or_default();
    if city_name.is_empty() {
        return Err(ServerError::BadRequest(
            "Please enter a city name to search".into(),
        ));
    }

    let raw_categories = params.get("categories").ok_or_else(|| {
        ServerError::BadRequest("categories must be a JSON array".into())
    })?;
    let selected = categories::parse_selected(raw_categories)?;

    let cities = Aggregator::new(&state.api, &state.db).search(city_name, &selected, now)?;
    json_response(&json!({ "cities": cities }))
}

fn cities_delete(req: Request, state: &AppState, ident: &str) -> ResultResp {
    let now = now_unix();
    gate::authenticate(&state.db, &req, &state.cfg.session_secret, now)?;

    if ident.is_empty() {
        return Err(ServerError::BadRequest("missing city identifier".into()));
    }

    let record = state
        .db
        .with_conn(|conn| city_store::find_by_id_or_name(conn, ident))?;
    let Some(record) = record else {
        return Err(ServerError::NotFound);
    };

    state
        .db
        .with_conn(|conn| city_store::delete_by_id(conn, record.id))?;

    json_response(&json!({
        "message": "City deleted successfully",
        "deletedCity": { "id": record.id, "name": record.name },
    }))
}

// ---------------------------------------------------------------------------
// Auth

#[derive(Deserialize)]
struct SignupBody {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

fn auth_signup(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    let body: SignupBody = read_json_body(req)?;

    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();

    if username.is_empty() || body.password.is_empty() {
        return Err(ServerError::BadRequest(
            "username and password are required".into(),
        ));
    }
    if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ServerError::BadRequest("invalid email".into()));
    }

    let hash = password::hash_password(&body.password);
    state
        .db
        .with_conn(|conn| users::create_user(conn, &username, &email, &hash, false, now))?;

    json_with_status(201, &json!({ "message": "User created successfully" }))
}

fn auth_login(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    let body: LoginBody = read_json_body(req)?;

    let user = state
        .db
        .with_conn(|conn| users::find_by_username(conn, body.username.trim()))?;

    // Unknown user and wrong password answer identically.
    let Some(user) = user else {
        return Ok(json_error_response(401, "Invalid credentials"));
    };
    if !password::verify_password(&user.password_hash, &body.password) {
        return Ok(json_error_response(401, "Invalid credentials"));
    }

    let ttl = state.cfg.session_ttl_secs;
    let secret = state.cfg.session_secret.clone();
    let token = state.db.with_conn(|conn| {
        let token = sessions::create_session(conn, &secret, user.id, ttl, now)?;
        conn.execute(
            "update users set last_login_at = ? where id = ?",
            rusqlite::params![now, user.id],
        )
        .map_err(|e| ServerError::DbError(format!("update last_login_at failed: {e}")))?;
        Ok(token)
    })?;

    json_with_cookie(
        200,
        &json!({ "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
        }}),
        &session_cookie(&token, ttl, state.cfg.production),
    )
}

fn auth_logout(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    if let Some(token) = gate::session_token(&req) {
        let secret = state.cfg.session_secret.clone();
        let result = state
            .db
            .with_conn(|conn| sessions::revoke_session(conn, &secret, &token, now));
        if let Err(e) = result {
            log::warn!("session revoke failed: {e}");
        }
    }

    json_with_cookie(
        200,
        &json!({ "message": "Logged out successfully" }),
        &session_cookie("", 0, state.cfg.production),
    )
}

fn auth_status(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    match gate::authenticate(&state.db, &req, &state.cfg.session_secret, now) {
        Ok(user) => json_response(&json!({
            "authenticated": true,
            "user": {
                "id": user.id,
                "username": user.username,
                "email": user.email,
                "isAdmin": user.is_admin,
            },
        })),
        Err(_) => json_with_status(401, &json!({ "authenticated": false })),
    }
}

// ---------------------------------------------------------------------------
// Admin

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    is_admin: Option<bool>,
}

fn admin_guard(req: &Request, state: &AppState, now: i64) -> Result<SessionUser, ServerError> {
    let user = gate::authenticate(&state.db, req, &state.cfg.session_secret, now)?;
    gate::require_admin(&user)?;
    Ok(user)
}

fn admin_dashboard(req: Request, state: &AppState) -> ResultResp {
    let admin = admin_guard(&req, state, now_unix())?;
    json_response(&json!({
        "message": "Admin dashboard data",
        "adminUser": admin.username,
    }))
}

fn admin_list_users(req: Request, state: &AppState) -> ResultResp {
    admin_guard(&req, state, now_unix())?;
    let users = state.db.with_conn(|conn| users::list_users(conn))?;
    json_response(&json!({ "users": users }))
}

fn admin_create_user(req: Request, state: &AppState) -> ResultResp {
    let now = now_unix();
    admin_guard(&req, state, now)?;
    let body: UserBody = read_json_body(req)?;

    let (Some(username), Some(email), Some(pw)) = (body.username, body.email, body.password)
    else {
        return Err(ServerError::BadRequest(
            "username, email and password are required".into(),
        ));
    };

    let hash = password::hash_password(&pw);
    let is_admin = body.is_admin.unwrap_or(false);
    let created = state.db.with_conn(|conn| {
        let id = users::create_user(conn, username.trim(), &email.trim().to_lowercase(), &hash, is_admin, now)?;
        users::find_by_id(conn, id)?.ok_or(ServerError::InternalError)
    })?;

    json_with_status(201, &json!({ "user": created }))
}

fn admin_update_user(req: Request, state: &AppState, id: i64) -> ResultResp {
    let now = now_unix();
    admin_guard(&req, state, now)?;
    let body: UserBody = read_json_body(req)?;

    let update = users::UserUpdate {
        username: body.username.map(|u| u.trim().to_string()),
        email: body.email.map(|e| e.trim().to_lowercase()),
        password_hash: body.password.as_deref().map(password::hash_password),
        is_admin: body.is_admin,
    };

    let updated = state
        .db
        .with_conn(|conn| users::update_user(conn, id, &update))?;
    json_response(&json!({ "user": updated }))
}

fn admin_delete_user(req: Request, state: &AppState, id: i64) -> ResultResp {
    let now = now_unix();
    admin_guard(&req, state, now)?;

    state.db.with_conn(|conn| users::delete_user(conn, id))?;
    json_response(&json!({ "message": "User deleted successfully" }))
}

// ---------------------------------------------------------------------------
// Helpers

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Percent-decode a path segment (city names may carry spaces).
fn decode_component(raw: &str) -> String {
    url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_user_id(raw: &str) -> Result<i64, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest("invalid user id".into()))
}

fn read_json_body<T: serde::de::DeserializeOwned>(req: Request) -> Result<T, ServerError> {
    let mut body = req.into_body();
    let reader = body.reader();
    serde_json::from_reader(reader)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn session_cookie(token: &str, max_age: i64, production: bool) -> String {
    // Cross-site frontend in production needs SameSite=None + Secure.
    if production {
        format!(
            "{}={token}; HttpOnly; Path=/; Max-Age={max_age}; Secure; SameSite=None",
            gate::SESSION_COOKIE
        )
    } else {
        format!(
            "{}={token}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax",
            gate::SESSION_COOKIE
        )
    }
}

/// Attach the CORS headers every response carries.
pub fn with_cors(mut resp: Response, origin: &str) -> Response {
    let headers = resp.headers_mut();
    if let Ok(value) = origin.parse() {
        headers.insert("Access-Control-Allow-Origin", value);
    }
    if let Ok(value) = "true".parse() {
        headers.insert("Access-Control-Allow-Credentials", value);
    }
    if let Ok(value) = "GET, POST, PUT, DELETE, OPTIONS".parse() {
        headers.insert("Access-Control-Allow-Methods", value);
    }
    if let Ok(value) = "Content-Type, Authorization, X-Requested-With".parse() {
        headers.insert("Access-Control-Allow-Headers", value);
    }
    resp
}
