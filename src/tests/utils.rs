use crate::auth::password;
use crate::auth::sessions;
use crate::cities::cache::ResponseCache;
use crate::cities::fetch::ApiClient;
use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::db::users;
use crate::errors::ServerError;
use crate::router::{now_unix, AppState};

pub fn test_config() -> AppConfig {
    AppConfig {
        session_secret: "test-secret".to_string(),
        session_ttl_secs: 3600,
        rapid_api_key: "test-key".to_string(),
        db_path: ":memory:".to_string(),
        allowed_origin: "http://localhost:3000".to_string(),
        production: false,
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

/// Fresh state on an in-memory DB with the production schema applied.
/// Each test runs on its own thread, so in-memory databases never leak
/// between tests.
pub fn init_test_state() -> AppState {
    let cfg = test_config();

    let db = Database::new(cfg.db_path.clone());
    db.with_conn(|conn| {
        conn.execute_batch(include_str!("../../sql/schema.sql"))
            .map_err(|e| ServerError::DbError(format!("schema failed: {e}")))
    })
    .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

    let api = ApiClient::new(cfg.rapid_api_key.clone(), ResponseCache::default())
        .expect("client build failed");

    AppState { db, cfg, api }
}

/// Create a user directly in the DB and hand back a live session token.
pub fn create_user_with_session(state: &AppState, username: &str, is_admin: bool) -> (i64, String) {
    let now = now_unix();
    let hash = password::hash_password("password123");
    let email = format!("{username}@example.com");

    let user_id = state
        .db
        .with_conn(|conn| users::create_user(conn, username, &email, &hash, is_admin, now))
        .expect("Failed to create user");

    let token = state
        .db
        .with_conn(|conn| {
            sessions::create_session(
                conn,
                &state.cfg.session_secret,
                user_id,
                state.cfg.session_ttl_secs,
                now,
            )
        })
        .expect("Failed to create session");

    (user_id, token)
}
