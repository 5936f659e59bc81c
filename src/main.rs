use crate::cities::cache::ResponseCache;
use crate::cities::fetch::ApiClient;
use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::responses::error_to_response;
use crate::router::{handle, with_cors, AppState};
use astra::Server;
use std::net::SocketAddr;

mod auth;
mod cities;
mod config;
mod db;
mod errors;
mod responses;
mod router;

#[cfg(test)]
mod tests;

fn main() {
    pretty_env_logger::init();

    let cfg = AppConfig::from_env();

    let db = Database::new(cfg.db_path.clone());
    if let Err(e) = init_db(&db, "sql/schema.sql") {
        log::error!("Database initialization failed: {e}");
        std::process::exit(1);
    }

    let api = match ApiClient::new(cfg.rapid_api_key.clone(), ResponseCache::default()) {
        Ok(api) => api,
        Err(e) => {
            log::error!("HTTP client setup failed: {e}");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = match cfg.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("Invalid BIND_ADDR {:?}: {e}", cfg.bind_addr);
            std::process::exit(1);
        }
    };
    log::info!("Starting server at http://{addr}");

    let state = AppState { db, cfg, api };
    let server = Server::bind(&addr).max_workers(8);

    let result = server.serve(move |req, _info| {
        let resp = match handle(req, &state) {
            Ok(resp) => resp,
            Err(err) => error_to_response(err),
        };
        with_cors(resp, &state.cfg.allowed_origin)
    });

    if let Err(e) = result {
        log::error!("Server ended with error: {e}");
    }
}
