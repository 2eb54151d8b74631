use crate::auth::JwtVerifier;
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::startup::AppState;
use tracing_subscriber::EnvFilter;

#[macro_use]
extern crate tracing;

mod audit;
mod auth;
mod config;
mod db;
mod error;
mod polls;
mod questions;
mod startup;
mod votes;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let pool = match db::init_db(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(PgStore::new(pool), JwtVerifier::new(&config.jwt));
    let app = startup::router(state);

    info!("listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Unable to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
