use axum::{
    routing::{get, post, put},
    Router,
};
use log::{debug, info};
use simplelog::{Config as LogConfig, SimpleLogger};
use sqlx::mysql::MySqlPool;
use std::{net::SocketAddr, sync::Arc};

mod config;
mod controllers;
mod dispatcher;
mod errors;
mod models;
mod registry;
mod repository;
mod services;

use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::repository::{InMemoryRepository, MySqlRepository, Repository};
use crate::services::{GameService, UserService};

// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<GameService>,
    pub users: Arc<UserService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // set up logging facility
    let _ = SimpleLogger::init(config.log_level, LogConfig::default());
    info!("Starting..");

    let repo: Arc<dyn Repository> = match &config.database_url {
        Some(database_url) => {
            debug!("connecting to MySQL");
            let pool = MySqlPool::connect(database_url).await?;
            Arc::new(MySqlRepository::new(pool))
        }
        None => {
            info!("$DATABASE_URL is not set, games are kept in memory");
            Arc::new(InMemoryRepository::new())
        }
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let state = AppState {
        games: Arc::new(GameService::new(repo.clone(), registry, config.turn_policy())),
        users: Arc::new(UserService::new(repo)),
    };

    // Define routes
    let app = Router::new()
        .route("/api/v1/check-health", get(controllers::server::check_health))
        .route("/api/v1/user", post(controllers::user::create_user))
        .route("/api/v1/user/:user_id", get(controllers::user::get_user))
        .route("/api/v1/game", post(controllers::game::create_game))
        .route("/api/v1/game/:game_id", get(controllers::game::get_game))
        .route("/api/v1/game/join", post(controllers::game::join_game))
        .route("/api/v1/game/submit-ships", post(controllers::game::submit_ships))
        .route("/api/v1/game/move-ship", put(controllers::game::move_ship))
        .route("/api/v1/game/change-turn", post(controllers::game::change_turn))
        .route("/api/v1/game/reveal", post(controllers::game::reveal))
        .route("/api/v1/game/explode", post(controllers::game::explode))
        .route("/socket", get(controllers::socket::ws_handler))
        .with_state(state);

    // Start the server
    // TODO: tls -> the axum-server crate can terminate it
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
