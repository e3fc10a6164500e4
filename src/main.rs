mod component;
mod config;
mod db;
mod frame;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let state = state::AppState::from_pool(pool).with_ws_channel_capacity(config.ws_channel_capacity);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "question feed listening");
    axum::serve(listener, app).await.expect("server failed");
}
