mod db;
mod llm;
mod routes;
mod services;
mod state;

use services::crypto::MasterKey;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let master_key_b64 = std::env::var("MASTER_KEY").expect("MASTER_KEY required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let master_key = MasterKey::from_base64(&master_key_b64).expect("MASTER_KEY must be 32 bytes of base64");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    let state = state::AppState::new(pool, master_key);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "shapecast listening");
    axum::serve(listener, app).await.expect("server failed");
}
