mod config;
mod entities;
mod error;
mod middleware;
mod models;
mod pagination;
mod routes;
mod services;
mod utils;
mod versioning;

use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::services::notifier::NotificationWorker;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::get_config();

    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("migrations applied");

    // Outbox worker: drains notification_jobs in the background.
    let worker = NotificationWorker::new(db.clone());
    tokio::spawn(async move {
        worker.run().await;
    });

    let app = routes::create_routes(db)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind 0.0.0.0:3000");
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Server error");
}
