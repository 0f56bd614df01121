pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::{Config, StoreBackend};
use database::Database;
use models::NewUser;
use services::reservations::ReservationEngine;
use store::{MemoryStore, PgStore, Store};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub reservations: ReservationEngine,
    pub config: Config,
}

impl AppState {
    /// Opens the configured backend and makes sure the admin account exists.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn Store> = match config.database.backend {
            StoreBackend::Postgres => {
                let db = Database::connect(&config.database).await?;
                db.run_migrations().await?;
                tracing::info!("database connected, migrations applied");
                Arc::new(PgStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let state = Self::with_store(store, config);
        state.ensure_admin().await?;
        Ok(state)
    }

    pub fn with_store(store: Arc<dyn Store>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            reservations: ReservationEngine::new(store.clone()),
            store,
            config,
        })
    }

    async fn ensure_admin(&self) -> anyhow::Result<()> {
        let (Some(email), Some(password)) = (
            self.config.auth.admin_email.as_deref(),
            self.config.auth.admin_password.as_deref(),
        ) else {
            return Ok(());
        };

        if self.store.find_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        let password_hash =
            services::auth::hash_password(password.to_string(), self.config.auth.bcrypt_cost)
                .await
                .map_err(|e| anyhow::anyhow!("hashing admin password: {e}"))?;
        let admin = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                is_staff: true,
            })
            .await?;
        tracing::info!(user_id = admin.id, "admin account created");
        Ok(())
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Theatre booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
