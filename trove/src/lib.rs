//! # trove: self-hostable personal asset tracking
//!
//! `trove` is a multi-tenant web service for keeping track of personal
//! assets across three domains: a **garage** (vehicles with maintenance
//! history and mileage alerts), an **armory** (firearms with accessories and
//! range sessions), and a **humidor** (cigar inventory with tasting sessions
//! and a cross-user community catalog). Accounts come with session-cookie
//! authentication, image/receipt uploads, per-user analytics, and optional
//! subscription billing through an external payment provider.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and SQLite (via SQLx) for persistence, which keeps a
//! single-binary deployment self-contained.
//!
//! ### Request Flow
//!
//! A request is authenticated first - session cookie, or a trusted
//! identity-provider header when configured ([`auth`]). The handler then
//! parses the form or multipart body, and calls into a repository
//! ([`db::handlers`]) holding all SQL for that aggregate. Every repository
//! call takes the owning user id and re-resolves the target root row against
//! it; a row owned by someone else behaves exactly like a missing row, so
//! handlers cannot leak existence. Mutations answer `303 See Other`
//! redirects; reads answer JSON.
//!
//! Uploaded files go through a [`db::handlers::file_storage::FileStorage`]
//! backend that writes them under a per-domain subdirectory with a generated
//! unique name and hands back the relative path - the only handle the
//! database keeps. Stored files are served read-only under `/uploads`.
//!
//! Billing ([`payment_providers`]) is a thin proxy: customer records are
//! created lazily on the first billing action, checkout and portal requests
//! redirect to provider-hosted pages, and inbound webhooks are signature
//! verified and mapped onto a local subscription-status overwrite.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use trove::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = trove::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     trove::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod payment_providers;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::db::handlers::file_storage::{FileStorage, LocalFileStorage};
use crate::openapi::ApiDoc;
use crate::payment_providers::{create_provider, PaymentProvider};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub file_storage: Arc<dyn FileStorage>,
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
}

/// Get the trove database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Open the database pool and bring the schema up to date.
#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
    migrator().run(&pool).await?;

    Ok(pool)
}

/// Build the main application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads.path.clone();

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Authentication
        .route(
            "/authentication/register",
            get(api::handlers::auth::get_registration_info).post(api::handlers::auth::register),
        )
        .route(
            "/authentication/login",
            get(api::handlers::auth::get_login_info).post(api::handlers::auth::login),
        )
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route(
            "/authentication/profile",
            get(api::handlers::auth::get_profile).post(api::handlers::auth::update_profile),
        )
        // Garage
        .route("/garage", get(api::handlers::garage::list_vehicles).post(api::handlers::garage::create_vehicle))
        .route("/garage/{id}", get(api::handlers::garage::get_vehicle).post(api::handlers::garage::update_vehicle))
        .route("/garage/{id}/odometer", post(api::handlers::garage::update_odometer))
        .route("/garage/{id}/services", post(api::handlers::garage::add_service_log))
        .route("/garage/{id}/dispose", post(api::handlers::garage::dispose_vehicle))
        // Armory
        .route("/armory", get(api::handlers::armory::list_guns).post(api::handlers::armory::create_gun))
        .route("/armory/{id}", get(api::handlers::armory::get_gun).post(api::handlers::armory::update_gun))
        .route("/armory/{id}/accessories", post(api::handlers::armory::add_accessory))
        .route("/armory/{id}/sessions", post(api::handlers::armory::add_range_session))
        .route("/armory/{id}/dispose", post(api::handlers::armory::dispose_gun))
        // Humidor (static segments before the id routes)
        .route("/humidor/community", get(api::handlers::humidor::community_catalog))
        .route("/humidor/community/add", post(api::handlers::humidor::add_from_catalog))
        .route("/humidor/options", get(api::handlers::humidor::catalog_options))
        .route("/humidor", get(api::handlers::humidor::list_cigars).post(api::handlers::humidor::create_cigar))
        .route("/humidor/{id}", get(api::handlers::humidor::get_cigar).post(api::handlers::humidor::update_cigar))
        .route("/humidor/{id}/sessions", post(api::handlers::humidor::add_smoking_session))
        .route("/humidor/{id}/dispose", post(api::handlers::humidor::dispose_cigar))
        // Analytics
        .route("/analytics", get(api::handlers::analytics::dashboard))
        // Billing
        .route("/billing", get(api::handlers::billing::billing_info))
        .route("/billing/checkout", post(api::handlers::billing::create_checkout))
        .route("/billing/portal", get(api::handlers::billing::customer_portal))
        // Webhook routes (external services, not part of the browser surface)
        .route("/webhooks/billing", post(api::handlers::billing::webhook_handler))
        // Uploaded images and receipts
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        // Generous body cap so the per-file limits are what actually bind
        .layer(axum::extract::DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(state);

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] opens the database, runs migrations,
///    prepares the blob store, and wires the payment provider
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;

        tokio::fs::create_dir_all(&config.uploads.path).await?;
        let file_storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(config.uploads.path.clone()));

        let payment_provider: Option<Arc<dyn PaymentProvider>> = config.payment.clone().map(|payment| Arc::from(create_provider(payment)));
        if payment_provider.is_none() {
            info!("No payment provider configured; billing endpoints will degrade gracefully");
        }

        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
            file_storage,
            payment_provider,
        };

        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("trove listening on http://{bind_addr}");

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
