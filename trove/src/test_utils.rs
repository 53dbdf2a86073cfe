//! Shared constructors for tests.

use std::sync::Arc;

use axum_test::TestServer;
use sqlx::SqlitePool;

use crate::{
    auth::password,
    config::{Config, DummyConfig, PaymentConfig},
    db::{
        handlers::{file_storage::LocalFileStorage, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    payment_providers::create_provider,
    AppState,
};

/// Password every test user is created with.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.secret_key = Some("unit-test-secret-key".to_string());
    config.auth.native.session.cookie_secure = false;
    config.uploads.path = std::env::temp_dir().join("trove-test-uploads");
    config
}

/// App state with the dummy payment provider and a temp-dir blob store.
pub async fn create_test_app_state(pool: SqlitePool) -> AppState {
    let config = create_test_config();
    tokio::fs::create_dir_all(&config.uploads.path).await.ok();

    AppState {
        db: pool,
        file_storage: Arc::new(LocalFileStorage::new(config.uploads.path.clone())),
        payment_provider: Some(Arc::from(create_provider(PaymentConfig::Dummy(DummyConfig::default())))),
        config,
    }
}

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    let state = create_test_app_state(pool).await;
    TestServer::new(crate::build_router(state)).expect("Failed to create test server")
}

/// Create a native-auth user with [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &SqlitePool, email: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    let mut users = Users::new(&mut conn);

    users
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            display_name: None,
            auth_source: "native".to_string(),
            password_hash: Some(password::hash_string(TEST_PASSWORD).unwrap()),
        })
        .await
        .unwrap()
}

/// Log in over HTTP and hand back the `cookie` header value for follow-ups.
pub async fn login_cookie(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/authentication/login")
        .form(&[("email", email), ("password", TEST_PASSWORD)])
        .await;

    let cookie = response.header("set-cookie");
    cookie.to_str().unwrap().split(';').next().unwrap().to_string()
}
