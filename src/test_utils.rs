use crate::config::Settings;
use crate::router::create_router;
use crate::schemas::AppState;
use axum::http::{HeaderValue, StatusCode, header};
use axum::Router;
use axum_test::TestServer;
use compute::identity::{NewAccount, create_account};
use migration::{Migrator, MigratorTrait};
use model::entities::account::{self, Role};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const TEST_PASSWORD: &str = "correct-horse";

/// Create an in-memory SQLite database for testing
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    // Run migrations
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Create AppState for testing
pub async fn setup_test_app_state(settings: Settings) -> AppState {
    AppState::new(setup_test_db().await, settings)
}

/// Initialize tracing for tests with output to STDERR.
///
/// The log level is taken from RUST_LOG, defaulting to WARN.
fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| match level.to_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        })
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// A running test server with direct access to its database.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _tracing: tracing::subscriber::DefaultGuard,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let tracing = init_test_tracing();
        let state = setup_test_app_state(settings).await;
        let router: Router = create_router(state.clone());
        let server = TestServer::new(router).expect("Failed to start test server");
        Self {
            server,
            state,
            _tracing: tracing,
        }
    }

    /// Inserts an approved account directly, bypassing the HTTP layer.
    pub async fn account(&self, role: Role, username: &str) -> account::Model {
        self.account_with(role, username, true, false).await
    }

    pub async fn account_with(
        &self,
        role: Role,
        username: &str,
        approved: bool,
        superuser: bool,
    ) -> account::Model {
        let new_account = NewAccount {
            username: username.to_string(),
            password: TEST_PASSWORD.to_string(),
            ..Default::default()
        };
        create_account(&self.state.db, role, new_account, approved, superuser)
            .await
            .expect("Failed to create test account")
    }

    /// Logs in through `/login` and returns the `Cookie` header to send back.
    pub async fn login(&self, username: &str) -> HeaderValue {
        let response = self
            .server
            .post("/login")
            .form(&LoginFields {
                username,
                password: TEST_PASSWORD,
            })
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let set_cookie = response.header(header::SET_COOKIE);
        let pair = set_cookie
            .to_str()
            .expect("Set-Cookie is not ASCII")
            .split(';')
            .next()
            .expect("Empty Set-Cookie")
            .to_string();
        HeaderValue::from_str(&pair).expect("Invalid cookie")
    }
}

#[derive(Serialize)]
struct LoginFields<'a> {
    username: &'a str,
    password: &'a str,
}
