use anyhow::Result;
use compute::access::ApprovalPolicy;
use config::{Config, Environment, File};
use model::entities::account::Role;
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::schemas::AppState;

const DEFAULT_SETTINGS_FILE: &str = "rollcall";

/// Runtime settings.
///
/// Layered as built-in defaults, then the settings file, then `ROLLCALL_*`
/// environment variables (`ROLLCALL_ROLES_REQUIRING_APPROVAL=teacher,admin`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub roles_requiring_approval: Vec<Role>,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roles_requiring_approval: vec![Role::Admin, Role::Teacher, Role::Student],
            session_ttl_hours: 24 * 14,
            cookie_secure: false,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = Settings::default();
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default(
                "roles_requiring_approval",
                defaults
                    .roles_requiring_approval
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>(),
            )?
            .set_default("session_ttl_hours", defaults.session_ttl_hours)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("ROLLCALL")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("roles_requiring_approval"),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::new(self.roles_requiring_approval.iter().copied())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

/// Initialize application state with a specific database URL
pub async fn initialize_app_state_with_url(
    database_url: &str,
    config_path: Option<&str>,
) -> Result<AppState> {
    let settings = Settings::load(config_path)?;

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState::new(db, settings))
}
