use anyhow::Result;
use compute::identity::{NewAccount, create_account};
use model::entities::account::Role;
use sea_orm::Database;
use tracing::{debug, error, info, trace};

/// Creates an approved superuser admin.
pub async fn create_admin(
    database_url: &str,
    username: &str,
    password: &str,
    full_name: Option<String>,
) -> Result<()> {
    trace!("Entering create_admin function");
    debug!("Database URL: {}", database_url);

    let db = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    let account = NewAccount {
        username: username.to_string(),
        password: password.to_string(),
        full_name,
        ..Default::default()
    };

    match create_account(&db, Role::Admin, account, true, true).await {
        Ok(admin) => {
            info!("Admin '{}' created with ID: {}", admin.username, admin.id);
            Ok(())
        }
        Err(e) => {
            error!("Failed to create admin '{}': {}", username, e);
            Err(e.into())
        }
    }
}
