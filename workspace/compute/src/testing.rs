use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use model::entities::account::{self, Role};

use crate::identity::{NewAccount, create_account};

pub const PASSWORD: &str = "secret-password";

/// Fresh in-memory database with the full schema.
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed.");
    db
}

pub fn new_account(username: &str) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        password: PASSWORD.to_string(),
        ..Default::default()
    }
}

/// Approved teacher with the default password.
pub async fn teacher(db: &DatabaseConnection, username: &str) -> account::Model {
    create_account(db, Role::Teacher, new_account(username), true, false)
        .await
        .expect("Failed to create teacher")
}

/// Approved student with the default password and a profile.
pub async fn student(db: &DatabaseConnection, username: &str) -> account::Model {
    create_account(db, Role::Student, new_account(username), true, false)
        .await
        .expect("Failed to create student")
}
