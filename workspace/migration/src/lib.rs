pub use sea_orm_migration::prelude::*;

mod m20240901_000001_create_table;
mod m20240915_000001_add_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240901_000001_create_table::Migration),
            Box::new(m20240915_000001_add_sessions::Migration),
        ]
    }
}
