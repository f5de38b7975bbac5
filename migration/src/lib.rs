pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_users_table;
mod m20250601_000002_create_refresh_tokens_table;
mod m20250602_000003_create_projects_table;
mod m20250602_000004_create_project_members_table;
mod m20250603_000005_create_project_folders_table;
mod m20250603_000006_create_project_media_table;
mod m20250604_000007_create_review_links_table;
mod m20250604_000008_create_project_tracks_table;
mod m20250605_000009_create_subscriptions_table;
mod m20250605_000010_create_notification_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users_table::Migration),
            Box::new(m20250601_000002_create_refresh_tokens_table::Migration),
            Box::new(m20250602_000003_create_projects_table::Migration),
            Box::new(m20250602_000004_create_project_members_table::Migration),
            Box::new(m20250603_000005_create_project_folders_table::Migration),
            Box::new(m20250603_000006_create_project_media_table::Migration),
            Box::new(m20250604_000007_create_review_links_table::Migration),
            Box::new(m20250604_000008_create_project_tracks_table::Migration),
            Box::new(m20250605_000009_create_subscriptions_table::Migration),
            Box::new(m20250605_000010_create_notification_tables::Migration),
        ]
    }
}
