use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationPreferences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationPreferences::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationPreferences::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(NotificationPreferences::Category)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationPreferences::Enabled)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationPreferences::Delivery)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_preferences_user_id")
                            .from(
                                NotificationPreferences::Table,
                                NotificationPreferences::UserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_preferences_user_category")
                    .table(NotificationPreferences::Table)
                    .col(NotificationPreferences::UserId)
                    .col(NotificationPreferences::Category)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActivityNotifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityNotifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActivityNotifications::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ActivityNotifications::ProjectId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityNotifications::ActorId).uuid().not_null())
                    .col(
                        ColumnDef::new(ActivityNotifications::Category)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityNotifications::Title).string().not_null())
                    .col(ColumnDef::new(ActivityNotifications::Body).text().not_null())
                    .col(ColumnDef::new(ActivityNotifications::Media).json().not_null())
                    .col(
                        ColumnDef::new(ActivityNotifications::IsRead)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityNotifications::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_notifications_user_id")
                            .from(ActivityNotifications::Table, ActivityNotifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_notifications_project_id")
                            .from(
                                ActivityNotifications::Table,
                                ActivityNotifications::ProjectId,
                            )
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NotificationJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NotificationJobs::Status).string().not_null())
                    .col(ColumnDef::new(NotificationJobs::Payload).json().not_null())
                    .col(ColumnDef::new(NotificationJobs::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(NotificationJobs::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActivityNotifications::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(NotificationPreferences::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum NotificationPreferences {
    Table,
    Id,
    UserId,
    Category,
    Enabled,
    Delivery,
}

#[derive(DeriveIden)]
enum ActivityNotifications {
    Table,
    Id,
    UserId,
    ProjectId,
    ActorId,
    Category,
    Title,
    Body,
    Media,
    IsRead,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NotificationJobs {
    Table,
    Id,
    Status,
    Payload,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
