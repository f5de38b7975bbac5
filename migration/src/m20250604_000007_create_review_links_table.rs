use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReviewLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewLinks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReviewLinks::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ReviewLinks::MediaId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReviewLinks::LinkToken)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ReviewLinks::Title).string().not_null())
                    .col(ColumnDef::new(ReviewLinks::IsActive).boolean().not_null())
                    .col(ColumnDef::new(ReviewLinks::PasswordHash).string())
                    .col(ColumnDef::new(ReviewLinks::AllowDownload).boolean().not_null())
                    .col(ColumnDef::new(ReviewLinks::ExpiresAt).timestamp())
                    .col(ColumnDef::new(ReviewLinks::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_links_project_id")
                            .from(ReviewLinks::Table, ReviewLinks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_links_media_id")
                            .from(ReviewLinks::Table, ReviewLinks::MediaId)
                            .to(ProjectMedia::Table, ProjectMedia::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReviewLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReviewLinks {
    Table,
    Id,
    ProjectId,
    MediaId,
    LinkToken,
    Title,
    IsActive,
    PasswordHash,
    AllowDownload,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ProjectMedia {
    Table,
    Id,
}
