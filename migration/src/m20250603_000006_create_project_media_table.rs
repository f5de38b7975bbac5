use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectMedia::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectMedia::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectMedia::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProjectMedia::FolderId).uuid())
                    .col(ColumnDef::new(ProjectMedia::ParentMediaId).uuid())
                    .col(ColumnDef::new(ProjectMedia::VersionNumber).integer().not_null())
                    .col(ColumnDef::new(ProjectMedia::DisplayOrder).integer().not_null())
                    .col(
                        ColumnDef::new(ProjectMedia::IsCurrentVersion)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectMedia::OriginalFilename)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectMedia::MimeType).string().not_null())
                    .col(ColumnDef::new(ProjectMedia::FileSize).big_integer().not_null())
                    .col(
                        ColumnDef::new(ProjectMedia::StorageKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ProjectMedia::ThumbnailKey).string())
                    .col(ColumnDef::new(ProjectMedia::Status).string().not_null())
                    .col(ColumnDef::new(ProjectMedia::UploadedBy).uuid().not_null())
                    .col(ColumnDef::new(ProjectMedia::UploadedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_media_project_id")
                            .from(ProjectMedia::Table, ProjectMedia::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_media_folder_id")
                            .from(ProjectMedia::Table, ProjectMedia::FolderId)
                            .to(ProjectFolders::Table, ProjectFolders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_media_parent_media_id")
                            .from(ProjectMedia::Table, ProjectMedia::ParentMediaId)
                            .to(ProjectMedia::Table, ProjectMedia::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_media_parent")
                    .table(ProjectMedia::Table)
                    .col(ProjectMedia::ParentMediaId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectMedia::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectMedia {
    Table,
    Id,
    ProjectId,
    FolderId,
    ParentMediaId,
    VersionNumber,
    DisplayOrder,
    IsCurrentVersion,
    OriginalFilename,
    MimeType,
    FileSize,
    StorageKey,
    ThumbnailKey,
    Status,
    UploadedBy,
    UploadedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ProjectFolders {
    Table,
    Id,
}
