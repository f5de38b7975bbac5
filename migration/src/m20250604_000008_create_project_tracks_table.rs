use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectTracks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectTracks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectTracks::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProjectTracks::RoundNumber).integer().not_null())
                    .col(
                        ColumnDef::new(ProjectTracks::ClientDecision)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectTracks::Steps).json().not_null())
                    .col(ColumnDef::new(ProjectTracks::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(ProjectTracks::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_tracks_project_id")
                            .from(ProjectTracks::Table, ProjectTracks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectTracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectTracks {
    Table,
    Id,
    ProjectId,
    RoundNumber,
    ClientDecision,
    Steps,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
