use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One uploaded file. A row with `parent_media_id = None` is the root of
/// its version chain; child versions point at the root. Exactly one row
/// per chain carries `is_current_version = true`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "project_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub parent_media_id: Option<Uuid>,
    pub version_number: i32,
    pub display_order: i32,
    pub is_current_version: bool,
    pub original_filename: String,
    pub mime_type: String,
    pub file_size: i64,
    #[sea_orm(unique)]
    pub storage_key: String,
    pub thumbnail_key: Option<String>,
    pub status: String, // in_progress, needs_review, approved, rejected
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::project_folder::Entity",
        from = "Column::FolderId",
        to = "super::project_folder::Column::Id",
        on_delete = "SetNull"
    )]
    Folder,
    #[sea_orm(has_many = "super::review_link::Entity")]
    ReviewLink,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::project_folder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Folder.def()
    }
}

impl Related<super::review_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewLink.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
