use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{media, project_folder};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::services::access::{check_project_access, Capability};

fn normalize_folder_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Folder name cannot be empty".to_string()));
    }
    if trimmed.len() > 100 {
        return Err(AppError::Validation(
            "Folder name cannot exceed 100 characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateFolderRequest {
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FolderResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<project_folder::Model> for FolderResponse {
    fn from(f: project_folder::Model) -> Self {
        Self {
            id: f.id,
            project_id: f.project_id,
            name: f.name,
            created_at: f.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/folders",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 400, description = "Invalid folder name"),
        (status = 409, description = "Folder name already taken in this project")
    ),
    security(("bearer_auth" = [])),
    tag = "Folders"
)]
pub async fn create_folder(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<FolderResponse>), AppError> {
    check_project_access(&db, project_id, user.id, Capability::UploadMedia).await?;

    let name = normalize_folder_name(&payload.name)?;
    let duplicate = project_folder::Entity::find()
        .filter(project_folder::Column::ProjectId.eq(project_id))
        .filter(project_folder::Column::Name.eq(&name))
        .one(&db)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict(
            "A folder with this name already exists".to_string(),
        ));
    }

    let folder = project_folder::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        name: Set(name),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(FolderResponse::from(folder))))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/folders",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Folders of the project, oldest first", body = [FolderResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Folders"
)]
pub async fn list_folders(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<FolderResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;

    let folders = project_folder::Entity::find()
        .filter(project_folder::Column::ProjectId.eq(project_id))
        .order_by_asc(project_folder::Column::CreatedAt)
        .all(&db)
        .await?;

    Ok(Json(folders.into_iter().map(FolderResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/folders/{folder_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("folder_id" = Uuid, Path, description = "Folder ID")
    ),
    responses(
        (status = 200, description = "Folder deleted, its media moved to the project root"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Folders"
)]
pub async fn delete_folder(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, folder_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::UploadMedia).await?;

    let folder = project_folder::Entity::find_by_id(folder_id)
        .filter(project_folder::Column::ProjectId.eq(project_id))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("Folder not found".to_string()))?;

    // Media in the folder survives; only the grouping goes away.
    let txn = db.begin().await?;
    media::Entity::update_many()
        .col_expr(media::Column::FolderId, sea_orm::sea_query::Expr::value(Option::<Uuid>::None))
        .filter(media::Column::FolderId.eq(folder_id))
        .exec(&txn)
        .await?;
    project_folder::Entity::delete_by_id(folder.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(serde_json::json!({
        "message": "Folder deleted successfully",
        "id": folder_id
    })))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct MoveMediaRequest {
    /// Target folder, or null to move the media back to the project root.
    pub folder_id: Option<Uuid>,
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}/media/{media_id}/folder",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Root media ID")
    ),
    request_body = MoveMediaRequest,
    responses(
        (status = 200, description = "Media moved", body = crate::routes::media::MediaResponse),
        (status = 400, description = "Media is a version, not a root"),
        (status = 404, description = "Media or folder not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Folders"
)]
pub async fn move_media_to_folder(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveMediaRequest>,
) -> Result<Json<crate::routes::media::MediaResponse>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::UploadMedia).await?;

    let item = crate::routes::media::find_media(&db, project_id, media_id).await?;
    if item.parent_media_id.is_some() {
        return Err(AppError::Validation(
            "Only the root of a version chain can be moved between folders".to_string(),
        ));
    }

    if let Some(folder_id) = payload.folder_id {
        project_folder::Entity::find_by_id(folder_id)
            .filter(project_folder::Column::ProjectId.eq(project_id))
            .one(&db)
            .await?
            .ok_or_else(|| AppError::NotFound("Folder not found".to_string()))?;
    }

    let mut active = item.into_active_model();
    active.folder_id = Set(payload.folder_id);
    let updated = active.update(&db).await?;

    Ok(Json(crate::routes::media::MediaResponse::from(updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_names_are_trimmed() {
        assert_eq!(normalize_folder_name("  Rough Cuts  ").unwrap(), "Rough Cuts");
    }

    #[test]
    fn blank_folder_names_are_rejected() {
        assert!(matches!(
            normalize_folder_name("   ").unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn overlong_folder_names_are_rejected() {
        let name = "x".repeat(101);
        assert!(matches!(
            normalize_folder_name(&name).unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
