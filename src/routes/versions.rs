use axum::{
    extract::{Extension, Path, State},
    Json,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::notification_preference::Category;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::routes::media::{
    apply_chain_plan, find_media, load_chain, snapshot, MediaResponse,
};
use crate::services::access::{check_project_access, Capability};
use crate::services::notifier::{self, NotificationPayload};
use crate::services::storage::StorageService;
use crate::versioning;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateVersionRequest {
    /// Chain whose current version is moved into the target chain.
    pub source_media_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/media/{media_id}/versions",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Target chain media ID")
    ),
    request_body = CreateVersionRequest,
    responses(
        (status = 200, description = "Updated target chain", body = [MediaResponse]),
        (status = 400, description = "Source already belongs to the target chain"),
        (status = 404, description = "Media not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Versions"
)]
pub async fn create_version(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateVersionRequest>,
) -> Result<Json<Vec<MediaResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::ManageVersions).await?;

    let target = find_media(&db, project_id, media_id).await?;
    let source = find_media(&db, project_id, payload.source_media_id).await?;

    let target_chain = load_chain(&db, &target).await?;
    let source_chain = load_chain(&db, &source).await?;

    if target_chain.iter().any(|m| m.id == source.id) {
        return Err(AppError::Validation(
            "Media is already a version of this item".to_string(),
        ));
    }

    let target_snap = snapshot(&target_chain);
    let source_snap = snapshot(&source_chain);
    // The row that moves is the source chain's current version, which
    // is not necessarily the row the caller named.
    let moved_id = versioning::current_of(&source_snap)
        .ok_or_else(|| AppError::NotFound("Source media chain is empty".to_string()))?
        .id;
    let plan = versioning::plan_create_version(&target_snap, &source_snap)?;

    // Whole reorganization commits or none of it does.
    let txn = db.begin().await?;
    apply_chain_plan(&txn, &plan).await?;
    if source.folder_id != target.folder_id {
        // The moved row lives in the target chain now; it follows the
        // target's folder.
        use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
        let moved = find_media(&txn, project_id, moved_id).await?;
        let mut active = moved.into_active_model();
        active.folder_id = Set(target.folder_id);
        active.update(&txn).await?;
    }
    txn.commit().await?;

    let target = find_media(&db, project_id, media_id).await?;
    let chain = load_chain(&db, &target).await?;
    Ok(Json(chain.into_iter().map(MediaResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/media/{media_id}/versions/{version_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Any media ID of the chain"),
        ("version_id" = Uuid, Path, description = "Version row to delete")
    ),
    responses(
        (status = 200, description = "Version deleted and chain renumbered"),
        (status = 400, description = "Version is the chain root"),
        (status = 404, description = "Version not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Versions"
)]
pub async fn delete_version(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id, version_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::ManageVersions).await?;

    let item = find_media(&db, project_id, media_id).await?;
    let chain = load_chain(&db, &item).await?;
    let victim = chain
        .iter()
        .find(|m| m.id == version_id)
        .ok_or_else(|| AppError::NotFound("Version not found".to_string()))?;
    let storage_key = victim.storage_key.clone();
    let thumbnail_key = victim.thumbnail_key.clone();
    let filename = victim.original_filename.clone();

    let plan = versioning::plan_delete_version(&snapshot(&chain), version_id)?;

    let txn = db.begin().await?;
    apply_chain_plan(&txn, &plan).await?;
    notifier::enqueue(
        &txn,
        &NotificationPayload {
            project_id,
            actor_id: user.id,
            category: Category::Media,
            activity: "media_deleted".to_string(),
            title: format!("A version of {} was deleted", filename),
            body: format!("Version \"{}\" was removed", filename),
            media: vec![filename],
        },
    )
    .await?;
    txn.commit().await?;

    let storage = StorageService::new().await;
    storage
        .delete_media_objects(&storage_key, thumbnail_key.as_deref())
        .await;

    Ok(Json(serde_json::json!({
        "message": "Version deleted successfully",
        "id": version_id
    })))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReorderVersionsRequest {
    /// Every chain row exactly once; the last entry becomes current.
    pub ordered_ids: Vec<Uuid>,
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/media/{media_id}/versions/order",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Any media ID of the chain")
    ),
    request_body = ReorderVersionsRequest,
    responses(
        (status = 200, description = "Renumbered chain", body = [MediaResponse]),
        (status = 400, description = "Order list is not a permutation of the chain")
    ),
    security(("bearer_auth" = [])),
    tag = "Versions"
)]
pub async fn reorder_versions(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReorderVersionsRequest>,
) -> Result<Json<Vec<MediaResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::ManageVersions).await?;

    let item = find_media(&db, project_id, media_id).await?;
    let chain = load_chain(&db, &item).await?;
    let plan = versioning::plan_reorder_versions(&snapshot(&chain), &payload.ordered_ids)?;

    let txn = db.begin().await?;
    apply_chain_plan(&txn, &plan).await?;
    txn.commit().await?;

    let item = find_media(&db, project_id, media_id).await?;
    let chain = load_chain(&db, &item).await?;
    Ok(Json(chain.into_iter().map(MediaResponse::from).collect()))
}
