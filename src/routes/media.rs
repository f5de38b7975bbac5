use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::notification_preference::Category;
use crate::entities::{media, review_link};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::pagination::PaginatedResponse;
use crate::services::access::{check_project_access, Capability};
use crate::services::notifier::{self, NotificationPayload};
use crate::services::storage::StorageService;
use crate::utils::format::{format_file_size, format_status};
use crate::versioning::{self, ChainPlan, MediaVersion};

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaResponse {
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
    pub file_size_display: String,
    pub status: String,
    pub status_display: String,
    pub thumbnail_key: Option<String>,
    pub uploaded_at: chrono::NaiveDateTime,
}

impl From<media::Model> for MediaResponse {
    fn from(m: media::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            folder_id: m.folder_id,
            parent_media_id: m.parent_media_id,
            version_number: m.version_number,
            display_order: m.display_order,
            is_current_version: m.is_current_version,
            original_filename: m.original_filename,
            mime_type: m.mime_type,
            file_size: m.file_size,
            file_size_display: format_file_size(m.file_size),
            status: m.status.clone(),
            status_display: format_status(&m.status),
            thumbnail_key: m.thumbnail_key,
            uploaded_at: m.uploaded_at,
        }
    }
}

pub(crate) async fn find_media<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    media_id: Uuid,
) -> Result<media::Model, AppError> {
    media::Entity::find_by_id(media_id)
        .filter(media::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))
}

/// Loads the full version chain (root + every row pointing at it) of the
/// chain containing `item`.
pub(crate) async fn load_chain<C: ConnectionTrait>(
    db: &C,
    item: &media::Model,
) -> Result<Vec<media::Model>, AppError> {
    let root_id = item.parent_media_id.unwrap_or(item.id);
    let rows = media::Entity::find()
        .filter(
            sea_orm::Condition::any()
                .add(media::Column::Id.eq(root_id))
                .add(media::Column::ParentMediaId.eq(root_id)),
        )
        .order_by_asc(media::Column::VersionNumber)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("Version chain not found".to_string()));
    }
    Ok(rows)
}

pub(crate) fn snapshot(rows: &[media::Model]) -> Vec<MediaVersion> {
    rows.iter().map(MediaVersion::from).collect()
}

/// Applies a computed `ChainPlan` on an open transaction: row updates,
/// deletions, and review-link relinking, in that order.
pub(crate) async fn apply_chain_plan<C: ConnectionTrait>(
    db: &C,
    plan: &ChainPlan,
) -> Result<(), AppError> {
    for update in &plan.updates {
        let row = media::Entity::find_by_id(update.id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Media row vanished mid-update".to_string()))?;
        let mut active = row.into_active_model();
        if let Some(parent) = update.parent_media_id {
            active.parent_media_id = Set(parent);
        }
        if let Some(n) = update.version_number {
            active.version_number = Set(n);
        }
        if let Some(d) = update.display_order {
            active.display_order = Set(d);
        }
        if let Some(c) = update.is_current_version {
            active.is_current_version = Set(c);
        }
        active.update(db).await?;
    }

    if let Some((from, to)) = plan.relink_review_links {
        review_link::Entity::update_many()
            .col_expr(review_link::Column::MediaId, sea_orm::sea_query::Expr::value(to))
            .filter(review_link::Column::MediaId.eq(from))
            .exec(db)
            .await?;
    }
    if let Some(media_id) = plan.delete_review_links_for {
        review_link::Entity::delete_many()
            .filter(review_link::Column::MediaId.eq(media_id))
            .exec(db)
            .await?;
    }

    for id in &plan.deletes {
        media::Entity::delete_by_id(*id).exec(db).await?;
    }

    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListMediaQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub folder_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/media",
    params(("project_id" = Uuid, Path, description = "Project ID"), ListMediaQuery),
    responses(
        (status = 200, description = "Media roots ordered by display order", body = PaginatedResponse<MediaResponse>),
        (status = 403, description = "Not a project member"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn list_media(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ListMediaQuery>,
) -> Result<Json<PaginatedResponse<MediaResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let mut finder = media::Entity::find()
        .filter(media::Column::ProjectId.eq(project_id))
        .filter(media::Column::ParentMediaId.is_null());
    if let Some(folder_id) = query.folder_id {
        finder = finder.filter(media::Column::FolderId.eq(folder_id));
    }

    let paginator = finder
        .order_by_asc(media::Column::DisplayOrder)
        .paginate(&db, limit);

    let total_items = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;
    let data: Vec<MediaResponse> = items.into_iter().map(MediaResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/media/{media_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Media ID")
    ),
    responses(
        (status = 200, description = "The media item and its full version chain", body = [MediaResponse]),
        (status = 404, description = "Media not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn get_media(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<MediaResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;
    let item = find_media(&db, project_id, media_id).await?;
    let chain = load_chain(&db, &item).await?;
    Ok(Json(chain.into_iter().map(MediaResponse::from).collect()))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateMediaStatusRequest {
    pub status: String,
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}/media/{media_id}/status",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Media ID")
    ),
    request_body = UpdateMediaStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MediaResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Media not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn update_media_status(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMediaStatusRequest>,
) -> Result<Json<MediaResponse>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::UploadMedia).await?;

    const STATUSES: [&str; 4] = ["in_progress", "needs_review", "approved", "rejected"];
    if !STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown media status \"{}\"",
            payload.status
        )));
    }

    let item = find_media(&db, project_id, media_id).await?;
    let filename = item.original_filename.clone();

    let txn = db.begin().await?;
    let mut active = item.into_active_model();
    active.status = Set(payload.status.clone());
    let updated = active.update(&txn).await?;

    notifier::enqueue(
        &txn,
        &NotificationPayload {
            project_id,
            actor_id: user.id,
            category: Category::StatusChange,
            activity: "status_changed".to_string(),
            title: format!("{} is now {}", filename, format_status(&payload.status)),
            body: format!(
                "The status of \"{}\" changed to {}",
                filename,
                format_status(&payload.status)
            ),
            media: vec![filename],
        },
    )
    .await?;
    txn.commit().await?;

    Ok(Json(MediaResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/media/{media_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Media ID, root or version")
    ),
    responses(
        (status = 200, description = "Media deleted; chain reorganized if a root was removed"),
        (status = 403, description = "Missing delete permission"),
        (status = 404, description = "Media not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn delete_media(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::DeleteMedia).await?;

    let item = find_media(&db, project_id, media_id).await?;
    let storage_key = item.storage_key.clone();
    let thumbnail_key = item.thumbnail_key.clone();
    let filename = item.original_filename.clone();

    let chain = load_chain(&db, &item).await?;
    let plan = versioning::plan_delete_media(&snapshot(&chain), media_id)?;

    let txn = db.begin().await?;
    apply_chain_plan(&txn, &plan).await?;
    notifier::enqueue(
        &txn,
        &NotificationPayload {
            project_id,
            actor_id: user.id,
            category: Category::Media,
            activity: "media_deleted".to_string(),
            title: format!("{} was deleted", filename),
            body: format!("\"{}\" was removed from the project", filename),
            media: vec![filename],
        },
    )
    .await?;
    txn.commit().await?;

    // Best effort only; the database row is already gone.
    let storage = StorageService::new().await;
    storage
        .delete_media_objects(&storage_key, thumbnail_key.as_deref())
        .await;

    Ok(Json(serde_json::json!({
        "message": "Media deleted successfully",
        "id": media_id
    })))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct DisplayOrderRequest {
    /// Every root media ID of the project (or folder) in the desired order.
    pub ordered_ids: Vec<Uuid>,
    pub folder_id: Option<Uuid>,
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/media/order",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = DisplayOrderRequest,
    responses(
        (status = 200, description = "Display order updated"),
        (status = 400, description = "Order list is not a permutation")
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn set_display_order(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<DisplayOrderRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::ManageVersions).await?;

    let mut finder = media::Entity::find()
        .filter(media::Column::ProjectId.eq(project_id))
        .filter(media::Column::ParentMediaId.is_null());
    if let Some(folder_id) = payload.folder_id {
        finder = finder.filter(media::Column::FolderId.eq(folder_id));
    } else {
        finder = finder.filter(media::Column::FolderId.is_null());
    }
    let rows = finder.all(&db).await?;

    let plan = versioning::plan_set_display_order(&snapshot(&rows), &payload.ordered_ids)?;

    let txn = db.begin().await?;
    apply_chain_plan(&txn, &plan).await?;
    txn.commit().await?;

    Ok(Json(serde_json::json!({
        "message": "Display order updated"
    })))
}
