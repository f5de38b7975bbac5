use axum::{
    extract::{Extension, Multipart, Path, State},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::notification_preference::Category;
use crate::entities::{media, subscription};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::plan::{PlanInfo, UploadCheck};
use crate::routes::media::MediaResponse;
use crate::services::access::{check_project_access, Capability};
use crate::services::notifier::{self, NotificationPayload};
use crate::services::storage::StorageService;

fn get_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin")
        .to_string()
}

/// Builds the media rows for a batch, contiguous display order starting
/// at `first_order`. One row per file, each a fresh chain root.
fn build_batch_rows(
    project_id: Uuid,
    uploader_id: Uuid,
    files: &[(String, String, i64)],
    first_order: i32,
) -> Vec<media::ActiveModel> {
    files
        .iter()
        .enumerate()
        .map(|(i, (filename, content_type, size))| {
            let media_id = Uuid::new_v4();
            let ext = get_extension(filename);
            media::ActiveModel {
                id: Set(media_id),
                project_id: Set(project_id),
                folder_id: Set(None),
                parent_media_id: Set(None),
                version_number: Set(1),
                display_order: Set(first_order + i as i32),
                is_current_version: Set(true),
                original_filename: Set(filename.clone()),
                mime_type: Set(content_type.clone()),
                file_size: Set(*size),
                storage_key: Set(format!("{}/media/{}.{}", project_id, media_id, ext)),
                thumbnail_key: Set(None),
                status: Set("in_progress".to_string()),
                uploaded_by: Set(uploader_id),
                uploaded_at: Set(chrono::Utc::now().naive_utc()),
            }
        })
        .collect()
}

/// Bytes currently stored across every project the user owns.
pub(crate) async fn storage_used(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<i64, AppError> {
    use crate::entities::project;

    let project_ids: Vec<Uuid> = project::Entity::find()
        .filter(project::Column::EditorId.eq(user_id))
        .filter(project::Column::DeletedAt.is_null())
        .select_only()
        .column(project::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    if project_ids.is_empty() {
        return Ok(0);
    }

    let sizes: Vec<i64> = media::Entity::find()
        .filter(media::Column::ProjectId.is_in(project_ids))
        .select_only()
        .column(media::Column::FileSize)
        .into_tuple()
        .all(db)
        .await?;

    Ok(sizes.iter().sum())
}

pub(crate) async fn plan_for(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<PlanInfo, AppError> {
    let sub = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(PlanInfo::derive(sub.as_ref(), chrono::Utc::now().naive_utc()))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/upload",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded media rows", body = [MediaResponse]),
        (status = 400, description = "Quota exceeded or empty upload"),
        (status = 403, description = "Missing upload permission")
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn upload_media(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Vec<MediaResponse>>, AppError> {
    let (project, _) =
        check_project_access(&db, project_id, user.id, Capability::UploadMedia).await?;

    // Read the whole batch first so the quota verdict covers it as one.
    let mut files: Vec<(String, String, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Invalid multipart data".to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("unknown").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|_| {
                AppError::InternalServerError("Failed to read file bytes".to_string())
            })?;
            files.push((filename, content_type, data.to_vec()));
        }
    }
    if files.is_empty() {
        return Err(AppError::Validation("No file field found".to_string()));
    }

    // Quota check against the project owner's plan, not the uploader's.
    let plan = plan_for(&db, project.editor_id).await?;
    let used = storage_used(&db, project.editor_id).await?;
    let batch: Vec<(String, i64)> = files
        .iter()
        .map(|(name, _, data)| (name.clone(), data.len() as i64))
        .collect();
    let check = UploadCheck::evaluate(&batch, used, &plan.limits);
    if !check.allowed {
        return Err(AppError::Validation(
            check.reason.unwrap_or_else(|| "Upload not allowed".to_string()),
        ));
    }

    let max_order: Option<i32> = media::Entity::find()
        .filter(media::Column::ProjectId.eq(project_id))
        .filter(media::Column::ParentMediaId.is_null())
        .select_only()
        .column_as(media::Column::DisplayOrder.max(), "max_order")
        .into_tuple()
        .one(&db)
        .await?
        .flatten();
    let next_order = max_order.unwrap_or(-1) + 1;

    let metadata: Vec<(String, String, i64)> = files
        .iter()
        .map(|(name, ct, data)| (name.clone(), ct.clone(), data.len() as i64))
        .collect();
    let rows = build_batch_rows(project_id, user.id, &metadata, next_order);
    let filenames: Vec<String> = metadata.into_iter().map(|(name, _, _)| name).collect();

    // Push objects to storage first; the rows and the notification job
    // then land together in a single transaction so a partial failure
    // never commits media without its job (or half the batch).
    let storage = StorageService::new().await;
    for (row, (_, content_type, data)) in rows.iter().zip(files) {
        if let sea_orm::ActiveValue::Set(ref key) = row.storage_key {
            storage.put_object(key, data, &content_type).await?;
        }
    }

    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        created.push(row.insert(&txn).await?);
    }
    notifier::enqueue(
        &txn,
        &NotificationPayload {
            project_id,
            actor_id: user.id,
            category: Category::Media,
            activity: "media_uploaded".to_string(),
            title: format!("{} new upload(s)", filenames.len()),
            body: format!("New media uploaded: {}", filenames.join(", ")),
            media: filenames,
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        "upload | project={} | files={} | user={}",
        project_id,
        created.len(),
        user.email
    );

    Ok(Json(created.into_iter().map(MediaResponse::from).collect()))
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct UploadCheckResponse {
    pub check: UploadCheck,
    pub used_bytes: i64,
    pub limit_bytes: i64,
    pub max_upload_bytes: i64,
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct UploadCheckRequest {
    /// (filename, size in bytes) pairs of the prospective batch.
    pub files: Vec<(String, i64)>,
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/upload/check",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = UploadCheckRequest,
    responses(
        (status = 200, description = "Verdict used to enable/disable the upload control", body = UploadCheckResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn check_upload(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UploadCheckRequest>,
) -> Result<Json<UploadCheckResponse>, AppError> {
    let (project, _) = check_project_access(&db, project_id, user.id, Capability::View).await?;

    let plan = plan_for(&db, project.editor_id).await?;
    let used = storage_used(&db, project.editor_id).await?;
    let check = UploadCheck::evaluate(&payload.files, used, &plan.limits);

    Ok(Json(UploadCheckResponse {
        check,
        used_bytes: used,
        limit_bytes: plan.limits.storage_bytes,
        max_upload_bytes: plan.limits.max_upload_bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn unwrap_set<T>(v: &ActiveValue<T>) -> T
    where
        T: Clone + std::fmt::Debug + Into<sea_orm::Value>,
    {
        match v {
            ActiveValue::Set(inner) => inner.clone(),
            other => panic!("expected Set, got {:?}", other),
        }
    }

    #[test]
    fn batch_rows_are_contiguous_fresh_roots() {
        let project_id = Uuid::new_v4();
        let uploader_id = Uuid::new_v4();
        let files = vec![
            ("a.mp4".to_string(), "video/mp4".to_string(), 100_i64),
            ("b.png".to_string(), "image/png".to_string(), 200_i64),
            ("c".to_string(), "application/octet-stream".to_string(), 300_i64),
        ];

        let rows = build_batch_rows(project_id, uploader_id, &files, 5);

        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(unwrap_set(&row.display_order), 5 + i as i32);
            assert_eq!(unwrap_set(&row.version_number), 1);
            assert!(unwrap_set(&row.is_current_version));
            assert_eq!(unwrap_set(&row.parent_media_id), None);
            assert_eq!(unwrap_set(&row.file_size), files[i].2);
        }
        // Extensionless files fall back to .bin in the object key.
        assert!(unwrap_set(&rows[2].storage_key).ends_with(".bin"));
    }

    #[test]
    fn batch_row_count_matches_input_so_job_covers_the_whole_batch() {
        let files: Vec<(String, String, i64)> = (0..7)
            .map(|i| (format!("f{}.mov", i), "video/quicktime".to_string(), 10))
            .collect();
        let rows = build_batch_rows(Uuid::new_v4(), Uuid::new_v4(), &files, 0);
        assert_eq!(rows.len(), files.len());
    }

    #[test]
    fn extension_defaults_to_bin() {
        assert_eq!(get_extension("clip.mp4"), "mp4");
        assert_eq!(get_extension("noext"), "bin");
    }
}
