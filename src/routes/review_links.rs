use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::get_config;
use crate::entities::review_link::{self, Entity as ReviewLink};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::routes::media::find_media;
use crate::services::access::{check_project_access, Capability};

fn generate_link_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

pub(crate) fn public_url(token: &str) -> String {
    format!("{}/review/{}", get_config().public_origin, token)
}

/// Links may only target the root of a version chain; rows with a
/// parent are versions and are rejected.
fn ensure_link_target_is_root(media: &crate::entities::media::Model) -> Result<(), AppError> {
    if media.parent_media_id.is_some() {
        return Err(AppError::Validation(
            "Review links can only point at a media item, not one of its versions".to_string(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReviewLinkRequest {
    pub media_id: Uuid,
    pub title: String,
    pub expires_at: Option<chrono::NaiveDateTime>,
    #[serde(default)]
    pub requires_password: bool,
    pub password: Option<String>,
    #[serde(default = "default_allow_download")]
    pub allow_download: bool,
}

fn default_allow_download() -> bool {
    true
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReviewLinkResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub media_id: Uuid,
    pub title: String,
    pub url: String,
    pub is_active: bool,
    pub requires_password: bool,
    pub allow_download: bool,
    pub expires_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<review_link::Model> for ReviewLinkResponse {
    fn from(link: review_link::Model) -> Self {
        Self {
            id: link.id,
            project_id: link.project_id,
            media_id: link.media_id,
            title: link.title,
            url: public_url(&link.link_token),
            is_active: link.is_active,
            requires_password: link.password_hash.is_some(),
            allow_download: link.allow_download,
            expires_at: link.expires_at,
            created_at: link.created_at,
        }
    }
}

async fn insert_link(
    db: &DatabaseConnection,
    project_id: Uuid,
    media_id: Uuid,
    title: String,
    expires_at: Option<chrono::NaiveDateTime>,
    password_hash: Option<String>,
    allow_download: bool,
) -> Result<review_link::Model, AppError> {
    let link = review_link::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        media_id: Set(media_id),
        link_token: Set(generate_link_token()),
        title: Set(title),
        is_active: Set(true),
        password_hash: Set(password_hash),
        allow_download: Set(allow_download),
        expires_at: Set(expires_at),
        created_at: Set(chrono::Utc::now().naive_utc()),
    };
    Ok(link.insert(db).await?)
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/review-links",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = CreateReviewLinkRequest,
    responses(
        (status = 201, description = "Review link created", body = ReviewLinkResponse),
        (status = 400, description = "Media is a version, not a root"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn create_review_link(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateReviewLinkRequest>,
) -> Result<(StatusCode, Json<ReviewLinkResponse>), AppError> {
    check_project_access(&db, project_id, user.id, Capability::CreateReviewLinks).await?;

    let media = find_media(&db, project_id, payload.media_id).await?;
    ensure_link_target_is_root(&media)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }

    let password_hash = if payload.requires_password {
        let password = payload
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                AppError::Validation(
                    "A password is required when password protection is on".to_string(),
                )
            })?;
        Some(hash_password(password)?)
    } else {
        None
    };

    let link = insert_link(
        &db,
        project_id,
        payload.media_id,
        payload.title.trim().to_string(),
        payload.expires_at,
        password_hash,
        payload.allow_download,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ReviewLinkResponse::from(link))))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/media/{media_id}/quick-link",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("media_id" = Uuid, Path, description = "Root media ID")
    ),
    responses(
        (status = 201, description = "Link with default options, URL ready for the clipboard", body = ReviewLinkResponse),
        (status = 400, description = "Media is a version, not a root")
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn create_quick_link(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<ReviewLinkResponse>), AppError> {
    check_project_access(&db, project_id, user.id, Capability::CreateReviewLinks).await?;

    let media = find_media(&db, project_id, media_id).await?;
    ensure_link_target_is_root(&media)?;

    // Defaults: active, no expiry, no password, downloads allowed.
    let link = insert_link(
        &db,
        project_id,
        media_id,
        media.original_filename,
        None,
        None,
        true,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ReviewLinkResponse::from(link))))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/review-links",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "All review links of the project", body = [ReviewLinkResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn list_review_links(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewLinkResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;

    let links = ReviewLink::find()
        .filter(review_link::Column::ProjectId.eq(project_id))
        .order_by_desc(review_link::Column::CreatedAt)
        .all(&db)
        .await?;

    Ok(Json(links.into_iter().map(ReviewLinkResponse::from).collect()))
}

async fn find_link(
    db: &DatabaseConnection,
    project_id: Uuid,
    link_id: Uuid,
) -> Result<review_link::Model, AppError> {
    ReviewLink::find_by_id(link_id)
        .filter(review_link::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Review link not found".to_string()))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateReviewLinkRequest {
    pub title: Option<String>,
    pub expires_at: Option<Option<chrono::NaiveDateTime>>,
    pub requires_password: Option<bool>,
    pub password: Option<String>,
    pub allow_download: Option<bool>,
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}/review-links/{link_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("link_id" = Uuid, Path, description = "Review link ID")
    ),
    request_body = UpdateReviewLinkRequest,
    responses(
        (status = 200, description = "Updated link", body = ReviewLinkResponse),
        (status = 404, description = "Link not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn update_review_link(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, link_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateReviewLinkRequest>,
) -> Result<Json<ReviewLinkResponse>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::CreateReviewLinks).await?;

    let link = find_link(&db, project_id, link_id).await?;
    let mut active = link.into_active_model();

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        active.title = Set(title.trim().to_string());
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(expires_at);
    }
    if let Some(allow_download) = payload.allow_download {
        active.allow_download = Set(allow_download);
    }
    match payload.requires_password {
        Some(true) => {
            let password = payload
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(
                        "A password is required when password protection is on".to_string(),
                    )
                })?;
            active.password_hash = Set(Some(hash_password(password)?));
        }
        Some(false) => active.password_hash = Set(None),
        None => {}
    }

    let updated = active.update(&db).await?;
    Ok(Json(ReviewLinkResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/review-links/{link_id}/toggle",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("link_id" = Uuid, Path, description = "Review link ID")
    ),
    responses(
        (status = 200, description = "Link activation flipped", body = ReviewLinkResponse),
        (status = 404, description = "Link not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn toggle_review_link(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, link_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ReviewLinkResponse>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::CreateReviewLinks).await?;

    let link = find_link(&db, project_id, link_id).await?;
    let was_active = link.is_active;
    let mut active = link.into_active_model();
    active.is_active = Set(!was_active);

    let updated = active.update(&db).await?;
    Ok(Json(ReviewLinkResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/review-links/{link_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        ("link_id" = Uuid, Path, description = "Review link ID")
    ),
    responses(
        (status = 200, description = "Link deleted"),
        (status = 404, description = "Link not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Review Links"
)]
pub async fn delete_review_link(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, link_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::CreateReviewLinks).await?;

    find_link(&db, project_id, link_id).await?;
    ReviewLink::delete_by_id(link_id).exec(&db).await?;

    Ok(Json(serde_json::json!({
        "message": "Review link deleted successfully",
        "id": link_id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::media;

    fn media_row(parent_media_id: Option<Uuid>) -> media::Model {
        media::Model {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            folder_id: None,
            parent_media_id,
            version_number: if parent_media_id.is_some() { 2 } else { 1 },
            display_order: 0,
            is_current_version: true,
            original_filename: "cut.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            file_size: 1024,
            storage_key: "p/media/cut.mp4".to_string(),
            thumbnail_key: None,
            status: "in_progress".to_string(),
            uploaded_by: Uuid::new_v4(),
            uploaded_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn root_media_is_a_valid_link_target() {
        assert!(ensure_link_target_is_root(&media_row(None)).is_ok());
    }

    #[test]
    fn version_rows_are_rejected_as_link_targets() {
        let err = ensure_link_target_is_root(&media_row(Some(Uuid::new_v4()))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
