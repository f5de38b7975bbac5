use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::project::{self, Entity as Project};
use crate::entities::project_member::{self, Entity as ProjectMember, MemberRole};
use crate::entities::user::{self, Entity as User};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::pagination::Pagination;
use crate::routes::upload::plan_for;
use crate::services::access::{check_project_access, Capability};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    name: String,
    description: Option<String>,
    client_email: Option<String>,
    deadline: Option<chrono::NaiveDateTime>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    name: Option<String>,
    description: Option<String>,
    client_email: Option<String>,
    status: Option<String>,
    deadline: Option<Option<chrono::NaiveDateTime>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    id: Uuid,
    editor_id: Uuid,
    name: String,
    description: Option<String>,
    client_email: Option<String>,
    status: String,
    deadline: Option<chrono::NaiveDateTime>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<project::Model> for ProjectResponse {
    fn from(p: project::Model) -> Self {
        Self {
            id: p.id,
            editor_id: p.editor_id,
            name: p.name,
            description: p.description,
            client_email: p.client_email,
            status: p.status,
            deadline: p.deadline,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Free plan project limit reached")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn create_project(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Project name cannot be empty".to_string()));
    }

    let plan = plan_for(&db, user.id).await?;
    if let Some(max_projects) = plan.limits.max_projects {
        let count = Project::find()
            .filter(project::Column::EditorId.eq(user.id))
            .filter(project::Column::DeletedAt.is_null())
            .count(&db)
            .await?;
        if count >= max_projects as u64 {
            return Err(AppError::Validation(format!(
                "Your plan allows at most {} projects; upgrade to create more",
                max_projects
            )));
        }
    }

    let now = chrono::Utc::now().naive_utc();
    let project_id = Uuid::new_v4();

    let txn = db.begin().await?;
    let created = project::ActiveModel {
        id: Set(project_id),
        editor_id: Set(user.id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        client_email: Set(payload.client_email),
        status: Set("active".to_string()),
        password_hash: Set(None),
        deadline: Set(payload.deadline),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&txn)
    .await?;

    // Owner membership row so the notification fan-out sees the owner.
    project_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        user_id: Set(user.id),
        role: Set(MemberRole::Owner),
        notifications_enabled: Set(true),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!("project '{}' created by {}", created.name, user.email);
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(created))))
}

#[utoipa::path(
    get,
    path = "/projects",
    params(Pagination),
    responses(
        (status = 200, description = "Projects the caller owns or belongs to", body = [ProjectResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn list_projects(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    let member_of: Vec<Uuid> = ProjectMember::find()
        .filter(project_member::Column::UserId.eq(user.id))
        .select_only()
        .column(project_member::Column::ProjectId)
        .into_tuple()
        .all(&db)
        .await?;

    let projects = Project::find()
        .filter(
            sea_orm::Condition::any()
                .add(project::Column::EditorId.eq(user.id))
                .add(project::Column::Id.is_in(member_of)),
        )
        .filter(project::Column::DeletedAt.is_null())
        .order_by_desc(project::Column::UpdatedAt)
        .limit(pagination.limit())
        .offset(pagination.offset())
        .all(&db)
        .await?;

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn get_project(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    let (project, _) = check_project_access(&db, project_id, user.id, Capability::View).await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 403, description = "Only the owner can update the project"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn update_project(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let (project, _) =
        check_project_access(&db, project_id, user.id, Capability::ManageProject).await?;

    let mut active = project.into_active_model();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Project name cannot be empty".to_string()));
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(client_email) = payload.client_email {
        active.client_email = Set(Some(client_email));
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(deadline) = payload.deadline {
        active.deadline = Set(deadline);
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(&db).await?;
    Ok(Json(ProjectResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project soft-deleted"),
        (status = 403, description = "Only the owner can delete the project"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn delete_project(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (project, _) =
        check_project_access(&db, project_id, user.id, Capability::ManageProject).await?;

    let mut active = project.into_active_model();
    active.deleted_at = Set(Some(chrono::Utc::now().naive_utc()));
    active.update(&db).await?;

    Ok(Json(serde_json::json!({
        "message": "Project deleted successfully"
    })))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: MemberRole,
    pub notifications_enabled: bool,
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/members",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project members", body = [MemberResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn list_members(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<MemberResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;

    let members = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .find_also_related(User)
        .all(&db)
        .await?;

    let data = members
        .into_iter()
        .filter_map(|(m, u)| {
            u.map(|u| MemberResponse {
                user_id: m.user_id,
                email: u.email,
                display_name: u.display_name,
                role: m.role,
                notifications_enabled: m.notifications_enabled,
            })
        })
        .collect();

    Ok(Json(data))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: MemberRole,
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/members",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Member limit reached on the free plan"),
        (status = 404, description = "No user with that email"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn add_member(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), AppError> {
    let (project, _) =
        check_project_access(&db, project_id, user.id, Capability::ManageProject).await?;

    let plan = plan_for(&db, project.editor_id).await?;
    if let Some(max_members) = plan.limits.max_members_per_project {
        let count = ProjectMember::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .count(&db)
            .await?;
        if count >= max_members as u64 {
            return Err(AppError::Validation(format!(
                "Your plan allows at most {} members per project",
                max_members
            )));
        }
    }

    let invitee = User::find()
        .filter(user::Column::Email.eq(payload.email.trim().to_ascii_lowercase()))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("No user with that email".to_string()))?;

    let existing = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(invitee.id))
        .one(&db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Already a member of this project".to_string()));
    }

    let member = project_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        user_id: Set(invitee.id),
        role: Set(payload.role),
        notifications_enabled: Set(true),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(&db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            user_id: member.user_id,
            email: invitee.email,
            display_name: invitee.display_name,
            role: member.role,
            notifications_enabled: member.notifications_enabled,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/leave",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Left the project"),
        (status = 400, description = "The owner cannot leave their own project")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn leave_project(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (project, _) = check_project_access(&db, project_id, user.id, Capability::View).await?;
    if project.editor_id == user.id {
        return Err(AppError::Validation(
            "The owner cannot leave their own project".to_string(),
        ));
    }

    ProjectMember::delete_many()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(user.id))
        .exec(&db)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Left the project"
    })))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct MemberNotificationsRequest {
    pub enabled: bool,
}

#[utoipa::path(
    patch,
    path = "/projects/{project_id}/members/me/notifications",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    request_body = MemberNotificationsRequest,
    responses(
        (status = 200, description = "Project-level notification toggle updated"),
        (status = 404, description = "Not a member of this project")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn set_member_notifications(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<MemberNotificationsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let member = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::UserId.eq(user.id))
        .one(&db)
        .await?
        .ok_or_else(|| AppError::NotFound("Not a member of this project".to_string()))?;

    let mut active = member.into_active_model();
    active.notifications_enabled = Set(payload.enabled);
    active.update(&db).await?;

    Ok(Json(serde_json::json!({
        "enabled": payload.enabled
    })))
}
