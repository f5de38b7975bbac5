use axum::{
    extract::{Extension, Form, Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::track::{self, ClientDecision, Entity as Track};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::steps::{self, Step, TrackStatus};
use crate::services::access::{check_project_access, Capability};
use crate::utils::links;

#[derive(Serialize, utoipa::ToSchema)]
pub struct StepResponse {
    pub id: Uuid,
    pub name: String,
    /// Description with `[LINK:n]` placeholders substituted back.
    pub description: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub status: steps::StepStatus,
    pub is_final: bool,
    pub deliverable_link: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub completed_at: Option<chrono::NaiveDateTime>,
}

impl From<Step> for StepResponse {
    fn from(s: Step) -> Self {
        let description = links::decode(&s.description, &s.links);
        Self {
            id: s.id,
            name: s.name,
            description,
            links: s.links,
            images: s.images,
            status: s.status,
            is_final: s.is_final,
            deliverable_link: s.deliverable_link,
            created_at: s.created_at,
            completed_at: s.completed_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TrackResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub round_number: i32,
    pub client_decision: ClientDecision,
    pub status: TrackStatus,
    pub steps: Vec<StepResponse>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

fn decode_steps(model: &track::Model) -> Result<Vec<Step>, AppError> {
    serde_json::from_value(model.steps.clone())
        .map_err(|e| AppError::InternalServerError(format!("Corrupt steps column: {}", e)))
}

fn to_response(model: track::Model) -> Result<TrackResponse, AppError> {
    let step_list = decode_steps(&model)?;
    let status = steps::track_status(&step_list, model.client_decision);
    Ok(TrackResponse {
        id: model.id,
        project_id: model.project_id,
        round_number: model.round_number,
        client_decision: model.client_decision,
        status,
        steps: step_list.into_iter().map(StepResponse::from).collect(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

async fn find_track(db: &DatabaseConnection, track_id: Uuid) -> Result<track::Model, AppError> {
    Track::find_by_id(track_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))
}

async fn save_steps(
    db: &DatabaseConnection,
    model: track::Model,
    step_list: &[Step],
) -> Result<track::Model, AppError> {
    let mut active = model.into_active_model();
    active.steps = Set(serde_json::to_value(step_list)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tracks",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 201, description = "New revision round with its final deliverable step", body = TrackResponse),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn create_track(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    check_project_access(&db, project_id, user.id, Capability::ManageTracks).await?;

    let last_round: Option<i32> = Track::find()
        .filter(track::Column::ProjectId.eq(project_id))
        .select_only()
        .column(track::Column::RoundNumber)
        .order_by_desc(track::Column::RoundNumber)
        .limit(1)
        .into_tuple()
        .one(&db)
        .await?;

    let now = chrono::Utc::now().naive_utc();
    let initial = steps::initial_steps(now);
    let model = track::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        round_number: Set(last_round.unwrap_or(0) + 1),
        client_decision: Set(ClientDecision::Pending),
        steps: Set(serde_json::to_value(&initial)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = model.insert(&db).await?;

    Ok((StatusCode::CREATED, Json(to_response(created)?)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tracks",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "All revision rounds, newest first", body = [TrackResponse])
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn list_tracks(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TrackResponse>>, AppError> {
    check_project_access(&db, project_id, user.id, Capability::View).await?;

    let tracks = Track::find()
        .filter(track::Column::ProjectId.eq(project_id))
        .order_by_desc(track::Column::RoundNumber)
        .all(&db)
        .await?;

    tracks.into_iter().map(to_response).collect::<Result<Vec<_>, _>>().map(Json)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddStepRequest {
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/tracks/{track_id}/steps",
    params(("track_id" = Uuid, Path, description = "Track ID")),
    request_body = AddStepRequest,
    responses(
        (status = 201, description = "Step inserted before the final deliverable", body = TrackResponse),
        (status = 409, description = "Client already decided this round")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn add_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(track_id): Path<Uuid>,
    Json(payload): Json<AddStepRequest>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let mut step_list = decode_steps(&model)?;
    steps::add_step(
        &mut step_list,
        model.client_decision,
        &payload.name,
        chrono::Utc::now().naive_utc(),
    )?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok((StatusCode::CREATED, Json(to_response(updated)?)))
}

/// Form body of the step content editor. The description arrives as free
/// text with literal URLs; they are re-embedded as `[LINK:n]`
/// placeholders before storage.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct EditStepForm {
    pub name: Option<String>,
    pub description: Option<String>,
    /// JSON-encoded array of image storage keys.
    pub images: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/tracks/{track_id}/steps/{step_id}",
    params(
        ("track_id" = Uuid, Path, description = "Track ID"),
        ("step_id" = Uuid, Path, description = "Step ID")
    ),
    request_body(content = EditStepForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Step content updated", body = TrackResponse),
        (status = 409, description = "Client already decided this round")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn edit_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((track_id, step_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<EditStepForm>,
) -> Result<Json<TrackResponse>, AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let description = form.description.map(|text| links::encode(&text));
    let images = match form.images {
        Some(raw) => Some(
            serde_json::from_str::<Vec<String>>(&raw)
                .map_err(|_| AppError::Validation("images must be a JSON array".to_string()))?,
        ),
        None => None,
    };

    let mut step_list = decode_steps(&model)?;
    steps::edit_step(
        &mut step_list,
        model.client_decision,
        step_id,
        form.name.as_deref(),
        description,
        images,
    )?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok(Json(to_response(updated)?))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CompleteStepForm {
    /// Required when completing the final step.
    pub deliverable_link: Option<String>,
}

#[utoipa::path(
    post,
    path = "/tracks/{track_id}/steps/{step_id}/complete",
    params(
        ("track_id" = Uuid, Path, description = "Track ID"),
        ("step_id" = Uuid, Path, description = "Step ID")
    ),
    request_body(content = CompleteStepForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Step completed", body = TrackResponse),
        (status = 400, description = "Final step gating failed"),
        (status = 409, description = "Already completed or client decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn complete_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((track_id, step_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<CompleteStepForm>,
) -> Result<Json<TrackResponse>, AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let mut step_list = decode_steps(&model)?;
    steps::complete_step(
        &mut step_list,
        model.client_decision,
        step_id,
        form.deliverable_link.as_deref(),
        chrono::Utc::now().naive_utc(),
    )?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok(Json(to_response(updated)?))
}

#[utoipa::path(
    post,
    path = "/tracks/{track_id}/steps/{step_id}/revert",
    params(
        ("track_id" = Uuid, Path, description = "Track ID"),
        ("step_id" = Uuid, Path, description = "Step ID")
    ),
    responses(
        (status = 200, description = "Step reverted to pending", body = TrackResponse),
        (status = 409, description = "Not completed or client decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn revert_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((track_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TrackResponse>, AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let mut step_list = decode_steps(&model)?;
    steps::revert_step(&mut step_list, model.client_decision, step_id)?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok(Json(to_response(updated)?))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct MoveStepRequest {
    pub step_id: Uuid,
    pub new_index: usize,
}

#[utoipa::path(
    put,
    path = "/tracks/{track_id}/steps/order",
    params(("track_id" = Uuid, Path, description = "Track ID")),
    request_body = MoveStepRequest,
    responses(
        (status = 200, description = "Step moved", body = TrackResponse),
        (status = 400, description = "Move would cross the final step"),
        (status = 409, description = "Client already decided this round")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn move_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path(track_id): Path<Uuid>,
    Json(payload): Json<MoveStepRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let mut step_list = decode_steps(&model)?;
    steps::move_step(
        &mut step_list,
        model.client_decision,
        payload.step_id,
        payload.new_index,
    )?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok(Json(to_response(updated)?))
}

#[utoipa::path(
    delete,
    path = "/tracks/{track_id}/steps/{step_id}",
    params(
        ("track_id" = Uuid, Path, description = "Track ID"),
        ("step_id" = Uuid, Path, description = "Step ID")
    ),
    responses(
        (status = 200, description = "Step removed", body = TrackResponse),
        (status = 400, description = "Final step cannot be deleted"),
        (status = 409, description = "Client already decided this round")
    ),
    security(("bearer_auth" = [])),
    tag = "Tracks"
)]
pub async fn remove_step(
    State(db): State<DatabaseConnection>,
    Extension(user): Extension<AuthUser>,
    Path((track_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TrackResponse>, AppError> {
    let model = find_track(&db, track_id).await?;
    check_project_access(&db, model.project_id, user.id, Capability::ManageTracks).await?;

    let mut step_list = decode_steps(&model)?;
    steps::remove_step(&mut step_list, model.client_decision, step_id)?;
    let updated = save_steps(&db, model, &step_list).await?;

    Ok(Json(to_response(updated)?))
}
