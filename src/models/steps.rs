//! Workflow steps of a delivery track.
//!
//! Steps are stored as a JSON array on `project_tracks.steps`. All
//! transitions run through this module; handlers deserialize the column,
//! mutate via these functions, and write the array back. Every mutation
//! is refused once the client has made a decision on the track.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::track::ClientDecision;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Step {
    pub id: Uuid,
    pub name: String,
    /// Free text with URLs replaced by `[LINK:n]` placeholders; the
    /// literal URLs live in `links` (see `utils::links`).
    pub description: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub status: StepStatus,
    pub is_final: bool,
    pub deliverable_link: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

impl Step {
    pub fn new(name: &str, is_final: bool, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            links: Vec::new(),
            images: Vec::new(),
            status: StepStatus::Pending,
            is_final,
            deliverable_link: None,
            created_at: now,
            completed_at: None,
        }
    }
}

/// Derived track status shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    InProgress,
    AwaitingClientReview,
    ClientApproved,
    ClientRequestedRevisions,
}

pub fn track_status(steps: &[Step], decision: ClientDecision) -> TrackStatus {
    match decision {
        ClientDecision::Approved => TrackStatus::ClientApproved,
        ClientDecision::RevisionsRequested => TrackStatus::ClientRequestedRevisions,
        ClientDecision::Pending => {
            let final_done = steps
                .iter()
                .any(|s| s.is_final && s.status == StepStatus::Completed);
            if final_done {
                TrackStatus::AwaitingClientReview
            } else {
                TrackStatus::InProgress
            }
        }
    }
}

/// Seed steps for a fresh track: the mandatory final deliverable step,
/// always last.
pub fn initial_steps(now: NaiveDateTime) -> Vec<Step> {
    vec![Step::new("Final Deliverable", true, now)]
}

fn ensure_editable(decision: ClientDecision) -> Result<(), AppError> {
    if decision != ClientDecision::Pending {
        return Err(AppError::Conflict(
            "The client has already reviewed this round; it can no longer be edited".to_string(),
        ));
    }
    Ok(())
}

fn position(steps: &[Step], step_id: Uuid) -> Result<usize, AppError> {
    steps
        .iter()
        .position(|s| s.id == step_id)
        .ok_or_else(|| AppError::NotFound("Step not found".to_string()))
}

fn final_position(steps: &[Step]) -> Result<usize, AppError> {
    steps
        .iter()
        .position(|s| s.is_final)
        .ok_or_else(|| AppError::InternalServerError("Track has no final step".to_string()))
}

/// Inserts a new non-final step immediately before the final step.
pub fn add_step(
    steps: &mut Vec<Step>,
    decision: ClientDecision,
    name: &str,
    now: NaiveDateTime,
) -> Result<Uuid, AppError> {
    ensure_editable(decision)?;
    if name.trim().is_empty() {
        return Err(AppError::Validation("Step name cannot be empty".to_string()));
    }
    let step = Step::new(name.trim(), false, now);
    let id = step.id;
    let at = final_position(steps)?;
    steps.insert(at, step);
    Ok(id)
}

pub fn remove_step(
    steps: &mut Vec<Step>,
    decision: ClientDecision,
    step_id: Uuid,
) -> Result<(), AppError> {
    ensure_editable(decision)?;
    let at = position(steps, step_id)?;
    if steps[at].is_final {
        return Err(AppError::Validation(
            "The final deliverable step cannot be deleted".to_string(),
        ));
    }
    steps.remove(at);
    Ok(())
}

/// Marks a step completed. The final step additionally demands that
/// every other step is already completed and that a deliverable link is
/// supplied; completing it is what puts the track in front of the client.
pub fn complete_step(
    steps: &mut [Step],
    decision: ClientDecision,
    step_id: Uuid,
    deliverable_link: Option<&str>,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    ensure_editable(decision)?;
    let at = position(steps, step_id)?;
    if steps[at].status == StepStatus::Completed {
        return Err(AppError::Conflict("Step is already completed".to_string()));
    }

    if steps[at].is_final {
        if steps
            .iter()
            .any(|s| !s.is_final && s.status != StepStatus::Completed)
        {
            return Err(AppError::Validation(
                "All other steps must be completed before the final deliverable".to_string(),
            ));
        }
        let link = deliverable_link.map(str::trim).unwrap_or("");
        if link.is_empty() {
            return Err(AppError::Validation(
                "A deliverable link is required to complete the final step".to_string(),
            ));
        }
        steps[at].deliverable_link = Some(link.to_string());
    }

    steps[at].status = StepStatus::Completed;
    steps[at].completed_at = Some(now);
    Ok(())
}

/// Completed → pending, allowed only while the client has not decided.
/// Reverting the final step withdraws the deliverable.
pub fn revert_step(
    steps: &mut [Step],
    decision: ClientDecision,
    step_id: Uuid,
) -> Result<(), AppError> {
    ensure_editable(decision)?;
    let at = position(steps, step_id)?;
    if steps[at].status != StepStatus::Completed {
        return Err(AppError::Conflict("Step is not completed".to_string()));
    }
    steps[at].status = StepStatus::Pending;
    steps[at].completed_at = None;
    if steps[at].is_final {
        steps[at].deliverable_link = None;
    }
    Ok(())
}

/// Drag-reorder: moves a non-final step to `new_index`. The final step
/// never moves, and nothing may land at or past its position.
pub fn move_step(
    steps: &mut Vec<Step>,
    decision: ClientDecision,
    step_id: Uuid,
    new_index: usize,
) -> Result<(), AppError> {
    ensure_editable(decision)?;
    let from = position(steps, step_id)?;
    if steps[from].is_final {
        return Err(AppError::Validation(
            "The final deliverable step cannot be reordered".to_string(),
        ));
    }
    let final_at = final_position(steps)?;
    if new_index >= final_at {
        return Err(AppError::Validation(
            "Steps cannot be moved past the final deliverable".to_string(),
        ));
    }
    let step = steps.remove(from);
    steps.insert(new_index, step);
    Ok(())
}

/// Updates a step's content. The description arrives already encoded
/// with `[LINK:n]` placeholders plus its parallel links array.
pub fn edit_step(
    steps: &mut [Step],
    decision: ClientDecision,
    step_id: Uuid,
    name: Option<&str>,
    description: Option<(String, Vec<String>)>,
    images: Option<Vec<String>>,
) -> Result<(), AppError> {
    ensure_editable(decision)?;
    let at = position(steps, step_id)?;
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Step name cannot be empty".to_string()));
        }
        steps[at].name = name.trim().to_string();
    }
    if let Some((text, links)) = description {
        steps[at].description = text;
        steps[at].links = links;
    }
    if let Some(images) = images {
        steps[at].images = images;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn track() -> Vec<Step> {
        let mut steps = initial_steps(now());
        add_step(&mut steps, ClientDecision::Pending, "Rough cut", now()).unwrap();
        add_step(&mut steps, ClientDecision::Pending, "Color pass", now()).unwrap();
        steps
    }

    #[test]
    fn new_steps_insert_before_final() {
        let steps = track();
        assert_eq!(steps.len(), 3);
        assert!(steps.last().unwrap().is_final);
        assert_eq!(steps[0].name, "Rough cut");
        assert_eq!(steps[1].name, "Color pass");
    }

    #[test]
    fn final_step_requires_all_others_completed() {
        let mut steps = track();
        let final_id = steps.last().unwrap().id;
        let err = complete_step(
            &mut steps,
            ClientDecision::Pending,
            final_id,
            Some("https://cdn.example.com/final.mp4"),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(steps.last().unwrap().status, StepStatus::Pending);
        assert_eq!(steps.last().unwrap().deliverable_link, None);
    }

    #[test]
    fn final_step_requires_deliverable_link() {
        let mut steps = track();
        let (a, b, final_id) = (steps[0].id, steps[1].id, steps[2].id);
        complete_step(&mut steps, ClientDecision::Pending, a, None, now()).unwrap();
        complete_step(&mut steps, ClientDecision::Pending, b, None, now()).unwrap();
        let err =
            complete_step(&mut steps, ClientDecision::Pending, final_id, Some("  "), now())
                .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn completing_all_steps_awaits_client_review() {
        let mut steps = track();
        let (a, b, final_id) = (steps[0].id, steps[1].id, steps[2].id);
        assert_eq!(
            track_status(&steps, ClientDecision::Pending),
            TrackStatus::InProgress
        );
        complete_step(&mut steps, ClientDecision::Pending, a, None, now()).unwrap();
        complete_step(&mut steps, ClientDecision::Pending, b, None, now()).unwrap();
        complete_step(
            &mut steps,
            ClientDecision::Pending,
            final_id,
            Some("https://cdn.example.com/final.mp4"),
            now(),
        )
        .unwrap();
        assert_eq!(
            steps[2].deliverable_link.as_deref(),
            Some("https://cdn.example.com/final.mp4")
        );
        assert_eq!(
            track_status(&steps, ClientDecision::Pending),
            TrackStatus::AwaitingClientReview
        );
    }

    #[test]
    fn decided_track_rejects_every_mutation() {
        let mut steps = track();
        let a = steps[0].id;
        for decision in [ClientDecision::Approved, ClientDecision::RevisionsRequested] {
            assert!(matches!(
                complete_step(&mut steps, decision, a, None, now()),
                Err(AppError::Conflict(_))
            ));
            assert!(matches!(
                move_step(&mut steps, decision, a, 1),
                Err(AppError::Conflict(_))
            ));
            assert!(matches!(
                edit_step(&mut steps, decision, a, Some("x"), None, None),
                Err(AppError::Conflict(_))
            ));
            assert!(matches!(
                remove_step(&mut steps, decision, a),
                Err(AppError::Conflict(_))
            ));
        }
        assert_eq!(
            track_status(&steps, ClientDecision::Approved),
            TrackStatus::ClientApproved
        );
    }

    #[test]
    fn reorder_cannot_cross_the_final_step() {
        let mut steps = track();
        let a = steps[0].id;
        let before = steps.clone();
        let err = move_step(&mut steps, ClientDecision::Pending, a, 2).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(steps, before, "rejected reorder must not change state");

        move_step(&mut steps, ClientDecision::Pending, a, 1).unwrap();
        assert_eq!(steps[1].id, a);
        assert!(steps.last().unwrap().is_final);
    }

    #[test]
    fn final_step_itself_cannot_move_or_be_removed() {
        let mut steps = track();
        let final_id = steps.last().unwrap().id;
        assert!(matches!(
            move_step(&mut steps, ClientDecision::Pending, final_id, 0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            remove_step(&mut steps, ClientDecision::Pending, final_id),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn revert_clears_deliverable_on_final() {
        let mut steps = track();
        let (a, b, final_id) = (steps[0].id, steps[1].id, steps[2].id);
        complete_step(&mut steps, ClientDecision::Pending, a, None, now()).unwrap();
        complete_step(&mut steps, ClientDecision::Pending, b, None, now()).unwrap();
        complete_step(
            &mut steps,
            ClientDecision::Pending,
            final_id,
            Some("https://cdn.example.com/final.mp4"),
            now(),
        )
        .unwrap();

        revert_step(&mut steps, ClientDecision::Pending, final_id).unwrap();
        assert_eq!(steps[2].status, StepStatus::Pending);
        assert_eq!(steps[2].deliverable_link, None);
        assert_eq!(
            track_status(&steps, ClientDecision::Pending),
            TrackStatus::InProgress
        );
    }
}
