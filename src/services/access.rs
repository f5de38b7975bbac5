//! Per-project access control, consulted before every mutation.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::project::{self, Entity as Project};
use crate::entities::project_member::{self, Entity as ProjectMember, MemberRole};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    UploadMedia,
    ManageVersions,
    DeleteMedia,
    CreateReviewLinks,
    ManageTracks,
    ManageProject,
}

impl MemberRole {
    pub fn allows(self, cap: Capability) -> bool {
        match self {
            MemberRole::Owner => true,
            MemberRole::Collaborator => !matches!(cap, Capability::ManageProject),
            MemberRole::Viewer => matches!(cap, Capability::View),
        }
    }
}

/// Resolves the caller's role on a project and checks the capability.
/// The project owner (`editor_id`) is always `Owner`, member row or not.
pub async fn check_project_access<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
    cap: Capability,
) -> Result<(project::Model, MemberRole), AppError> {
    let project = Project::find_by_id(project_id)
        .filter(project::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let role = if project.editor_id == user_id {
        MemberRole::Owner
    } else {
        ProjectMember::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|m| m.role)
            .ok_or_else(|| {
                AppError::PermissionDenied("You are not a member of this project".to_string())
            })?
    };

    if !role.allows(cap) {
        return Err(AppError::PermissionDenied(
            "You don't have permission to do this".to_string(),
        ));
    }

    Ok((project, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_capability_matrix() {
        assert!(MemberRole::Owner.allows(Capability::ManageProject));
        assert!(MemberRole::Collaborator.allows(Capability::ManageVersions));
        assert!(MemberRole::Collaborator.allows(Capability::CreateReviewLinks));
        assert!(!MemberRole::Collaborator.allows(Capability::ManageProject));
        assert!(MemberRole::Viewer.allows(Capability::View));
        assert!(!MemberRole::Viewer.allows(Capability::UploadMedia));
        assert!(!MemberRole::Viewer.allows(Capability::DeleteMedia));
    }
}
