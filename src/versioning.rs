//! Version-chain planning for project media.
//!
//! A chain is a root row (`parent_media_id = None`) plus every row that
//! points at it. All reorganizations are computed here as a `ChainPlan`
//! against an immutable snapshot of the affected chain(s); route handlers
//! apply the plan inside a single database transaction. One rule decides
//! currency everywhere: the row with the highest `version_number` is the
//! current version. `display_order` is a UI sort key and never drives it.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// Snapshot of one media row, the subset the planner needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaVersion {
    pub id: Uuid,
    pub parent_media_id: Option<Uuid>,
    pub version_number: i32,
    pub display_order: i32,
    pub is_current_version: bool,
    pub uploaded_at: NaiveDateTime,
}

impl From<&crate::entities::media::Model> for MediaVersion {
    fn from(m: &crate::entities::media::Model) -> Self {
        Self {
            id: m.id,
            parent_media_id: m.parent_media_id,
            version_number: m.version_number,
            display_order: m.display_order,
            is_current_version: m.is_current_version,
            uploaded_at: m.uploaded_at,
        }
    }
}

/// One row update. `None` fields are left untouched; `parent_media_id`
/// uses a nested Option so `Some(None)` means "promote to root".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionUpdate {
    pub id: Uuid,
    pub parent_media_id: Option<Option<Uuid>>,
    pub version_number: Option<i32>,
    pub display_order: Option<i32>,
    pub is_current_version: Option<bool>,
}

/// The full set of writes a reorganization needs. Applied atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainPlan {
    pub updates: Vec<VersionUpdate>,
    pub deletes: Vec<Uuid>,
    /// Review links pointing at `.0` must be repointed to `.1`.
    pub relink_review_links: Option<(Uuid, Uuid)>,
    /// Review links pointing at this media must be deleted.
    pub delete_review_links_for: Option<Uuid>,
}

/// The current version of a chain: highest `version_number`.
pub fn current_of(chain: &[MediaVersion]) -> Option<&MediaVersion> {
    chain.iter().max_by_key(|m| m.version_number)
}

fn root_of(chain: &[MediaVersion]) -> Option<&MediaVersion> {
    chain.iter().find(|m| m.parent_media_id.is_none())
}

fn find(chain: &[MediaVersion], id: Uuid) -> Result<&MediaVersion, AppError> {
    chain
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| AppError::NotFound("Media not found in version chain".to_string()))
}

/// Moves the source chain's current version into the target chain as its
/// newest version. If the moved row was the source root, the remaining
/// source rows are reorganized around a promoted successor.
pub fn plan_create_version(
    target_chain: &[MediaVersion],
    source_chain: &[MediaVersion],
) -> Result<ChainPlan, AppError> {
    let target_root = root_of(target_chain)
        .ok_or_else(|| AppError::NotFound("Target media chain has no root".to_string()))?;
    let moved = current_of(source_chain)
        .ok_or_else(|| AppError::NotFound("Source media chain is empty".to_string()))?;

    if target_chain.iter().any(|m| m.id == moved.id) {
        return Err(AppError::Validation(
            "Media is already part of the target chain".to_string(),
        ));
    }

    let next_version = target_chain
        .iter()
        .map(|m| m.version_number)
        .max()
        .unwrap_or(0)
        + 1;

    let mut plan = ChainPlan::default();

    plan.updates.push(VersionUpdate {
        id: moved.id,
        parent_media_id: Some(Some(target_root.id)),
        version_number: Some(next_version),
        is_current_version: Some(true),
        ..Default::default()
    });
    for row in target_chain.iter().filter(|m| m.is_current_version) {
        plan.updates.push(VersionUpdate {
            id: row.id,
            is_current_version: Some(false),
            ..Default::default()
        });
    }

    let remaining: Vec<&MediaVersion> =
        source_chain.iter().filter(|m| m.id != moved.id).collect();

    if moved.parent_media_id.is_none() {
        // Source root left its own chain.
        match remaining.iter().max_by_key(|m| m.version_number) {
            Some(successor) => {
                plan.updates.push(VersionUpdate {
                    id: successor.id,
                    parent_media_id: Some(None),
                    is_current_version: Some(true),
                    ..Default::default()
                });
                for row in remaining.iter().filter(|m| m.id != successor.id) {
                    plan.updates.push(VersionUpdate {
                        id: row.id,
                        parent_media_id: Some(Some(successor.id)),
                        is_current_version: Some(false),
                        ..Default::default()
                    });
                }
                plan.relink_review_links = Some((moved.id, successor.id));
            }
            // Single-row source chain: its links follow the media into
            // the target chain's root.
            None => plan.relink_review_links = Some((moved.id, target_root.id)),
        }
    } else if moved.is_current_version {
        if let Some(next_current) = remaining.iter().max_by_key(|m| m.version_number) {
            plan.updates.push(VersionUpdate {
                id: next_current.id,
                is_current_version: Some(true),
                ..Default::default()
            });
        }
    }

    Ok(plan)
}

/// Deletes a non-root version and renumbers the survivors sequentially
/// from `root.version_number + 1` in upload order.
pub fn plan_delete_version(chain: &[MediaVersion], version_id: Uuid) -> Result<ChainPlan, AppError> {
    let victim = find(chain, version_id)?;
    if victim.parent_media_id.is_none() {
        return Err(AppError::Validation(
            "Cannot delete the root media as a version; delete the media itself".to_string(),
        ));
    }
    let root = root_of(chain)
        .ok_or_else(|| AppError::NotFound("Version chain has no root".to_string()))?;

    let mut plan = ChainPlan {
        deletes: vec![victim.id],
        ..Default::default()
    };

    let mut survivors: Vec<&MediaVersion> = chain
        .iter()
        .filter(|m| m.id != victim.id && m.parent_media_id.is_some())
        .collect();
    survivors.sort_by_key(|m| (m.uploaded_at, m.id));

    let mut renumbered: Vec<(Uuid, i32)> = Vec::with_capacity(survivors.len());
    for (i, row) in survivors.iter().enumerate() {
        renumbered.push((row.id, root.version_number + 1 + i as i32));
    }

    // Currency follows the highest number after renumbering.
    let new_current = renumbered
        .iter()
        .max_by_key(|(_, n)| *n)
        .map(|(id, _)| *id)
        .unwrap_or(root.id);

    for row in survivors {
        let number = renumbered.iter().find(|(id, _)| *id == row.id).map(|(_, n)| *n);
        plan.updates.push(VersionUpdate {
            id: row.id,
            version_number: number,
            is_current_version: Some(row.id == new_current),
            ..Default::default()
        });
    }
    if new_current == root.id && !root.is_current_version {
        plan.updates.push(VersionUpdate {
            id: root.id,
            is_current_version: Some(true),
            ..Default::default()
        });
    } else if new_current != root.id && root.is_current_version {
        plan.updates.push(VersionUpdate {
            id: root.id,
            is_current_version: Some(false),
            ..Default::default()
        });
    }

    Ok(plan)
}

/// Deletes any chain row. Deleting a root with surviving versions
/// promotes the highest-numbered survivor to root, keeping its original
/// version number, and repoints review links at it. Deleting the last
/// row of a chain removes the chain's review links entirely.
pub fn plan_delete_media(chain: &[MediaVersion], media_id: Uuid) -> Result<ChainPlan, AppError> {
    let victim = find(chain, media_id)?;
    let mut plan = ChainPlan {
        deletes: vec![victim.id],
        ..Default::default()
    };

    let remaining: Vec<&MediaVersion> =
        chain.iter().filter(|m| m.id != victim.id).collect();

    if victim.parent_media_id.is_none() {
        match remaining.iter().max_by_key(|m| m.version_number) {
            Some(successor) => {
                // Promotion preserves the successor's version_number.
                plan.updates.push(VersionUpdate {
                    id: successor.id,
                    parent_media_id: Some(None),
                    is_current_version: Some(true),
                    ..Default::default()
                });
                for row in remaining.iter().filter(|m| m.id != successor.id) {
                    plan.updates.push(VersionUpdate {
                        id: row.id,
                        parent_media_id: Some(Some(successor.id)),
                        is_current_version: Some(false),
                        ..Default::default()
                    });
                }
                plan.relink_review_links = Some((victim.id, successor.id));
            }
            None => plan.delete_review_links_for = Some(victim.id),
        }
    } else if victim.is_current_version {
        if let Some(next_current) = remaining.iter().max_by_key(|m| m.version_number) {
            plan.updates.push(VersionUpdate {
                id: next_current.id,
                is_current_version: Some(true),
                ..Default::default()
            });
        }
    }
    // Deleting a non-current version needs no promotion.

    Ok(plan)
}

/// Rewrites version numbers to match the supplied order; the last entry
/// becomes current. The order must be a permutation of the whole chain.
pub fn plan_reorder_versions(
    chain: &[MediaVersion],
    ordered_ids: &[Uuid],
) -> Result<ChainPlan, AppError> {
    if ordered_ids.len() != chain.len()
        || !chain.iter().all(|m| ordered_ids.contains(&m.id))
    {
        return Err(AppError::Validation(
            "Version order must list every version of the chain exactly once".to_string(),
        ));
    }

    let mut plan = ChainPlan::default();
    let last = *ordered_ids.last().ok_or_else(|| {
        AppError::Validation("Version order cannot be empty".to_string())
    })?;

    for (i, id) in ordered_ids.iter().enumerate() {
        let row = find(chain, *id)?;
        let number = i as i32 + 1;
        let current = *id == last;
        if row.version_number != number || row.is_current_version != current {
            plan.updates.push(VersionUpdate {
                id: *id,
                version_number: Some(number),
                is_current_version: Some(current),
                ..Default::default()
            });
        }
    }

    Ok(plan)
}

/// Rewrites `display_order` to match the supplied order. Pure UI sort:
/// never touches `is_current_version` or `version_number`.
pub fn plan_set_display_order(
    rows: &[MediaVersion],
    ordered_ids: &[Uuid],
) -> Result<ChainPlan, AppError> {
    if ordered_ids.len() != rows.len() || !rows.iter().all(|m| ordered_ids.contains(&m.id)) {
        return Err(AppError::Validation(
            "Display order must list every item exactly once".to_string(),
        ));
    }

    let mut plan = ChainPlan::default();
    for (i, id) in ordered_ids.iter().enumerate() {
        let row = find(rows, *id)?;
        let order = i as i32;
        if row.display_order != order {
            plan.updates.push(VersionUpdate {
                id: *id,
                display_order: Some(order),
                ..Default::default()
            });
        }
    }
    Ok(plan)
}

/// Applies a plan to an in-memory snapshot. Used by tests and by
/// handlers that need the post-plan state without a re-fetch.
pub fn apply_plan(rows: &mut Vec<MediaVersion>, plan: &ChainPlan) {
    rows.retain(|m| !plan.deletes.contains(&m.id));
    for update in &plan.updates {
        if let Some(row) = rows.iter_mut().find(|m| m.id == update.id) {
            if let Some(parent) = update.parent_media_id {
                row.parent_media_id = parent;
            }
            if let Some(n) = update.version_number {
                row.version_number = n;
            }
            if let Some(d) = update.display_order {
                row.display_order = d;
            }
            if let Some(c) = update.is_current_version {
                row.is_current_version = c;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, min, 0)
            .unwrap()
    }

    fn row(
        id: Uuid,
        parent: Option<Uuid>,
        version: i32,
        current: bool,
        min: u32,
    ) -> MediaVersion {
        MediaVersion {
            id,
            parent_media_id: parent,
            version_number: version,
            display_order: version,
            is_current_version: current,
            uploaded_at: ts(min),
        }
    }

    fn chain3() -> (Uuid, Uuid, Uuid, Vec<MediaVersion>) {
        let root = Uuid::new_v4();
        let v2 = Uuid::new_v4();
        let v3 = Uuid::new_v4();
        let rows = vec![
            row(root, None, 1, false, 0),
            row(v2, Some(root), 2, false, 1),
            row(v3, Some(root), 3, true, 2),
        ];
        (root, v2, v3, rows)
    }

    fn assert_single_current(rows: &[MediaVersion]) {
        let currents: Vec<_> = rows.iter().filter(|m| m.is_current_version).collect();
        assert_eq!(currents.len(), 1, "exactly one current version expected");
        let max = rows.iter().map(|m| m.version_number).max().unwrap();
        assert_eq!(
            currents[0].version_number, max,
            "current version must hold the highest version number"
        );
    }

    #[test]
    fn delete_current_version_promotes_highest_remaining() {
        let (_, v2, v3, mut rows) = chain3();
        let plan = plan_delete_version(&rows, v3).unwrap();
        apply_plan(&mut rows, &plan);
        assert_eq!(rows.len(), 2);
        assert_single_current(&rows);
        assert!(rows.iter().find(|m| m.id == v2).unwrap().is_current_version);
    }

    #[test]
    fn delete_version_renumbers_sequentially_by_upload_time() {
        let root = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut rows = vec![
            row(root, None, 1, false, 0),
            row(a, Some(root), 2, false, 1),
            row(b, Some(root), 4, false, 3),
            row(c, Some(root), 5, true, 5),
        ];
        let plan = plan_delete_version(&rows, a).unwrap();
        apply_plan(&mut rows, &plan);
        // Survivors renumbered from root+1 in upload order: b=2, c=3.
        assert_eq!(rows.iter().find(|m| m.id == b).unwrap().version_number, 2);
        assert_eq!(rows.iter().find(|m| m.id == c).unwrap().version_number, 3);
        assert_single_current(&rows);
    }

    #[test]
    fn delete_version_rejects_root() {
        let (root, _, _, rows) = chain3();
        let err = plan_delete_version(&rows, root).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn delete_root_promotes_highest_and_preserves_version_number() {
        let (root, v2, v3, mut rows) = chain3();
        let plan = plan_delete_media(&rows, root).unwrap();
        apply_plan(&mut rows, &plan);

        let promoted = rows.iter().find(|m| m.id == v3).unwrap();
        assert_eq!(promoted.parent_media_id, None);
        assert_eq!(promoted.version_number, 3, "no renumbering on promotion");
        assert!(promoted.is_current_version);
        assert_eq!(
            rows.iter().find(|m| m.id == v2).unwrap().parent_media_id,
            Some(v3)
        );
        assert_eq!(plan.relink_review_links, Some((root, v3)));
        assert_single_current(&rows);
    }

    #[test]
    fn delete_root_of_single_row_chain_removes_everything() {
        let root = Uuid::new_v4();
        let mut rows = vec![row(root, None, 1, true, 0)];
        let plan = plan_delete_media(&rows, root).unwrap();
        apply_plan(&mut rows, &plan);
        assert!(rows.is_empty());
        assert_eq!(plan.delete_review_links_for, Some(root));
    }

    #[test]
    fn delete_non_current_version_leaves_current_untouched() {
        let (_, v2, v3, mut rows) = chain3();
        let plan = plan_delete_media(&rows, v2).unwrap();
        assert!(plan.updates.is_empty());
        apply_plan(&mut rows, &plan);
        assert!(rows.iter().find(|m| m.id == v3).unwrap().is_current_version);
        assert_single_current(&rows);
    }

    #[test]
    fn create_version_moves_source_current_into_target() {
        let (target_root, _, _, target) = chain3();
        let source_root = Uuid::new_v4();
        let source = vec![row(source_root, None, 1, true, 4)];

        let plan = plan_create_version(&target, &source).unwrap();

        let mut merged = target.clone();
        merged.push(source[0].clone());
        apply_plan(&mut merged, &plan);

        let moved = merged.iter().find(|m| m.id == source_root).unwrap();
        assert_eq!(moved.parent_media_id, Some(target_root));
        assert_eq!(moved.version_number, 4);
        assert!(moved.is_current_version);
        assert_single_current(&merged);
        // Orphaned links follow the media into the target chain.
        assert_eq!(plan.relink_review_links, Some((source_root, target_root)));
    }

    #[test]
    fn create_version_reorganizes_source_chain_when_root_moves() {
        let target_root = Uuid::new_v4();
        let target = vec![row(target_root, None, 1, true, 0)];
        let (source_root, sv2, sv3, mut source) = chain3();
        // Make the root current so it is the one that moves.
        for m in source.iter_mut() {
            m.is_current_version = m.id == source_root;
        }
        source.iter_mut().find(|m| m.id == source_root).unwrap().version_number = 9;

        let plan = plan_create_version(&target, &source).unwrap();

        let mut world = target.clone();
        world.extend(source.clone());
        apply_plan(&mut world, &plan);

        let promoted = world.iter().find(|m| m.id == sv3).unwrap();
        assert_eq!(promoted.parent_media_id, None);
        assert!(promoted.is_current_version);
        assert_eq!(
            world.iter().find(|m| m.id == sv2).unwrap().parent_media_id,
            Some(sv3)
        );
        assert_eq!(plan.relink_review_links, Some((source_root, sv3)));

        let target_chain: Vec<MediaVersion> = world
            .iter()
            .filter(|m| m.id == target_root || m.parent_media_id == Some(target_root))
            .cloned()
            .collect();
        assert_single_current(&target_chain);
    }

    #[test]
    fn failed_create_version_leaves_snapshot_untouched() {
        let (_, _, _, target) = chain3();
        let before = target.clone();
        // Source chain sharing a row with the target is invalid input.
        let err = plan_create_version(&target, &target).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(target, before);
    }

    #[test]
    fn reorder_versions_renumbers_and_sets_last_as_current() {
        let (root, v2, v3, mut rows) = chain3();
        let plan = plan_reorder_versions(&rows, &[v3, root, v2]).unwrap();
        apply_plan(&mut rows, &plan);
        assert_eq!(rows.iter().find(|m| m.id == v3).unwrap().version_number, 1);
        assert_eq!(rows.iter().find(|m| m.id == root).unwrap().version_number, 2);
        let last = rows.iter().find(|m| m.id == v2).unwrap();
        assert_eq!(last.version_number, 3);
        assert!(last.is_current_version);
        assert_single_current(&rows);
    }

    #[test]
    fn reorder_versions_rejects_partial_lists() {
        let (root, v2, _, rows) = chain3();
        let err = plan_reorder_versions(&rows, &[root, v2]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn display_order_never_touches_currency() {
        let (root, v2, v3, mut rows) = chain3();
        let plan = plan_set_display_order(&rows, &[v3, v2, root]).unwrap();
        assert!(plan
            .updates
            .iter()
            .all(|u| u.is_current_version.is_none() && u.version_number.is_none()));
        apply_plan(&mut rows, &plan);
        assert!(rows.iter().find(|m| m.id == v3).unwrap().is_current_version);
        assert_eq!(rows.iter().find(|m| m.id == root).unwrap().display_order, 2);
        assert_single_current(&rows);
    }
}
