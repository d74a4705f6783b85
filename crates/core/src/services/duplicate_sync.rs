//! Duplicate-merge propagation.
//!
//! When a master report changes, every report marked as its duplicate is
//! brought to the same status with the status-relevant fields copied over.
//! Propagation is best-effort: one failing duplicate is logged and counted,
//! the rest still sync.

use cityfix_common::AppResult;
use cityfix_db::entities::report::{self, ReportStatus};
use cityfix_db::repositories::ReportRepository;
use sea_orm::Set;

/// One duplicate that was synced to its master, with the status it held
/// before the sync (the fan-out needs the before/after pair).
#[derive(Debug, Clone)]
pub struct SyncedDuplicate {
    pub previous_status: ReportStatus,
    pub report: report::Model,
}

/// Result of one propagation pass over a master's duplicates.
#[derive(Debug, Clone, Default)]
pub struct PropagationOutcome {
    /// Number of duplicates found for the master.
    pub attempted: usize,
    /// Number of duplicates whose update failed.
    pub failed: usize,
    /// Duplicates that were updated, in query order.
    pub synced: Vec<SyncedDuplicate>,
}

/// Build the partial update that carries a master's change onto one
/// duplicate. The status is always copied; which other fields follow
/// depends on the master's status, so stale assignment or QA fields from
/// earlier passes are never dragged along.
#[must_use]
pub fn sync_payload(master: &report::Model, duplicate: &report::Model) -> report::ActiveModel {
    let mut payload = report::ActiveModel {
        id: sea_orm::Unchanged(duplicate.id.clone()),
        status: Set(master.status),
        updated_at: Set(Some(chrono::Utc::now().into())),
        ..Default::default()
    };

    match master.status {
        ReportStatus::Assigned => {
            payload.assigned_to = Set(master.assigned_to.clone());
            payload.assigned_to_name = Set(master.assigned_to_name.clone());
            payload.priority = Set(master.priority);
            payload.deadline = Set(master.deadline);
            payload.dispatcher_notes = Set(master.dispatcher_notes.clone());
            payload.assigned_at = Set(master.assigned_at);
        }
        ReportStatus::InProgress => {
            payload.started_at = Set(master.started_at);
        }
        ReportStatus::Resolved => {
            payload.after_photos = Set(master.after_photos.clone());
            payload.after_video = Set(master.after_video.clone());
            payload.resolution_notes = Set(master.resolution_notes.clone());
            payload.resolved_at = Set(master.resolved_at);
        }
        ReportStatus::Verified => {
            payload.qa_feedback = Set(master.qa_feedback.clone());
            payload.verified_at = Set(master.verified_at);
        }
        ReportStatus::Reopened => {
            payload.reopen_reason = Set(master.reopen_reason.clone());
            payload.qa_feedback = Set(master.qa_feedback.clone());
            payload.reopened_at = Set(master.reopened_at);
        }
        ReportStatus::Draft | ReportStatus::Submitted | ReportStatus::Merged => {}
    }

    payload
}

/// Propagates master report changes to linked duplicates.
#[derive(Clone)]
pub struct DuplicateSyncService {
    report_repo: ReportRepository,
}

impl DuplicateSyncService {
    /// Create a new duplicate sync service.
    #[must_use]
    pub const fn new(report_repo: ReportRepository) -> Self {
        Self { report_repo }
    }

    /// Sync every duplicate of `master` to the master's current state.
    ///
    /// Only the duplicate listing itself is a hard error; per-duplicate
    /// update failures are warned about and counted in the outcome.
    pub async fn propagate(&self, master: &report::Model) -> AppResult<PropagationOutcome> {
        let duplicates = self.report_repo.find_duplicates_of(&master.id).await?;

        let mut outcome = PropagationOutcome {
            attempted: duplicates.len(),
            ..Default::default()
        };

        for duplicate in duplicates {
            let previous_status = duplicate.status;
            let payload = sync_payload(master, &duplicate);
            match self.report_repo.update(payload).await {
                Ok(updated) => outcome.synced.push(SyncedDuplicate {
                    previous_status,
                    report: updated,
                }),
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        master_id = %master.id,
                        duplicate_id = %duplicate.id,
                        error = %e,
                        "Failed to sync duplicate to master"
                    );
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cityfix_db::entities::report::Priority;
    use sea_orm::{ActiveValue, DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn report(id: &str, status: ReportStatus, master_id: Option<&str>) -> report::Model {
        report::Model {
            id: id.to_string(),
            title: "Broken streetlight".to_string(),
            description: "Light out at the corner".to_string(),
            category: "Lighting".to_string(),
            address: "5 Oak Ave".to_string(),
            latitude: 41.0,
            longitude: -73.5,
            before_photos: serde_json::json!([]),
            before_video: None,
            after_photos: None,
            after_video: None,
            user_id: "citizen1".to_string(),
            user_name: "Jane Citizen".to_string(),
            status,
            is_draft: false,
            is_deleted: false,
            assigned_to: None,
            assigned_to_name: None,
            priority: None,
            deadline: None,
            dispatcher_notes: None,
            assigned_at: None,
            started_at: None,
            resolution_notes: None,
            resolved_at: None,
            qa_feedback: None,
            reopen_reason: None,
            verified_at: None,
            reopened_at: None,
            duplicate_count: 0,
            is_duplicate_of: master_id.map(String::from),
            created_at: Utc::now().into(),
            updated_at: None,
            submitted_at: Some(Utc::now().into()),
        }
    }

    #[test]
    fn test_assignment_payload_copies_assignment_fields_only() {
        let mut master = report("master1", ReportStatus::Assigned, None);
        master.assigned_to = Some("eng1".to_string());
        master.assigned_to_name = Some("Sam Engineer".to_string());
        master.priority = Some(Priority::High);
        master.deadline = Some(Utc::now().into());
        master.assigned_at = Some(Utc::now().into());
        master.resolution_notes = Some("stale from a previous cycle".to_string());

        let duplicate = report("dup1", ReportStatus::Submitted, Some("master1"));
        let payload = sync_payload(&master, &duplicate);

        assert_eq!(payload.status, Set(ReportStatus::Assigned));
        assert_eq!(payload.assigned_to, Set(Some("eng1".to_string())));
        assert_eq!(payload.priority, Set(Some(Priority::High)));
        // Resolution fields stay untouched for an assignment sync.
        assert_eq!(payload.resolution_notes, ActiveValue::NotSet);
        assert_eq!(payload.after_photos, ActiveValue::NotSet);
    }

    #[test]
    fn test_resolution_payload_copies_after_evidence() {
        let mut master = report("master1", ReportStatus::Resolved, None);
        master.after_photos = Some(serde_json::json!(["https://files/after.jpg"]));
        master.resolution_notes = Some("Patched the pothole".to_string());
        master.resolved_at = Some(Utc::now().into());

        let duplicate = report("dup1", ReportStatus::InProgress, Some("master1"));
        let payload = sync_payload(&master, &duplicate);

        assert_eq!(payload.status, Set(ReportStatus::Resolved));
        assert_eq!(
            payload.resolution_notes,
            Set(Some("Patched the pothole".to_string()))
        );
        assert_eq!(payload.assigned_to, ActiveValue::NotSet);
        assert_eq!(payload.qa_feedback, ActiveValue::NotSet);
    }

    #[test]
    fn test_reopen_payload_carries_reason_and_feedback() {
        let mut master = report("master1", ReportStatus::Reopened, None);
        master.reopen_reason = Some("Pothole reappeared".to_string());
        master.qa_feedback = Some("Patch did not hold".to_string());
        master.reopened_at = Some(Utc::now().into());

        let duplicate = report("dup1", ReportStatus::Resolved, Some("master1"));
        let payload = sync_payload(&master, &duplicate);

        assert_eq!(
            payload.reopen_reason,
            Set(Some("Pothole reappeared".to_string()))
        );
        assert_eq!(
            payload.qa_feedback,
            Set(Some("Patch did not hold".to_string()))
        );
    }

    #[tokio::test]
    async fn test_propagate_with_no_duplicates_is_a_no_op() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report::Model>::new()])
                .into_connection(),
        );

        let service = DuplicateSyncService::new(ReportRepository::new(db));
        let master = report("master1", ReportStatus::Assigned, None);
        let outcome = service.propagate(&master).await.unwrap();

        assert_eq!(outcome.attempted, 0);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.synced.is_empty());
    }

    #[tokio::test]
    async fn test_propagate_syncs_each_duplicate() {
        let master = report("master1", ReportStatus::InProgress, None);
        let dup1 = report("dup1", ReportStatus::Submitted, Some("master1"));
        let dup2 = report("dup2", ReportStatus::Assigned, Some("master1"));

        let mut synced1 = dup1.clone();
        synced1.status = ReportStatus::InProgress;
        let mut synced2 = dup2.clone();
        synced2.status = ReportStatus::InProgress;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![dup1, dup2]])
                .append_query_results([vec![synced1]])
                .append_query_results([vec![synced2]])
                .into_connection(),
        );

        let service = DuplicateSyncService::new(ReportRepository::new(db));
        let outcome = service.propagate(&master).await.unwrap();

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.synced.len(), 2);
        assert_eq!(outcome.synced[0].previous_status, ReportStatus::Submitted);
        assert_eq!(outcome.synced[0].report.status, ReportStatus::InProgress);
        assert_eq!(outcome.synced[1].previous_status, ReportStatus::Assigned);
    }
}
