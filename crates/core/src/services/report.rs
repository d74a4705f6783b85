//! Report service.
//!
//! Orchestrates the lifecycle: validates the actor, consults the transition
//! table, applies the partial update, then runs the post-commit side
//! effects (duplicate propagation, notification fan-out, event publish).
//! Side effects are best-effort; the persisted transition is the source of
//! truth and is never rolled back for a failed side effect.

use chrono::{DateTime, Utc};
use cityfix_common::{AppError, AppResult, IdGenerator};
use cityfix_db::entities::report::{self, Priority, ReportStatus};
use cityfix_db::entities::user::{self, Role};
use cityfix_db::repositories::{CategoryRepository, ReportRepository, UserRepository};
use sea_orm::Set;
use tokio_util::sync::CancellationToken;

use crate::services::duplicate_sync::{DuplicateSyncService, PropagationOutcome};
use crate::services::events::{ReportEvent, ReportEventBus};
use crate::services::evidence::{EvidenceService, EvidenceSet, ProgressFn};
use crate::services::lifecycle::{ReportAction, check_transition, ensure_future_deadline};
use crate::services::notification::{FanoutOutcome, NotificationFanoutService};

/// Report content a citizen provides, for a draft or a direct submission.
#[derive(Debug, Clone)]
pub struct DraftInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Dispatcher assignment input.
#[derive(Debug, Clone)]
pub struct AssignInput {
    pub engineer_id: String,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    pub notes: Option<String>,
}

/// What a lifecycle action produced: the updated report plus the outcome of
/// the best-effort side effects.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub report: report::Model,
    /// Duplicate propagation tally, when the report had duplicates.
    pub propagation: Option<PropagationOutcome>,
    /// Fan-out tally, when a fan-out service is configured.
    pub notifications: Option<FanoutOutcome>,
}

/// Report lifecycle service.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    user_repo: UserRepository,
    evidence: EvidenceService,
    duplicate_sync: DuplicateSyncService,
    fanout: Option<NotificationFanoutService>,
    categories: Option<CategoryRepository>,
    events: Option<ReportEventBus>,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        user_repo: UserRepository,
        evidence: EvidenceService,
        duplicate_sync: DuplicateSyncService,
    ) -> Self {
        Self {
            report_repo,
            user_repo,
            evidence,
            duplicate_sync,
            fanout: None,
            categories: None,
            events: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Enable the notification fan-out.
    pub fn set_fanout(&mut self, fanout: NotificationFanoutService) {
        self.fanout = Some(fanout);
    }

    /// Enable category validation against the admin-managed list.
    pub fn set_categories(&mut self, categories: CategoryRepository) {
        self.categories = Some(categories);
    }

    /// Enable event publication for live queue views.
    pub fn set_events(&mut self, events: ReportEventBus) {
        self.events = Some(events);
    }

    // === Citizen operations ===

    /// Save a draft. Drafts are private to the citizen and invisible to
    /// staff queues until submitted.
    pub async fn save_draft(
        &self,
        citizen_id: &str,
        input: DraftInput,
    ) -> AppResult<report::Model> {
        let citizen = self.require_role(citizen_id, Role::Citizen).await?;
        self.validate_fields(&input.title, &input.description, &input.category)
            .await?;

        let now = Utc::now();
        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            address: Set(input.address),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            before_photos: Set(serde_json::json!([])),
            user_id: Set(citizen.id),
            user_name: Set(citizen.name),
            status: Set(ReportStatus::Draft),
            is_draft: Set(true),
            is_deleted: Set(false),
            duplicate_count: Set(0),
            created_at: Set(now.into()),
            ..Default::default()
        };

        self.report_repo.create(model).await
    }

    /// Edit an existing draft. Only the owning citizen may edit, and only
    /// while the report is still a draft.
    pub async fn update_draft(
        &self,
        citizen_id: &str,
        report_id: &str,
        input: DraftInput,
    ) -> AppResult<report::Model> {
        let report = self.report_repo.get_by_id(report_id).await?;
        if report.user_id != citizen_id {
            return Err(AppError::Forbidden(
                "Only the report owner may edit a draft".to_string(),
            ));
        }
        if !report.is_draft {
            return Err(AppError::state_violation("edit", report.status));
        }
        self.validate_fields(&input.title, &input.description, &input.category)
            .await?;

        let mut model: report::ActiveModel = report.into();
        model.title = Set(input.title);
        model.description = Set(input.description);
        model.category = Set(input.category);
        model.address = Set(input.address);
        model.latitude = Set(input.latitude);
        model.longitude = Set(input.longitude);
        model.updated_at = Set(Some(Utc::now().into()));
        self.report_repo.update(model).await
    }

    /// File a report directly in `submitted`, uploading the "before"
    /// evidence first. Cancelling the upload leaves nothing behind.
    pub async fn submit(
        &self,
        citizen_id: &str,
        input: DraftInput,
        evidence: EvidenceSet,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> AppResult<ActionOutcome> {
        let citizen = self.require_role(citizen_id, Role::Citizen).await?;
        self.validate_fields(&input.title, &input.description, &input.category)
            .await?;
        if evidence.is_empty() {
            return Err(AppError::Validation(
                "At least one piece of evidence is required".to_string(),
            ));
        }

        let id = self.id_gen.generate();
        let uploaded = self
            .evidence
            .upload_set(&id, evidence, progress, cancel)
            .await?;

        let now = Utc::now();
        let model = report::ActiveModel {
            id: Set(id),
            title: Set(input.title),
            description: Set(input.description),
            category: Set(input.category),
            address: Set(input.address),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            before_photos: Set(serde_json::json!(uploaded.photo_urls)),
            before_video: Set(uploaded.video_url),
            user_id: Set(citizen.id),
            user_name: Set(citizen.name),
            status: Set(ReportStatus::Submitted),
            is_draft: Set(false),
            is_deleted: Set(false),
            duplicate_count: Set(0),
            created_at: Set(now.into()),
            submitted_at: Set(Some(now.into())),
            ..Default::default()
        };

        let report = self.report_repo.create(model).await?;
        Ok(self.finish(report, None, ReportStatus::Submitted).await)
    }

    /// Submit a saved draft, optionally replacing its "before" evidence.
    pub async fn submit_draft(
        &self,
        citizen_id: &str,
        report_id: &str,
        evidence: Option<EvidenceSet>,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> AppResult<ActionOutcome> {
        let report = self.report_repo.get_by_id(report_id).await?;
        if report.user_id != citizen_id {
            return Err(AppError::Forbidden(
                "Only the report owner may submit a draft".to_string(),
            ));
        }
        let target = check_transition(report.status, ReportAction::Submit)?;

        let uploaded = match evidence {
            Some(set) => Some(self.evidence.upload_set(report_id, set, progress, cancel).await?),
            None => None,
        };

        let has_existing_evidence = report
            .before_photos
            .as_array()
            .is_some_and(|a| !a.is_empty())
            || report.before_video.is_some();
        let uploads_nothing = uploaded
            .as_ref()
            .is_none_or(|u| u.photo_urls.is_empty() && u.video_url.is_none());
        if uploads_nothing && !has_existing_evidence {
            return Err(AppError::Validation(
                "At least one piece of evidence is required".to_string(),
            ));
        }

        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        if let Some(uploaded) = uploaded {
            if !uploaded.photo_urls.is_empty() {
                model.before_photos = Set(serde_json::json!(uploaded.photo_urls));
            }
            if uploaded.video_url.is_some() {
                model.before_video = Set(uploaded.video_url);
            }
        }
        model.status = Set(target);
        model.is_draft = Set(false);
        model.submitted_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(ReportStatus::Draft), target).await)
    }

    /// Soft-delete a report. Citizens may delete their own drafts; admins
    /// may delete anything.
    pub async fn delete(&self, actor_id: &str, report_id: &str) -> AppResult<report::Model> {
        let actor = self.require_active(actor_id).await?;
        let report = self.report_repo.get_by_id(report_id).await?;

        let allowed = actor.role == Role::Admin
            || (report.user_id == actor.id && report.is_draft);
        if !allowed {
            return Err(AppError::Forbidden(
                "Not allowed to delete this report".to_string(),
            ));
        }

        self.report_repo.soft_delete(report_id).await
    }

    // === Dispatcher operations ===

    /// Assign a submitted report to an engineer with priority and deadline.
    pub async fn assign(
        &self,
        dispatcher_id: &str,
        report_id: &str,
        input: AssignInput,
    ) -> AppResult<ActionOutcome> {
        self.require_role(dispatcher_id, Role::Dispatcher).await?;
        let report = self.require_actionable(report_id).await?;
        let target = check_transition(report.status, ReportAction::Assign)?;
        ensure_future_deadline(input.deadline, Utc::now())?;

        let engineer = self.user_repo.get_by_id(&input.engineer_id).await?;
        if engineer.role != Role::Engineer {
            return Err(AppError::Validation(format!(
                "User '{}' is not an engineer",
                engineer.id
            )));
        }
        if engineer.is_disabled {
            return Err(AppError::Validation(format!(
                "Engineer '{}' is disabled",
                engineer.id
            )));
        }

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.status = Set(target);
        model.assigned_to = Set(Some(engineer.id));
        model.assigned_to_name = Set(Some(engineer.name));
        model.priority = Set(Some(input.priority));
        model.deadline = Set(Some(input.deadline.into()));
        model.dispatcher_notes = Set(input.notes);
        model.assigned_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    /// Link `duplicate_id` to `master_id` as a duplicate and sync it to the
    /// master's current state. The duplicate's own status is replaced by
    /// the sync; its row never holds the `merged` status, which exists only
    /// in the notification matrix.
    pub async fn mark_duplicate(
        &self,
        dispatcher_id: &str,
        duplicate_id: &str,
        master_id: &str,
    ) -> AppResult<ActionOutcome> {
        self.require_role(dispatcher_id, Role::Dispatcher).await?;

        if duplicate_id == master_id {
            return Err(AppError::Validation(
                "A report cannot duplicate itself".to_string(),
            ));
        }

        let duplicate = self.report_repo.get_by_id(duplicate_id).await?;
        let master = self.report_repo.get_by_id(master_id).await?;

        if duplicate.is_duplicate_of.is_some() {
            return Err(AppError::Conflict(
                "Report is already marked as a duplicate".to_string(),
            ));
        }
        if duplicate.duplicate_count > 0 {
            return Err(AppError::Conflict(
                "Report has duplicates of its own and cannot become one".to_string(),
            ));
        }
        if master.is_duplicate_of.is_some() {
            return Err(AppError::Conflict(
                "Master is itself a duplicate; link to its master instead".to_string(),
            ));
        }
        if duplicate.is_draft {
            return Err(AppError::state_violation("merge", ReportStatus::Draft));
        }

        let previous_status = duplicate.status;
        let new_count = master.duplicate_count + 1;
        let now = Utc::now();

        // Link, then immediately sync the duplicate to the master's state.
        let mut link: report::ActiveModel = duplicate.into();
        link.is_duplicate_of = Set(Some(master.id.clone()));
        link.updated_at = Set(Some(now.into()));
        let linked = self.report_repo.update(link).await?;

        let sync = crate::services::duplicate_sync::sync_payload(&master, &linked);
        let synced = self.report_repo.update(sync).await?;

        let mut master_update: report::ActiveModel = master.into();
        master_update.duplicate_count = Set(new_count);
        master_update.updated_at = Set(Some(now.into()));
        let master = self.report_repo.update(master_update).await?;

        let mut notifications = None;
        if let Some(fanout) = &self.fanout {
            match fanout
                .on_report_change(&synced, Some(previous_status), ReportStatus::Merged)
                .await
            {
                Ok(outcome) => notifications = Some(outcome),
                Err(e) => {
                    tracing::warn!(report_id = %synced.id, error = %e, "Fan-out failed");
                }
            }
        }
        self.publish(&synced, Some(previous_status));
        self.publish(&master, Some(master.status));

        Ok(ActionOutcome {
            report: synced,
            propagation: None,
            notifications,
        })
    }

    // === Engineer operations ===

    /// Start work on an assigned report.
    pub async fn start_work(&self, engineer_id: &str, report_id: &str) -> AppResult<ActionOutcome> {
        let report = self.require_assigned_engineer(engineer_id, report_id).await?;
        let target = check_transition(report.status, ReportAction::Start)?;

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.status = Set(target);
        model.started_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    /// Save interim work notes, optionally with partial "after" evidence,
    /// without leaving `in_progress`. No notifications fire; the status did
    /// not change.
    pub async fn save_progress(
        &self,
        engineer_id: &str,
        report_id: &str,
        notes: String,
        evidence: Option<EvidenceSet>,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> AppResult<ActionOutcome> {
        let report = self.require_assigned_engineer(engineer_id, report_id).await?;
        let target = check_transition(report.status, ReportAction::SaveProgress)?;

        let uploaded = match evidence {
            Some(set) => Some(self.evidence.upload_set(report_id, set, progress, cancel).await?),
            None => None,
        };

        let before = report.status;
        let mut model: report::ActiveModel = report.into();
        if let Some(uploaded) = uploaded {
            if !uploaded.photo_urls.is_empty() {
                model.after_photos = Set(Some(serde_json::json!(uploaded.photo_urls)));
            }
            if uploaded.video_url.is_some() {
                model.after_video = Set(uploaded.video_url);
            }
        }
        model.resolution_notes = Set(Some(notes));
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    /// Resolve a report with "after" evidence and resolution notes.
    pub async fn resolve(
        &self,
        engineer_id: &str,
        report_id: &str,
        notes: String,
        evidence: EvidenceSet,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> AppResult<ActionOutcome> {
        let report = self.require_assigned_engineer(engineer_id, report_id).await?;
        let target = check_transition(report.status, ReportAction::Resolve)?;

        if notes.trim().is_empty() {
            return Err(AppError::Validation(
                "Resolution notes are required".to_string(),
            ));
        }
        if evidence.is_empty() {
            return Err(AppError::Validation(
                "At least one piece of after evidence is required".to_string(),
            ));
        }
        let uploaded = self
            .evidence
            .upload_set(report_id, evidence, progress, cancel)
            .await?;

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.after_photos = Set(Some(serde_json::json!(uploaded.photo_urls)));
        model.after_video = Set(uploaded.video_url);
        model.status = Set(target);
        model.resolution_notes = Set(Some(notes));
        model.resolved_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    /// Restart work on a reopened report.
    pub async fn restart(&self, engineer_id: &str, report_id: &str) -> AppResult<ActionOutcome> {
        let report = self.require_assigned_engineer(engineer_id, report_id).await?;
        let target = check_transition(report.status, ReportAction::Restart)?;

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.status = Set(target);
        model.started_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    // === QA operations ===

    /// Verify a resolved report, closing the lifecycle.
    pub async fn verify(
        &self,
        qa_id: &str,
        report_id: &str,
        feedback: Option<String>,
    ) -> AppResult<ActionOutcome> {
        self.require_role(qa_id, Role::Qa).await?;
        let report = self.require_actionable(report_id).await?;
        let target = check_transition(report.status, ReportAction::Verify)?;

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.status = Set(target);
        model.qa_feedback = Set(Some(feedback.unwrap_or_else(|| "Approved".to_string())));
        model.verified_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    /// Reopen a resolved report. A reason is required; it travels to the
    /// assigned engineer with the reopen notification.
    pub async fn reopen(
        &self,
        qa_id: &str,
        report_id: &str,
        reason: String,
        feedback: Option<String>,
    ) -> AppResult<ActionOutcome> {
        self.require_role(qa_id, Role::Qa).await?;
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "A reopen reason is required".to_string(),
            ));
        }
        let report = self.require_actionable(report_id).await?;
        let target = check_transition(report.status, ReportAction::Reopen)?;

        let before = report.status;
        let now = Utc::now();
        let mut model: report::ActiveModel = report.into();
        model.status = Set(target);
        model.reopen_reason = Set(Some(reason));
        model.qa_feedback = Set(feedback);
        model.reopened_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));

        let updated = self.report_repo.update(model).await?;
        Ok(self.finish(updated, Some(before), target).await)
    }

    // === Queries ===

    /// Fetch one report.
    pub async fn get_report(&self, id: &str) -> AppResult<report::Model> {
        self.report_repo.get_by_id(id).await
    }

    /// Staff queue for one status.
    pub async fn list_by_status(&self, status: ReportStatus) -> AppResult<Vec<report::Model>> {
        self.report_repo.list_by_status(status).await
    }

    /// A citizen's own reports, drafts included.
    pub async fn list_for_citizen(&self, citizen_id: &str) -> AppResult<Vec<report::Model>> {
        self.report_repo.list_for_citizen(citizen_id).await
    }

    /// An engineer's work queue.
    pub async fn list_assigned_to(&self, engineer_id: &str) -> AppResult<Vec<report::Model>> {
        self.report_repo.list_assigned_to(engineer_id).await
    }

    // === Internals ===

    async fn require_active(&self, user_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if user.is_disabled {
            return Err(AppError::Forbidden("Account is disabled".to_string()));
        }
        Ok(user)
    }

    async fn require_role(&self, user_id: &str, role: Role) -> AppResult<user::Model> {
        let user = self.require_active(user_id).await?;
        if user.role == role || user.role == Role::Admin {
            Ok(user)
        } else {
            Err(AppError::Forbidden(format!(
                "Requires the {role} role"
            )))
        }
    }

    /// Fetch a report that staff may act on directly: not deleted and not a
    /// duplicate (duplicates only change through their master).
    async fn require_actionable(&self, report_id: &str) -> AppResult<report::Model> {
        let report = self.report_repo.get_by_id(report_id).await?;
        if report.is_deleted {
            return Err(AppError::ReportNotFound(report_id.to_string()));
        }
        if report.is_duplicate_of.is_some() {
            return Err(AppError::Conflict(
                "Duplicates are synced from their master report".to_string(),
            ));
        }
        Ok(report)
    }

    async fn require_assigned_engineer(
        &self,
        engineer_id: &str,
        report_id: &str,
    ) -> AppResult<report::Model> {
        let engineer = self.require_role(engineer_id, Role::Engineer).await?;
        let report = self.require_actionable(report_id).await?;
        if report.assigned_to.as_deref() != Some(engineer.id.as_str()) {
            return Err(AppError::Forbidden(
                "Report is assigned to another engineer".to_string(),
            ));
        }
        Ok(report)
    }

    async fn validate_fields(
        &self,
        title: &str,
        description: &str,
        category: &str,
    ) -> AppResult<()> {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        if let Some(categories) = &self.categories
            && !categories.exists(category).await?
        {
            return Err(AppError::Validation(format!(
                "Unknown category '{category}'"
            )));
        }
        Ok(())
    }

    fn publish(&self, report: &report::Model, previous_status: Option<ReportStatus>) {
        if let Some(events) = &self.events {
            events.publish(ReportEvent {
                report: report.clone(),
                previous_status,
            });
        }
    }

    /// Post-commit side effects for a persisted transition: propagate to
    /// duplicates, fan out notifications for the master and each synced
    /// duplicate, publish events. Failures are logged and tallied, never
    /// raised.
    async fn finish(
        &self,
        report: report::Model,
        before: Option<ReportStatus>,
        after: ReportStatus,
    ) -> ActionOutcome {
        let mut propagation = None;
        if report.duplicate_count > 0 {
            match self.duplicate_sync.propagate(&report).await {
                Ok(outcome) => propagation = Some(outcome),
                Err(e) => {
                    tracing::warn!(report_id = %report.id, error = %e, "Duplicate propagation failed");
                }
            }
        }

        let mut notifications = None;
        if let Some(fanout) = &self.fanout {
            let mut total = FanoutOutcome::default();
            match fanout.on_report_change(&report, before, after).await {
                Ok(outcome) => total.merge(outcome),
                Err(e) => {
                    tracing::warn!(report_id = %report.id, error = %e, "Fan-out failed");
                }
            }
            if let Some(propagation) = &propagation {
                for synced in &propagation.synced {
                    match fanout
                        .on_report_change(&synced.report, Some(synced.previous_status), after)
                        .await
                    {
                        Ok(outcome) => total.merge(outcome),
                        Err(e) => {
                            tracing::warn!(
                                report_id = %synced.report.id,
                                error = %e,
                                "Fan-out failed for synced duplicate"
                            );
                        }
                    }
                }
            }
            notifications = Some(total);
        }

        self.publish(&report, before);
        if let Some(propagation) = &propagation {
            for synced in &propagation.synced {
                self.publish(&synced.report, Some(synced.previous_status));
            }
        }

        ActionOutcome {
            report,
            propagation,
            notifications,
        }
    }
}
