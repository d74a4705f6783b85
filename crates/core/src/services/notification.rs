//! Notification fan-out.
//!
//! Every status change is announced to a role-dependent recipient set. The
//! planner is pure: given the before/after pair, the report, and the roster
//! of candidate recipients it decides who hears what. The service then
//! persists one notification row per recipient and pushes to the devices
//! that registered a token. The whole fan-out is best-effort and never
//! blocks the lifecycle action that triggered it.

use cityfix_common::{AppResult, IdGenerator};
use cityfix_db::entities::report::{self, ReportStatus};
use cityfix_db::entities::{notification, user};
use cityfix_db::repositories::{NotificationRepository, UserRepository};
use sea_orm::Set;
use std::collections::HashSet;

use crate::services::push_notification::{PushDispatcher, PushMessage, PushOutcome};

/// Candidate recipients for one fan-out, resolved by the service before
/// planning.
#[derive(Debug, Clone, Default)]
pub struct RoleRoster {
    /// The citizen who filed the report.
    pub citizen: Option<user::Model>,
    /// The engineer currently assigned, if any.
    pub engineer: Option<user::Model>,
    pub dispatchers: Vec<user::Model>,
    pub qa: Vec<user::Model>,
    pub admins: Vec<user::Model>,
}

/// One notification the planner decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub user_id: String,
    /// Device token, when the recipient registered one.
    pub push_token: Option<String>,
    pub message: String,
}

/// Tally of one fan-out run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanoutOutcome {
    /// Recipients the planner selected.
    pub planned: usize,
    /// Notification rows written.
    pub stored: usize,
    pub push: PushOutcome,
}

impl FanoutOutcome {
    /// Fold another outcome into this one. Used when a master's change fans
    /// out once per synced duplicate as well.
    pub fn merge(&mut self, other: Self) {
        self.planned += other.planned;
        self.stored += other.stored;
        self.push.sent += other.push.sent;
        self.push.failed += other.push.failed;
    }
}

fn citizen_message(status: ReportStatus, title: &str) -> Option<String> {
    let msg = match status {
        ReportStatus::Draft => return None,
        ReportStatus::Submitted => format!("Your report '{title}' has been received."),
        ReportStatus::Assigned => format!("Your report '{title}' has been assigned to a crew."),
        ReportStatus::InProgress => format!("Work has started on your report '{title}'."),
        ReportStatus::Resolved => format!("Your report '{title}' has been resolved."),
        ReportStatus::Verified => format!("Your report '{title}' has been verified and closed."),
        ReportStatus::Reopened => format!("Your report '{title}' has been reopened."),
        ReportStatus::Merged => {
            format!("Your report '{title}' was merged into an existing report.")
        }
    };
    Some(msg)
}

fn engineer_message(status: ReportStatus, title: &str) -> Option<String> {
    let msg = match status {
        ReportStatus::Assigned => format!("You have been assigned report '{title}'."),
        ReportStatus::Reopened => format!("Report '{title}' failed verification and was reopened."),
        ReportStatus::Verified => format!("Report '{title}' passed verification."),
        ReportStatus::Merged => format!("Report '{title}' absorbed a duplicate report."),
        _ => return None,
    };
    Some(msg)
}

fn dispatcher_message(status: ReportStatus, title: &str) -> Option<String> {
    let msg = match status {
        ReportStatus::Submitted => format!("New report '{title}' is awaiting triage."),
        ReportStatus::InProgress => format!("Report '{title}' is in progress."),
        ReportStatus::Resolved => format!("Report '{title}' has been resolved."),
        ReportStatus::Verified => format!("Report '{title}' has been verified."),
        ReportStatus::Merged => format!("Report '{title}' absorbed a duplicate report."),
        _ => return None,
    };
    Some(msg)
}

fn qa_message(status: ReportStatus, title: &str) -> Option<String> {
    let msg = match status {
        ReportStatus::Resolved => format!("Report '{title}' is ready for verification."),
        ReportStatus::Merged => format!("Report '{title}' absorbed a duplicate report."),
        _ => return None,
    };
    Some(msg)
}

fn admin_message(status: ReportStatus, title: &str) -> Option<String> {
    let msg = match status {
        ReportStatus::Submitted => format!("New report '{title}' was submitted."),
        ReportStatus::Verified => format!("Report '{title}' has been verified."),
        ReportStatus::Merged => format!("Report '{title}' absorbed a duplicate report."),
        _ => return None,
    };
    Some(msg)
}

/// Decide who is notified about a status change and with which message.
///
/// Recipients are deduplicated by user id; the first applicable message
/// wins, with the citizen's owner-phrased message taking precedence. Drafts
/// and no-op changes (`before == Some(after)`) produce an empty plan.
#[must_use]
pub fn plan_fan_out(
    before: Option<ReportStatus>,
    after: ReportStatus,
    report: &report::Model,
    roster: &RoleRoster,
) -> Vec<PlannedNotification> {
    if after == ReportStatus::Draft || before == Some(after) {
        return Vec::new();
    }

    let title = &report.title;
    let mut seen: HashSet<String> = HashSet::new();
    let mut plan = Vec::new();

    let mut push = |user: &user::Model, message: Option<String>| {
        if let Some(message) = message
            && seen.insert(user.id.clone())
        {
            plan.push(PlannedNotification {
                user_id: user.id.clone(),
                push_token: user.push_token.clone(),
                message,
            });
        }
    };

    if let Some(citizen) = &roster.citizen {
        push(citizen, citizen_message(after, title));
    }
    if let Some(engineer) = &roster.engineer {
        push(engineer, engineer_message(after, title));
    }
    for dispatcher in &roster.dispatchers {
        push(dispatcher, dispatcher_message(after, title));
    }
    for qa in &roster.qa {
        push(qa, qa_message(after, title));
    }
    for admin in &roster.admins {
        push(admin, admin_message(after, title));
    }

    plan
}

/// Persists and pushes the planned notifications for a report change.
#[derive(Clone)]
pub struct NotificationFanoutService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    push: Option<PushDispatcher>,
    id_gen: IdGenerator,
}

impl NotificationFanoutService {
    /// Create a new fan-out service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository, user_repo: UserRepository) -> Self {
        Self {
            notification_repo,
            user_repo,
            push: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Enable push delivery.
    #[must_use]
    pub fn with_push(mut self, push: PushDispatcher) -> Self {
        self.push = Some(push);
        self
    }

    /// Fan out one status change.
    ///
    /// `after` is passed separately from `report.status` so the merge flow
    /// can announce [`ReportStatus::Merged`] without the report row ever
    /// holding that status. Row insert failures are warned about and
    /// reflected in the `stored` count.
    pub async fn on_report_change(
        &self,
        report: &report::Model,
        before: Option<ReportStatus>,
        after: ReportStatus,
    ) -> AppResult<FanoutOutcome> {
        if report.is_draft && after != ReportStatus::Submitted {
            return Ok(FanoutOutcome::default());
        }

        let roster = self.load_roster(report).await?;
        let plan = plan_fan_out(before, after, report, &roster);

        let mut outcome = FanoutOutcome {
            planned: plan.len(),
            ..Default::default()
        };

        let now = chrono::Utc::now();
        let mut push_messages = Vec::new();

        for planned in &plan {
            let row = notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(planned.user_id.clone()),
                report_id: Set(report.id.clone()),
                message: Set(planned.message.clone()),
                is_read: Set(false),
                created_at: Set(now.into()),
            };
            match self.notification_repo.create(row).await {
                Ok(_) => outcome.stored += 1,
                Err(e) => {
                    tracing::warn!(
                        report_id = %report.id,
                        user_id = %planned.user_id,
                        error = %e,
                        "Failed to store notification"
                    );
                }
            }

            if let Some(token) = &planned.push_token {
                push_messages.push(PushMessage {
                    to: token.clone(),
                    title: "CityFix".to_string(),
                    body: planned.message.clone(),
                    data: Some(serde_json::json!({ "report_id": report.id })),
                });
            }
        }

        if let Some(push) = &self.push
            && !push_messages.is_empty()
        {
            outcome.push = push.dispatch(&push_messages).await;
        }

        Ok(outcome)
    }

    async fn load_roster(&self, report: &report::Model) -> AppResult<RoleRoster> {
        let citizen = self.user_repo.find_by_id(&report.user_id).await?;

        let engineer = match &report.assigned_to {
            Some(id) => self.user_repo.find_by_id(id).await?,
            None => None,
        };

        Ok(RoleRoster {
            citizen,
            engineer,
            dispatchers: self.user_repo.find_by_role(user::Role::Dispatcher).await?,
            qa: self.user_repo.find_by_role(user::Role::Qa).await?,
            admins: self.user_repo.find_by_role(user::Role::Admin).await?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cityfix_db::entities::user::Role;

    fn test_user(id: &str, role: Role, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            role,
            is_disabled: false,
            push_token: token.map(String::from),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_report(status: ReportStatus) -> report::Model {
        report::Model {
            id: "report1".to_string(),
            title: "Pothole on Elm St".to_string(),
            description: "Deep pothole".to_string(),
            category: "Roads".to_string(),
            address: "12 Elm St".to_string(),
            latitude: 40.7,
            longitude: -74.0,
            before_photos: serde_json::json!([]),
            before_video: None,
            after_photos: None,
            after_video: None,
            user_id: "citizen1".to_string(),
            user_name: "Jane Citizen".to_string(),
            status,
            is_draft: false,
            is_deleted: false,
            assigned_to: Some("eng1".to_string()),
            assigned_to_name: Some("Sam Engineer".to_string()),
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
            is_duplicate_of: None,
            created_at: Utc::now().into(),
            updated_at: None,
            submitted_at: Some(Utc::now().into()),
        }
    }

    fn full_roster() -> RoleRoster {
        RoleRoster {
            citizen: Some(test_user("citizen1", Role::Citizen, Some("tok-c"))),
            engineer: Some(test_user("eng1", Role::Engineer, Some("tok-e"))),
            dispatchers: vec![test_user("disp1", Role::Dispatcher, None)],
            qa: vec![test_user("qa1", Role::Qa, None)],
            admins: vec![test_user("admin1", Role::Admin, None)],
        }
    }

    fn recipient_ids(plan: &[PlannedNotification]) -> Vec<&str> {
        plan.iter().map(|p| p.user_id.as_str()).collect()
    }

    #[test]
    fn test_submitted_notifies_citizen_dispatchers_admins() {
        let report = test_report(ReportStatus::Submitted);
        let plan = plan_fan_out(
            Some(ReportStatus::Draft),
            ReportStatus::Submitted,
            &report,
            &full_roster(),
        );
        assert_eq!(recipient_ids(&plan), vec!["citizen1", "disp1", "admin1"]);
    }

    #[test]
    fn test_assigned_notifies_citizen_and_engineer() {
        let report = test_report(ReportStatus::Assigned);
        let plan = plan_fan_out(
            Some(ReportStatus::Submitted),
            ReportStatus::Assigned,
            &report,
            &full_roster(),
        );
        assert_eq!(recipient_ids(&plan), vec!["citizen1", "eng1"]);
        assert!(plan[1].message.contains("assigned"));
    }

    #[test]
    fn test_resolved_notifies_citizen_dispatchers_qa() {
        let report = test_report(ReportStatus::Resolved);
        let plan = plan_fan_out(
            Some(ReportStatus::InProgress),
            ReportStatus::Resolved,
            &report,
            &full_roster(),
        );
        assert_eq!(recipient_ids(&plan), vec!["citizen1", "disp1", "qa1"]);
    }

    #[test]
    fn test_verified_notifies_everyone_but_qa() {
        let report = test_report(ReportStatus::Verified);
        let plan = plan_fan_out(
            Some(ReportStatus::Resolved),
            ReportStatus::Verified,
            &report,
            &full_roster(),
        );
        assert_eq!(
            recipient_ids(&plan),
            vec!["citizen1", "eng1", "disp1", "admin1"]
        );
    }

    #[test]
    fn test_merged_reaches_the_full_staff_set() {
        let report = test_report(ReportStatus::Submitted);
        let plan = plan_fan_out(None, ReportStatus::Merged, &report, &full_roster());
        assert_eq!(
            recipient_ids(&plan),
            vec!["citizen1", "eng1", "disp1", "qa1", "admin1"]
        );
    }

    #[test]
    fn test_draft_produces_no_notifications() {
        let report = test_report(ReportStatus::Draft);
        let plan = plan_fan_out(None, ReportStatus::Draft, &report, &full_roster());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_unchanged_status_is_silent() {
        let report = test_report(ReportStatus::InProgress);
        let plan = plan_fan_out(
            Some(ReportStatus::InProgress),
            ReportStatus::InProgress,
            &report,
            &full_roster(),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_recipients_deduplicated_by_user_id() {
        // The citizen is also the assigned engineer; the owner-phrased
        // message wins and they are notified once.
        let mut roster = full_roster();
        roster.engineer = Some(test_user("citizen1", Role::Citizen, Some("tok-c")));

        let report = test_report(ReportStatus::Assigned);
        let plan = plan_fan_out(
            Some(ReportStatus::Submitted),
            ReportStatus::Assigned,
            &report,
            &roster,
        );

        assert_eq!(recipient_ids(&plan), vec!["citizen1"]);
        assert!(plan[0].message.starts_with("Your report"));
    }

    #[test]
    fn test_push_tokens_carried_on_the_plan() {
        let report = test_report(ReportStatus::Assigned);
        let plan = plan_fan_out(
            Some(ReportStatus::Submitted),
            ReportStatus::Assigned,
            &report,
            &full_roster(),
        );
        assert_eq!(plan[0].push_token.as_deref(), Some("tok-c"));
        assert_eq!(plan[1].push_token.as_deref(), Some("tok-e"));
    }

    #[tokio::test]
    async fn test_on_report_change_stores_one_row_per_recipient() {
        use sea_orm::{DatabaseBackend, MockDatabase};
        use std::sync::Arc;

        let mut report = test_report(ReportStatus::Submitted);
        report.assigned_to = None;

        let stored_row = cityfix_db::entities::notification::Model {
            id: "n1".to_string(),
            user_id: "citizen1".to_string(),
            report_id: "report1".to_string(),
            message: "Your report 'Pothole on Elm St' has been received.".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // roster: citizen, then dispatchers / qa / admins (all empty)
                .append_query_results([vec![test_user("citizen1", Role::Citizen, None)]])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([Vec::<user::Model>::new()])
                // notification insert
                .append_query_results([vec![stored_row]])
                .into_connection(),
        );

        let service = NotificationFanoutService::new(
            NotificationRepository::new(db.clone()),
            UserRepository::new(db),
        );

        let outcome = service
            .on_report_change(&report, Some(ReportStatus::Draft), ReportStatus::Submitted)
            .await
            .unwrap();

        assert_eq!(outcome.planned, 1);
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.push.sent, 0);
    }
}
