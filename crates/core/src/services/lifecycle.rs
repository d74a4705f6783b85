//! Report lifecycle transition rules.
//!
//! Every caller (report service, fan-out trigger, tests) consults this one
//! table instead of re-deriving transition legality per call site.

use chrono::{DateTime, Utc};
use cityfix_common::{AppError, AppResult};
use cityfix_db::entities::report::ReportStatus;

/// Maximum size for a single evidence video.
pub const MAX_VIDEO_BYTES: u64 = 15 * 1024 * 1024;

/// Maximum number of photos per evidence set (before or after).
pub const MAX_PHOTOS_PER_SET: usize = 4;

/// Maximum number of videos per evidence set (before or after).
pub const MAX_VIDEOS_PER_SET: usize = 1;

/// A lifecycle action a role may attempt on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportAction {
    /// Citizen submits a saved draft.
    Submit,
    /// Dispatcher assigns the report to an engineer.
    Assign,
    /// The assigned engineer starts work.
    Start,
    /// The assigned engineer saves progress without changing status.
    SaveProgress,
    /// The assigned engineer marks the report resolved.
    Resolve,
    /// QA verifies the resolution.
    Verify,
    /// QA reopens the report for further work.
    Reopen,
    /// The assigned engineer restarts work on a reopened report.
    Restart,
}

impl ReportAction {
    /// Statuses from which this action is legal.
    #[must_use]
    pub const fn valid_sources(self) -> &'static [ReportStatus] {
        match self {
            Self::Submit => &[ReportStatus::Draft],
            Self::Assign => &[ReportStatus::Submitted],
            Self::Start => &[ReportStatus::Assigned],
            Self::SaveProgress | Self::Resolve => &[ReportStatus::InProgress],
            Self::Verify | Self::Reopen => &[ReportStatus::Resolved],
            Self::Restart => &[ReportStatus::Reopened],
        }
    }

    /// Status the report holds after this action.
    #[must_use]
    pub const fn target(self) -> ReportStatus {
        match self {
            Self::Submit => ReportStatus::Submitted,
            Self::Assign => ReportStatus::Assigned,
            Self::Start | Self::SaveProgress | Self::Restart => ReportStatus::InProgress,
            Self::Resolve => ReportStatus::Resolved,
            Self::Verify => ReportStatus::Verified,
            Self::Reopen => ReportStatus::Reopened,
        }
    }
}

impl std::fmt::Display for ReportAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submit => "submit",
            Self::Assign => "assign",
            Self::Start => "start",
            Self::SaveProgress => "save progress on",
            Self::Resolve => "resolve",
            Self::Verify => "verify",
            Self::Reopen => "reopen",
            Self::Restart => "restart",
        };
        write!(f, "{s}")
    }
}

/// Check that `action` is legal from `current` and return the target status.
///
/// Rejects with [`AppError::StateViolation`] otherwise; callers must abort
/// without mutating anything.
pub fn check_transition(current: ReportStatus, action: ReportAction) -> AppResult<ReportStatus> {
    if action.valid_sources().contains(&current) {
        Ok(action.target())
    } else {
        Err(AppError::state_violation(&action.to_string(), current))
    }
}

/// Deadline rule for assignment: only strictly-future deadlines are valid.
pub fn ensure_future_deadline(
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if deadline > now {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid Deadline".to_string()))
    }
}
