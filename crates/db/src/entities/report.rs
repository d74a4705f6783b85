//! Report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report lifecycle status.
///
/// Transitions only move forward through the lifecycle, except the QA reopen
/// path which loops back into engineer work. `Merged` is reserved: the
/// notification matrix understands it but no lifecycle path produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[derive(Default)]
pub enum ReportStatus {
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "reopened")]
    Reopened,
    /// Reserved for duplicate-merge flows; never set by this crate.
    #[sea_orm(string_value = "merged")]
    Merged,
}

impl ReportStatus {
    /// Whether this status ends the lifecycle (successful close).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Assigned => "assigned",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
            Self::Verified => "verified",
            Self::Reopened => "reopened",
            Self::Merged => "merged",
        };
        write!(f, "{s}")
    }
}

/// Assignment priority set by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// Report model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Category name, drawn from the admin-managed category list.
    pub category: String,

    pub address: String,

    #[sea_orm(column_type = "Double")]
    pub latitude: f64,

    #[sea_orm(column_type = "Double")]
    pub longitude: f64,

    /// Ordered list of "before" photo URLs (at most four).
    #[sea_orm(column_type = "JsonBinary")]
    pub before_photos: Json,

    /// At most one "before" video URL.
    #[sea_orm(nullable)]
    pub before_video: Option<String>,

    /// Ordered list of "after" photo URLs, populated at resolution.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub after_photos: Option<Json>,

    /// At most one "after" video URL.
    #[sea_orm(nullable)]
    pub after_video: Option<String>,

    /// The citizen who filed the report.
    pub user_id: String,

    /// Citizen display name, denormalized for queue listings.
    pub user_name: String,

    pub status: ReportStatus,

    /// Drafts are excluded from all staff queues until submitted.
    #[sea_orm(default_value = false)]
    pub is_draft: bool,

    /// Soft delete: excluded from listings, still addressable by id.
    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    // === Assignment fields ===
    #[sea_orm(nullable)]
    pub assigned_to: Option<String>,

    #[sea_orm(nullable)]
    pub assigned_to_name: Option<String>,

    #[sea_orm(nullable)]
    pub priority: Option<Priority>,

    #[sea_orm(nullable)]
    pub deadline: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub dispatcher_notes: Option<String>,

    #[sea_orm(nullable)]
    pub assigned_at: Option<DateTimeWithTimeZone>,

    // === Progress / resolution fields ===
    #[sea_orm(nullable)]
    pub started_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub resolution_notes: Option<String>,

    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,

    // === QA fields ===
    #[sea_orm(column_type = "Text", nullable)]
    pub qa_feedback: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub reopen_reason: Option<String>,

    #[sea_orm(nullable)]
    pub verified_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub reopened_at: Option<DateTimeWithTimeZone>,

    // === Duplicate-merge fields ===
    /// Number of duplicate reports pointing at this master.
    #[sea_orm(default_value = 0)]
    pub duplicate_count: i32,

    /// Master report this report duplicates. Mutually exclusive with having
    /// duplicates of one's own: masters are terminal.
    #[sea_orm(nullable)]
    pub is_duplicate_of: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub submitted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Citizen,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Engineer,
}

impl ActiveModelBehavior for ActiveModel {}
