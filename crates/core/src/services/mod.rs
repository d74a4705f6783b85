//! Business logic services.

#![allow(missing_docs)]

pub mod category;
pub mod duplicate_sync;
pub mod events;
pub mod evidence;
pub mod lifecycle;
pub mod notification;
pub mod push_notification;
pub mod report;
pub mod user;
pub mod zone;

pub use category::CategoryService;
pub use duplicate_sync::{DuplicateSyncService, PropagationOutcome, SyncedDuplicate};
pub use events::{EventSubscription, ReportEvent, ReportEventBus};
pub use evidence::{
    EvidenceService, EvidenceSet, MediaItem, ProgressFn, UploadProgress, UploadedEvidence,
};
pub use lifecycle::{
    MAX_PHOTOS_PER_SET, MAX_VIDEO_BYTES, MAX_VIDEOS_PER_SET, ReportAction, check_transition,
    ensure_future_deadline,
};
pub use notification::{
    FanoutOutcome, NotificationFanoutService, PlannedNotification, RoleRoster, plan_fan_out,
};
pub use push_notification::{
    HttpPushSender, NoOpPushSender, PUSH_CHUNK_SIZE, PushDispatcher, PushMessage, PushOutcome,
    PushSender,
};
pub use report::{ActionOutcome, AssignInput, DraftInput, ReportService};
pub use user::{CreateUserInput, UserService};
pub use zone::ZoneService;
