//! Database repositories.

pub mod category;
pub mod notification;
pub mod report;
pub mod user;
pub mod zone;

pub use category::CategoryRepository;
pub use notification::NotificationRepository;
pub use report::ReportRepository;
pub use user::UserRepository;
pub use zone::ZoneRepository;
