//! Database entities.

pub mod category;
pub mod notification;
pub mod report;
pub mod user;
pub mod zone;

pub use category::Entity as Category;
pub use notification::Entity as Notification;
pub use report::Entity as Report;
pub use user::Entity as User;
pub use zone::Entity as Zone;
