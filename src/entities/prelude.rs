pub use super::anime::Entity as Anime;
pub use super::comments::Entity as Comments;
pub use super::ratings::Entity as Ratings;
pub use super::security_logs::Entity as SecurityLogs;
pub use super::users::Entity as Users;
