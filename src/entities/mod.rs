pub mod prelude;

pub mod anime;
pub mod comments;
pub mod ratings;
pub mod security_logs;
pub mod users;
