pub mod anime;
pub mod audit;
pub mod comment;
pub mod rating;
pub mod user;
