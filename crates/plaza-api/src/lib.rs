pub mod admin;
pub mod auth;
pub mod comments;
pub mod error;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod profiles;
