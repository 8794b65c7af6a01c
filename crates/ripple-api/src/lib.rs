pub mod auth;
pub mod error;
pub mod middleware;
pub mod pictures;
pub mod posts;
pub mod users;
