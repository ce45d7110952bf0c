//! HTTP API for clipscore-ev

pub mod admin;
pub mod auth;
pub mod health;
pub mod me;
pub mod sessions;

pub use admin::admin_routes;
pub use auth::{AdminAuthLayer, CurrentUser};
pub use health::health_routes;
pub use me::me_routes;
pub use sessions::session_routes;
