//! REST API handlers organized by domain.

pub mod admin;
pub mod batches;
pub mod health;
pub mod roles;
pub mod users;
