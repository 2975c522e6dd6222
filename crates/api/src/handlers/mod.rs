//! Request handlers.
//!
//! Each submodule serves one resource. Handlers extract the caller, call
//! the matching repository in `altme_db`, publish a platform event after
//! the change commits, and map errors via [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod bids;
pub mod chat;
pub mod me;
pub mod notifications;
pub mod payouts;
pub mod project_requests;
