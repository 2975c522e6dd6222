//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - Where the entity is editable, an update DTO (all `Option` fields)

pub mod bid;
pub mod chat;
pub mod escrow;
pub mod event;
pub mod favorite;
pub mod ledger;
pub mod notification;
pub mod payout;
pub mod project_request;
pub mod user;
