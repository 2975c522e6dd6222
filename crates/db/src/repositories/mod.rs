//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions that
//! accept `&PgPool` as the first argument. Functions that must join a
//! caller's transaction take `&mut PgConnection` instead.

pub mod bid_repo;
pub mod chat_repo;
pub mod escrow_repo;
pub mod event_repo;
pub mod favorite_repo;
pub mod ledger_repo;
pub mod notification_repo;
pub mod payout_repo;
pub mod project_request_repo;
pub mod user_repo;

pub use bid_repo::BidRepo;
pub use chat_repo::ChatRepo;
pub use escrow_repo::EscrowRepo;
pub use event_repo::EventRepo;
pub use favorite_repo::FavoriteRepo;
pub use ledger_repo::LedgerRepo;
pub use notification_repo::NotificationRepo;
pub use payout_repo::PayoutRepo;
pub use project_request_repo::{ProjectRequestRepo, TransitionOutcome, TransitionRequest};
pub use user_repo::UserRepo;

/// Name of the constraint violated by `err`, if it is a constraint violation.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}
