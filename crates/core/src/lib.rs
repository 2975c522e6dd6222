//! AltMe domain core.
//!
//! Pure domain rules with no I/O: the project request state machine, escrow
//! settlement, the balance ledger, and the validation shared by the
//! repository and HTTP layers.

pub mod bid;
pub mod chat;
pub mod error;
pub mod escrow;
pub mod favorites;
pub mod ledger;
pub mod notification;
pub mod payout;
pub mod project_status;
pub mod roles;
pub mod types;
pub mod validation;
