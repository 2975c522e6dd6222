//! Error type for repository operations that enforce domain rules.

use altme_core::error::CoreError;

/// Failure of a repository operation.
///
/// Plain CRUD functions return `sqlx::Error` directly; operations that
/// validate state inside their transaction (status transitions, payouts,
/// chat sends) return this so a domain rejection is not mistaken for a
/// database failure.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
