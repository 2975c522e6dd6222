//! Project request lifecycle.
//!
//! A project request moves through a fixed set of statuses. Every status
//! change goes through a [`ProjectAction`], and each action is only valid
//! from the statuses listed in its row of the transition table:
//!
//! | Action          | From                                            | To          |
//! |-----------------|-------------------------------------------------|-------------|
//! | `book`          | Open                                            | Pending     |
//! | `approve`       | Pending                                         | In Progress |
//! | `deliver`       | In Progress                                     | Delivered   |
//! | `complete`      | Delivered                                       | Completed   |
//! | `dispute`       | In Progress, Delivered                          | Disputed    |
//! | `resolve_refund`| Disputed                                        | Completed   |
//! | `resolve_pay`   | Disputed                                        | Completed   |
//! | `disable`       | Open, Pending, In Progress, Delivered, Disputed | Disabled    |

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::escrow::EscrowEffect;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

/// Status of a project request. The wire and database form is the display
/// string returned by [`ProjectStatus::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Disabled")]
    Disabled,
    #[serde(rename = "Disputed")]
    Disputed,
}

/// Every status, in lifecycle order.
pub const ALL_STATUSES: &[ProjectStatus] = &[
    ProjectStatus::Open,
    ProjectStatus::Pending,
    ProjectStatus::InProgress,
    ProjectStatus::Delivered,
    ProjectStatus::Completed,
    ProjectStatus::Disabled,
    ProjectStatus::Disputed,
];

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::Disabled => "Disabled",
            Self::Disputed => "Disputed",
        }
    }

    /// Parse the database / wire representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!("Invalid project request status '{value}'"))
            })
    }

    /// Completed and Disabled requests never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Disabled)
    }

    /// Whether funds are expected to be held in escrow in this status.
    pub fn holds_escrow(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::InProgress | Self::Delivered | Self::Disputed
        )
    }

    /// Statuses reachable from this one through any single action.
    pub fn valid_transitions(self) -> Vec<ProjectStatus> {
        let mut targets: Vec<ProjectStatus> = ALL_ACTIONS
            .iter()
            .filter(|a| a.allowed_from().contains(&self))
            .map(|a| a.target())
            .collect();
        targets.dedup();
        targets
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

/// The role an actor plays with respect to a particular request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The user who posted the request.
    Client,
    /// The photographer hired for the request.
    Photographer,
    /// A platform administrator.
    Admin,
}

// ---------------------------------------------------------------------------
// ProjectAction
// ---------------------------------------------------------------------------

/// An operation that moves a request from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    Book,
    Approve,
    Deliver,
    Complete,
    Dispute,
    ResolveRefund,
    ResolvePay,
    Disable,
}

pub const ALL_ACTIONS: &[ProjectAction] = &[
    ProjectAction::Book,
    ProjectAction::Approve,
    ProjectAction::Deliver,
    ProjectAction::Complete,
    ProjectAction::Dispute,
    ProjectAction::ResolveRefund,
    ProjectAction::ResolvePay,
    ProjectAction::Disable,
];

impl ProjectAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Approve => "approve",
            Self::Deliver => "deliver",
            Self::Complete => "complete",
            Self::Dispute => "dispute",
            Self::ResolveRefund => "resolve_refund",
            Self::ResolvePay => "resolve_pay",
            Self::Disable => "disable",
        }
    }

    /// Statuses this action may be applied to.
    pub fn allowed_from(self) -> &'static [ProjectStatus] {
        use ProjectStatus::*;
        match self {
            Self::Book => &[Open],
            Self::Approve => &[Pending],
            Self::Deliver => &[InProgress],
            Self::Complete => &[Delivered],
            Self::Dispute => &[InProgress, Delivered],
            Self::ResolveRefund | Self::ResolvePay => &[Disputed],
            Self::Disable => &[Open, Pending, InProgress, Delivered, Disputed],
        }
    }

    /// The status a request ends up in after this action.
    pub fn target(self) -> ProjectStatus {
        match self {
            Self::Book => ProjectStatus::Pending,
            Self::Approve => ProjectStatus::InProgress,
            Self::Deliver => ProjectStatus::Delivered,
            Self::Complete | Self::ResolveRefund | Self::ResolvePay => ProjectStatus::Completed,
            Self::Dispute => ProjectStatus::Disputed,
            Self::Disable => ProjectStatus::Disabled,
        }
    }

    /// Validate the transition from `current` and return the new status.
    pub fn apply(self, current: ProjectStatus) -> Result<ProjectStatus, CoreError> {
        if self.allowed_from().contains(&current) {
            Ok(self.target())
        } else {
            Err(CoreError::Conflict(format!(
                "Cannot {} a project request in status '{}'",
                self.as_str(),
                current
            )))
        }
    }

    /// Parties allowed to perform this action.
    pub fn permitted_parties(self) -> &'static [Party] {
        match self {
            Self::Book => &[Party::Client],
            Self::Approve | Self::ResolveRefund | Self::ResolvePay | Self::Disable => {
                &[Party::Admin]
            }
            Self::Deliver => &[Party::Photographer],
            Self::Complete => &[Party::Client, Party::Admin],
            Self::Dispute => &[Party::Client, Party::Photographer],
        }
    }

    /// Check that at least one of the actor's parties may perform this action.
    pub fn authorize(self, parties: &[Party]) -> Result<(), CoreError> {
        if parties
            .iter()
            .any(|p| self.permitted_parties().contains(p))
        {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Not allowed to {} this project request",
                self.as_str()
            )))
        }
    }

    /// What happens to the escrowed funds when this action succeeds.
    ///
    /// `Disable` only refunds when an escrow is actually held; the caller
    /// downgrades [`EscrowEffect::Refund`] to [`EscrowEffect::None`] if not.
    pub fn escrow_effect(self) -> EscrowEffect {
        match self {
            Self::Book => EscrowEffect::Create,
            Self::Complete | Self::ResolvePay => EscrowEffect::Release,
            Self::ResolveRefund | Self::Disable => EscrowEffect::Refund,
            Self::Approve | Self::Deliver | Self::Dispute => EscrowEffect::None,
        }
    }

    /// Name of the platform event published after this action.
    pub fn event_type(self) -> &'static str {
        use crate::notification::*;
        match self {
            Self::Book => EVENT_PROJECT_BOOKED,
            Self::Approve => EVENT_PROJECT_APPROVED,
            Self::Deliver => EVENT_PROJECT_DELIVERED,
            Self::Complete => EVENT_PROJECT_COMPLETED,
            Self::Dispute => EVENT_PROJECT_DISPUTED,
            Self::ResolveRefund | Self::ResolvePay => EVENT_PROJECT_RESOLVED,
            Self::Disable => EVENT_PROJECT_DISABLED,
        }
    }
}

/// Work out which parties `actor_id` plays on a request.
pub fn parties_for(
    actor_id: DbId,
    is_admin: bool,
    client_id: DbId,
    hired_photographer_id: Option<DbId>,
) -> Vec<Party> {
    let mut parties = Vec::with_capacity(3);
    if actor_id == client_id {
        parties.push(Party::Client);
    }
    if hired_photographer_id == Some(actor_id) {
        parties.push(Party::Photographer);
    }
    if is_admin {
        parties.push(Party::Admin);
    }
    parties
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_round_trips_through_display_string() {
        for s in ALL_STATUSES {
            assert_eq!(ProjectStatus::parse(s.as_str()).unwrap(), *s);
        }
        assert_eq!(ProjectStatus::InProgress.as_str(), "In Progress");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_matches!(
            ProjectStatus::parse("in_progress"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn status_serializes_as_display_string() {
        let json = serde_json::to_string(&ProjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn happy_path_reaches_completed() {
        let mut status = ProjectStatus::Open;
        for action in [
            ProjectAction::Book,
            ProjectAction::Approve,
            ProjectAction::Deliver,
            ProjectAction::Complete,
        ] {
            status = action.apply(status).unwrap();
        }
        assert_eq!(status, ProjectStatus::Completed);
    }

    #[test]
    fn resolving_a_dispute_always_completes() {
        for action in [ProjectAction::ResolveRefund, ProjectAction::ResolvePay] {
            assert_eq!(
                action.apply(ProjectStatus::Disputed).unwrap(),
                ProjectStatus::Completed
            );
        }
    }

    #[test]
    fn disabling_a_completed_request_is_a_conflict() {
        assert_matches!(
            ProjectAction::Disable.apply(ProjectStatus::Completed),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            ProjectAction::Disable.apply(ProjectStatus::Disabled),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for s in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            assert!(s.valid_transitions().is_empty(), "{s} should be terminal");
        }
    }

    #[test]
    fn non_terminal_statuses_can_be_disabled() {
        for s in ALL_STATUSES.iter().filter(|s| !s.is_terminal()) {
            assert!(s.valid_transitions().contains(&ProjectStatus::Disabled));
        }
    }

    #[test]
    fn cannot_deliver_before_approval() {
        assert!(ProjectAction::Deliver.apply(ProjectStatus::Pending).is_err());
        assert!(ProjectAction::Deliver.apply(ProjectStatus::Open).is_err());
    }

    #[test]
    fn open_requests_cannot_be_disputed() {
        assert!(ProjectAction::Dispute.apply(ProjectStatus::Open).is_err());
        assert!(ProjectAction::Dispute.apply(ProjectStatus::Pending).is_err());
    }

    #[test]
    fn escrow_is_held_only_while_work_is_outstanding() {
        assert!(!ProjectStatus::Open.holds_escrow());
        assert!(ProjectStatus::Pending.holds_escrow());
        assert!(ProjectStatus::Disputed.holds_escrow());
        assert!(!ProjectStatus::Completed.holds_escrow());
        assert!(!ProjectStatus::Disabled.holds_escrow());
    }

    #[test]
    fn only_admins_resolve_disputes() {
        assert!(ProjectAction::ResolvePay.authorize(&[Party::Admin]).is_ok());
        assert_matches!(
            ProjectAction::ResolvePay.authorize(&[Party::Client]),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn only_the_hired_photographer_delivers() {
        assert!(ProjectAction::Deliver
            .authorize(&[Party::Photographer])
            .is_ok());
        assert!(ProjectAction::Deliver.authorize(&[Party::Admin]).is_err());
        assert!(ProjectAction::Deliver.authorize(&[]).is_err());
    }

    #[test]
    fn parties_are_resolved_from_request_roles() {
        assert_eq!(parties_for(1, false, 1, Some(2)), vec![Party::Client]);
        assert_eq!(parties_for(2, false, 1, Some(2)), vec![Party::Photographer]);
        assert_eq!(parties_for(3, true, 1, Some(2)), vec![Party::Admin]);
        assert!(parties_for(4, false, 1, None).is_empty());
    }

    #[test]
    fn disable_targets_refund() {
        assert_eq!(ProjectAction::Disable.escrow_effect(), EscrowEffect::Refund);
        assert_eq!(ProjectAction::Complete.escrow_effect(), EscrowEffect::Release);
        assert_eq!(ProjectAction::Approve.escrow_effect(), EscrowEffect::None);
    }
}
