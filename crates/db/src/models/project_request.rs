//! Project request entity model and DTOs.

use altme_core::error::CoreError;
use altme_core::project_status::ProjectStatus;
use altme_core::types::{Cents, DbId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `project_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectRequest {
    pub id: DbId,
    pub client_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub budget: Cents,
    pub status: String,
    pub accepted_bid_id: Option<DbId>,
    pub accepted_bid_amount: Option<Cents>,
    pub hired_photographer_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectRequest {
    /// Parse the stored status string.
    pub fn status(&self) -> Result<ProjectStatus, CoreError> {
        ProjectStatus::parse(&self.status)
    }
}

/// DTO for creating a new project request.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub budget: Cents,
}

/// DTO for editing an Open project request. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub budget: Option<Cents>,
}

/// Sort order for project request listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSort {
    #[default]
    Newest,
    Oldest,
    BudgetDesc,
    BudgetAsc,
}

impl ProjectSort {
    /// SQL `ORDER BY` clause for this sort. Ties break on id for stable paging.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::Oldest => "created_at ASC, id ASC",
            Self::BudgetDesc => "budget DESC, id DESC",
            Self::BudgetAsc => "budget ASC, id ASC",
        }
    }
}

/// Filters for project request listings.
#[derive(Debug, Default)]
pub struct ProjectRequestFilter {
    pub status: Option<ProjectStatus>,
    pub client_id: Option<DbId>,
    pub photographer_id: Option<DbId>,
    pub sort: ProjectSort,
}

/// How a client books a request: by accepting a bid, or by hiring a
/// photographer directly at the posted budget.
#[derive(Debug, Clone, Deserialize)]
pub struct Booking {
    pub bid_id: Option<DbId>,
    pub photographer_id: Option<DbId>,
    /// Reference of the already-confirmed card payment at the processor.
    pub payment_reference: String,
}
