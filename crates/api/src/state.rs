use std::sync::Arc;

use crate::config::ServerConfig;
use crate::payments::PayoutGateway;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is a pool handle or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: altme_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Publishes platform events after each committed change.
    pub event_bus: Arc<altme_events::EventBus>,
    /// Outbound transfer provider. `None` means payouts are settled by hand
    /// and the admin supplies the transfer reference.
    pub payout_gateway: Option<Arc<dyn PayoutGateway>>,
}
