//! rebalancer-api — REST API for the rebalancer.
//!
//! Every change to a resource triggers a reconcile pass through the
//! controller's work queue.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/rebalances` | List resources |
//! | PUT | `/api/v1/rebalances` | Create or update a resource |
//! | GET | `/api/v1/rebalances/{namespace}/{name}` | Get a resource |
//! | DELETE | `/api/v1/rebalances/{namespace}/{name}` | Delete a resource |
//! | GET | `/api/v1/zones/{zone}/recordsets` | List local record sets |
//! | PUT | `/api/v1/zones/{zone}/recordsets` | Upsert a local record set |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use axum::Router;
use axum::routing::get;
use rebalancer_controller::{Gauges, WorkQueue};
use rebalancer_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub gauges: Gauges,
    pub queue: WorkQueue,
}

/// Build the complete API router (REST + metrics).
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route(
            "/rebalances",
            get(handlers::list_rebalances).put(handlers::apply_rebalance),
        )
        .route(
            "/rebalances/{namespace}/{name}",
            get(handlers::get_rebalance).delete(handlers::delete_rebalance),
        )
        .route(
            "/zones/{zone}/recordsets",
            get(handlers::list_record_sets).put(handlers::put_record_set),
        )
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
