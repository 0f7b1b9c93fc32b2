//! Export REST Service
//!
//! Serves the tables of one export directory to the alluvial and layout
//! front ends.
//!
//! ## Endpoints
//!
//! - `GET /` - Endpoint index
//! - `GET /health` - Service health and table availability
//! - `GET /data/nodes` - `nodes.csv`
//! - `GET /data/edges` - `edges.csv`
//! - `GET /data/alluvial-nodes` - `alluvial_nodes.csv`
//! - `GET /data/alluvial-links` - `alluvial_links.csv`
//! - `GET /data/manifest` - `run_manifest.json`

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_table_served};
pub use routes::{create_router, ErrorResponse};
pub use state::ServiceState;
