//! HTTP API layer

pub mod buckets;
pub mod health;
pub mod revisions;
pub mod router;
pub mod state;
pub mod types;
pub mod workflows;

pub use router::create_router_with_state;
pub use state::AppState;
