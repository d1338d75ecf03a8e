//! HTTP adapters: publish, status and router assembly.

pub mod publish;
pub mod router;
pub mod status;

pub use publish::{publish_routes, PublishState};
pub use router::{create_router, AppState};
pub use status::{local_hostname, status_routes, StatusState};
