//! Publish endpoint: `POST /pub/:channel/:event_name`.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, PublishResponse};
pub use handlers::{is_json_content_type, publish_event, PublishError, PublishState};
pub use routes::publish_routes;
