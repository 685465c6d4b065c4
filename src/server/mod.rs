mod api;
pub mod dto;
pub mod response;
mod router;

pub use api::api_router;
pub use router::{AppState, create_router};
