pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod types;
pub mod validate;

pub use router::handle_request;
pub use types::{ApiRequest, AppState};
