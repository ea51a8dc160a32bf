pub mod handlers;
pub mod render;
pub mod routes;
pub mod session_extractor;

pub use handlers::*;
pub use routes::*;
