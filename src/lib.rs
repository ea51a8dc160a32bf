pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{FailureKind, ODataError, ODataResult};

// Export logic types
pub use logic::{
    decode_entity, parse_resource_path, EntityLocator, KeyMatcher, NavigationResolver,
    RequestRouter, ResourceOutcome,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{EntityStore, MemoryStore, SessionHandle, SessionRegistry};

use std::sync::Arc;

/// Shared state for the HTTP layer: a session registry over the sample
/// schema whose sessions are seeded with the sample data.
pub fn build_state(config: &config::AppConfig) -> anyhow::Result<api::AppState> {
    let schema = Arc::new(seed::sample_schema()?);
    let sessions = SessionRegistry::new(
        schema,
        config.session_ttl(),
        Box::new(|store: &MemoryStore| seed::load_sample_data(store)),
    );
    Ok(Arc::new(api::ServiceState {
        sessions,
        service: config.service.clone(),
    }))
}

pub fn build_app(config: &config::AppConfig) -> anyhow::Result<axum::Router> {
    Ok(api::routes::create_router(build_state(config)?))
}
