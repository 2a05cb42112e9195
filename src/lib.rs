pub mod blueprint;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod routes;
pub mod sse;
pub mod state;
pub mod stores;
pub mod validation;

pub use routes::api_routes;
pub use state::AppState;
