pub mod middleware;
pub mod response;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary and to the integration tests.
pub use router::build_router;
pub use state::AppState;
