//! Read-only status endpoint reporting the current state of every watched file

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, run_status_server};
