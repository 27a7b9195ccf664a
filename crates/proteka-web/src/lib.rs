//! proteka-web — axum server exposing the REST API and the dashboard.

pub mod handlers;
pub mod router;
pub mod state;
