//! Band-finder API service
//!
//! Musicians publish posts, form bands and join them through requests and
//! invites. The binary in `main.rs` wires configuration and the database
//! pool into [`create_router`].

pub mod config;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod media;
pub mod membership;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod repositories;
pub mod routes;
pub mod seed;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
