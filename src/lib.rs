//! Depot - real-time shared depot for collaborative construction projects
//!
//! Participants contribute quantities of named commodities toward a project's
//! fixed requirements. Every accepted contribution is persisted and the
//! updated project snapshot is fanned out to all connected participants.
//!
//! ## Services
//!
//! - **Catalog**: built-in construction templates (station types)
//! - **Store**: project persistence (in-memory or JSON file index)
//! - **Engine**: contribution validation and atomic apply
//! - **Hub**: per-project snapshot fan-out to WebSocket subscribers
//! - **Sweeper**: retention sweep for stale projects

pub mod catalog;
pub mod config;
pub mod engine;
pub mod hub;
pub mod project;
pub mod routes;
pub mod server;
pub mod store;
pub mod sweeper;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{DepotError, Result};
