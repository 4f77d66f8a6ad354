//! Shared types for Depot

mod error;

pub use error::{DepotError, Result};
