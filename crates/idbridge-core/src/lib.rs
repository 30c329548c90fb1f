//! idbridge Core Library
//!
//! Shared types for the idbridge workspace.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed directory identifiers (`GroupId`, `UserId`)

pub mod ids;

pub use ids::{GroupId, ParseIdError, UserId};
