//! HTTP intake layer of the soundshift conversion service.
//!
//! Exposed as a library so integration tests can build the router with mock
//! collaborators.

pub mod api;
pub mod metrics;
pub mod state;
