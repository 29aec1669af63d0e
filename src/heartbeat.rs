//! Liveness reporting to the central coordinator.

pub mod client;
pub mod status;
