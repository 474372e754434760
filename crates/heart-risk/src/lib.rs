pub mod assessment;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod telemetry;
