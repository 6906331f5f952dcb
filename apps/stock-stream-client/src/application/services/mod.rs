//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `StreamClient`: Owns the aggregator and connection supervisor and
//!   exposes the read-only feed view

mod client;

pub use client::StreamClient;
