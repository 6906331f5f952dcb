//! Domain Layer - Core streaming types and retention rules.
//!
//! This layer contains the stock record and connection state types plus
//! the bounded aggregator. Nothing here performs I/O.

/// Stock record and connection state types.
pub mod streaming;

/// Bounded, insertion-ordered retention of stock records.
pub mod retention;
