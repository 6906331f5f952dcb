#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )
)]

//! Stock Stream Client - Live Price Feed Consumer
//!
//! Maintains a single WebSocket session to a stock price feed, merges the
//! partial `stock_info` / `price_update` messages into a bounded,
//! insertion-ordered list of records, and exposes a read-only view of that
//! list plus the connection state.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types and retention rules
//!   - `streaming`: Stock records and connection state
//!   - `retention`: Bounded aggregator
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Transport and feed view interfaces
//!   - `services`: The composed stream client
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: Codec, router, connection supervisor, WebSocket transport
//!   - `config`: Environment-driven settings
//!   - `health`: Health check HTTP endpoint
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//!                 ┌────────────┐  frames  ┌────────────┐  upserts  ┌────────────┐
//! Feed WS ───────►│ Transport  │─────────►│   Router   │──────────►│ Aggregator │
//!                 └────────────┘          └────────────┘           └─────┬──────┘
//!                       ▲ open/close/config                              │ snapshot
//!                 ┌─────┴──────┐                                   ┌─────▼──────┐
//!                 │ Supervisor │──────────── connection state ────►│  FeedView  │
//!                 └────────────┘                                   └────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core streaming types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::retention::{Aggregator, RetentionPolicy, UpsertKind, UpsertOutcome};
pub use domain::streaming::{ConnectionState, StockRecord, Symbol};

// Ports and services
pub use application::ports::{
    CloseReason, FeedStatus, FeedView, SupervisorStats, Transport, TransportError, TransportEvent,
    TransportSession,
};
pub use application::services::StreamClient;

// Feed adapters
pub use infrastructure::feed::{
    CodecError, ConfigFrame, ConnectionSupervisor, MessageRouter, SupervisorConfig, WsTransport,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedConfig};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
