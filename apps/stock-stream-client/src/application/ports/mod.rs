//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`Transport`]: Opens a single bidirectional message-stream session
//! - [`TransportSession`]: Handle for sending frames and closing a session
//!
//! ## Driver Ports (Inbound)
//!
//! - [`FeedView`]: Read-only view consumed by display collaborators
//! - [`FeedStatus`]: Operational status for health reporting

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::retention::RetentionPolicy;
use crate::domain::streaming::{ConnectionState, StockRecord};

// =============================================================================
// Transport Events
// =============================================================================

/// Close code and reason reported when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code.
    pub code: u16,
    /// Human-readable reason (may be empty).
    pub reason: String,
}

impl CloseReason {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// No status code was present in the close frame.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;

    /// Create a close reason.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close reason for a connection lost without a close handshake.
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Self::ABNORMAL, reason)
    }

    /// Whether the session ended with the normal close code.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        self.code == Self::NORMAL
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.reason)
        }
    }
}

/// Lifecycle and data events delivered by a transport session.
///
/// Every session emits at most one `Opened` and exactly one `Closed`, which
/// is always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The session handshake completed.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// A frame arrived that is not valid UTF-8 text; carries its length.
    UndecodableFrame(usize),
    /// The transport failed; a `Closed` event follows.
    Error(String),
    /// The session ended.
    Closed(CloseReason),
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors returned synchronously by transport calls.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint URL could not be turned into a connection request.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The session has already ended.
    #[error("session closed")]
    SessionClosed,
}

// =============================================================================
// Transport Port
// =============================================================================

/// Capability to open message-stream sessions.
///
/// `connect` returns immediately; the handshake outcome and all further
/// activity arrive on `events`.
pub trait Transport: Send + Sync + 'static {
    /// Handle type for an opened session.
    type Session: TransportSession;

    /// Start a session to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be started at all (for
    /// example, an unparseable URL). Handshake failures are reported as
    /// events instead.
    fn connect(
        &self,
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self::Session, TransportError>;
}

/// Handle to one transport session.
pub trait TransportSession: Send + Sync + 'static {
    /// Queue a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SessionClosed`] if the session has ended.
    fn send(&self, text: String) -> Result<(), TransportError>;

    /// Begin a close handshake with the given code.
    fn close(&self, code: u16, reason: &str);
}

// =============================================================================
// View Port
// =============================================================================

/// Read-only view of the feed for display collaborators.
pub trait FeedView: Send + Sync {
    /// Immutable copy of the retained records, in insertion order.
    fn snapshot(&self) -> Vec<StockRecord>;

    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;
}

/// Connection supervisor counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupervisorStats {
    /// Sessions that completed the open handshake.
    pub sessions_opened: u64,
    /// Configuration frames handed to the transport.
    pub config_frames_sent: u64,
    /// Reconnects scheduled after abnormal closes.
    pub reconnects_scheduled: u64,
    /// Frames applied to the aggregator.
    pub frames_routed: u64,
    /// Frames discarded as malformed or unknown.
    pub frames_discarded: u64,
}

/// Feed view plus the counters reported by the health endpoint.
pub trait FeedStatus: FeedView {
    /// Supervisor counters.
    fn stats(&self) -> SupervisorStats;

    /// Maximum retained records after a price update.
    fn retention_capacity(&self) -> usize;

    /// Retention policy applied to metadata inserts.
    fn retention_policy(&self) -> RetentionPolicy;

    /// Whether the feed was stopped on purpose and will not reconnect.
    fn is_stopped(&self) -> bool;
}
