//! Stock Streaming Types
//!
//! Core domain types for the live price view: the per-symbol record that
//! is assembled from partial feed messages, and the connection state that
//! consumers display next to it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

// =============================================================================
// Stock Record
// =============================================================================

/// A stock symbol (ticker).
pub type Symbol = String;

/// One retained entity, keyed by symbol.
///
/// Fields other than `symbol` are refreshed by whichever message mentions
/// the symbol last. `price` stays `None` until the first price update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRecord {
    /// Ticker symbol (unique, non-empty).
    pub symbol: Symbol,
    /// Company display name.
    pub display_name: Option<String>,
    /// Industry category.
    pub category: Option<String>,
    /// Last traded price, if one has been seen.
    pub price: Option<Decimal>,
    /// Timestamp of the most recent message for this symbol.
    pub observed_at: DateTime<Utc>,
}

impl StockRecord {
    /// Create a record from a metadata message (price unset).
    #[must_use]
    pub const fn from_metadata(
        symbol: Symbol,
        display_name: Option<String>,
        category: Option<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            display_name,
            category,
            price: None,
            observed_at,
        }
    }

    /// Create a record from a price message (no metadata yet).
    #[must_use]
    pub const fn from_price(symbol: Symbol, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            display_name: None,
            category: None,
            price: Some(price),
            observed_at,
        }
    }

    /// Whether both metadata and a price have been observed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.display_name.is_some() && self.price.is_some()
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live session.
    #[default]
    Disconnected,
    /// Session opening.
    Connecting,
    /// Session open and configured.
    Connected,
    /// The transport reported an error; a close normally follows.
    Errored,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        }
    }

    /// Whether a session is being opened or is open.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Numeric code used for the connection-state gauge.
    #[must_use]
    pub const fn as_gauge(&self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Connected => 2.0,
            Self::Errored => 3.0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_record_has_no_price() {
        let record = StockRecord::from_metadata(
            "AAPL".to_string(),
            Some("Apple Inc.".to_string()),
            Some("Technology".to_string()),
            Utc::now(),
        );
        assert!(record.price.is_none());
        assert!(!record.is_complete());
    }

    #[test]
    fn price_record_has_no_metadata() {
        let record = StockRecord::from_price("AAPL".to_string(), Decimal::new(1905, 1), Utc::now());
        assert_eq!(record.price, Some(Decimal::new(1905, 1)));
        assert!(record.display_name.is_none());
        assert!(record.category.is_none());
    }

    #[test]
    fn connection_state_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn connection_state_active() {
        assert!(ConnectionState::Connecting.is_active());
        assert!(ConnectionState::Connected.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(!ConnectionState::Errored.is_active());
    }

    #[test]
    fn connection_state_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Errored).unwrap();
        assert_eq!(json, r#""errored""#);
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
