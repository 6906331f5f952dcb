//! Bounded Retention of Stock Records
//!
//! The aggregator owns the ordered, capacity-bounded list of stock records
//! and applies the merge/insert/eviction rules for the two feed message
//! kinds.
//!
//! # Rules
//!
//! - Records are unique by symbol.
//! - Order reflects insertion, never recency: updates mutate in place.
//! - A price update for an unknown symbol appends the record and then
//!   truncates the list to its first `capacity` entries. When the list is
//!   already full the appended record is the one truncated, so the new
//!   symbol never becomes visible.
//! - Under [`RetentionPolicy::Reference`] a metadata message for an unknown
//!   symbol always appends, even past capacity. The next price update then
//!   truncates the overflow away.
//! - Under [`RetentionPolicy::Uniform`] the metadata path obeys the same
//!   truncation rule as the price path.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::streaming::{StockRecord, Symbol};

/// Default number of retained records.
pub const DEFAULT_CAPACITY: usize = 10;

/// Largest capacity accepted from configuration.
pub const MAX_CAPACITY: usize = 10_000;

// =============================================================================
// Policy and Outcomes
// =============================================================================

/// How the metadata path interacts with the capacity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Metadata inserts are exempt from truncation.
    #[default]
    Reference,
    /// Both paths truncate to capacity after inserting.
    Uniform,
}

impl RetentionPolicy {
    /// Parse policy from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "uniform" => Self::Uniform,
            _ => Self::Reference,
        }
    }

    /// Get the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Uniform => "uniform",
        }
    }
}

/// Result of a single upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// What happened to the mentioned symbol.
    pub kind: UpsertKind,
    /// Symbols removed from the tail by truncation (excluding a dropped
    /// new symbol).
    pub evicted: Vec<Symbol>,
}

/// What an upsert did to the mentioned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// A new record was appended and retained.
    Inserted,
    /// An existing record was updated in place.
    Updated,
    /// A new record was appended and immediately truncated away.
    Dropped,
}

impl UpsertOutcome {
    const fn updated() -> Self {
        Self {
            kind: UpsertKind::Updated,
            evicted: Vec::new(),
        }
    }

    const fn inserted() -> Self {
        Self {
            kind: UpsertKind::Inserted,
            evicted: Vec::new(),
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Owner of the bounded, insertion-ordered record list.
///
/// All mutation happens under a single write lock, so a concurrent
/// [`snapshot`](Self::snapshot) never observes a partially applied upsert.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use rust_decimal::Decimal;
/// use stock_stream_client::domain::retention::{Aggregator, UpsertKind};
///
/// let aggregator = Aggregator::new(2);
/// let now = Utc::now();
///
/// aggregator.upsert_price("AAA", Decimal::new(105, 1), now);
/// aggregator.upsert_price("BBB", Decimal::new(200, 1), now);
///
/// // List is full: the new symbol is dropped.
/// let outcome = aggregator.upsert_price("CCC", Decimal::new(10, 0), now);
/// assert_eq!(outcome.kind, UpsertKind::Dropped);
///
/// let symbols: Vec<_> = aggregator.snapshot().into_iter().map(|r| r.symbol).collect();
/// assert_eq!(symbols, vec!["AAA", "BBB"]);
/// ```
#[derive(Debug)]
pub struct Aggregator {
    capacity: usize,
    policy: RetentionPolicy,
    records: RwLock<Vec<StockRecord>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Aggregator {
    /// Create an aggregator with the reference policy.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, RetentionPolicy::Reference)
    }

    /// Create an aggregator with an explicit policy.
    #[must_use]
    pub fn with_policy(capacity: usize, policy: RetentionPolicy) -> Self {
        Self {
            capacity,
            policy,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Maximum number of records retained after a price update.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured retention policy.
    #[must_use]
    pub const fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Apply a metadata message.
    ///
    /// An existing record keeps its position and price; name, category and
    /// timestamp are replaced with the message values.
    pub fn upsert_metadata(
        &self,
        symbol: &str,
        display_name: Option<String>,
        category: Option<String>,
        observed_at: DateTime<Utc>,
    ) -> UpsertOutcome {
        let mut records = self.records.write();

        if let Some(record) = records.iter_mut().find(|r| r.symbol == symbol) {
            record.display_name = display_name;
            record.category = category;
            record.observed_at = observed_at;
            return UpsertOutcome::updated();
        }

        records.push(StockRecord::from_metadata(
            symbol.to_string(),
            display_name,
            category,
            observed_at,
        ));

        match self.policy {
            RetentionPolicy::Reference => UpsertOutcome::inserted(),
            RetentionPolicy::Uniform => self.truncate(&mut records, Some(symbol)),
        }
    }

    /// Apply a price message.
    ///
    /// An existing record keeps its position and metadata. The list is
    /// truncated to capacity afterwards in every case.
    pub fn upsert_price(&self, symbol: &str, price: Decimal, observed_at: DateTime<Utc>) -> UpsertOutcome {
        let mut records = self.records.write();

        if let Some(record) = records.iter_mut().find(|r| r.symbol == symbol) {
            record.price = Some(price);
            record.observed_at = observed_at;
            let mut outcome = self.truncate(&mut records, None);
            outcome.kind = UpsertKind::Updated;
            return outcome;
        }

        records.push(StockRecord::from_price(symbol.to_string(), price, observed_at));
        self.truncate(&mut records, Some(symbol))
    }

    /// Point-in-time copy of the retained records, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StockRecord> {
        self.records.read().clone()
    }

    /// Number of records currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether a symbol is currently retained.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.records.read().iter().any(|r| r.symbol == symbol)
    }

    /// Cut the list down to capacity.
    ///
    /// `appended` names the symbol pushed by the caller; if it falls past
    /// capacity the outcome is `Dropped`.
    fn truncate(&self, records: &mut Vec<StockRecord>, appended: Option<&str>) -> UpsertOutcome {
        if records.len() <= self.capacity {
            return UpsertOutcome::inserted();
        }

        let mut kind = UpsertKind::Inserted;
        let evicted = records
            .drain(self.capacity..)
            .filter_map(|r| {
                if appended == Some(r.symbol.as_str()) {
                    kind = UpsertKind::Dropped;
                    None
                } else {
                    Some(r.symbol)
                }
            })
            .collect();

        UpsertOutcome { kind, evicted }
    }
}

// =============================================================================
// Tests
// =============================================================================
