//! Journal of fired transitions.
//!
//! Every transition the engine executes is recorded here with the source,
//! destination, triggering event kind and a timestamp. The journal is
//! purely diagnostic; it never influences transition selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single fired transition.
///
/// # Example
///
/// ```rust
/// use statechart::core::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: "Red".to_string(),
///     to: Some("Green".to_string()),
///     event: Some("Tick".to_string()),
///     timestamp: Utc::now(),
///     step: 1,
/// };
/// assert!(!record.is_internal());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Key of the state owning the transition
    pub from: String,
    /// Key of the destination, `None` for internal transitions
    pub to: Option<String>,
    /// Kind of the triggering event, `None` for conditional passes
    pub event: Option<String>,
    /// When the transition fired
    pub timestamp: DateTime<Utc>,
    /// Sequence number of the `apply_event` call that fired it
    pub step: u64,
}

impl TransitionRecord {
    pub fn is_internal(&self) -> bool {
        self.to.is_none()
    }
}

/// Ordered, optionally bounded log of transition records.
///
/// When a capacity is set the oldest records are discarded first.
///
/// # Example
///
/// ```rust
/// use statechart::core::{TransitionJournal, TransitionRecord};
/// use chrono::Utc;
///
/// let mut journal = TransitionJournal::with_capacity(Some(1));
/// for (from, to) in [("Red", "Green"), ("Green", "Yellow")] {
///     journal.record(TransitionRecord {
///         from: from.to_string(),
///         to: Some(to.to_string()),
///         event: Some("Tick".to_string()),
///         timestamp: Utc::now(),
///         step: 1,
///     });
/// }
///
/// assert_eq!(journal.len(), 1);
/// assert_eq!(journal.last().unwrap().from, "Green");
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionJournal {
    records: VecDeque<TransitionRecord>,
    capacity: Option<usize>,
}

impl TransitionJournal {
    /// Create an unbounded journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal keeping at most `capacity` records.
    ///
    /// `Some(0)` disables recording entirely.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, record: TransitionRecord) {
        match self.capacity {
            Some(0) => return,
            Some(max) if self.records.len() >= max => {
                self.records.pop_front();
            }
            _ => {}
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// Destinations of external transitions, in firing order.
    pub fn destinations(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|record| record.to.as_deref())
            .collect()
    }

    /// Time between the first and last retained record.
    ///
    /// Returns `None` if the journal is empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
