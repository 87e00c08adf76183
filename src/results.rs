//! Event result feeds.
//!
//! Defines the `ResultFeed` trait — the seam between the settlement
//! engine and whatever ingests final scores. The engine only ever sees
//! stable event and side identifiers; how a feed maps box scores, data
//! vendors, or manual entry onto those identifiers is its own concern.

use async_trait::async_trait;

use crate::store::Store;
use crate::types::{EventResult, LedgerError};

/// Source of final event results.
///
/// Implementors resolve a batch of event ids to their results. Events
/// that are not yet final are simply absent from the returned list — the
/// scheduler leaves their bets pending.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultFeed: Send + Sync {
    async fn final_results(&self, event_ids: &[String]) -> Result<Vec<EventResult>, LedgerError>;

    /// Feed name for logging and identification.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stored feed
// ---------------------------------------------------------------------------

/// Feed backed by the `event_results` table: results are ingested into
/// the store by an external process and read back here.
pub struct StoredResultFeed {
    store: Store,
}

impl StoredResultFeed {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResultFeed for StoredResultFeed {
    async fn final_results(&self, event_ids: &[String]) -> Result<Vec<EventResult>, LedgerError> {
        let mut results = Vec::new();
        for event_id in event_ids {
            if let Some(result) = self.store.get_event_result(event_id).await? {
                if result.is_final {
                    results.push(result);
                }
            }
        }
        Ok(results)
    }

    fn name(&self) -> &str {
        "stored"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
