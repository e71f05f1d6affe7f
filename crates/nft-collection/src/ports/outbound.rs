//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the collection account needs from its host.

use crate::errors::CollectionResult;
use shared_cells::{Cell, StdAddress};
use std::sync::Arc;

// =============================================================================
// STATE STORE
// =============================================================================

/// Persistent record storage, one cell per account.
///
/// The account re-reads its record on every request, so a store that
/// returns a corrupted cell halts the account rather than being silently
/// patched over.
pub trait StateStore {
    /// Loads the record of `account`, or `None` if nothing was saved.
    fn load(&self, account: &StdAddress) -> CollectionResult<Option<Arc<Cell>>>;

    /// Replaces the record of `account`.
    fn save(&mut self, account: &StdAddress, data: Arc<Cell>) -> CollectionResult<()>;
}
