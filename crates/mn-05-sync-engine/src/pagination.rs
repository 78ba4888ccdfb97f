//! # Page Contract
//!
//! What a fetched page must look like before any of its entries reach a
//! store, and the rule that ends the fetch loop.

use crate::errors::TransportError;
use crate::ports::{LogFetchRequest, LogPage};

/// Checks a page against the request that produced it.
///
/// Entries must ascend strictly by `global_index`, start at or after the
/// requested index, and fit the requested bound. A violation means the
/// daemon and the mirror no longer agree on the protocol, so the whole
/// page is refused before any entry is consumed.
pub fn validate_page(request: &LogFetchRequest, page: &LogPage) -> Result<(), TransportError> {
    if page.actions.len() > request.max_count as usize {
        return Err(TransportError::Unexpected(format!(
            "page holds {} entries, requested at most {}",
            page.actions.len(),
            request.max_count
        )));
    }
    let mut floor = request.start_index;
    for entry in &page.actions {
        if entry.global_index < floor {
            return Err(TransportError::Unexpected(format!(
                "entry {} out of order in page starting at {}",
                entry.global_index, request.start_index
            )));
        }
        floor = entry.global_index.saturating_add(1);
    }
    Ok(())
}

/// Whether a page of `len` entries, fetched with bound `max_count`,
/// proves the log is exhausted.
///
/// Only a short page does. A full page says nothing, even when the log
/// happens to end exactly at its boundary, so a log whose length is a
/// multiple of the page size costs one final empty round-trip.
pub fn page_exhausts_log(len: usize, max_count: u32) -> bool {
    len < max_count as usize
}
