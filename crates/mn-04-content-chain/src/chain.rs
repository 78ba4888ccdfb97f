//! # Version Chain Operations
//!
//! Pure operations on one content's version chain. A chain is an ordered
//! sequence of versions; each version is a set of units keyed by uri and
//! is either Pending (an open edit set) or Approved. At most one version
//! of a chain is Approved at any time.
//!
//! Every operation has an exact inverse driven only by the forward
//! payload: `remove_unit` undoes `add_unit`, `demote` undoes `promote`.
//! Reverts arrive tip-first when the daemon unwinds a branch, so an
//! inverse always meets the chain exactly as its forward op left it.
//! Structural expectations are asserted fatally, not returned: a chain
//! that does not match its history is a broken mirror.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::ContentUnitBody;

/// Units of one version, keyed by uri. A `BTreeMap` keeps serialization
/// deterministic, which the exact-inversion equality checks rely on.
pub type UnitMap = BTreeMap<String, ContentUnitBody>;

/// One element of a content's version chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentVersion {
    /// Unit revisions in this version.
    pub content_units: UnitMap,
    /// True for the approved version, false for a pending edit set.
    pub approved: bool,
}

impl ContentVersion {
    fn pending(content_units: UnitMap) -> Self {
        ContentVersion {
            content_units,
            approved: false,
        }
    }

    fn approved(content_units: UnitMap) -> Self {
        ContentVersion {
            content_units,
            approved: true,
        }
    }
}

/// Version chain of one `(channel, content id)`, oldest first.
pub type ContentVersionChain = Vec<ContentVersion>;

/// Adds a unit revision to the chain's open edit set.
///
/// An empty chain gets a first Pending version. A Pending tail absorbs
/// the unit; an Approved tail gets a fresh Pending version appended.
pub fn add_unit(chain: &mut ContentVersionChain, uri: &str, unit: ContentUnitBody) {
    match chain.last_mut() {
        Some(tail) if !tail.approved => {
            tail.content_units.insert(uri.to_string(), unit);
        }
        _ => {
            let mut content_units = UnitMap::new();
            content_units.insert(uri.to_string(), unit);
            chain.push(ContentVersion::pending(content_units));
        }
    }
}

/// Removes a unit revision from the chain's open edit set, the exact
/// inverse of [`add_unit`]. An emptied tail is popped; the caller removes
/// the content entry when the chain itself empties.
pub fn remove_unit(chain: &mut ContentVersionChain, uri: &str) {
    let tail = match chain.last_mut() {
        Some(tail) => tail,
        None => {
            tracing::error!("[mn-04] chain desync: removing unit {} from an empty chain", uri);
            panic!("chain desync: remove from empty chain");
        }
    };
    if tail.approved {
        tracing::error!(
            "[mn-04] chain desync: removing unit {} but the tail is approved",
            uri
        );
        panic!("chain desync: remove against approved tail");
    }
    if tail.content_units.remove(uri).is_none() {
        tracing::error!("[mn-04] chain desync: unit {} not in the pending tail", uri);
        panic!("chain desync: unit {} not present", uri);
    }
    if tail.content_units.is_empty() {
        chain.pop();
    }
}

/// Approves the most recent revision of each requested uri, collecting
/// them into a new Approved version.
///
/// Per uri, the chain is scanned tail to head for the most recent version
/// containing it. A hit in the Pending tail is moved out of it (the edit
/// is being promoted); any other hit is copied. An emptied tail is popped.
/// The new version is then placed so that exactly one Approved version
/// exists: alone in an emptied chain, before a sole Pending version, or
/// directly after the previously Approved version, which turns Pending.
pub fn promote(chain: &mut ContentVersionChain, uris: &[String]) {
    let mut promoted = UnitMap::new();
    for uri in uris {
        let tail_index = chain.len().checked_sub(1);
        let found = chain
            .iter()
            .enumerate()
            .rev()
            .find(|(_, version)| version.content_units.contains_key(uri));
        let (index, unit) = match found {
            Some((index, version)) => (index, version.content_units[uri].clone()),
            None => {
                tracing::error!("[mn-04] chain desync: promoting unknown uri {}", uri);
                panic!("chain desync: uri {} not present", uri);
            }
        };
        if Some(index) == tail_index && !chain[index].approved {
            chain[index].content_units.remove(uri);
        }
        promoted.insert(uri.clone(), unit);
    }

    if chain.last().is_some_and(|tail| tail.content_units.is_empty()) {
        chain.pop();
    }

    let new_version = ContentVersion::approved(promoted);
    if chain.is_empty() {
        chain.push(new_version);
    } else if chain.len() == 1 && !chain[0].approved {
        chain.insert(0, new_version);
    } else {
        let index = match chain.iter().position(|version| version.approved) {
            Some(index) => index,
            None => {
                tracing::error!(
                    "[mn-04] chain desync: no approved version in a {}-element chain",
                    chain.len()
                );
                panic!("chain desync: approved version missing");
            }
        };
        chain[index].approved = false;
        chain.insert(index + 1, new_version);
    }
}

/// Un-approves the chain's Approved version, the exact inverse of
/// [`promote`] for the same uris.
///
/// Units the promotion copied still exist in earlier versions and are
/// stripped; units it moved out of the then-tail are merged back into the
/// current tail (or become it). The version preceding the Approved one,
/// if any, gets its approval back.
pub fn demote(chain: &mut ContentVersionChain, uris: &[String]) {
    let index = match chain.iter().position(|version| version.approved) {
        Some(index) => index,
        None => {
            tracing::error!("[mn-04] chain desync: demote without an approved version");
            panic!("chain desync: approved version missing");
        }
    };
    for uri in uris {
        if !chain[index].content_units.contains_key(uri) {
            tracing::error!(
                "[mn-04] chain desync: demoted uri {} not in the approved version",
                uri
            );
            panic!("chain desync: uri {} not present", uri);
        }
    }

    let mut duplicated = Vec::new();
    for version in &chain[..index] {
        if version.approved {
            tracing::error!("[mn-04] chain desync: two approved versions in one chain");
            panic!("chain desync: duplicate approved version");
        }
        duplicated.extend(version.content_units.keys().cloned());
    }
    for uri in duplicated {
        chain[index].content_units.remove(&uri);
    }

    if index > 0 {
        chain[index - 1].approved = true;
    }

    if index == chain.len() - 1 {
        chain[index].approved = false;
        if chain[index].content_units.is_empty() {
            chain.pop();
        }
    } else {
        let remaining = std::mem::take(&mut chain[index].content_units);
        chain.remove(index);
        match chain.last_mut() {
            Some(tail) => tail.content_units.extend(remaining),
            None => {
                tracing::error!("[mn-04] chain desync: demote left no tail to merge into");
                panic!("chain desync: demote left no tail");
            }
        }
    }
}

/// Number of approved versions; well-formed chains have zero or one.
pub fn approved_count(chain: &ContentVersionChain) -> usize {
    chain.iter().filter(|version| version.approved).count()
}
