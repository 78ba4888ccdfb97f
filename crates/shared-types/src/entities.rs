//! # Action Log Entities
//!
//! Defines the ledger daemon's action-log data model, the single input
//! format every mirror-node subsystem consumes.
//!
//! ## Clusters
//!
//! - **Log**: `ActionLogEntry`, `ActionRecord`, `LoggingType`
//! - **Blocks**: `BlockLog`, `RewardEntry`, `RewardKind`
//! - **Transactions**: `TransactionLog`, `LedgerAction`, `StorageStatus`

use serde::{Deserialize, Serialize};

use crate::coin::Coin;
use crate::errors::AddressError;

// =============================================================================
// CLUSTER A: ADDRESSES
// =============================================================================

/// A ledger account name.
///
/// The empty string denotes "no party": the side of an action that has no
/// account attached. It never appears as a stored account.
pub type Address = String;

/// Maximum accepted address length, in characters.
pub const MAX_ADDRESS_LEN: usize = 64;

/// Validates an externally supplied account address.
///
/// Accepts 1..=64 characters from `[A-Za-z0-9._-]`. The empty string is
/// reserved for the internal "no party" marker and is rejected here, so
/// query entry points never conflate a caller mistake with that marker.
pub fn validate_address(address: &str) -> Result<(), AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err(AddressError::TooLong { len: address.len() });
    }
    if let Some(character) = address
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-'))
    {
        return Err(AddressError::InvalidCharacter { character });
    }
    Ok(())
}

// =============================================================================
// CLUSTER B: THE LOG
// =============================================================================

/// Whether an entry applies an action or reverts a previously applied one.
///
/// A revert is a fresh log entry in its own right: it carries a new
/// `global_index` and a payload equal to the forward entry it undoes.
/// Nothing is ever rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoggingType {
    /// Forward application of the action.
    Apply,
    /// Inverse application, issued when the daemon abandons a chain branch.
    Revert,
}

/// One entry of the daemon's append-only action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// Position of this entry in the log. Strictly increasing.
    pub global_index: u64,
    /// Apply or revert.
    pub logging_type: LoggingType,
    /// The logged action.
    pub record: ActionRecord,
}

/// The payload of a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionRecord {
    /// A whole accepted block: its transactions plus the rewards it paid.
    Block(BlockLog),
    /// A single transaction logged outside block context.
    Transaction(TransactionLog),
}

// =============================================================================
// CLUSTER C: BLOCKS
// =============================================================================

/// An accepted block as the daemon logs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockLog {
    /// Height of the block in the daemon's chain.
    pub block_number: u64,
    /// The authority that produced the block. Collects transaction fees.
    pub authority: Address,
    /// Transactions the block contains, in block order.
    pub transactions: Vec<TransactionLog>,
    /// Rewards the block paid out.
    pub rewards: Vec<RewardEntry>,
}

/// A block reward paid to one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    /// Receiving account.
    pub to: Address,
    /// Amount paid.
    pub amount: Coin,
    /// Why the reward was paid.
    pub reward_type: RewardKind,
}

/// The service a reward pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    /// Block production.
    Authority,
    /// File storage.
    Storage,
    /// Content authorship.
    Content,
}

// =============================================================================
// CLUSTER D: TRANSACTIONS
// =============================================================================

/// A logged transaction: the action it performed plus the fee it paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLog {
    /// The action the transaction performed.
    pub action: LedgerAction,
    /// Fee paid by the from-side to the block authority.
    pub fee: Coin,
}

impl TransactionLog {
    /// The paying / originating side of the action.
    pub fn from_address(&self) -> &str {
        self.action.from_address()
    }

    /// The receiving side of the action. Empty when the action has none.
    pub fn to_address(&self) -> &str {
        self.action.to_address()
    }

    /// The amount moved from the from-side to the to-side.
    pub fn principal(&self) -> Coin {
        self.action.principal()
    }
}

/// Every action kind the ledger daemon logs.
///
/// The set is closed and consumers match it exhaustively, so a kind added
/// here fails compilation at every dispatch site instead of being skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerAction {
    /// Moves `amount` from one account to another.
    Transfer {
        from: Address,
        to: Address,
        amount: Coin,
    },
    /// A storage node announcing it stores, or stopped storing, a file.
    StorageUpdate {
        storage_address: Address,
        file_uri: String,
        status: StorageStatus,
    },
    /// Publishes or amends one unit of a channel content.
    ContentUnit {
        channel_address: Address,
        content_id: u64,
        uri: String,
        unit: ContentUnitBody,
    },
    /// Approves a set of unit revisions of a channel content.
    ContentApprove {
        approver: Address,
        channel_address: Address,
        content_id: u64,
        uris: Vec<String>,
    },
    /// A service node reporting per-file view counts for one block.
    ServiceStatistics {
        reporter: Address,
        block_number: u64,
        views: Vec<(String, u64)>,
    },
    /// Grants a named role to an account.
    RoleGrant {
        grantor: Address,
        grantee: Address,
        role: String,
    },
    /// Sponsors a channel content unit with a payment to the channel.
    SponsorContentUnit {
        sponsor: Address,
        channel_address: Address,
        content_id: u64,
        amount: Coin,
    },
}

/// The body of one content unit revision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentUnitBody {
    /// Authors credited for this revision.
    pub author_addresses: Vec<Address>,
    /// Files the revision is made of.
    pub file_uris: Vec<String>,
}

/// Direction of a storage replication announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageStatus {
    /// The node stores the file.
    Store,
    /// The node no longer stores the file.
    Remove,
}

impl LedgerAction {
    /// The paying / originating side, per action kind.
    pub fn from_address(&self) -> &str {
        match self {
            LedgerAction::Transfer { from, .. } => from,
            LedgerAction::StorageUpdate {
                storage_address, ..
            } => storage_address,
            LedgerAction::ContentUnit { unit, .. } => unit
                .author_addresses
                .first()
                .map(String::as_str)
                .unwrap_or(""),
            LedgerAction::ContentApprove { approver, .. } => approver,
            LedgerAction::ServiceStatistics { reporter, .. } => reporter,
            LedgerAction::RoleGrant { grantor, .. } => grantor,
            LedgerAction::SponsorContentUnit { sponsor, .. } => sponsor,
        }
    }

    /// The receiving side; empty ("no party") when the action has none.
    pub fn to_address(&self) -> &str {
        match self {
            LedgerAction::Transfer { to, .. } => to,
            LedgerAction::StorageUpdate { .. } => "",
            LedgerAction::ContentUnit {
                channel_address, ..
            } => channel_address,
            LedgerAction::ContentApprove {
                channel_address, ..
            } => channel_address,
            LedgerAction::ServiceStatistics { .. } => "",
            LedgerAction::RoleGrant { grantee, .. } => grantee,
            LedgerAction::SponsorContentUnit {
                channel_address, ..
            } => channel_address,
        }
    }

    /// The amount moved between the two sides. Zero for non-monetary actions.
    pub fn principal(&self) -> Coin {
        match self {
            LedgerAction::Transfer { amount, .. } => *amount,
            LedgerAction::SponsorContentUnit { amount, .. } => *amount,
            LedgerAction::StorageUpdate { .. }
            | LedgerAction::ContentUnit { .. }
            | LedgerAction::ContentApprove { .. }
            | LedgerAction::ServiceStatistics { .. }
            | LedgerAction::RoleGrant { .. } => Coin::ZERO,
        }
    }
}
