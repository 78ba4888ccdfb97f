//! # Key Schema
//!
//! Composite keys for the account-log store. Numeric components are
//! big-endian, so lexicographic key order equals numeric order and prefix
//! scans walk blocks and offsets ascending. `:` is safe as a separator
//! because account addresses never contain it.
//!
//! Layout:
//!
//! - `idx:{log}:{account}:{block_be8}`  -> range entry (offset, count)
//! - `log:{log}:{account}:{offset_be8}` -> serialized row
//! - `len:{log}:{account}`              -> log length, u64 big-endian

/// Which per-account log a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Transactions the account took part in.
    Transactions,
    /// Rewards paid to the account.
    Rewards,
}

impl LogKind {
    fn tag(self) -> &'static str {
        match self {
            LogKind::Transactions => "tx",
            LogKind::Rewards => "rw",
        }
    }
}

/// Key of the range-index row for one block of one account log.
pub fn index_key(kind: LogKind, account: &str, block_number: u64) -> Vec<u8> {
    let mut key = index_prefix(kind, account);
    key.extend_from_slice(&block_number.to_be_bytes());
    key
}

/// Prefix covering every range-index row of one account log.
pub fn index_prefix(kind: LogKind, account: &str) -> Vec<u8> {
    format!("idx:{}:{}:", kind.tag(), account).into_bytes()
}

/// Block number encoded in a range-index key, if the key has one.
pub fn block_of_index_key(key: &[u8]) -> Option<u64> {
    let suffix: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(suffix))
}

/// Key of one log row.
pub fn entry_key(kind: LogKind, account: &str, offset: u64) -> Vec<u8> {
    let mut key = format!("log:{}:{}:", kind.tag(), account).into_bytes();
    key.extend_from_slice(&offset.to_be_bytes());
    key
}

/// Key of the log-length row.
pub fn len_key(kind: LogKind, account: &str) -> Vec<u8> {
    format!("len:{}:{}", kind.tag(), account).into_bytes()
}
