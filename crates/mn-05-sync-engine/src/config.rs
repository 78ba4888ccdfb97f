//! # Sync Configuration

use serde::{Deserialize, Serialize};

/// Page size used by the account-facing deployment profile.
pub const ACCOUNT_PAGE_SIZE: u32 = 3_000;

/// Page size used by the storage-manager deployment profile.
pub const STORAGE_MANAGER_PAGE_SIZE: u32 = 10_000;

/// Tuning knobs of the sync engine.
///
/// Always passed explicitly; nothing in the engine reads ambient settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper bound on entries per page request during normal sync.
    pub page_size: u32,
    /// Upper bound on entries per page request during an account import.
    pub import_page_size: u32,
    /// Statistics retention window, in blocks, swept at cycle end.
    pub statistics_window: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            page_size: ACCOUNT_PAGE_SIZE,
            import_page_size: ACCOUNT_PAGE_SIZE,
            statistics_window: 144,
        }
    }
}

impl SyncConfig {
    /// Defaults of the storage-manager profile, which drains far larger
    /// backlogs per cycle.
    pub fn for_storage_manager() -> Self {
        SyncConfig {
            page_size: STORAGE_MANAGER_PAGE_SIZE,
            ..SyncConfig::default()
        }
    }

    /// Small pages and a small window so tests can cross page and window
    /// boundaries with little data.
    pub fn for_testing() -> Self {
        SyncConfig {
            page_size: 4,
            import_page_size: 4,
            statistics_window: 1_000,
        }
    }
}
