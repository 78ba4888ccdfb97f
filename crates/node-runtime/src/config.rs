//! # Node Configuration
//!
//! Unified configuration for the mirror runtime: where the data directory
//! lives, how to reach the ledger daemon, and how the sync and rebalance
//! loops are paced.
//!
//! Every field has a sane default and can be overridden through an `MN_*`
//! environment variable, so a bare `node-runtime` invocation mirrors a
//! local daemon out of the box.

use std::path::PathBuf;

use mn_05_sync_engine::{RebalanceConfig, SyncConfig, STORAGE_MANAGER_PAGE_SIZE};

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Node identity and placement.
    pub node: NodeSection,
    /// Sync loop configuration.
    pub sync: SyncSection,
    /// Rebalance loop configuration.
    pub rebalance: RebalanceSection,
}

impl NodeConfig {
    /// Build the configuration from defaults plus `MN_*` environment
    /// overrides. Invalid override values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = NodeConfig::default();

        if let Ok(dir) = std::env::var("MN_DATA_DIR") {
            config.node.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("MN_DAEMON_ADDR") {
            config.node.daemon_addr = addr;
        }
        if let Ok(profile) = std::env::var("MN_PROFILE") {
            match profile.parse() {
                Ok(p) => {
                    config.node.profile = p;
                    if config.node.profile == Profile::StorageManager {
                        config.sync.page_size = STORAGE_MANAGER_PAGE_SIZE;
                    }
                }
                Err(()) => {
                    tracing::warn!("MN_PROFILE must be 'account' or 'storage-manager', got {profile:?}");
                }
            }
        }
        if let Ok(addr) = std::env::var("MN_STORAGE_ADDRESS") {
            config.node.storage_address = addr;
        }

        if let Ok(value) = std::env::var("MN_PAGE_SIZE") {
            if let Ok(v) = value.parse() {
                config.sync.page_size = v;
            }
        }
        if let Ok(value) = std::env::var("MN_IMPORT_PAGE_SIZE") {
            if let Ok(v) = value.parse() {
                config.sync.import_page_size = v;
            }
        }
        if let Ok(value) = std::env::var("MN_SYNC_INTERVAL_SECS") {
            if let Ok(v) = value.parse() {
                config.sync.interval_secs = v;
            }
        }
        if let Ok(value) = std::env::var("MN_STATISTICS_WINDOW") {
            if let Ok(v) = value.parse() {
                config.sync.statistics_window = v;
            }
        }

        if let Ok(value) = std::env::var("MN_REBALANCE_INTERVAL_SECS") {
            if let Ok(v) = value.parse() {
                config.rebalance.interval_secs = v;
            }
        }
        if let Ok(value) = std::env::var("MN_HOT_VIEW_THRESHOLD") {
            if let Ok(v) = value.parse() {
                config.rebalance.hot_view_threshold = v;
            }
        }
        if let Ok(value) = std::env::var("MN_TARGET_REPLICAS") {
            if let Ok(v) = value.parse() {
                config.rebalance.target_replicas = v;
            }
        }
        if let Ok(value) = std::env::var("MN_MIN_REPLICAS") {
            if let Ok(v) = value.parse() {
                config.rebalance.min_replicas = v;
            }
        }

        config
    }

    /// Validate configuration before the runtime starts.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the storage-manager profile is selected without a storage address
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.profile == Profile::StorageManager && self.node.storage_address.is_empty() {
            return Err(ConfigError::StorageAddressRequired);
        }
        Ok(())
    }

    /// Sync engine configuration derived from this node configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            page_size: self.sync.page_size,
            import_page_size: self.sync.import_page_size,
            statistics_window: self.sync.statistics_window,
        }
    }

    /// Rebalance planner configuration derived from this node configuration.
    pub fn rebalance_config(&self) -> RebalanceConfig {
        RebalanceConfig {
            storage_address: self.node.storage_address.clone(),
            hot_view_threshold: self.rebalance.hot_view_threshold,
            target_replicas: self.rebalance.target_replicas,
            min_replicas: self.rebalance.min_replicas,
            statistics_window: self.sync.statistics_window,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Storage-manager profile selected without a storage address.
    StorageAddressRequired,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::StorageAddressRequired => {
                write!(
                    f,
                    "The storage-manager profile needs the address this node stores \
                     files under. Set MN_STORAGE_ADDRESS."
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which kind of mirror this node runs as.
///
/// An account mirror only tracks accounts it was told to import. A storage
/// manager additionally plans replica placement for the files it serves and
/// syncs with larger pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Account mirror: projections and history for imported accounts.
    #[default]
    Account,
    /// Storage manager: account mirror plus the rebalance loop.
    StorageManager,
}

impl std::str::FromStr for Profile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(Profile::Account),
            "storage-manager" => Ok(Profile::StorageManager),
            _ => Err(()),
        }
    }
}

/// Node identity and placement.
#[derive(Debug, Clone)]
pub struct NodeSection {
    /// Data directory for the RocksDB mirror state.
    pub data_dir: PathBuf,
    /// Address of the ledger daemon's log endpoint, `host:port`.
    pub daemon_addr: String,
    /// Runtime profile.
    pub profile: Profile,
    /// Ledger address this node stores files under (storage-manager only).
    pub storage_address: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            daemon_addr: "127.0.0.1:7450".to_string(),
            profile: Profile::Account,
            storage_address: String::new(),
        }
    }
}

/// Sync loop configuration.
#[derive(Debug, Clone)]
pub struct SyncSection {
    /// Entries requested per log page.
    pub page_size: u32,
    /// Entries requested per page during account imports.
    pub import_page_size: u32,
    /// Seconds between sync cycles.
    pub interval_secs: u64,
    /// Blocks of usage statistics kept behind the head.
    pub statistics_window: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            page_size: sync.page_size,
            import_page_size: sync.import_page_size,
            interval_secs: 10,
            statistics_window: sync.statistics_window,
        }
    }
}

/// Rebalance loop configuration.
#[derive(Debug, Clone)]
pub struct RebalanceSection {
    /// Seconds between rebalance passes.
    pub interval_secs: u64,
    /// Window views at which an unstored file becomes worth storing.
    pub hot_view_threshold: u64,
    /// Replica count the planner stops volunteering at.
    pub target_replicas: u64,
    /// Replica count below which cold files are still kept.
    pub min_replicas: u64,
}

impl Default for RebalanceSection {
    fn default() -> Self {
        let rebalance = RebalanceConfig::new("");
        Self {
            interval_secs: 600,
            hot_view_threshold: rebalance.hot_view_threshold,
            target_replicas: rebalance.target_replicas,
            min_replicas: rebalance.min_replicas,
        }
    }
}
