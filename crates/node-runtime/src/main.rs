//! # Mirror Node Runtime
//!
//! The executable entry point for the mirror node. It replays a ledger
//! daemon's action log into local RocksDB projections and, for storage
//! managers, periodically volunteers or retires file replicas.
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (`MN_LOG` filter)
//! 2. Load configuration from `MN_*` environment overrides
//! 3. Lock the data directory, open RocksDB, wire the sync engine
//! 4. Enter the timer loop: sync tick, rebalance tick, Ctrl+C
//!
//! Cancellation is observed at loop boundaries only: a running cycle
//! finishes (commits or discards) before shutdown proceeds, so the stores
//! never see a torn commit.

use std::time::Duration;

use anyhow::Result;
use node_runtime::config::{NodeConfig, Profile};
use node_runtime::{build_node, telemetry};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = NodeConfig::from_env();
    let mut node = build_node(&config)?;

    info!(
        "Mirror node starting: data dir {}, daemon {}, profile {:?}",
        config.node.data_dir.display(),
        config.node.daemon_addr,
        config.node.profile
    );

    // interval() panics on zero, so a zeroed override still ticks.
    let mut sync_tick =
        tokio::time::interval(Duration::from_secs(config.sync.interval_secs.max(1)));
    sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rebalance_tick =
        tokio::time::interval(Duration::from_secs(config.rebalance.interval_secs.max(1)));
    rebalance_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let rebalance =
        (config.node.profile == Profile::StorageManager).then(|| config.rebalance_config());

    info!("Mirror node is running. Press Ctrl+C to stop.");
    loop {
        tokio::select! {
            _ = sync_tick.tick() => {
                if let Err(e) = node.engine.run_cycle().await {
                    warn!("[mn-05] sync cycle failed, retrying next tick: {e}");
                }
            }
            _ = rebalance_tick.tick(), if rebalance.is_some() => {
                if let Some(rebalance) = &rebalance {
                    if let Err(e) = node.engine.run_rebalance(rebalance).await {
                        warn!("[mn-05] rebalance pass failed: {e}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Mirror node stopped");
    Ok(())
}
