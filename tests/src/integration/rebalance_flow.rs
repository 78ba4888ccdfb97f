//! The rebalance feedback loop.
//!
//! A storage manager plans from its own projections, broadcasts storage
//! updates, and then sees those updates come back through the action log
//! like anyone else's. These flows close that loop against the scripted
//! daemon.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use mn_01_staged_store::InMemoryKv;
    use mn_05_sync_engine::{
        MirrorStores, MockDaemon, RebalanceConfig, StorageUpdateCommand, SyncConfig, SyncEngine,
    };
    use shared_types::StorageStatus;

    async fn synced(entries: Vec<shared_types::ActionLogEntry>) -> SyncEngine<InMemoryKv, MockDaemon> {
        let mut engine = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(entries),
            MirrorStores::in_memory().unwrap(),
        );
        engine.run_cycle().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_a_hot_file_is_volunteered_and_confirmed_by_the_log() {
        let mut engine = synced(vec![block(
            0,
            1,
            "val-1",
            vec![
                publication("news", 1, "news/article", "ann", &["files/a"]),
                store_update("node-2", "files/a", StorageStatus::Store),
                views("svc-1", 1, &[("files/a", 6)]),
            ],
            vec![],
        )])
        .await;

        let config = RebalanceConfig::for_testing("mgr-1");
        let report = engine.run_rebalance(&config).await.unwrap();
        assert_eq!(report.planned, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(
            engine.client().broadcasts(),
            vec![StorageUpdateCommand {
                status: StorageStatus::Store,
                file_uri: "files/a".to_string(),
                storage_address: "mgr-1".to_string(),
                channel_address: "news".to_string(),
            }]
        );

        // The accepted update comes back through the log on the next cycle.
        engine.client().extend_log(vec![block(
            1,
            2,
            "val-1",
            vec![store_update("mgr-1", "files/a", StorageStatus::Store)],
            vec![],
        )]);
        engine.run_cycle().await.unwrap();
        assert!(engine.stores().replication.is_stored("mgr-1", "files/a").unwrap());
        assert_eq!(engine.stores().replication.replica_count("files/a").unwrap(), 2);

        // Once stored, the same pass has nothing left to plan.
        let report = engine.run_rebalance(&config).await.unwrap();
        assert_eq!(report.planned, 0);
        assert_eq!(engine.client().broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn test_a_cold_replica_is_retired_through_the_log() {
        let mut engine = synced(vec![block(
            0,
            1,
            "val-1",
            vec![
                store_update("mgr-1", "files/old", StorageStatus::Store),
                store_update("node-2", "files/old", StorageStatus::Store),
            ],
            vec![],
        )])
        .await;

        let config = RebalanceConfig::for_testing("mgr-1");
        let report = engine.run_rebalance(&config).await.unwrap();
        assert_eq!(report.planned, 1);
        assert_eq!(
            engine.client().broadcasts(),
            vec![StorageUpdateCommand {
                status: StorageStatus::Remove,
                file_uri: "files/old".to_string(),
                storage_address: "mgr-1".to_string(),
                channel_address: String::new(),
            }]
        );

        engine.client().extend_log(vec![block(
            1,
            2,
            "val-1",
            vec![store_update("mgr-1", "files/old", StorageStatus::Remove)],
            vec![],
        )]);
        engine.run_cycle().await.unwrap();
        assert!(!engine.stores().replication.is_stored("mgr-1", "files/old").unwrap());
        assert_eq!(engine.stores().replication.replica_count("files/old").unwrap(), 1);

        let report = engine.run_rebalance(&config).await.unwrap();
        assert_eq!(report.planned, 0);
    }

    #[tokio::test]
    async fn test_rejections_are_counted_not_fatal() {
        let mut engine = synced(vec![block(
            0,
            1,
            "val-1",
            vec![
                store_update("node-2", "files/a", StorageStatus::Store),
                store_update("node-2", "files/b", StorageStatus::Store),
                views("svc-1", 1, &[("files/a", 6), ("files/b", 6)]),
            ],
            vec![],
        )])
        .await;
        engine.client().reject_uri("files/a");

        let report = engine
            .run_rebalance(&RebalanceConfig::for_testing("mgr-1"))
            .await
            .unwrap();
        assert_eq!(report.planned, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 1);

        // Both commands went out; the daemon refused only one.
        let uris: Vec<String> = engine
            .client()
            .broadcasts()
            .iter()
            .map(|c| c.file_uri.clone())
            .collect();
        assert_eq!(uris, vec!["files/a".to_string(), "files/b".to_string()]);
    }
}
