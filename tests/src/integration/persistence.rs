//! Durability of the mirror across process restarts.
//!
//! Everything the in-memory flows prove must also hold over the RocksDB
//! adapter: the cursor, the watermarks, the tracked set, and every
//! projection come back after a reopen, and a restarted engine resumes
//! from the committed cursor instead of re-applying history.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use mn_01_staged_store::Staged;
    use mn_05_sync_engine::{ActionLogClient, MirrorStores, MockDaemon, SyncConfig, SyncEngine};
    use node_runtime::adapters::{open_backings, FileReplayClient, RocksDbConfig, RocksDbKv};
    use shared_types::{ActionLogEntry, Coin, RewardKind};

    fn rocks_stores(dir: &tempfile::TempDir) -> MirrorStores<RocksDbKv> {
        let config =
            RocksDbConfig::for_testing(dir.path().join("rocksdb").to_string_lossy());
        MirrorStores::open(open_backings(&config).unwrap()).unwrap()
    }

    fn backlog() -> Vec<ActionLogEntry> {
        vec![
            block(0, 1, "val-1", vec![mint("alice", 1_000)], vec![]),
            block(
                1,
                2,
                "val-1",
                vec![transfer("alice", "bob", 100, 0)],
                vec![reward("bob", 3, RewardKind::Storage)],
            ),
        ]
    }

    #[tokio::test]
    async fn test_the_mirror_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut stores = rocks_stores(&dir);
            stores.chain_state.track_account("alice");
            stores.chain_state.track_account("bob");
            stores.chain_state.save();
            stores.chain_state.commit().unwrap();

            let mut engine = SyncEngine::new(
                SyncConfig::for_testing(),
                MockDaemon::new(backlog()),
                stores,
            );
            engine.run_cycle().await.unwrap();
            assert_eq!(
                engine.stores().balances.balance("alice").unwrap(),
                Coin::from_units(900)
            );

            // Drop every handle so the database closes cleanly.
            drop(engine.into_stores().into_backings());
        }

        let stores = rocks_stores(&dir);
        assert_eq!(stores.balances.balance("alice").unwrap(), Coin::from_units(900));
        assert_eq!(stores.balances.balance("bob").unwrap(), Coin::from_units(103));
        assert_eq!(stores.chain_state.next_index().unwrap(), 2);
        assert_eq!(stores.chain_state.head_block_number().unwrap(), Some(2));
        assert!(stores.chain_state.is_tracked("alice").unwrap());
        assert_eq!(stores.account_log.transaction_log_len("alice").unwrap(), 2);
        assert_eq!(stores.account_log.reward_log_len("bob").unwrap(), 1);
        assert_eq!(stores.balances.watermark(), Some(1));

        // A restarted engine resumes at the cursor: nothing re-applies.
        let mut engine = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(backlog()),
            stores,
        );
        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(engine.client().requests()[0].start_index, 2);
        assert_eq!(
            engine.stores().balances.balance("alice").unwrap(),
            Coin::from_units(900)
        );
    }

    #[tokio::test]
    async fn test_a_captured_log_replays_into_the_same_mirror() {
        let entries = vec![
            block(0, 1, "val-1", vec![mint("alice", 500)], vec![]),
            block(
                1,
                2,
                "carol",
                vec![
                    transfer("alice", "bob", 50, 1),
                    publication("news", 1, "news/article", "alice", &["files/a"]),
                ],
                vec![reward("alice", 2, RewardKind::Content)],
            ),
        ];

        let tracked_stores = || {
            let mut stores = MirrorStores::in_memory().unwrap();
            for account in ["alice", "bob", "carol"] {
                stores.chain_state.track_account(account);
            }
            stores.chain_state.save();
            stores.chain_state.commit().unwrap();
            stores
        };

        let mut live = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(entries.clone()),
            tracked_stores(),
        );
        live.run_cycle().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        FileReplayClient::write_capture(&path, &entries).unwrap();
        let mut replayed = SyncEngine::new(
            SyncConfig::for_testing(),
            FileReplayClient::open(&path).unwrap(),
            tracked_stores(),
        );
        replayed.run_cycle().await.unwrap();

        let live = live.stores();
        let replayed = replayed.stores();
        assert_eq!(
            live.balances.rows().unwrap(),
            replayed.balances.rows().unwrap()
        );
        assert_eq!(
            live.account_log.rows().unwrap(),
            replayed.account_log.rows().unwrap()
        );
        assert_eq!(
            live.content.rows().unwrap(),
            replayed.content.rows().unwrap()
        );
        assert_eq!(
            live.chain_state.next_index().unwrap(),
            replayed.chain_state.next_index().unwrap()
        );
    }

    #[tokio::test]
    async fn test_captures_page_like_a_daemon() {
        let entries: Vec<ActionLogEntry> = (0..6)
            .map(|i| block(i, i + 1, "val-1", vec![mint("alice", 1)], vec![]))
            .collect();
        let client = FileReplayClient::from_entries(entries);

        let page = client
            .fetch(mn_05_sync_engine::LogFetchRequest {
                start_index: 4,
                max_count: 4,
            })
            .await
            .unwrap();
        assert_eq!(page.actions.len(), 2);
        assert_eq!(page.actions[0].global_index, 4);
    }
}
