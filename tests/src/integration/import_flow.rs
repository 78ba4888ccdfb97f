//! Account import against an already synced mirror.
//!
//! An import re-reads the log prefix to backfill one account's logs. It
//! must leave the cursor, the watermarks, and every other account exactly
//! where they were, and the imported account must then ride along in
//! normal cycles.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use mn_01_staged_store::{InMemoryKv, Staged};
    use mn_02_account_log::LogKind;
    use mn_05_sync_engine::{MirrorStores, MockDaemon, SyncConfig, SyncEngine};
    use shared_types::{ActionLogEntry, Coin};

    fn backlog() -> Vec<ActionLogEntry> {
        vec![
            block(0, 1, "val-1", vec![mint("alice", 1_000)], vec![]),
            block(1, 2, "val-1", vec![transfer("alice", "bob", 100, 0)], vec![]),
            block(2, 3, "val-1", vec![transfer("bob", "carol", 10, 0)], vec![]),
        ]
    }

    async fn synced_mirror() -> SyncEngine<InMemoryKv, MockDaemon> {
        let mut stores = MirrorStores::in_memory().unwrap();
        stores.chain_state.track_account("alice");
        stores.chain_state.save();
        stores.chain_state.commit().unwrap();

        let mut engine = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(backlog()),
            stores,
        );
        engine.run_cycle().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_import_backfills_only_the_new_account() {
        let mut engine = synced_mirror().await;

        // Balances are global, so bob's is already right; only his log
        // is missing.
        assert_eq!(engine.stores().balances.balance("bob").unwrap(), Coin::from_units(90));
        assert_eq!(engine.stores().account_log.transaction_log_len("bob").unwrap(), 0);

        let target = engine.stores().chain_state.next_index().unwrap();
        let report = engine.import_account("bob", target).await.unwrap();
        assert_eq!(report.entries, 3);

        let stores = engine.stores();
        assert!(stores.chain_state.is_tracked("bob").unwrap());
        assert_eq!(stores.account_log.transaction_log_len("bob").unwrap(), 2);
        assert_eq!(
            stores
                .account_log
                .block_span("bob", LogKind::Transactions, 0..u64::MAX)
                .unwrap(),
            Some((2, 3))
        );

        // Everything else is untouched: cursor, watermarks, other logs.
        assert_eq!(stores.chain_state.next_index().unwrap(), 3);
        assert_eq!(stores.balances.watermark(), Some(2));
        assert_eq!(stores.account_log.transaction_log_len("alice").unwrap(), 2);
        assert_eq!(stores.account_log.transaction_log_len("carol").unwrap(), 0);
        assert_eq!(stores.balances.balance("bob").unwrap(), Coin::from_units(90));
    }

    #[tokio::test]
    async fn test_importing_a_tracked_account_changes_nothing() {
        let mut engine = synced_mirror().await;
        let rows_before = engine.stores().account_log.rows().unwrap();
        let requests_before = engine.client().request_count();

        let report = engine.import_account("alice", 3).await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(report.pages, 0);

        // A no-op import does not even talk to the daemon.
        assert_eq!(engine.client().request_count(), requests_before);
        assert_eq!(engine.stores().account_log.rows().unwrap(), rows_before);
    }

    #[tokio::test]
    async fn test_imported_accounts_ride_along_in_later_cycles() {
        let mut engine = synced_mirror().await;
        let target = engine.stores().chain_state.next_index().unwrap();
        engine.import_account("bob", target).await.unwrap();

        engine.client().extend_log(vec![block(
            3,
            4,
            "val-1",
            vec![transfer("bob", "alice", 5, 0)],
            vec![],
        )]);
        engine.run_cycle().await.unwrap();

        let stores = engine.stores();
        assert_eq!(stores.account_log.transaction_log_len("bob").unwrap(), 3);
        assert_eq!(
            stores
                .account_log
                .block_span("bob", LogKind::Transactions, 0..u64::MAX)
                .unwrap(),
            Some((2, 4))
        );
        assert_eq!(stores.balances.balance("bob").unwrap(), Coin::from_units(85));
    }

    #[tokio::test]
    async fn test_import_stops_at_the_requested_index() {
        let mut engine = synced_mirror().await;

        // Backfill bob only up to the entry before his second transaction.
        let report = engine.import_account("bob", 2).await.unwrap();
        assert_eq!(report.entries, 2);

        let stores = engine.stores();
        assert_eq!(stores.account_log.transaction_log_len("bob").unwrap(), 1);
        assert_eq!(
            stores
                .account_log
                .block_span("bob", LogKind::Transactions, 0..u64::MAX)
                .unwrap(),
            Some((2, 2))
        );
    }
}
