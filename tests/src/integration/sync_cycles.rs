//! Scripted-log sync cycles over in-memory stores.
//!
//! These flows drive `SyncEngine::run_cycle` exactly the way the runtime
//! timer does and then inspect every derived store, so they lock the
//! cross-store contract: one cycle drains the whole backlog, commits once,
//! and either lands everywhere or nowhere.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use mn_01_staged_store::{InMemoryKv, Staged};
    use mn_04_content_chain::approved_count;
    use mn_05_sync_engine::{
        MirrorStores, MockDaemon, SyncConfig, SyncEngine, SyncPhase,
    };
    use shared_types::{ActionLogEntry, Coin, RewardKind, StorageStatus};

    fn stores_tracking(accounts: &[&str]) -> MirrorStores<InMemoryKv> {
        let mut stores = MirrorStores::in_memory().unwrap();
        for account in accounts {
            stores.chain_state.track_account(account);
        }
        stores.chain_state.save();
        stores.chain_state.commit().unwrap();
        stores
    }

    fn engine_over(
        entries: Vec<ActionLogEntry>,
        stores: MirrorStores<InMemoryKv>,
    ) -> SyncEngine<InMemoryKv, MockDaemon> {
        SyncEngine::new(SyncConfig::for_testing(), MockDaemon::new(entries), stores)
    }

    #[tokio::test]
    async fn test_one_cycle_mirrors_a_block_into_every_projection() {
        let entries = vec![
            block(0, 9, "val-1", vec![mint("alice", 1_000)], vec![]),
            block(
                1,
                10,
                "carol",
                vec![transfer("alice", "bob", 100, 1)],
                vec![reward("dave", 5, RewardKind::Authority)],
            ),
        ];
        let mut engine = engine_over(entries, stores_tracking(&["alice", "bob", "carol", "dave"]));

        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.next_index, 2);
        assert_eq!(engine.phase(), SyncPhase::Done);

        let stores = engine.stores();
        assert_eq!(stores.balances.balance("alice").unwrap(), Coin::from_units(899));
        assert_eq!(stores.balances.balance("bob").unwrap(), Coin::from_units(100));
        assert_eq!(stores.balances.balance("carol").unwrap(), Coin::from_units(1));
        assert_eq!(stores.balances.balance("dave").unwrap(), Coin::from_units(5));

        // The mint logs under alice; the transfer under all three parties.
        assert_eq!(stores.account_log.transaction_log_len("alice").unwrap(), 2);
        assert_eq!(stores.account_log.transaction_log_len("bob").unwrap(), 1);
        assert_eq!(stores.account_log.transaction_log_len("carol").unwrap(), 1);
        assert_eq!(stores.account_log.reward_log_len("dave").unwrap(), 1);

        assert_eq!(stores.chain_state.next_index().unwrap(), 2);
        assert_eq!(stores.chain_state.block_count().unwrap(), 2);
        assert_eq!(stores.chain_state.head_block_number().unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_apply_then_revert_leaves_no_trace() {
        let busy = block(
            0,
            1,
            "val-1",
            vec![
                mint("alice", 1_000),
                transfer("alice", "bob", 10, 1),
                store_update("node-1", "files/a", StorageStatus::Store),
                publication("news", 1, "news/article", "alice", &["files/a"]),
                views("svc-1", 1, &[("files/a", 3)]),
            ],
            vec![reward("alice", 2, RewardKind::Content)],
        );
        let undo = revert(1, &busy);
        let mut engine = engine_over(vec![busy, undo], stores_tracking(&["alice", "bob", "val-1"]));

        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 2);

        let stores = engine.stores();
        assert!(stores.balances.rows().unwrap().is_empty());
        assert!(stores.account_log.rows().unwrap().is_empty());
        assert!(stores.content.rows().unwrap().is_empty());
        assert!(stores.statistics.rows().unwrap().is_empty());
        assert_eq!(stores.chain_state.block_count().unwrap(), 0);
        assert_eq!(stores.chain_state.next_index().unwrap(), 2);

        // Replication keeps the last sighting of the reverted update but
        // reports the file as unstored.
        assert!(!stores.replication.is_stored("node-1", "files/a").unwrap());
        assert_eq!(stores.replication.replica_count("files/a").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_paging_a_backlog_costs_ceil_plus_a_terminator() {
        // Eight entries at page size four: two full pages, then the empty
        // page that proves the log is drained.
        let entries: Vec<ActionLogEntry> = (0..8)
            .map(|i| block(i, i + 1, "val-1", vec![mint("alice", 1)], vec![]))
            .collect();
        let mut engine = engine_over(entries, stores_tracking(&["alice"]));

        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 8);
        assert_eq!(report.pages, 3);

        let starts: Vec<u64> = engine
            .client()
            .requests()
            .iter()
            .map(|r| r.start_index)
            .collect();
        assert_eq!(starts, vec![0, 4, 8]);
        assert_eq!(engine.stores().balances.balance("alice").unwrap(), Coin::from_units(8));

        // A later cycle resumes from the committed cursor.
        engine
            .client()
            .extend_log(vec![block(8, 9, "val-1", vec![mint("alice", 1)], vec![])]);
        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 1);
        assert_eq!(engine.client().requests().last().unwrap().start_index, 8);
        assert_eq!(engine.stores().chain_state.next_index().unwrap(), 9);
    }

    #[tokio::test]
    async fn test_a_transport_failure_discards_the_whole_cycle() {
        let entries: Vec<ActionLogEntry> = (0..8)
            .map(|i| block(i, i + 1, "val-1", vec![mint("alice", 1)], vec![]))
            .collect();
        let mut engine = engine_over(entries, stores_tracking(&["alice"]));
        engine.client().fail_on_request(1);

        // The first page was already dispatched when the second request
        // fails; none of it may survive.
        assert!(engine.run_cycle().await.is_err());
        assert_eq!(engine.phase(), SyncPhase::Idle);
        assert_eq!(engine.stores().chain_state.next_index().unwrap(), 0);
        assert_eq!(engine.stores().balances.balance("alice").unwrap(), Coin::ZERO);
        assert!(engine.stores().account_log.rows().unwrap().is_empty());

        // The retry picks up from index zero and lands everything.
        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 8);
        assert_eq!(engine.stores().balances.balance("alice").unwrap(), Coin::from_units(8));
    }

    #[tokio::test]
    async fn test_a_rolled_back_cursor_replays_without_double_apply() {
        let entries = vec![
            block(0, 1, "val-1", vec![mint("alice", 1_000)], vec![]),
            block(1, 2, "val-1", vec![transfer("alice", "bob", 100, 0)], vec![]),
        ];
        let mut engine = engine_over(entries.clone(), stores_tracking(&["alice", "bob"]));
        engine.run_cycle().await.unwrap();

        // Rewind only the cursor, as a crash between the data commits and
        // the chain state commit would. The data watermarks stay ahead.
        let mut stores = engine.into_stores();
        stores.chain_state.set_next_index(0);
        stores.chain_state.save();
        stores.chain_state.commit().unwrap();
        assert_eq!(stores.balances.watermark(), Some(1));

        let mut engine = engine_over(entries, stores);
        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 2);

        let stores = engine.stores();
        assert_eq!(stores.balances.balance("alice").unwrap(), Coin::from_units(900));
        assert_eq!(stores.balances.balance("bob").unwrap(), Coin::from_units(100));
        assert_eq!(stores.account_log.transaction_log_len("alice").unwrap(), 2);
        assert_eq!(stores.chain_state.block_count().unwrap(), 2);
        assert_eq!(stores.chain_state.next_index().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_an_approval_promotes_published_units() {
        let entries = vec![
            block(
                0,
                1,
                "val-1",
                vec![publication("news", 1, "news/draft", "ann", &["files/a"])],
                vec![],
            ),
            block(
                1,
                2,
                "val-1",
                vec![approval("news", 1, "editor", &["news/draft"])],
                vec![],
            ),
        ];
        let mut engine = engine_over(entries, stores_tracking(&[]));
        engine.run_cycle().await.unwrap();

        let chain = engine.stores().content.chain("news", 1).unwrap().unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].approved);
        assert_eq!(approved_count(&chain), 1);
        assert!(chain[0].content_units.contains_key("news/draft"));
        assert_eq!(chain[0].content_units["news/draft"].file_uris, vec!["files/a"]);
    }

    #[tokio::test]
    async fn test_an_idle_log_is_one_empty_request() {
        let mut engine = engine_over(vec![], stores_tracking(&[]));

        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.entries, 0);
        assert_eq!(report.pages, 1);
        assert_eq!(engine.client().request_count(), 1);
        assert_eq!(engine.stores().chain_state.next_index().unwrap(), 0);
    }
}
