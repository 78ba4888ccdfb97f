//! History feed assembled from a synced mirror.
//!
//! The full path: daemon log in, sync cycles building the per-account
//! logs and their block range indexes, then the history query merging
//! transactions and rewards into one ascending feed.

#[cfg(test)]
mod tests {
    use crate::support::*;
    use mn_01_staged_store::{InMemoryKv, Staged};
    use mn_05_sync_engine::{MirrorStores, MockDaemon, SyncConfig, SyncEngine};
    use mn_06_history_query::{FeedKind, HistoryQueryEngine};
    use shared_types::{Coin, RewardKind};

    /// Alice receives in blocks 5 and 9, is rewarded in blocks 7 and 9,
    /// and the chain head is block 10.
    async fn alice_mirror() -> SyncEngine<InMemoryKv, MockDaemon> {
        let entries = vec![
            block(
                0,
                5,
                "val-1",
                vec![mint("bob", 1_000), transfer("bob", "alice", 40, 0)],
                vec![],
            ),
            block(
                1,
                7,
                "val-1",
                vec![],
                vec![reward("alice", 7, RewardKind::Content)],
            ),
            block(
                2,
                9,
                "val-1",
                vec![transfer("bob", "alice", 9, 0)],
                vec![reward("alice", 9, RewardKind::Storage)],
            ),
            block(3, 10, "val-1", vec![mint("carol", 1)], vec![]),
        ];

        let mut stores = MirrorStores::in_memory().unwrap();
        stores.chain_state.track_account("alice");
        stores.chain_state.track_account("bob");
        stores.chain_state.save();
        stores.chain_state.commit().unwrap();

        let mut engine = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(entries),
            stores,
        );
        engine.run_cycle().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_the_feed_merges_transactions_and_rewards_ascending() {
        let engine = alice_mirror().await;
        let stores = engine.stores();
        let head = stores.chain_state.head_block_number().unwrap().unwrap();
        assert_eq!(head, 10);

        let feed =
            HistoryQueryEngine::account_history(&stores.account_log, "alice", 5, 5, head).unwrap();

        let shape: Vec<(FeedKind, u64)> = feed
            .iter()
            .map(|item| (item.kind, item.block_number))
            .collect();
        assert_eq!(
            shape,
            vec![
                (FeedKind::Received, 5),
                (FeedKind::Rewarded(RewardKind::Content), 7),
                (FeedKind::Received, 9),
                (FeedKind::Rewarded(RewardKind::Storage), 9),
            ]
        );

        assert_eq!(feed[0].amount, Coin::from_units(40));
        assert_eq!(feed[0].counterparty, "bob");
        assert_eq!(feed[0].confirmations, 6);
        assert_eq!(feed[1].amount, Coin::from_units(7));
        assert_eq!(feed[1].confirmations, 4);
        assert_eq!(feed[3].amount, Coin::from_units(9));
        assert_eq!(feed[3].confirmations, 2);
    }

    #[tokio::test]
    async fn test_an_oversized_range_clips_to_the_log() {
        let engine = alice_mirror().await;
        let stores = engine.stores();

        let feed =
            HistoryQueryEngine::account_history(&stores.account_log, "alice", 0, 1_000, 10)
                .unwrap();
        assert_eq!(feed.len(), 4);
        assert_eq!(feed.first().unwrap().block_number, 5);
        assert_eq!(feed.last().unwrap().block_number, 9);
    }

    #[tokio::test]
    async fn test_fees_show_up_on_both_sides() {
        // One transfer with a fee: the sender gets Sent + SentFee, the
        // authority gets ReceivedFee.
        let entries = vec![block(
            0,
            3,
            "carol",
            vec![mint("alice", 100), transfer("alice", "bob", 10, 2)],
            vec![],
        )];
        let mut stores = MirrorStores::in_memory().unwrap();
        for account in ["alice", "bob", "carol"] {
            stores.chain_state.track_account(account);
        }
        stores.chain_state.save();
        stores.chain_state.commit().unwrap();
        let mut engine = SyncEngine::new(
            SyncConfig::for_testing(),
            MockDaemon::new(entries),
            stores,
        );
        engine.run_cycle().await.unwrap();
        let stores = engine.stores();

        let alice =
            HistoryQueryEngine::account_history(&stores.account_log, "alice", 3, 1, 3).unwrap();
        let kinds: Vec<FeedKind> = alice.iter().map(|item| item.kind).collect();
        // The mint credits alice first, then her transfer debits her.
        assert_eq!(
            kinds,
            vec![FeedKind::Received, FeedKind::Sent, FeedKind::SentFee]
        );
        assert_eq!(alice[2].amount, Coin::ZERO);
        assert_eq!(alice[2].fee, Coin::from_units(2));
        assert_eq!(alice[2].counterparty, "carol");

        let carol =
            HistoryQueryEngine::account_history(&stores.account_log, "carol", 3, 1, 3).unwrap();
        assert_eq!(carol.len(), 1);
        assert_eq!(carol[0].kind, FeedKind::ReceivedFee);
        assert_eq!(carol[0].counterparty, "alice");
    }

    #[tokio::test]
    async fn test_untracked_accounts_have_an_empty_feed() {
        let engine = alice_mirror().await;
        let feed = HistoryQueryEngine::account_history(
            &engine.stores().account_log,
            "carol",
            0,
            1_000,
            10,
        )
        .unwrap();
        assert!(feed.is_empty());
    }
}
