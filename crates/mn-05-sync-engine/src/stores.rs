//! # The Mirror Store Set
//!
//! One value owning every derived store, plus the unit of work that
//! saves, commits or discards them as a group. Commit order is fixed:
//! data stores first, chain state with the cursor last, so a crash
//! between two commits can only leave the cursor behind the data. The
//! per-store watermarks then tell replay which stores already absorbed
//! which entries.

use mn_01_staged_store::{
    commit_all, discard_all, save_all, InMemoryKv, KeyValue, Staged, StoreError,
};
use mn_02_account_log::AccountLogStore;
use mn_03_projections::{
    BalanceProjection, StorageReplicationProjection, UsageStatisticsProjection,
};
use mn_04_content_chain::ChannelContentProjection;

use crate::chain_state::ChainStateStore;

/// One backing store per derived store.
pub struct MirrorBackings<B: KeyValue> {
    pub account_log: B,
    pub balances: B,
    pub replication: B,
    pub statistics: B,
    pub content: B,
    pub chain_state: B,
}

impl MirrorBackings<InMemoryKv> {
    /// Six fresh in-memory backings.
    pub fn in_memory() -> Self {
        MirrorBackings {
            account_log: InMemoryKv::new(),
            balances: InMemoryKv::new(),
            replication: InMemoryKv::new(),
            statistics: InMemoryKv::new(),
            content: InMemoryKv::new(),
            chain_state: InMemoryKv::new(),
        }
    }
}

/// Every derived store of one mirror node.
pub struct MirrorStores<B: KeyValue> {
    pub account_log: AccountLogStore<B>,
    pub balances: BalanceProjection<B>,
    pub replication: StorageReplicationProjection<B>,
    pub statistics: UsageStatisticsProjection<B>,
    pub content: ChannelContentProjection<B>,
    pub chain_state: ChainStateStore<B>,
}

impl<B: KeyValue> MirrorStores<B> {
    /// Opens every store over its backing.
    pub fn open(backings: MirrorBackings<B>) -> Result<Self, StoreError> {
        Ok(MirrorStores {
            account_log: AccountLogStore::open(backings.account_log)?,
            balances: BalanceProjection::open(backings.balances)?,
            replication: StorageReplicationProjection::open(backings.replication)?,
            statistics: UsageStatisticsProjection::open(backings.statistics)?,
            content: ChannelContentProjection::open(backings.content)?,
            chain_state: ChainStateStore::open(backings.chain_state)?,
        })
    }

    /// Consumes the set, returning the backings so a test can reopen over
    /// the same data.
    pub fn into_backings(self) -> MirrorBackings<B> {
        MirrorBackings {
            account_log: self.account_log.into_backing(),
            balances: self.balances.into_backing(),
            replication: self.replication.into_backing(),
            statistics: self.statistics.into_backing(),
            content: self.content.into_backing(),
            chain_state: self.chain_state.into_backing(),
        }
    }

    /// The stores as one staging group, in commit order. Chain state goes
    /// last; see the module docs.
    fn staged_in_commit_order(&mut self) -> [&mut dyn Staged; 6] {
        [
            &mut self.account_log,
            &mut self.balances,
            &mut self.replication,
            &mut self.statistics,
            &mut self.content,
            &mut self.chain_state,
        ]
    }
}

impl MirrorStores<InMemoryKv> {
    pub fn in_memory() -> Result<Self, StoreError> {
        MirrorStores::open(MirrorBackings::in_memory())
    }
}

/// Scoped mutation of the store set.
///
/// Begins over the last committed view, dropping anything a previous
/// interrupted cycle left staged. Committing consumes the guard; dropping
/// it without committing discards every uncommitted write, so an error
/// path can simply propagate and leave the stores untouched.
pub struct UnitOfWork<'a, B: KeyValue> {
    stores: &'a mut MirrorStores<B>,
    label: &'static str,
    finished: bool,
}

impl<'a, B: KeyValue> UnitOfWork<'a, B> {
    /// Opens a unit of work named `label` (used in logs).
    pub fn begin(stores: &'a mut MirrorStores<B>, label: &'static str) -> Self {
        discard_all(&mut stores.staged_in_commit_order());
        UnitOfWork {
            stores,
            label,
            finished: false,
        }
    }

    /// The stores under this unit of work.
    pub fn stores(&mut self) -> &mut MirrorStores<B> {
        self.stores
    }

    /// Stages and commits every store, stamping `watermark` into each in
    /// the same atomic batch as its rows.
    pub fn commit_at(mut self, watermark: u64) -> Result<(), StoreError> {
        for store in self.stores.staged_in_commit_order() {
            store.set_watermark(watermark);
        }
        self.finish()
    }

    /// Stages and commits every store without moving the watermarks.
    /// Imports use this: they only backfill rows the watermarks already
    /// cover for the other stores.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        // Marked finished before committing: when a commit fails halfway,
        // the not-yet-committed stores keep their staged batches until
        // the next `begin` discards them, while the committed ones are
        // already guarded by their watermarks.
        self.finished = true;
        let mut staged = self.stores.staged_in_commit_order();
        save_all(&mut staged);
        commit_all(&mut staged)
    }
}

impl<B: KeyValue> Drop for UnitOfWork<'_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!(
            "[mn-05] {} abandoned; discarding uncommitted writes",
            self.label
        );
        discard_all(&mut self.stores.staged_in_commit_order());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mn_03_projections::BalanceDirection;
    use shared_types::Coin;

    #[test]
    fn test_commit_at_stamps_every_store() {
        let mut stores = MirrorStores::in_memory().unwrap();
        let mut work = UnitOfWork::begin(&mut stores, "test");
        work.stores()
            .balances
            .apply_delta("alice", Coin::from_units(5), BalanceDirection::Increase)
            .unwrap();
        work.commit_at(9).unwrap();

        assert_eq!(stores.account_log.watermark(), Some(9));
        assert_eq!(stores.balances.watermark(), Some(9));
        assert_eq!(stores.chain_state.watermark(), Some(9));
        assert_eq!(
            stores.balances.balance("alice").unwrap(),
            Coin::from_units(5)
        );
    }

    #[test]
    fn test_drop_without_commit_discards() {
        let mut stores = MirrorStores::in_memory().unwrap();
        {
            let mut work = UnitOfWork::begin(&mut stores, "test");
            work.stores()
                .balances
                .apply_delta("alice", Coin::from_units(5), BalanceDirection::Increase)
                .unwrap();
        }
        assert!(stores.balances.balance("alice").unwrap().is_zero());
        assert_eq!(stores.balances.watermark(), None);
    }

    #[test]
    fn test_begin_drops_leftover_staged_writes() {
        let mut stores = MirrorStores::in_memory().unwrap();
        stores
            .balances
            .apply_delta("alice", Coin::from_units(5), BalanceDirection::Increase)
            .unwrap();
        stores.balances.save();

        let mut work = UnitOfWork::begin(&mut stores, "test");
        assert!(work.stores().balances.balance("alice").unwrap().is_zero());
    }

    #[test]
    fn test_plain_commit_keeps_watermarks() {
        let mut stores = MirrorStores::in_memory().unwrap();
        let mut work = UnitOfWork::begin(&mut stores, "test");
        work.stores().chain_state.track_account("alice");
        work.commit().unwrap();

        assert_eq!(stores.chain_state.watermark(), None);
        assert!(stores.chain_state.is_tracked("alice").unwrap());
    }
}
