//! # Mirror-Node Projection Benchmarks
//!
//! Hot paths under sustained replay load:
//!
//! - mn-02: appending log rows and tiling their block range index
//! - mn-03: balance deltas across a churning account set
//! - mn-05: whole sync cycles over a scripted backlog

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use mn_01_staged_store::InMemoryKv;
use mn_02_account_log::{AccountLogStore, TransactionRow};
use mn_03_projections::{BalanceDirection, BalanceProjection};
use mn_05_sync_engine::{MirrorStores, MockDaemon, SyncConfig, SyncEngine};
use mn_tests::support::{block, mint, transfer};
use shared_types::{ActionLogEntry, Coin};

// ============================================================================
// MN-02: Account log appends
// ============================================================================

fn bench_account_log_appends(c: &mut Criterion) {
    let mut group = c.benchmark_group("mn-02-account-log");
    group.measurement_time(Duration::from_secs(10));

    for &rows in &[1_000u64, 10_000] {
        group.throughput(Throughput::Elements(rows));
        group.bench_with_input(
            BenchmarkId::new("append_and_index", rows),
            &rows,
            |b, &rows| {
                let row = TransactionRow {
                    transaction: transfer("alice", "bob", 10, 1),
                    authority: "val-1".to_string(),
                };
                b.iter(|| {
                    let mut store = AccountLogStore::open(InMemoryKv::new()).unwrap();
                    // Four rows per block keeps the range index merging
                    // instead of degenerating into one range per row.
                    for i in 0..rows {
                        store.append_transaction("alice", i / 4, &row).unwrap();
                    }
                    black_box(store.transaction_log_len("alice").unwrap())
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// MN-03: Balance deltas
// ============================================================================

fn bench_balance_deltas(c: &mut Criterion) {
    let mut group = c.benchmark_group("mn-03-balances");
    group.measurement_time(Duration::from_secs(10));

    let mut rng = rand::thread_rng();
    let accounts: Vec<String> = (0..512).map(|i| format!("account-{i:04}")).collect();
    let deltas: Vec<(usize, u64)> = (0..10_000)
        .map(|_| (rng.gen_range(0..accounts.len()), rng.gen_range(1..100)))
        .collect();

    group.throughput(Throughput::Elements(deltas.len() as u64));
    group.bench_function("apply_delta", |b| {
        b.iter(|| {
            let mut balances = BalanceProjection::open(InMemoryKv::new()).unwrap();
            for (who, units) in &deltas {
                balances
                    .apply_delta(
                        &accounts[*who],
                        Coin::from_units(*units),
                        BalanceDirection::Increase,
                    )
                    .unwrap();
            }
            black_box(balances.balance(&accounts[0]).unwrap())
        });
    });
    group.finish();
}

// ============================================================================
// MN-05: Whole sync cycles
// ============================================================================

fn bench_sync_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("mn-05-sync-engine");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(20);

    let runtime = tokio::runtime::Runtime::new().unwrap();

    for &entries in &[100u64, 1_000] {
        let backlog: Vec<ActionLogEntry> = (0..entries)
            .map(|i| {
                block(
                    i,
                    i + 1,
                    "val-1",
                    vec![mint("alice", 10), transfer("alice", "bob", 5, 1)],
                    vec![],
                )
            })
            .collect();

        group.throughput(Throughput::Elements(entries));
        group.bench_with_input(
            BenchmarkId::new("run_cycle", entries),
            &backlog,
            |b, backlog| {
                b.iter(|| {
                    let mut engine = SyncEngine::new(
                        SyncConfig {
                            page_size: 500,
                            import_page_size: 500,
                            statistics_window: 1_000,
                        },
                        MockDaemon::new(backlog.clone()),
                        MirrorStores::in_memory().unwrap(),
                    );
                    let report = runtime.block_on(engine.run_cycle()).unwrap();
                    black_box(report.entries)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_account_log_appends,
    bench_balance_deltas,
    bench_sync_cycle
);
criterion_main!(benches);
