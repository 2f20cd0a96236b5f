use criterion::{criterion_group, criterion_main, Criterion};
use powledger_core::{mine::mine_block_parallel, Block, Budget};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;

fn pending_block() -> Block {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<_> = (0..10)
        .map(|i| {
            json!({
                "from": format!("alice-{i}"),
                "to": "bob",
                "amount": rng.gen_range(1..10),
            })
        })
        .collect();
    Block::new(1, txs, "0".repeat(64), Some(1_700_000_000_000))
}

fn bench_pow(c: &mut Criterion) {
    let block = pending_block();

    c.bench_function("digest", |b| b.iter(|| block.digest()));

    c.bench_function("mine_sequential_difficulty_4", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine(4);
            candidate
        });
    });

    c.bench_function("mine_parallel_difficulty_4", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            mine_block_parallel(&mut candidate, 4, &Budget::unbounded())
                .expect("unbounded budget never interrupts");
            candidate
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
