//! Criterion benchmarks for the chipflow cascade engines.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chipflow::driver::Simulation;
use chipflow::instructions::{Assignment, Wiring};
use chipflow::network::{Delivery, NetworkConfig, NodeRef};
use chipflow::observer::EventLog;

/// A linear chain: every bot forwards its low to an output and its high to
/// the next bot, so one primed injection cascades through the whole chain.
fn chain_program(depth: u32) -> (Vec<Wiring>, Vec<Assignment>) {
    let mut wirings = Vec::with_capacity(depth as usize);
    for bot in 0..depth {
        wirings.push(Wiring {
            bot,
            low: NodeRef::output(bot),
            high: NodeRef::bot(bot + 1),
        });
    }

    // Prime every bot with one value, then trigger the head of the chain.
    let mut assignments = Vec::with_capacity(depth as usize + 1);
    for bot in (1..depth).rev() {
        assignments.push(Assignment {
            value: bot * 2,
            bot,
        });
    }
    assignments.push(Assignment { value: 1, bot: 0 });
    assignments.push(Assignment { value: 3, bot: 0 });
    (wirings, assignments)
}

fn bench_chain_depths(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");

    for depth in [16u32, 64, 256].iter() {
        let (wirings, assignments) = chain_program(*depth);
        group.throughput(Throughput::Elements(*depth as u64));

        for (name, delivery) in [
            ("recursive", Delivery::Recursive),
            ("worklist", Delivery::Worklist),
        ] {
            group.bench_with_input(
                BenchmarkId::new(name, depth),
                depth,
                |b, _| {
                    b.iter(|| {
                        let cfg = NetworkConfig::default()
                            .with_delivery(delivery)
                            .with_max_depth(4096);
                        let mut sim = Simulation::new(cfg);
                        let mut log = EventLog::new();
                        sim.run(&wirings, &assignments, &mut log).unwrap();
                        black_box(log.events().len())
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_chain_depths);
criterion_main!(benches);
