//! Performance benchmarks for SYMBIOSIS

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use symbiosis::behavior::{DeepQLearner, Experience, LearnedAction, STATE_SIZE};
use symbiosis::neural::QNetwork;
use symbiosis::{Config, Simulation, SimulationSnapshot, FRAME_DT};

fn benchmark_simulation_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step");

    for population in [20, 60, 150].iter() {
        let mut config = Config::default();
        config.world.initial_population = *population;
        config.world.size = 60.0;

        let mut sim = Simulation::new_with_seed(config, 42);

        // Warm up
        sim.run(60, FRAME_DT);

        group.bench_with_input(BenchmarkId::new("population", population), population, |b, _| {
            b.iter(|| {
                sim.step(black_box(FRAME_DT));
            });
        });
    }

    group.finish();
}

fn benchmark_q_network(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut net = QNetwork::new(STATE_SIZE, 8, 3, &mut rng);
    let inputs = [0.5f32; STATE_SIZE];

    c.bench_function("q_network_forward", |b| {
        b.iter(|| net.forward(black_box(&inputs)));
    });

    let target = [1.0f32, 0.0, -1.0];
    c.bench_function("q_network_train", |b| {
        b.iter(|| net.train(black_box(&inputs), black_box(&target), 0.05));
    });

    let mut learner = DeepQLearner::new(&mut rng);
    for i in 0..50 {
        let mut state = [0.0f32; STATE_SIZE];
        state[i % STATE_SIZE] = 1.0;
        learner.remember_experience(Experience {
            state,
            action: LearnedAction::ALL[i % 3],
            reward: (i % 5) as f32 - 2.0,
            next_state: inputs,
        });
    }
    c.bench_function("deep_q_replay_batch", |b| {
        b.iter(|| learner.replay_batch(&mut rng));
    });
}

fn benchmark_safe_placement(c: &mut Criterion) {
    let mut config = Config::default();
    config.world.initial_population = 80;
    config.world.size = 60.0;
    let sim = Simulation::new_with_seed(config, 42);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    c.bench_function("find_safe_position", |b| {
        b.iter(|| sim.world.find_safe_position(&mut rng));
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let mut config = Config::default();
    config.world.initial_population = 100;
    config.world.size = 60.0;
    let mut sim = Simulation::new_with_seed(config, 42);
    sim.run(600, FRAME_DT);

    let snapshot = sim.snapshot();

    c.bench_function("snapshot_serialize", |b| {
        b.iter(|| bincode::serialize(black_box(&snapshot)).unwrap());
    });

    let serialized = bincode::serialize(&snapshot).unwrap();

    c.bench_function("snapshot_deserialize", |b| {
        b.iter(|| {
            let _: SimulationSnapshot = bincode::deserialize(black_box(&serialized)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    benchmark_simulation_step,
    benchmark_q_network,
    benchmark_safe_placement,
    benchmark_snapshot,
);

criterion_main!(benches);
