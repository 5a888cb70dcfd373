//! Integration tests for SYMBIOSIS

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use symbiosis::behavior::{
    Behavior, BehaviorKind, EnergyLevel, InteractionMemory, LearnedAction, PriorContact, Profile, QLearner, QState,
};
use symbiosis::food::FoodKind;
use symbiosis::geometry::{circles_overlap, Vec2};
use symbiosis::organism::MAX_ENERGY;
use symbiosis::world::{World, FOOD_CLEARANCE, ORGANISM_CLEARANCE};
use symbiosis::{Config, Simulation, SimulationSnapshot, FRAME_DT};

fn small_config(population: usize) -> Config {
    let mut config = Config::default();
    config.world.initial_population = population;
    config
}

#[test]
fn test_full_simulation_cycle() {
    let mut sim = Simulation::new_with_seed(small_config(30), 12345);

    // Ten simulated seconds
    sim.run(600, FRAME_DT);
    assert_eq!(sim.ticks(), 600);

    let bound = sim.world_size() / 2.1 + 1e-3;
    for org in sim.world.living() {
        assert!(org.is_finite());
        assert!(org.behavior.is_valid());
        assert!((0.0..=MAX_ENERGY).contains(&org.energy));
        assert!(org.position.x.abs() <= bound && org.position.z.abs() <= bound);
        assert!(org.age <= org.max_lifespan);
    }
}

#[test]
fn test_snapshot_persistence() {
    let mut sim = Simulation::new_with_seed(small_config(20), 54321);
    sim.run(300, FRAME_DT);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.snap");
    let snapshot = sim.snapshot();
    snapshot.save(&path).expect("Failed to save snapshot");

    let loaded = SimulationSnapshot::load(&path).expect("Failed to load snapshot");
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.population(), sim.population());

    // Restore and continue
    let mut restored = Simulation::from_snapshot(Config::default(), &loaded, 1);
    assert_eq!(restored.population(), sim.population());
    assert!((restored.time() - sim.time()).abs() < 1e-9);

    restored.run(60, FRAME_DT);
    assert!(restored.time() > sim.time());
}

#[test]
fn test_learned_policy_not_persisted() {
    let mut sim = Simulation::new_with_seed(small_config(40), 2024);
    sim.run(1200, FRAME_DT);

    let restored = Simulation::from_snapshot(Config::default(), &sim.snapshot(), 3);
    for org in restored.world.living() {
        if let Some(q) = org.behavior.q_learner() {
            assert_eq!(q.states_seen(), 0);
        }
        if let Some(dq) = org.behavior.deep_q_learner() {
            assert_eq!(dq.replay_len(), 0);
        }
    }
}

#[test]
fn test_reproducibility() {
    let config = small_config(25);

    let mut sim1 = Simulation::new_with_seed(config.clone(), 99999);
    let mut sim2 = Simulation::new_with_seed(config, 99999);

    sim1.run(900, FRAME_DT);
    sim2.run(900, FRAME_DT);

    assert_eq!(sim1.stats.stats(), sim2.stats.stats());
    assert_eq!(sim1.snapshot(), sim2.snapshot());
}

#[test]
fn test_stats_tracking() {
    let mut sim = Simulation::new_with_seed(small_config(30), 33333);
    sim.run(600, FRAME_DT);

    let stats = sim.stats.stats();
    assert!(stats.time > 9.9);
    assert_eq!(stats.total_population, sim.population());
    assert_eq!(stats.behavior_counts, sim.world.behavior_counts());

    // One sample per simulated second
    let history_len = sim.stats.history_len();
    assert!((9..=10).contains(&history_len), "history has {} samples", history_len);
    assert_eq!(sim.stats.population_series().len(), history_len);
    assert!(sim.stats.summary().contains("Pop:"));
}

#[test]
fn test_extinction_recovery() {
    let mut config = small_config(0);
    config.world.generate_obstacles = false;
    let mut sim = Simulation::new_with_seed(config, 5);
    assert!(sim.is_extinct());

    let report = sim.step(FRAME_DT);
    assert_eq!(report.injected.len(), 5);
    assert_eq!(sim.population(), 5);
}

#[test]
fn test_interaction_energy_bounds() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);

    for round in 0..200u64 {
        let me = Profile {
            id: 1,
            kind: BehaviorKind::Cooperative,
            position: Vec2::ZERO,
            energy: rng.gen_range(0.0..MAX_ENERGY),
            size: 1.0,
        };
        let target = Profile {
            id: 2 + round,
            kind: BehaviorKind::random(&mut rng),
            position: Vec2::new(1.0, 0.0),
            energy: rng.gen_range(0.0..MAX_ENERGY),
            size: 1.0,
        };

        for kind in [BehaviorKind::Selfish, BehaviorKind::Aggressive] {
            let mut behavior = Behavior::new(kind, &mut rng);
            let outcome = behavior.interact(&Profile { kind, ..me }, &target, 0.0, &mut rng);
            assert!(outcome.net() <= 1e-4, "{} created energy: {:?}", kind, outcome);
        }

        for kind in [BehaviorKind::Cooperative, BehaviorKind::Altruistic, BehaviorKind::TitForTat] {
            let mut behavior = Behavior::new(kind, &mut rng);
            let outcome = behavior.interact(&Profile { kind, ..me }, &target, 0.0, &mut rng);
            assert!(outcome.net() >= -1e-4, "{} destroyed energy: {:?}", kind, outcome);
            assert!(outcome.net() <= 2.4 + 1e-4);
        }
    }
}

#[test]
fn test_cooperative_pair_scenario() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut behavior = Behavior::new(BehaviorKind::Cooperative, &mut rng);
    let a = Profile {
        id: 1,
        kind: BehaviorKind::Cooperative,
        position: Vec2::ZERO,
        energy: 100.0,
        size: 1.0,
    };
    let b = Profile {
        id: 2,
        energy: 50.0,
        position: Vec2::new(1.0, 0.0),
        ..a
    };

    let outcome = behavior.interact(&a, &b, 0.0, &mut rng);
    assert!((outcome.self_energy_delta + 5.6).abs() < 1e-5);
    assert!((outcome.target_energy_delta - 8.0).abs() < 1e-5);
    assert!(behavior.last_interaction(2, 0.0).unwrap().was_positive);
}

#[test]
fn test_q_learning_update() {
    let state = QState {
        self_energy: EnergyLevel::High,
        target_energy: EnergyLevel::Low,
        target_kind: BehaviorKind::Selfish,
        prior: PriorContact::None,
    };
    let next = QState {
        prior: PriorContact::Positive,
        ..state
    };

    let mut q = QLearner::new();
    q.set_q_value(next, LearnedAction::Compete, 2.0);
    q.learn(state, LearnedAction::Cooperate, 5.0, &next);

    assert!((q.q_value(&state, LearnedAction::Cooperate) - 0.68).abs() < 1e-6);
}

#[test]
fn test_memory_expiry() {
    let mut memory = InteractionMemory::new(10.0);
    memory.remember(7, true, 0.0);

    assert!(memory.recall(7, 9.0).is_some());
    assert!(memory.recall(7, 10.5).is_none());

    memory.set_unlimited(true);
    assert!(memory.recall(7, 1000.0).is_some());
}

#[test]
fn test_placement_safety() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let sim = Simulation::new_with_seed(small_config(25), 10);
    let world: &World = &sim.world;

    for _ in 0..50 {
        let Some(p) = world.find_safe_position(&mut rng) else {
            continue;
        };
        for o in world.living() {
            let min = ORGANISM_CLEARANCE + o.bounding_radius();
            assert!(p.distance_squared(o.position) >= min * min);
        }
        for o in &world.obstacles {
            let min = ORGANISM_CLEARANCE + o.radius;
            assert!(p.distance_squared(o.position) >= min * min);
        }
        for f in world.food.iter().filter(|f| !f.is_consumed()) {
            let min = ORGANISM_CLEARANCE + f.bounding_radius();
            assert!(p.distance_squared(f.position) >= min * min);
        }
    }
}

#[test]
fn test_offspring_placement_safety() {
    let mut config = small_config(45);
    config.world.size = 25.0;
    let mut sim = Simulation::new_with_seed(config, 21);
    for _ in 0..30 {
        sim.spawn_food();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let mut spawned = 0;
    for index in 0..sim.world.organisms.len() {
        let Some((parent, hood)) = sim.world.split_at(index) else {
            break;
        };
        parent.energy = 120.0;
        let radius = parent.bounding_radius();
        let Some(child) = parent.reproduce(0.1, &hood, &mut rng) else {
            continue;
        };
        spawned += 1;
        let p = child.position;

        assert!(!circles_overlap(p, radius, parent.position, radius), "child overlaps its parent");
        for o in hood.others().filter(|o| o.is_alive()) {
            assert!(!circles_overlap(p, radius, o.position, o.bounding_radius()));
        }
        for o in hood.obstacles {
            assert!(!circles_overlap(p, radius, o.position, o.radius));
        }
        for f in hood.food.iter().filter(|f| !f.is_consumed()) {
            assert!(!circles_overlap(p, radius, f.position, f.bounding_radius()));
        }
    }
    assert!(spawned > 0);
}

#[test]
fn test_food_placement_safety() {
    let mut rng = ChaCha8Rng::seed_from_u64(22);
    let mut sim = Simulation::new_with_seed(small_config(10), 22);

    for _ in 0..20 {
        let p = sim.world.find_safe_food_position(&mut rng);
        for o in sim.world.living() {
            let min = FOOD_CLEARANCE + o.bounding_radius();
            assert!(p.distance_squared(o.position) >= min * min);
        }
        for o in &sim.world.obstacles {
            let min = FOOD_CLEARANCE + o.radius;
            assert!(p.distance_squared(o.position) >= min * min);
        }
        for f in sim.world.food.iter().filter(|f| !f.is_consumed()) {
            let min = FOOD_CLEARANCE + f.bounding_radius();
            assert!(p.distance_squared(f.position) >= min * min);
        }
        sim.add_food_at(FoodKind::Berry, p);
    }
}

#[test]
fn test_yaml_config_drives_simulation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "world:\n  size: 30.0\n  initial_population: 6\n  generate_obstacles: false\n\
         behaviors:\n  selfish:\n    interaction_strength: 2.0\n",
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    let sim = Simulation::new_with_seed(config, 11);

    assert_eq!(sim.world_size(), 30.0);
    assert_eq!(sim.population(), 6);
    assert!(sim.world.obstacles.is_empty());
    assert_eq!(sim.world.food.len(), 3);
    assert_eq!(
        sim.parameters().behaviors.get(BehaviorKind::Selfish).interaction_strength,
        2.0
    );
}
