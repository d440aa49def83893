use grower_core::{CellKind, Direction, GridCoord};
use grower_system_generation::{
    carve_paths, generate, is_edge, layout_fingerprint, CarvedPath, GenerationSettings,
    MapGenerator,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn settings(map_size: u32, number_of_paths: u32, seed: u64) -> GenerationSettings {
    GenerationSettings {
        map_size,
        number_of_paths,
        seed,
        ..GenerationSettings::default()
    }
}

/// Number of interior cells between `start` and the edge in the dig direction.
fn run_to_edge(path: &CarvedPath, min: GridCoord, max: GridCoord) -> usize {
    let start = path.start;
    let span = match path.direction {
        Direction::Right => max.x() - start.x(),
        Direction::Left => start.x() - min.x(),
        Direction::Up => max.y() - start.y(),
        Direction::Down => start.y() - min.y(),
    };
    usize::try_from(span).expect("start lies inside the map")
}

#[test]
fn perimeter_survives_carving() {
    for size in [3_u32, 4, 5, 8, 10, 13] {
        for seed in 0..8_u64 {
            let config = settings(size, 6, seed);
            let mut generator = MapGenerator::new(config).expect("valid settings");
            let (store, _) = generator.build().expect("map builds");

            let side = size as i32;
            let origin = GridCoord::new(-side / 2, -side / 2);
            for x in 0..side {
                for y in 0..side {
                    let coord = origin.offset(x, y);
                    if is_edge(&config, coord) {
                        assert_eq!(
                            store.get(coord).map(|record| record.kind),
                            Some(CellKind::Wall),
                            "edge {coord:?} removed for size {size} seed {seed}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn carved_runs_never_exceed_distance_to_edge() {
    for seed in 0..16_u64 {
        let mut store = generate(9, false, GridCoord::new(0, 0), 1.0).expect("valid size");
        let (min, max) = store.bounds().expect("non-empty map");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let report = carve_paths(&mut store, 5, 32, &mut rng).expect("carvable map");

        for path in &report.paths {
            assert!(path.removed.len() <= run_to_edge(path, min, max));
            assert!(path.terminal.x() > min.x() && path.terminal.x() < max.x());
            assert!(path.terminal.y() > min.y() && path.terminal.y() < max.y());
            for coord in &path.removed {
                assert!(!store.contains(*coord));
            }
        }
    }
}

#[test]
fn corridors_chain_from_previous_terminal() {
    let mut generator = MapGenerator::new(settings(12, 4, 99)).expect("valid settings");
    let (_, report) = generator.build().expect("map builds");

    assert!(!report.paths.is_empty());
    let first = &report.paths[0];
    assert_eq!(first.removed.first(), Some(&first.start), "start cell is carved");
    for pair in report.paths.windows(2) {
        let chained = pair[1].start == pair[0].terminal;
        let restarted = pair[1].removed.first() == Some(&pair[1].start);
        assert!(chained || restarted);
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let config = settings(10, 5, 0xdead_beef);
    let (store_a, report_a) = MapGenerator::new(config)
        .expect("valid settings")
        .build()
        .expect("map builds");
    let (store_b, report_b) = MapGenerator::new(config)
        .expect("valid settings")
        .build()
        .expect("map builds");

    assert_eq!(report_a, report_b);
    assert_eq!(store_a.all_coordinates(), store_b.all_coordinates());
    assert_eq!(layout_fingerprint(&store_a), layout_fingerprint(&store_b));
}

#[test]
fn tiny_map_stops_at_retry_cap() {
    let mut generator = MapGenerator::new(GenerationSettings {
        retry_cap: 4,
        ..settings(3, 2, 1)
    })
    .expect("three cells still have an interior");

    let (store, report) = generator.build().expect("no panic, no deadlock");

    assert!(report.exhausted);
    assert!(report.paths.is_empty());
    assert_eq!(store.len(), 9);
}
