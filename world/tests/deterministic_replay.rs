use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::Vec3;
use grower_core::{
    CellKind, Command, Direction, Event, GameState, GridCoord, LevelConfig, LevelValidator,
    MoverSettings,
};
use grower_world::{self as world, query, World};

const SIDE: i32 = 7;

#[test]
fn identical_scripts_replay_identically() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());

    let departed = first
        .events
        .iter()
        .filter(|record| record.starts_with("HeadDepartedCell"))
        .count();
    assert!(departed > 0, "script never moved the head");
    assert_eq!(first.body_cells, departed);
    assert!(first
        .events
        .iter()
        .any(|record| record.starts_with("HeadCollided")));
}

#[test]
fn different_scripts_diverge() {
    let mut reversed = scripted_commands();
    for command in &mut reversed {
        if let Command::RequestDirection { direction } = command {
            *direction = match direction {
                Direction::Up => Direction::Down,
                Direction::Down => Direction::Up,
                Direction::Left => Direction::Right,
                Direction::Right => Direction::Left,
            };
        }
    }

    assert_ne!(
        replay(scripted_commands()).fingerprint(),
        replay(reversed).fingerprint()
    );
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    // Events carry floats, so they are compared through their debug rendering.
    events: Vec<String>,
    body_cells: usize,
    final_cell: Option<GridCoord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new();
    let mut events = Vec::new();

    for command in commands {
        let mut generated: Vec<Event> = Vec::new();
        world::apply(&mut world, command, &mut generated);
        events.extend(generated.iter().map(|event| format!("{event:?}")));
    }

    ReplayOutcome {
        events,
        body_cells: query::store(&world).cells_of_kind(CellKind::Body).count(),
        final_cell: query::head(&world).map(|snapshot| snapshot.cell),
    }
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::ConfigureMover {
            settings: MoverSettings::default(),
        },
        Command::ConfigureLevel {
            level: LevelConfig {
                validator: LevelValidator::new(12),
                ..LevelConfig::default()
            },
        },
    ];

    for x in 0..SIDE {
        for y in 0..SIDE {
            if x == 0 || y == 0 || x == SIDE - 1 || y == SIDE - 1 {
                commands.push(Command::PlaceCell {
                    cell: GridCoord::new(x, y),
                    world_position: Vec3::new(x as f32, 0.0, y as f32),
                    kind: CellKind::Wall,
                });
            }
        }
    }

    commands.push(Command::SpawnHead {
        cell: GridCoord::new(1, 1),
    });
    commands.push(Command::SetGameState {
        state: GameState::Playing,
    });

    for direction in [
        Direction::Right,
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ] {
        commands.push(Command::RequestDirection { direction });
        commands.extend((0..30).map(|_| Command::Tick {
            dt: Duration::from_millis(50),
        }));
    }
    commands
}
