#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bootstrap system that prepares playable Grower levels.

use grower_core::{Command, Event, GameState, GridCoord, LevelConfig, MoverSettings};
use grower_system_generation::{
    layout_fingerprint, CarveReport, GenerationError, GenerationSettings, MapGenerator,
};
use grower_world::{apply, query, World};
use thiserror::Error;
use tracing::{error, info};

/// Failures that leave no playable level behind.
#[derive(Debug, Error, PartialEq)]
pub enum BootstrapError {
    /// Map generation rejected its configuration.
    #[error("map generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// Carving produced no corridor to place the head in.
    #[error("no corridor was carved, so the head has nowhere to spawn")]
    NoSpawnCell,
}

/// A generated level ready for play.
#[derive(Debug)]
pub struct PreparedLevel {
    /// World owning the generated grid and the spawned head.
    pub world: World,
    /// Corridors carved into the walls.
    pub report: CarveReport,
    /// Cell the head spawned on.
    pub spawn: GridCoord,
    /// Digest of the generated layout.
    pub fingerprint: u64,
}

/// Produces levels from generation, movement and level settings.
#[derive(Debug)]
pub struct Bootstrap {
    generator: MapGenerator,
    mover: MoverSettings,
    level: LevelConfig,
    levels_prepared: u32,
}

impl Bootstrap {
    /// Creates a bootstrap whose generator is seeded from `generation`.
    ///
    /// The mover's cell size is taken from the generation settings so head
    /// alignment matches the generated cells.
    pub fn new(
        generation: GenerationSettings,
        mover: MoverSettings,
        level: LevelConfig,
    ) -> Result<Self, BootstrapError> {
        let generator = MapGenerator::new(generation).map_err(|err| {
            error!(error = %err, "invalid generation settings");
            BootstrapError::from(err)
        })?;
        Ok(Self {
            generator,
            mover: MoverSettings {
                cell_size: generation.cell_size,
                ..mover
            },
            level,
            levels_prepared: 0,
        })
    }

    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner<'world>(&self, world: &'world World) -> &'world str {
        query::welcome_banner(world)
    }

    /// Movement settings handed to every prepared world.
    #[must_use]
    pub const fn mover_settings(&self) -> &MoverSettings {
        &self.mover
    }

    /// Generates a level for `scene_index`, spawns the head on the first carved
    /// cell and enters [`GameState::Playing`].
    pub fn prepare(
        &mut self,
        scene_index: u32,
        out_events: &mut Vec<Event>,
    ) -> Result<PreparedLevel, BootstrapError> {
        let (store, report) = self.generator.build().map_err(|err| {
            error!(error = %err, "level generation aborted");
            BootstrapError::from(err)
        })?;
        let Some(spawn) = report.first_cell() else {
            error!(exhausted = report.exhausted, "no corridor to spawn the head in");
            return Err(BootstrapError::NoSpawnCell);
        };
        let fingerprint = layout_fingerprint(&store);

        let level = LevelConfig {
            scene_index,
            level_index: self.levels_prepared,
            ..self.level
        };
        self.levels_prepared = self.levels_prepared.saturating_add(1);

        let mut world = World::from_store(store);
        for command in [
            Command::ConfigureMover {
                settings: self.mover,
            },
            Command::ConfigureLevel { level },
            Command::SpawnHead { cell: spawn },
            Command::SetGameState {
                state: GameState::Playing,
            },
        ] {
            apply(&mut world, command, out_events);
        }

        info!(
            scene = scene_index,
            level = level.level_index,
            ?spawn,
            fingerprint = %format!("{fingerprint:016x}"),
            "level ready"
        );
        Ok(PreparedLevel {
            world,
            report,
            spawn,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grower_core::{CellKind, HeadPhase};

    fn bootstrap(seed: u64) -> Bootstrap {
        Bootstrap::new(
            GenerationSettings {
                seed,
                ..GenerationSettings::default()
            },
            MoverSettings::default(),
            LevelConfig::default(),
        )
        .expect("default settings are valid")
    }

    #[test]
    fn prepared_level_is_playing_with_head_on_corridor() {
        let mut events = Vec::new();
        let level = bootstrap(5).prepare(0, &mut events).expect("level prepared");

        let head = query::head(&level.world).expect("head spawned");
        assert_eq!(head.cell, level.spawn);
        assert_eq!(head.phase, HeadPhase::Idle);
        assert!(!query::store(&level.world).contains(level.spawn));
        assert_eq!(query::game_state(&level.world), GameState::Playing);
        assert!(events.contains(&Event::HeadSpawned { cell: level.spawn }));
        assert!(events.contains(&Event::GameStateChanged {
            state: GameState::Playing
        }));
        assert_eq!(
            query::store(&level.world).cells_of_kind(CellKind::Body).count(),
            0
        );
    }

    #[test]
    fn level_indices_advance_per_preparation() {
        let mut bootstrap = bootstrap(8);
        let mut events = Vec::new();
        let first = bootstrap.prepare(0, &mut events).expect("first level");
        let second = bootstrap.prepare(1, &mut events).expect("second level");

        assert_eq!(query::level_config(&first.world).level_index, 0);
        let second_level = query::level_config(&second.world);
        assert_eq!(second_level.level_index, 1);
        assert_eq!(second_level.scene_index, 1);
    }

    #[test]
    fn invalid_generation_is_reported() {
        let result = Bootstrap::new(
            GenerationSettings {
                map_size: 0,
                ..GenerationSettings::default()
            },
            MoverSettings::default(),
            LevelConfig::default(),
        );
        assert_eq!(
            result.err(),
            Some(BootstrapError::Generation(GenerationError::ZeroSize))
        );
    }

    #[test]
    fn uncarvable_map_has_no_spawn() {
        let mut bootstrap = Bootstrap::new(
            GenerationSettings {
                map_size: 3,
                number_of_paths: 1,
                retry_cap: 2,
                ..GenerationSettings::default()
            },
            MoverSettings::default(),
            LevelConfig::default(),
        )
        .expect("settings are valid");
        let mut events = Vec::new();
        assert_eq!(
            bootstrap.prepare(0, &mut events).err(),
            Some(BootstrapError::NoSpawnCell)
        );
    }
}
