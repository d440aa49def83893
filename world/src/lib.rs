#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Grower.

mod store;

use grower_core::{
    CellKind, Command, Event, GameState, GridCoord, LevelConfig, MoverSettings, RejectReason,
    WELCOME_BANNER,
};
use grower_system_movement::HeadMover;
use tracing::{debug, info, warn};

pub use store::GridStore;

/// Represents the authoritative Grower world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    store: GridStore,
    mover_settings: MoverSettings,
    level: LevelConfig,
    head: Option<HeadMover>,
    game_state: GameState,
    last_rejection: Option<RejectReason>,
    tick_index: u64,
}

impl World {
    /// Creates an empty world sitting in the main menu.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(GridStore::new())
    }

    /// Creates a world around an already populated occupancy store.
    #[must_use]
    pub fn from_store(store: GridStore) -> Self {
        Self {
            banner: WELCOME_BANNER,
            store,
            mover_settings: MoverSettings::default(),
            level: LevelConfig::default(),
            head: None,
            game_state: GameState::MainMenu,
            last_rejection: None,
            tick_index: 0,
        }
    }

    fn set_game_state(&mut self, state: GameState, out_events: &mut Vec<Event>) {
        if self.game_state == state {
            return;
        }
        info!(from = ?self.game_state, to = ?state, "game state changed");
        self.game_state = state;
        out_events.push(Event::GameStateChanged { state });
    }

    fn reject(&mut self, reason: RejectReason) {
        debug!(?reason, "direction request ignored");
        self.last_rejection = Some(reason);
    }

    /// Forwards head events, growing the trail and reacting to level completion.
    fn absorb_head_events(&mut self, head_events: Vec<Event>, out_events: &mut Vec<Event>) {
        for event in head_events {
            match event {
                Event::HeadDepartedCell { cell } => {
                    out_events.push(event);
                    self.grow_body(cell, out_events);
                }
                Event::LevelCompleted { .. } => {
                    out_events.push(event);
                    self.set_game_state(GameState::ReloadingScene, out_events);
                }
                other => out_events.push(other),
            }
        }
    }

    fn grow_body(&mut self, cell: GridCoord, out_events: &mut Vec<Event>) {
        let position = self.mover_settings.alignment().to_world(cell);
        if self.store.add_cell(cell, position, CellKind::Body) {
            out_events.push(Event::CellPlaced {
                cell,
                kind: CellKind::Body,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMover { settings } => {
            world.mover_settings = settings;
        }
        Command::ConfigureLevel { level } => {
            world.level = level;
        }
        Command::PlaceCell {
            cell,
            world_position,
            kind,
        } => {
            if world.store.add_cell(cell, world_position, kind) {
                out_events.push(Event::CellPlaced { cell, kind });
            }
        }
        Command::RemoveCell { cell } => {
            if let Some(record) = world.store.take_cell(cell) {
                out_events.push(Event::CellRemoved {
                    cell,
                    kind: record.kind,
                });
            }
        }
        Command::SpawnHead { cell } => {
            if world.store.contains(cell) {
                warn!(?cell, "refusing to spawn the head inside an occupied cell");
                return;
            }
            world.head = Some(HeadMover::new(world.mover_settings, world.level, cell));
            world.last_rejection = None;
            out_events.push(Event::HeadSpawned { cell });
        }
        Command::RequestDirection { direction } => {
            if world.game_state != GameState::Playing {
                world.reject(RejectReason::NotPlaying);
                return;
            }
            let mut head_events = Vec::new();
            let outcome = match world.head.as_mut() {
                Some(head) => head.request(direction, &world.store, &mut head_events),
                None => Err(RejectReason::NoHead),
            };
            match outcome {
                Ok(()) => {
                    world.last_rejection = None;
                    world.absorb_head_events(head_events, out_events);
                }
                Err(reason) => world.reject(reason),
            }
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            if world.game_state != GameState::Playing {
                return;
            }
            let mut head_events = Vec::new();
            if let Some(head) = world.head.as_mut() {
                head.advance(dt, &world.store, &mut head_events);
            }
            world.absorb_head_events(head_events, out_events);
        }
        Command::SetGameState { state } => {
            world.set_game_state(state, out_events);
        }
        Command::ResetLevel => {
            for record in world.store.remove_kind(CellKind::Body) {
                out_events.push(Event::CellRemoved {
                    cell: record.coordinate,
                    kind: record.kind,
                });
            }
            if let Some(head) = world.head.as_mut() {
                head.reset();
                let cell = head.spawn_cell();
                out_events.push(Event::HeadSpawned { cell });
            }
            world.last_rejection = None;
            out_events.push(Event::LevelReset);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use grower_core::{GameState, HeadSnapshot, LevelConfig, MoverSettings, RejectReason};

    use super::{GridStore, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the occupancy store.
    #[must_use]
    pub fn store(world: &World) -> &GridStore {
        &world.store
    }

    /// Captures the head state, if a head has been spawned.
    #[must_use]
    pub fn head(world: &World) -> Option<HeadSnapshot> {
        world.head.as_ref().map(|head| head.snapshot())
    }

    /// Current session state.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.game_state
    }

    /// Level bookkeeping handed to newly spawned heads.
    #[must_use]
    pub fn level_config(world: &World) -> LevelConfig {
        world.level
    }

    /// Movement tuning handed to newly spawned heads.
    #[must_use]
    pub fn mover_settings(world: &World) -> MoverSettings {
        world.mover_settings
    }

    /// Reason the most recent direction request was ignored, cleared on acceptance.
    #[must_use]
    pub fn last_rejection(world: &World) -> Option<RejectReason> {
        world.last_rejection
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
