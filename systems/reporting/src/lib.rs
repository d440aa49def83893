#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collision and level-result reporting for Grower.
//!
//! The builders in this crate turn raw movement facts into the immutable
//! [`CollisionRecord`] and [`LevelResult`] values carried by world events.
//! [`Broadcaster`] fans those records out to presentation listeners.

mod broadcast;

use std::time::Duration;

use grower_core::{
    CellRecord, CollisionRecord, CollisionSide, GridCoord, LevelConfig, LevelResult,
};
use thiserror::Error;
use tracing::warn;

pub use broadcast::{Broadcaster, Delivery, Listener, ListenerId};

/// Side reported when the collision delta is not a unit step.
pub const FALLBACK_SIDE: CollisionSide = CollisionSide::Top;

/// Motion facts captured on the tick the head struck an obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
    /// Speed measured over the tick before impact.
    pub speed_before: f32,
    /// Mass of the head.
    pub mass: f32,
    /// Duration of the tick in which the impact happened.
    pub tick: Duration,
}

/// Raised when head and obstacle are not orthogonal neighbours.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unexpected collision delta ({dx}, {dy}) between head and obstacle")]
pub struct UnexpectedDelta {
    /// Horizontal difference `obstacle - head`.
    pub dx: i32,
    /// Vertical difference `obstacle - head`.
    pub dy: i32,
}

/// Derives the struck side from the unit step between head and obstacle.
pub fn resolve_collision_side(
    head: GridCoord,
    obstacle: GridCoord,
) -> Result<CollisionSide, UnexpectedDelta> {
    match head.delta_to(obstacle) {
        (0, 1) => Ok(CollisionSide::Top),
        (0, -1) => Ok(CollisionSide::Bottom),
        (-1, 0) => Ok(CollisionSide::Left),
        (1, 0) => Ok(CollisionSide::Right),
        (dx, dy) => Err(UnexpectedDelta { dx, dy }),
    }
}

/// Force of an elastic stop: `mass * (speed_before - 0) / tick`.
///
/// A zero-length tick yields zero rather than an infinite force.
#[must_use]
pub fn collision_force(impact: Impact) -> f32 {
    let seconds = impact.tick.as_secs_f32();
    if seconds <= 0.0 {
        return 0.0;
    }
    impact.mass * (impact.speed_before - 0.0) / seconds
}

/// Packages a collision into an immutable record.
///
/// Non-unit deltas are logged and reported with [`FALLBACK_SIDE`] and
/// `side_defaulted` set, so listeners can tell the side was not derived.
#[must_use]
pub fn build_collision_record(
    head: GridCoord,
    obstructing_cell: CellRecord,
    impact: Impact,
) -> CollisionRecord {
    let obstacle = obstructing_cell.coordinate;
    let (side, side_defaulted) = match resolve_collision_side(head, obstacle) {
        Ok(side) => (side, false),
        Err(error) => {
            warn!(%error, ?head, ?obstacle, "falling back to default collision side");
            (FALLBACK_SIDE, true)
        }
    };

    CollisionRecord {
        head,
        obstacle,
        force: collision_force(impact),
        side,
        obstructing_cell,
        side_defaulted,
    }
}

/// Packages level statistics into an immutable result.
///
/// Completion only counts visited cells; it does not inspect which cells
/// were covered.
#[must_use]
pub fn build_level_result(
    level: &LevelConfig,
    final_coord: GridCoord,
    elapsed: Duration,
    path_length: usize,
) -> LevelResult {
    LevelResult {
        scene_index: level.scene_index,
        level_index: level.level_index,
        final_coord,
        elapsed,
        path_length,
        complete: level.validator.is_complete(path_length),
        validator: level.validator,
    }
}

/// Chooses the scene to load after a level ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneValidator {
    scene_count: u32,
}

impl SceneValidator {
    /// Creates a validator cycling through `scene_count` scenes.
    #[must_use]
    pub const fn new(scene_count: u32) -> Self {
        Self { scene_count }
    }

    /// Number of scenes the validator cycles through.
    #[must_use]
    pub const fn scene_count(&self) -> u32 {
        self.scene_count
    }

    /// Advances to the next scene on completion, otherwise repeats the current one.
    #[must_use]
    pub fn next_scene_index(&self, result: &LevelResult) -> u32 {
        if !result.complete || self.scene_count == 0 {
            return result.scene_index;
        }
        result.scene_index.saturating_add(1) % self.scene_count
    }
}

impl Default for SceneValidator {
    fn default() -> Self {
        Self::new(1)
    }
}
