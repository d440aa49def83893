#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Grower engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presentation layers to react to. Systems read the grid through
//! [`ObstacleQuery`] and never mutate it directly.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Grower.";

/// High level state of the game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// The player is looking at the main menu; no level is running.
    MainMenu,
    /// A level is running and the head accepts direction requests.
    Playing,
    /// The level ended and the adapter is transitioning to the next scene.
    ReloadingScene,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the tuning used by subsequently spawned heads.
    ConfigureMover {
        /// Movement and grid alignment settings.
        settings: MoverSettings,
    },
    /// Replaces the level bookkeeping handed to subsequently spawned heads.
    ConfigureLevel {
        /// Scene, level and validator information.
        level: LevelConfig,
    },
    /// Inserts a cell into the occupancy store if the coordinate is free.
    PlaceCell {
        /// Grid coordinate that keys the cell.
        cell: GridCoord,
        /// Continuous position used by presentation layers.
        world_position: Vec3,
        /// Whether the cell is a static wall or a body segment.
        kind: CellKind,
    },
    /// Removes the cell stored at the provided coordinate, if any.
    RemoveCell {
        /// Grid coordinate of the cell to remove.
        cell: GridCoord,
    },
    /// Places the head on the provided cell, replacing any existing head.
    SpawnHead {
        /// Cell the head starts on.
        cell: GridCoord,
    },
    /// Asks the head to start travelling in the provided direction.
    RequestDirection {
        /// Requested cardinal direction.
        direction: Direction,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the session transition to the provided state.
    SetGameState {
        /// State the session should enter.
        state: GameState,
    },
    /// Clears the body trail and returns the head to its spawn cell.
    ResetLevel,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a cell was inserted into the occupancy store.
    CellPlaced {
        /// Coordinate of the inserted cell.
        cell: GridCoord,
        /// Kind of the inserted cell.
        kind: CellKind,
    },
    /// Confirms that a cell was removed from the occupancy store.
    CellRemoved {
        /// Coordinate of the removed cell.
        cell: GridCoord,
        /// Kind of the removed cell.
        kind: CellKind,
    },
    /// Confirms that the head was placed on the grid.
    HeadSpawned {
        /// Cell the head occupies after spawning.
        cell: GridCoord,
    },
    /// Reports that the head committed to a new travel direction.
    HeadDirectionChanged {
        /// Direction that became active.
        direction: Direction,
    },
    /// Reports that the head left an idle stop and started travelling.
    HeadMoveStarted {
        /// Cell the head was resting on.
        from: GridCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// Reports that the head is leaving a cell, which becomes part of the trail.
    HeadDepartedCell {
        /// Cell the head is leaving.
        cell: GridCoord,
    },
    /// Reports that the head reached the centre of a cell.
    HeadArrived {
        /// Cell the head arrived on.
        cell: GridCoord,
    },
    /// Reports that the head ran into an obstacle.
    HeadCollided {
        /// Geometry and force of the collision.
        record: CollisionRecord,
    },
    /// Reports that the head came to rest.
    HeadStopped {
        /// Cell the head rests on.
        cell: GridCoord,
    },
    /// Announces that the head has no free neighbour left.
    LevelCompleted {
        /// Statistics describing the finished level.
        result: LevelResult,
    },
    /// Announces that the session entered a new state.
    GameStateChanged {
        /// State that became active.
        state: GameState,
    },
    /// Confirms that the body trail was cleared and the head respawned.
    LevelReset,
}

/// Location of a single grid cell expressed as signed x and y coordinates.
///
/// Grid `y` maps onto the world `z` axis; the world `y` axis is vertical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    x: i32,
    y: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal component of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical component of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the coordinate shifted by the provided amounts.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Returns the adjacent coordinate in the provided direction.
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// Component-wise difference `other - self`.
    #[must_use]
    pub const fn delta_to(self, other: GridCoord) -> (i32, i32) {
        (
            other.x.saturating_sub(self.x),
            other.y.saturating_sub(self.y),
        )
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Cardinal directions available to the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward increasing `y` (world `+z`).
    Up,
    /// Movement toward decreasing `y` (world `-z`).
    Down,
    /// Movement toward decreasing `x`.
    Left,
    /// Movement toward increasing `x`.
    Right,
}

impl Direction {
    /// Every cardinal direction in the order used for neighbour scans.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit grid step associated with the direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Unit world-space vector on the horizontal plane.
    #[must_use]
    pub fn to_world(self) -> Vec3 {
        let (dx, dy) = self.delta();
        Vec3::new(dx as f32, 0.0, dy as f32)
    }

    /// Parses a single compass or arrow letter (`N/U`, `S/D`, `W/L`, `E/R`).
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'N' | 'U' => Some(Self::Up),
            'S' | 'D' => Some(Self::Down),
            'W' | 'L' => Some(Self::Left),
            'E' | 'R' => Some(Self::Right),
            _ => None,
        }
    }
}

/// Category of an occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Static obstacle placed when the map is generated.
    Wall,
    /// Trail segment left behind by the moving head.
    Body,
}

/// Metadata stored for a single occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Coordinate that keys the record in the occupancy store.
    pub coordinate: GridCoord,
    /// Continuous position used for rendering.
    pub world_position: Vec3,
    /// Kind of obstacle the cell represents.
    pub kind: CellKind,
}

/// Side of the obstacle that the head struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionSide {
    /// The obstacle lies one cell toward `+y`.
    Top,
    /// The obstacle lies one cell toward `-y`.
    Bottom,
    /// The obstacle lies one cell toward `-x`.
    Left,
    /// The obstacle lies one cell toward `+x`.
    Right,
}

/// Immutable description of a single head collision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    /// Cell the head occupied at impact.
    pub head: GridCoord,
    /// Cell holding the obstacle.
    pub obstacle: GridCoord,
    /// Impact force derived from mass, speed and tick duration.
    pub force: f32,
    /// Side of the obstacle that was struck.
    pub side: CollisionSide,
    /// Record of the obstructing cell.
    pub obstructing_cell: CellRecord,
    /// Set when the side could not be derived and fell back to the default.
    pub side_defaulted: bool,
}

/// Threshold test deciding whether a level counts as completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelValidator {
    required_fill_count: usize,
}

impl LevelValidator {
    /// Number of cells a level requires by default.
    pub const DEFAULT_REQUIRED_FILL: usize = 9;

    /// Creates a validator requiring the provided number of visited cells.
    #[must_use]
    pub const fn new(required_fill_count: usize) -> Self {
        Self {
            required_fill_count,
        }
    }

    /// Number of distinct visited cells required for completion.
    #[must_use]
    pub const fn required_fill_count(&self) -> usize {
        self.required_fill_count
    }

    /// Reports whether `filled` cells satisfy the threshold.
    #[must_use]
    pub const fn is_complete(&self, filled: usize) -> bool {
        filled >= self.required_fill_count
    }
}

impl Default for LevelValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REQUIRED_FILL)
    }
}

/// Scene and level bookkeeping attached to every level result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Index of the scene hosting the level.
    pub scene_index: u32,
    /// Index of the level within the campaign.
    pub level_index: u32,
    /// Validator used to decide completion.
    pub validator: LevelValidator,
}

/// Immutable summary produced once when a level ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    /// Index of the scene hosting the level.
    pub scene_index: u32,
    /// Index of the level within the campaign.
    pub level_index: u32,
    /// Cell the head rested on when the level ended.
    pub final_coord: GridCoord,
    /// Total time the head spent moving.
    pub elapsed: Duration,
    /// Number of distinct cells recorded in the path history.
    pub path_length: usize,
    /// Whether the fill threshold was met.
    pub complete: bool,
    /// Validator that produced the completion flag.
    pub validator: LevelValidator,
}

/// Tuning for head movement and grid alignment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoverSettings {
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Mass used when computing collision force.
    pub mass: f32,
    /// Side length of a grid cell in world units.
    pub cell_size: f32,
    /// Alignment offset; its `y` component fixes the vertical height.
    pub grid_offset: Vec3,
    /// Distance below which the head counts as having reached its target.
    pub arrival_epsilon: f32,
}

impl MoverSettings {
    /// Grid alignment derived from the cell size and offset.
    #[must_use]
    pub const fn alignment(&self) -> GridAlignment {
        GridAlignment::new(self.cell_size, self.grid_offset)
    }
}

impl Default for MoverSettings {
    fn default() -> Self {
        Self {
            speed: 5.0,
            mass: 1.0,
            cell_size: 1.0,
            grid_offset: Vec3::ZERO,
            arrival_epsilon: 0.01,
        }
    }
}

/// Converts between continuous world positions and grid coordinates.
///
/// Only the horizontal `x`/`z` plane is snapped; the vertical axis is pinned
/// to the offset's `y` component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridAlignment {
    cell_size: f32,
    offset: Vec3,
}

impl GridAlignment {
    /// Creates an alignment for the provided cell size and offset.
    #[must_use]
    pub const fn new(cell_size: f32, offset: Vec3) -> Self {
        Self { cell_size, offset }
    }

    /// Side length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Snaps a world position to the centre of the nearest cell.
    #[must_use]
    pub fn align(&self, position: Vec3) -> Vec3 {
        self.to_world(self.to_coord(position))
    }

    /// Grid coordinate of the cell nearest to the provided position.
    #[must_use]
    pub fn to_coord(&self, position: Vec3) -> GridCoord {
        if self.cell_size <= 0.0 {
            return GridCoord::new(0, 0);
        }
        let local = position - self.offset;
        GridCoord::new(
            (local.x / self.cell_size).round() as i32,
            (local.z / self.cell_size).round() as i32,
        )
    }

    /// World position of the centre of the provided cell.
    #[must_use]
    pub fn to_world(&self, coord: GridCoord) -> Vec3 {
        Vec3::new(
            coord.x() as f32 * self.cell_size + self.offset.x,
            self.offset.y,
            coord.y() as f32 * self.cell_size + self.offset.z,
        )
    }
}

/// Lifecycle phase of the head state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeadPhase {
    /// Resting on a cell and accepting direction requests.
    Idle,
    /// Travelling toward a target cell with the direction locked.
    Moving,
    /// No free neighbour remains; the head ignores further input.
    LevelComplete,
}

/// Reasons a direction request may be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No head has been spawned yet.
    NoHead,
    /// The session is not in [`GameState::Playing`].
    NotPlaying,
    /// The head is travelling and cannot change direction mid-cell.
    Moving,
    /// The adjacent cell in the requested direction is occupied.
    Blocked,
    /// The level already completed.
    LevelComplete,
}

/// Immutable representation of the head used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadSnapshot {
    /// Continuous position of the head.
    pub position: Vec3,
    /// Grid cell nearest to the head.
    pub cell: GridCoord,
    /// Active travel direction, if any.
    pub direction: Option<Direction>,
    /// Current phase of the state machine.
    pub phase: HeadPhase,
    /// Speed measured over the last tick.
    pub current_speed: f32,
    /// Total time spent moving.
    pub elapsed: Duration,
    /// Cells visited so far in arrival order.
    pub path: Vec<GridCoord>,
}

/// Read-only access to grid obstacles.
pub trait ObstacleQuery {
    /// Returns the record of the obstacle stored at the provided cell, if any.
    fn obstacle(&self, cell: GridCoord) -> Option<CellRecord>;

    /// Returns the kind of obstacle stored at the provided cell, if any.
    fn obstacle_at(&self, cell: GridCoord) -> Option<CellKind> {
        self.obstacle(cell).map(|record| record.kind)
    }

    /// Reports whether the cell holds an obstacle of any kind.
    fn is_occupied(&self, cell: GridCoord) -> bool {
        self.obstacle(cell).is_some()
    }
}

/// Presentation hook that materialises and discards cells.
pub trait CellSpawner {
    /// Opaque handle identifying a spawned cell.
    type Handle;

    /// Materialises a cell and returns a handle for later removal.
    fn spawn(&mut self, cell: GridCoord, kind: CellKind) -> Self::Handle;

    /// Discards a previously spawned cell.
    fn despawn(&mut self, handle: Self::Handle);
}

#[cfg(test)]
mod tests {
    use super::{
        CellKind, CollisionSide, Direction, GameState, GridAlignment, GridCoord, LevelValidator,
    };
    use glam::Vec3;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = GridCoord::new(-1, 1);
        let destination = GridCoord::new(2, -3);
        assert_eq!(origin.manhattan_distance(destination), 7);
        assert_eq!(destination.manhattan_distance(origin), 7);
    }

    #[test]
    fn neighbor_follows_direction_delta() {
        let origin = GridCoord::new(3, 3);
        assert_eq!(origin.neighbor(Direction::Up), GridCoord::new(3, 4));
        assert_eq!(origin.neighbor(Direction::Down), GridCoord::new(3, 2));
        assert_eq!(origin.neighbor(Direction::Left), GridCoord::new(2, 3));
        assert_eq!(origin.neighbor(Direction::Right), GridCoord::new(4, 3));
        assert_eq!(origin.delta_to(GridCoord::new(4, 3)), (1, 0));
    }

    #[test]
    fn alignment_rounds_horizontal_plane_and_pins_height() {
        let alignment = GridAlignment::new(1.0, Vec3::new(0.0, 0.5, 0.0));
        let aligned = alignment.align(Vec3::new(2.4, 7.0, -0.6));
        assert_eq!(aligned, Vec3::new(2.0, 0.5, -1.0));
        assert_eq!(
            alignment.to_coord(Vec3::new(2.4, 7.0, -0.6)),
            GridCoord::new(2, -1)
        );
    }

    #[test]
    fn alignment_respects_cell_size() {
        let alignment = GridAlignment::new(2.0, Vec3::ZERO);
        assert_eq!(
            alignment.to_coord(Vec3::new(3.1, 0.0, 4.9)),
            GridCoord::new(2, 2)
        );
        assert_eq!(
            alignment.to_world(GridCoord::new(2, 2)),
            Vec3::new(4.0, 0.0, 4.0)
        );
    }

    #[test]
    fn validator_uses_inclusive_threshold() {
        let validator = LevelValidator::new(9);
        assert!(validator.is_complete(9));
        assert!(!validator.is_complete(8));
        assert_eq!(LevelValidator::default().required_fill_count(), 9);
    }

    #[test]
    fn direction_letters_parse() {
        assert_eq!(Direction::from_letter('n'), Some(Direction::Up));
        assert_eq!(Direction::from_letter('R'), Some(Direction::Right));
        assert_eq!(Direction::from_letter('x'), None);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn value_types_round_trip_through_bincode() {
        assert_round_trip(&GridCoord::new(-4, 9));
        assert_round_trip(&CellKind::Body);
        assert_round_trip(&CollisionSide::Left);
        assert_round_trip(&GameState::ReloadingScene);
        assert_round_trip(&LevelValidator::new(12));
    }
}
