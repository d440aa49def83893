#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid-locked head movement state machine.
//!
//! The head rests on a cell until a direction is accepted, then slides cell by
//! cell in that direction until the next cell is occupied. Obstacles are read
//! through [`ObstacleQuery`]; the mover never writes to the grid. Cells the
//! head leaves are announced with [`Event::HeadDepartedCell`] so the owner of
//! the grid can grow the body trail.

use std::time::Duration;

use glam::Vec3;
use grower_core::{
    Direction, Event, GridAlignment, GridCoord, HeadPhase, HeadSnapshot, LevelConfig,
    MoverSettings, ObstacleQuery, RejectReason,
};
use grower_system_reporting::{build_collision_record, build_level_result, Impact};
use tracing::{debug, info};

/// Mutable state tracked for the head between ticks.
#[derive(Clone, Debug, PartialEq)]
pub struct MoverState {
    /// Continuous position of the head.
    pub position: Vec3,
    /// Direction of travel, `None` while resting.
    pub current_direction: Option<Direction>,
    /// Centre of the cell the head is travelling toward.
    pub target_position: Vec3,
    /// Whether the head is travelling.
    pub is_moving: bool,
    /// Whether a new direction may be committed. Always `!is_moving`.
    pub can_change_direction: bool,
    /// Configured travel speed.
    pub speed: f32,
    /// Configured mass.
    pub mass: f32,
    /// Speed measured over the most recent tick.
    pub current_speed: f32,
    /// Total time spent travelling.
    pub elapsed: Duration,
    /// Distinct cells visited, in arrival order.
    pub path_history: Vec<GridCoord>,
}

impl MoverState {
    fn resting_at(position: Vec3, settings: &MoverSettings) -> Self {
        Self {
            position,
            current_direction: None,
            target_position: position,
            is_moving: false,
            can_change_direction: true,
            speed: settings.speed,
            mass: settings.mass,
            current_speed: 0.0,
            elapsed: Duration::ZERO,
            path_history: Vec::new(),
        }
    }

    /// Unit world vector of the active direction, zero while resting.
    #[must_use]
    pub fn direction_vector(&self) -> Vec3 {
        self.current_direction
            .map_or(Vec3::ZERO, Direction::to_world)
    }
}

/// State machine driving the single head entity.
#[derive(Clone, Debug)]
pub struct HeadMover {
    settings: MoverSettings,
    alignment: GridAlignment,
    level: LevelConfig,
    spawn: GridCoord,
    state: MoverState,
    phase: HeadPhase,
    last_direction: Option<Direction>,
    level_reported: bool,
}

impl HeadMover {
    /// Creates a head resting on the provided spawn cell.
    #[must_use]
    pub fn new(settings: MoverSettings, level: LevelConfig, spawn: GridCoord) -> Self {
        let alignment = settings.alignment();
        let position = alignment.to_world(spawn);
        Self {
            state: MoverState::resting_at(position, &settings),
            settings,
            alignment,
            level,
            spawn,
            phase: HeadPhase::Idle,
            last_direction: None,
            level_reported: false,
        }
    }

    /// Settings the head was created with.
    #[must_use]
    pub const fn settings(&self) -> &MoverSettings {
        &self.settings
    }

    /// Level bookkeeping used for the level result.
    #[must_use]
    pub const fn level(&self) -> &LevelConfig {
        &self.level
    }

    /// Cell the head spawned on.
    #[must_use]
    pub const fn spawn_cell(&self) -> GridCoord {
        self.spawn
    }

    /// Read-only access to the movement state.
    #[must_use]
    pub const fn state(&self) -> &MoverState {
        &self.state
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> HeadPhase {
        self.phase
    }

    /// Grid cell nearest to the head.
    #[must_use]
    pub fn cell(&self) -> GridCoord {
        self.alignment.to_coord(self.state.position)
    }

    /// Captures an immutable snapshot for queries.
    #[must_use]
    pub fn snapshot(&self) -> HeadSnapshot {
        HeadSnapshot {
            position: self.state.position,
            cell: self.cell(),
            direction: self.state.current_direction,
            phase: self.phase,
            current_speed: self.state.current_speed,
            elapsed: self.state.elapsed,
            path: self.state.path_history.clone(),
        }
    }

    /// Attempts to start travelling in `direction`.
    ///
    /// Accepted only while idle and when the adjacent cell is free. Rejected
    /// requests leave the state untouched.
    pub fn request<O>(
        &mut self,
        direction: Direction,
        obstacles: &O,
        out: &mut Vec<Event>,
    ) -> Result<(), RejectReason>
    where
        O: ObstacleQuery + ?Sized,
    {
        match self.phase {
            HeadPhase::LevelComplete => return Err(RejectReason::LevelComplete),
            HeadPhase::Moving => return Err(RejectReason::Moving),
            HeadPhase::Idle => {}
        }

        let from = self.cell();
        let next = from.neighbor(direction);
        if obstacles.is_occupied(next) {
            debug!(?from, ?direction, "direction blocked by adjacent obstacle");
            return Err(RejectReason::Blocked);
        }

        if self.last_direction != Some(direction) {
            self.last_direction = Some(direction);
            out.push(Event::HeadDirectionChanged { direction });
        }

        self.state.current_direction = Some(direction);
        self.state.target_position = self.alignment.to_world(next);
        self.set_moving(true);
        self.phase = HeadPhase::Moving;

        out.push(Event::HeadMoveStarted { from, direction });
        out.push(Event::HeadDepartedCell { cell: from });
        Ok(())
    }

    /// Advances the head by one fixed tick.
    ///
    /// Travel left over after reaching a cell carries into the next one, so
    /// the head covers `speed * dt` per tick until it stops.
    pub fn advance<O>(&mut self, dt: Duration, obstacles: &O, out: &mut Vec<Event>)
    where
        O: ObstacleQuery + ?Sized,
    {
        if self.phase != HeadPhase::Moving {
            return;
        }

        let seconds = dt.as_secs_f32();
        let impact = Impact {
            speed_before: self.impact_speed(),
            mass: self.state.mass,
            tick: dt,
        };
        self.state.elapsed = self.state.elapsed.saturating_add(dt);

        let mut budget = self.state.speed * seconds;
        let mut travelled = 0.0;
        loop {
            let previous = self.state.position;
            self.state.position = move_towards(previous, self.state.target_position, budget);
            let moved = previous.distance(self.state.position);
            travelled += moved;
            budget -= moved;

            if self.state.position.distance(self.state.target_position)
                > self.settings.arrival_epsilon
            {
                break;
            }
            if !self.arrive(impact, obstacles, out) || budget <= 0.0 {
                break;
            }
        }

        self.state.current_speed = if self.phase == HeadPhase::Moving && seconds > 0.0 {
            travelled / seconds
        } else {
            0.0
        };
    }

    /// Speed carried into an impact: the previous tick's measurement, or the
    /// configured speed on the first tick of a move.
    fn impact_speed(&self) -> f32 {
        if self.state.current_speed > 0.0 {
            self.state.current_speed
        } else {
            self.state.speed
        }
    }

    /// Reports whether any cardinal neighbour of the head is free.
    #[must_use]
    pub fn has_valid_moves<O>(&self, obstacles: &O) -> bool
    where
        O: ObstacleQuery + ?Sized,
    {
        let cell = self.cell();
        Direction::ALL
            .iter()
            .any(|direction| !obstacles.is_occupied(cell.neighbor(*direction)))
    }

    /// Returns the head to its spawn cell with an empty history.
    pub fn reset(&mut self) {
        let position = self.alignment.to_world(self.spawn);
        self.state = MoverState::resting_at(position, &self.settings);
        self.phase = HeadPhase::Idle;
        self.last_direction = None;
        self.level_reported = false;
    }

    /// Handles reaching the target cell. Returns whether the head keeps going.
    fn arrive<O>(&mut self, impact: Impact, obstacles: &O, out: &mut Vec<Event>) -> bool
    where
        O: ObstacleQuery + ?Sized,
    {
        self.state.position = self.alignment.align(self.state.position);
        let cell = self.cell();
        if self.state.path_history.last() != Some(&cell) {
            self.state.path_history.push(cell);
        }
        out.push(Event::HeadArrived { cell });

        let Some(direction) = self.state.current_direction else {
            self.stop(obstacles, out);
            return false;
        };

        let next = cell.neighbor(direction);
        match obstacles.obstacle(next) {
            Some(obstructing_cell) => {
                let record = build_collision_record(cell, obstructing_cell, impact);
                out.push(Event::HeadCollided { record });
                self.stop(obstacles, out);
                false
            }
            None => {
                out.push(Event::HeadDepartedCell { cell });
                self.state.target_position = self.alignment.to_world(next);
                true
            }
        }
    }

    fn stop<O>(&mut self, obstacles: &O, out: &mut Vec<Event>)
    where
        O: ObstacleQuery + ?Sized,
    {
        self.set_moving(false);
        self.state.current_direction = None;
        self.state.position = self.alignment.align(self.state.position);
        self.state.target_position = self.state.position;
        self.phase = HeadPhase::Idle;

        let cell = self.cell();
        out.push(Event::HeadStopped { cell });

        if !self.has_valid_moves(obstacles) {
            self.complete_level(out);
        }
    }

    fn complete_level(&mut self, out: &mut Vec<Event>) {
        self.phase = HeadPhase::LevelComplete;
        if self.level_reported {
            return;
        }
        self.level_reported = true;

        let result = build_level_result(
            &self.level,
            self.cell(),
            self.state.elapsed,
            self.state.path_history.len(),
        );
        info!(
            path_length = result.path_length,
            complete = result.complete,
            "no free neighbour left; level finished"
        );
        out.push(Event::LevelCompleted { result });
    }

    fn set_moving(&mut self, moving: bool) {
        self.state.is_moving = moving;
        self.state.can_change_direction = !moving;
    }
}

fn move_towards(current: Vec3, target: Vec3, max_distance: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_distance || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_towards_clamps_at_target() {
        let start = Vec3::ZERO;
        let target = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(move_towards(start, target, 0.25), Vec3::new(0.25, 0.0, 0.0));
        assert_eq!(move_towards(start, target, 3.0), target);
    }

    #[test]
    fn spawn_is_aligned_and_idle() {
        let mover = HeadMover::new(
            MoverSettings::default(),
            LevelConfig::default(),
            GridCoord::new(2, -1),
        );
        assert_eq!(mover.cell(), GridCoord::new(2, -1));
        assert_eq!(mover.phase(), HeadPhase::Idle);
        assert!(mover.state().can_change_direction);
        assert!(!mover.state().is_moving);
        assert_eq!(mover.state().direction_vector(), Vec3::ZERO);
    }
}
