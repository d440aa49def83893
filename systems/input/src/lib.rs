#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure input system translating raw player signals into direction requests.

mod swipe;

use std::collections::VecDeque;

use glam::Vec2;
use grower_core::{
    Command, Direction, Event, GameState, GridCoord, HeadPhase, HeadSnapshot, ObstacleQuery,
};
use tracing::debug;

pub use swipe::{SwipeDetector, SwipeSettings};

/// Magnitude below which an input vector counts as no input.
pub const DEFAULT_CARDINAL_THRESHOLD: f32 = 0.1;

/// Collapses a 2D vector onto its dominant cardinal axis.
///
/// Returns `None` when the vector is shorter than `threshold`. Equal axis
/// magnitudes resolve to the vertical axis.
#[must_use]
pub fn cardinal_from_vector(vector: Vec2, threshold: f32) -> Option<Direction> {
    if vector == Vec2::ZERO || vector.length() < threshold {
        return None;
    }
    if vector.x.abs() > vector.y.abs() {
        Some(if vector.x > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        })
    } else {
        Some(if vector.y > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        })
    }
}

/// Normalised movement vector for a set of held direction keys.
#[must_use]
pub fn keyboard_vector(left: bool, right: bool, up: bool, down: bool) -> Vec2 {
    let axis = |negative: bool, positive: bool| {
        f32::from(u8::from(positive)) - f32::from(u8::from(negative))
    };
    Vec2::new(axis(left, right), axis(down, up)).normalize_or_zero()
}

/// Chooses directions without a player by following the longest open run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Autopilot {
    lookahead: u32,
}

impl Autopilot {
    /// Creates an autopilot that scans at most `lookahead` cells per direction.
    #[must_use]
    pub const fn new(lookahead: u32) -> Self {
        Self { lookahead }
    }

    /// Maximum number of cells scanned in each direction.
    #[must_use]
    pub const fn lookahead(&self) -> u32 {
        self.lookahead
    }

    /// Picks the free direction with the longest straight run from `head`.
    ///
    /// Ties keep the earliest direction in [`Direction::ALL`]; `None` when
    /// every neighbour is blocked.
    #[must_use]
    pub fn choose<O>(&self, head: GridCoord, obstacles: &O) -> Option<Direction>
    where
        O: ObstacleQuery + ?Sized,
    {
        let mut best: Option<(Direction, u32)> = None;
        for direction in Direction::ALL {
            let run = self.free_run(head, direction, obstacles);
            if run == 0 {
                continue;
            }
            if best.map_or(true, |(_, longest)| run > longest) {
                best = Some((direction, run));
            }
        }
        best.map(|(direction, _)| direction)
    }

    fn free_run<O>(&self, head: GridCoord, direction: Direction, obstacles: &O) -> u32
    where
        O: ObstacleQuery + ?Sized,
    {
        let mut run = 0;
        let mut cell = head.neighbor(direction);
        while run < self.lookahead && !obstacles.is_occupied(cell) {
            run += 1;
            cell = cell.neighbor(direction);
        }
        run
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Source of direction decisions.
#[derive(Clone, Debug, PartialEq)]
pub enum InputStrategy {
    /// Held keys collapsed onto the dominant axis.
    Keyboard,
    /// Pointer presses classified as swipes.
    Swipe(SwipeSettings),
    /// A fixed list of moves replayed one per stop.
    Scripted(Vec<Direction>),
    /// Moves chosen by [`Autopilot`].
    Autopilot(Autopilot),
}

/// Raw signal sampled from a device for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputSignal {
    /// Current state of the four direction keys.
    Keys {
        /// Left key held.
        left: bool,
        /// Right key held.
        right: bool,
        /// Up key held.
        up: bool,
        /// Down key held.
        down: bool,
    },
    /// A pointer or touch went down.
    PointerDown {
        /// Screen position of the press.
        position: Vec2,
        /// Time of the press in seconds.
        time: f32,
    },
    /// A pointer or touch was released.
    PointerUp {
        /// Screen position of the release.
        position: Vec2,
        /// Time of the release in seconds.
        time: f32,
    },
}

/// Pure system that turns input into [`Command::RequestDirection`] values.
#[derive(Debug)]
pub struct Input {
    strategy: InputKind,
    game_state: GameState,
    threshold: f32,
}

#[derive(Debug)]
enum InputKind {
    Keyboard,
    Swipe(SwipeDetector),
    Scripted(VecDeque<Direction>),
    Autopilot(Autopilot),
}

impl Input {
    /// Creates the input system for the provided strategy.
    #[must_use]
    pub fn new(strategy: InputStrategy) -> Self {
        let strategy = match strategy {
            InputStrategy::Keyboard => InputKind::Keyboard,
            InputStrategy::Swipe(settings) => InputKind::Swipe(SwipeDetector::new(settings)),
            InputStrategy::Scripted(moves) => InputKind::Scripted(moves.into()),
            InputStrategy::Autopilot(autopilot) => InputKind::Autopilot(autopilot),
        };
        Self {
            strategy,
            game_state: GameState::MainMenu,
            threshold: DEFAULT_CARDINAL_THRESHOLD,
        }
    }

    /// Overrides the magnitude below which key vectors are ignored.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Game state last observed through world events.
    #[must_use]
    pub const fn game_state(&self) -> GameState {
        self.game_state
    }

    /// Number of scripted moves not yet issued.
    #[must_use]
    pub fn remaining_script(&self) -> usize {
        match &self.strategy {
            InputKind::Scripted(moves) => moves.len(),
            _ => 0,
        }
    }

    /// Consumes world events and the latest signal to emit direction requests.
    ///
    /// Requests are only produced while the game is [`GameState::Playing`].
    /// Scripted and autopilot moves wait for the head to rest.
    pub fn handle<O>(
        &mut self,
        events: &[Event],
        signal: Option<InputSignal>,
        head: Option<&HeadSnapshot>,
        obstacles: &O,
        out: &mut Vec<Command>,
    ) where
        O: ObstacleQuery + ?Sized,
    {
        for event in events {
            if let Event::GameStateChanged { state } = event {
                self.game_state = *state;
            }
        }

        if self.game_state != GameState::Playing {
            if signal.is_some() {
                debug!(state = ?self.game_state, "input ignored outside play");
            }
            return;
        }

        let resting = head.filter(|snapshot| snapshot.phase == HeadPhase::Idle);
        let direction = match &mut self.strategy {
            InputKind::Keyboard => match signal {
                Some(InputSignal::Keys {
                    left,
                    right,
                    up,
                    down,
                }) => cardinal_from_vector(keyboard_vector(left, right, up, down), self.threshold),
                _ => None,
            },
            InputKind::Swipe(detector) => match signal {
                Some(InputSignal::PointerDown { position, time }) => {
                    detector.begin(position, time);
                    None
                }
                Some(InputSignal::PointerUp { position, time }) => detector.end(position, time),
                _ => None,
            },
            InputKind::Scripted(moves) => resting.and_then(|_| moves.pop_front()),
            InputKind::Autopilot(autopilot) => {
                resting.and_then(|snapshot| autopilot.choose(snapshot.cell, obstacles))
            }
        };

        if let Some(direction) = direction {
            out.push(Command::RequestDirection { direction });
        }
    }
}
