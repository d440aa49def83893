//! Frame loop driving a world through consecutive levels.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use glam::Vec2;
use grower_core::{
    Command, CollisionRecord, Direction, Event, GameState, HeadPhase, HeadSnapshot, LevelResult,
};
use grower_rendering::{CellHandle, CellMirror, FrameSink, TextCanvas};
use grower_system_bootstrap::Bootstrap;
use grower_system_input::{Input, InputSignal, InputStrategy};
use grower_system_reporting::{Broadcaster, SceneValidator};
use grower_world::{apply, query, World};
use tracing::{info, warn};

use crate::config::{StrategyConfig, ValidatedConfig};

/// Why a session stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// The configured number of levels finished.
    LevelsFinished,
    /// The head rested without any new input for too long.
    Stalled,
    /// The tick budget ran out.
    TickLimit,
}

/// Outcome of [`Session::run`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SessionSummary {
    pub(crate) end: SessionEnd,
    pub(crate) results: Vec<LevelResult>,
    pub(crate) ticks: u64,
    pub(crate) collisions: u64,
}

/// Turns a move list into the raw signals a keyboard or touch screen would send.
#[derive(Debug)]
struct ReplayDevice {
    kind: DeviceKind,
    moves: VecDeque<Direction>,
    pending_release: Option<Direction>,
}

#[derive(Clone, Copy, Debug)]
enum DeviceKind {
    Silent,
    Keys,
    Pointer { reach: f32 },
}

impl ReplayDevice {
    fn sample(&mut self, head: Option<&HeadSnapshot>, now: f32) -> Option<InputSignal> {
        match self.kind {
            DeviceKind::Silent => None,
            DeviceKind::Keys => {
                let direction = self.next_move(head)?;
                Some(InputSignal::Keys {
                    left: direction == Direction::Left,
                    right: direction == Direction::Right,
                    up: direction == Direction::Up,
                    down: direction == Direction::Down,
                })
            }
            DeviceKind::Pointer { reach } => {
                if let Some(direction) = self.pending_release.take() {
                    let (dx, dy) = direction.delta();
                    return Some(InputSignal::PointerUp {
                        position: Vec2::new(dx as f32, dy as f32) * reach,
                        time: now,
                    });
                }
                let direction = self.next_move(head)?;
                self.pending_release = Some(direction);
                Some(InputSignal::PointerDown {
                    position: Vec2::ZERO,
                    time: now,
                })
            }
        }
    }

    fn next_move(&mut self, head: Option<&HeadSnapshot>) -> Option<Direction> {
        let _ = head.filter(|snapshot| snapshot.phase == HeadPhase::Idle)?;
        self.moves.pop_front()
    }
}

/// Owns everything needed to play levels back to back.
#[derive(Debug)]
pub(crate) struct Session {
    bootstrap: Bootstrap,
    world: World,
    input: Input,
    device: ReplayDevice,
    scenes: SceneValidator,
    canvas: TextCanvas,
    mirror: CellMirror<CellHandle>,
    collisions: Broadcaster<CollisionRecord>,
    results: Broadcaster<LevelResult>,
    config: ValidatedConfig,
    events: Vec<Event>,
    log: Option<Vec<Event>>,
}

impl Session {
    /// Prepares the first level.
    pub(crate) fn new(config: ValidatedConfig) -> Result<Self> {
        let mut bootstrap = Bootstrap::new(config.generation, config.mover, config.level)
            .context("failed to configure level bootstrap")?;
        let mut events = Vec::new();
        let prepared = bootstrap
            .prepare(config.level.scene_index, &mut events)
            .context("failed to prepare the first level")?;

        let (strategy, device) = input_for(&config.strategy);
        let input = match config.strategy {
            StrategyConfig::Keyboard { threshold, .. } => {
                Input::new(strategy).with_threshold(threshold)
            }
            _ => Input::new(strategy),
        };

        let mut canvas = TextCanvas::new();
        let mut mirror = CellMirror::new();
        mirror.populate(query::store(&prepared.world).iter(), &mut canvas);

        Ok(Self {
            bootstrap,
            world: prepared.world,
            input,
            device,
            scenes: SceneValidator::new(config.scene_count),
            canvas,
            mirror,
            collisions: Broadcaster::new(),
            results: Broadcaster::new(),
            config,
            events,
            log: None,
        })
    }

    /// Keeps a copy of every event for later inspection.
    #[cfg(test)]
    pub(crate) fn record_events(&mut self) {
        self.log = Some(self.events.clone());
    }

    /// Events recorded since [`Session::record_events`] was called.
    #[cfg(test)]
    pub(crate) fn recorded_events(&self) -> &[Event] {
        self.log.as_deref().unwrap_or_default()
    }

    /// Greeting derived from the running world.
    pub(crate) fn banner(&self) -> &str {
        self.bootstrap.welcome_banner(&self.world)
    }

    /// Listeners told about every collision.
    pub(crate) fn collision_listeners(&mut self) -> &mut Broadcaster<CollisionRecord> {
        &mut self.collisions
    }

    /// Listeners told about every finished level.
    pub(crate) fn result_listeners(&mut self) -> &mut Broadcaster<LevelResult> {
        &mut self.results
    }

    /// Runs ticks until the configured levels finish, input dries up or the
    /// tick budget runs out.
    pub(crate) fn run(&mut self, sink: &mut dyn FrameSink) -> Result<SessionSummary> {
        let dt = self.config.tick;
        let mut commands = Vec::new();
        let mut results = Vec::new();
        let mut collisions = 0_u64;
        let mut idle_ticks = 0_u64;
        let mut now = 0.0_f32;
        let mut ticks = 0_u64;

        self.present(sink)?;
        let end = loop {
            if ticks >= self.config.max_ticks {
                warn!(ticks, "tick budget exhausted");
                break SessionEnd::TickLimit;
            }

            let head = query::head(&self.world);
            let signal = self.device.sample(head.as_ref(), now);
            self.input.handle(
                &self.events,
                signal,
                head.as_ref(),
                query::store(&self.world),
                &mut commands,
            );

            let resting = head.map_or(true, |snapshot| snapshot.phase != HeadPhase::Moving);
            if resting && signal.is_none() && commands.is_empty() {
                idle_ticks += 1;
                if idle_ticks > self.config.idle_ticks {
                    warn!(idle_ticks, "no input while the head rests");
                    break SessionEnd::Stalled;
                }
            } else {
                idle_ticks = 0;
            }

            self.events.clear();
            for command in commands.drain(..) {
                apply(&mut self.world, command, &mut self.events);
            }
            apply(&mut self.world, Command::Tick { dt }, &mut self.events);
            ticks += 1;
            now += dt.as_secs_f32();

            self.mirror.handle(&self.events, &mut self.canvas);
            if let Some(log) = &mut self.log {
                log.extend(self.events.iter().cloned());
            }

            let mut stopped = false;
            for event in &self.events {
                match event {
                    Event::HeadCollided { record } => {
                        collisions += 1;
                        let _ = self.collisions.broadcast(record);
                    }
                    Event::LevelCompleted { result } => {
                        let _ = self.results.broadcast(result);
                        results.push(*result);
                    }
                    Event::HeadStopped { .. } => stopped = true,
                    _ => {}
                }
            }
            if stopped {
                self.present(sink)?;
            }

            if query::game_state(&self.world) == GameState::ReloadingScene {
                let Some(result) = results.last().copied() else {
                    break SessionEnd::LevelsFinished;
                };
                if results.len() >= self.config.levels as usize {
                    break SessionEnd::LevelsFinished;
                }
                self.next_level(&result)?;
                self.present(sink)?;
            }
        };

        info!(
            ?end,
            ticks,
            levels = results.len(),
            collisions,
            "session finished"
        );
        Ok(SessionSummary {
            end,
            results,
            ticks,
            collisions,
        })
    }

    fn next_level(&mut self, result: &LevelResult) -> Result<()> {
        let scene = self.scenes.next_scene_index(result);
        info!(
            from = result.scene_index,
            to = scene,
            complete = result.complete,
            "loading next scene"
        );
        self.mirror.clear(&mut self.canvas);
        self.events.clear();
        let prepared = self
            .bootstrap
            .prepare(scene, &mut self.events)
            .with_context(|| format!("failed to prepare scene {scene}"))?;
        self.world = prepared.world;
        self.mirror
            .populate(query::store(&self.world).iter(), &mut self.canvas);
        if let Some(log) = &mut self.log {
            log.extend(self.events.iter().cloned());
        }
        Ok(())
    }

    fn present(&self, sink: &mut dyn FrameSink) -> Result<()> {
        if !self.config.render {
            return Ok(());
        }
        let head = query::head(&self.world).map(|snapshot| snapshot.cell);
        let frame = self.canvas.render(head, &self.config.glyphs);
        sink.present(&frame).context("failed to present frame")
    }
}

fn input_for(strategy: &StrategyConfig) -> (InputStrategy, ReplayDevice) {
    let device = |kind: DeviceKind, moves: &[Direction]| ReplayDevice {
        kind,
        moves: moves.iter().copied().collect(),
        pending_release: None,
    };
    match strategy {
        StrategyConfig::Keyboard { moves, .. } => {
            (InputStrategy::Keyboard, device(DeviceKind::Keys, moves))
        }
        StrategyConfig::Swipe { moves, settings } => (
            InputStrategy::Swipe(*settings),
            device(
                DeviceKind::Pointer {
                    reach: settings.min_distance * 2.0,
                },
                moves,
            ),
        ),
        StrategyConfig::Scripted(moves) => (
            InputStrategy::Scripted(moves.clone()),
            device(DeviceKind::Silent, &[]),
        ),
        StrategyConfig::Autopilot(autopilot) => (
            InputStrategy::Autopilot(*autopilot),
            device(DeviceKind::Silent, &[]),
        ),
    }
}
