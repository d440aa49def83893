//! `grower.toml` loading and validation.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use glam::Vec3;
use grower_core::{Direction, GridCoord, LevelConfig, LevelValidator, MoverSettings};
use grower_rendering::{Glyphs, RenderingError};
use grower_system_generation::GenerationSettings;
use grower_system_input::{Autopilot, SwipeSettings};
use serde::Deserialize;
use thiserror::Error;

/// Raw configuration file contents. Every field falls back to a default.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GrowerConfig {
    pub(crate) generation: GenerationSection,
    pub(crate) mover: MoverSection,
    pub(crate) level: LevelSection,
    pub(crate) input: InputSection,
    pub(crate) session: SessionSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GenerationSection {
    pub(crate) map_size: u32,
    pub(crate) centered: bool,
    pub(crate) offset: [i32; 2],
    pub(crate) paths: u32,
    pub(crate) seed: u64,
    pub(crate) cell_size: f32,
    pub(crate) retry_cap: u32,
}

impl Default for GenerationSection {
    fn default() -> Self {
        let settings = GenerationSettings::default();
        Self {
            map_size: settings.map_size,
            centered: settings.centered,
            offset: [settings.offset.x(), settings.offset.y()],
            paths: settings.number_of_paths,
            seed: settings.seed,
            cell_size: settings.cell_size,
            retry_cap: settings.retry_cap,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MoverSection {
    pub(crate) speed: f32,
    pub(crate) mass: f32,
    pub(crate) height: f32,
    pub(crate) arrival_epsilon: f32,
}

impl Default for MoverSection {
    fn default() -> Self {
        let settings = MoverSettings::default();
        Self {
            speed: settings.speed,
            mass: settings.mass,
            height: settings.grid_offset.y,
            arrival_epsilon: settings.arrival_epsilon,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LevelSection {
    pub(crate) required_fill: usize,
    pub(crate) scene_count: u32,
}

impl Default for LevelSection {
    fn default() -> Self {
        Self {
            required_fill: LevelValidator::DEFAULT_REQUIRED_FILL,
            scene_count: 3,
        }
    }
}

/// Name of the input strategy selected in `[input]`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StrategyName {
    Keyboard,
    Swipe,
    Scripted,
    #[default]
    Autopilot,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct InputSection {
    pub(crate) strategy: StrategyName,
    pub(crate) moves: String,
    pub(crate) threshold: f32,
    pub(crate) swipe_min_distance: f32,
    pub(crate) swipe_max_duration: f32,
    pub(crate) swipe_dot_threshold: f32,
    pub(crate) lookahead: u32,
}

impl Default for InputSection {
    fn default() -> Self {
        let swipe = SwipeSettings::default();
        Self {
            strategy: StrategyName::default(),
            moves: String::new(),
            threshold: grower_system_input::DEFAULT_CARDINAL_THRESHOLD,
            swipe_min_distance: swipe.min_distance,
            swipe_max_duration: swipe.max_duration,
            swipe_dot_threshold: swipe.dot_threshold,
            lookahead: Autopilot::default().lookahead(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionSection {
    pub(crate) levels: u32,
    pub(crate) tick_ms: u64,
    pub(crate) max_ticks: u64,
    pub(crate) idle_ticks: u64,
    pub(crate) glyphs: String,
    pub(crate) render: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            levels: 1,
            tick_ms: 20,
            max_ticks: 5_000,
            idle_ticks: 50,
            glyphs: "#o@.".to_string(),
            render: true,
        }
    }
}

/// Values that parse as TOML but cannot drive a session.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum ConfigError {
    #[error("`{field}` must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("`{field}` must lie within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("`{field}` must be at least 1")]
    Zero { field: &'static str },
    #[error("`{value}` is not a direction letter (use N, S, E, W or U, D, L, R)")]
    UnknownMove { value: char },
    #[error("the scripted strategy needs at least one move")]
    EmptyScript,
    #[error("invalid glyphs: {0}")]
    Glyphs(RenderingError),
}

/// Input strategy with validated parameters.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum StrategyConfig {
    Keyboard { moves: Vec<Direction>, threshold: f32 },
    Swipe { moves: Vec<Direction>, settings: SwipeSettings },
    Scripted(Vec<Direction>),
    Autopilot(Autopilot),
}

/// Settings that passed validation, expressed in domain types.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ValidatedConfig {
    pub(crate) generation: GenerationSettings,
    pub(crate) mover: MoverSettings,
    pub(crate) level: LevelConfig,
    pub(crate) scene_count: u32,
    pub(crate) strategy: StrategyConfig,
    pub(crate) levels: u32,
    pub(crate) tick: Duration,
    pub(crate) max_ticks: u64,
    pub(crate) idle_ticks: u64,
    pub(crate) glyphs: Glyphs,
    pub(crate) render: bool,
}

impl GrowerConfig {
    /// Reads and parses a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Parses configuration text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid grower.toml contents")
    }

    /// Converts raw values into domain settings.
    pub(crate) fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let generation = &self.generation;
        if generation.map_size == 0 {
            return Err(ConfigError::Zero {
                field: "generation.map_size",
            });
        }
        positive("generation.cell_size", generation.cell_size)?;

        let mover = &self.mover;
        positive("mover.speed", mover.speed)?;
        positive("mover.mass", mover.mass)?;
        positive("mover.arrival_epsilon", mover.arrival_epsilon)?;
        if !mover.height.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "mover.height",
                value: mover.height,
            });
        }

        if self.level.scene_count == 0 {
            return Err(ConfigError::Zero {
                field: "level.scene_count",
            });
        }
        if self.session.levels == 0 {
            return Err(ConfigError::Zero {
                field: "session.levels",
            });
        }
        if self.session.tick_ms == 0 {
            return Err(ConfigError::Zero {
                field: "session.tick_ms",
            });
        }

        let glyphs = Glyphs::parse(&self.session.glyphs).map_err(ConfigError::Glyphs)?;
        let strategy = self.input.validate()?;

        Ok(ValidatedConfig {
            generation: GenerationSettings {
                map_size: generation.map_size,
                centered: generation.centered,
                offset: GridCoord::new(generation.offset[0], generation.offset[1]),
                number_of_paths: generation.paths,
                seed: generation.seed,
                cell_size: generation.cell_size,
                retry_cap: generation.retry_cap,
            },
            mover: MoverSettings {
                speed: mover.speed,
                mass: mover.mass,
                cell_size: generation.cell_size,
                grid_offset: Vec3::new(0.0, mover.height, 0.0),
                arrival_epsilon: mover.arrival_epsilon,
            },
            level: LevelConfig {
                validator: LevelValidator::new(self.level.required_fill),
                ..LevelConfig::default()
            },
            scene_count: self.level.scene_count,
            strategy,
            levels: self.session.levels,
            tick: Duration::from_millis(self.session.tick_ms),
            max_ticks: self.session.max_ticks,
            idle_ticks: self.session.idle_ticks,
            glyphs,
            render: self.session.render,
        })
    }
}

impl InputSection {
    fn validate(&self) -> Result<StrategyConfig, ConfigError> {
        let moves = parse_moves(&self.moves)?;
        Ok(match self.strategy {
            StrategyName::Keyboard => {
                positive("input.threshold", self.threshold)?;
                StrategyConfig::Keyboard {
                    moves,
                    threshold: self.threshold,
                }
            }
            StrategyName::Swipe => {
                positive("input.swipe_min_distance", self.swipe_min_distance)?;
                positive("input.swipe_max_duration", self.swipe_max_duration)?;
                if !(0.0..=1.0).contains(&self.swipe_dot_threshold) {
                    return Err(ConfigError::OutOfUnitRange {
                        field: "input.swipe_dot_threshold",
                        value: self.swipe_dot_threshold,
                    });
                }
                StrategyConfig::Swipe {
                    moves,
                    settings: SwipeSettings {
                        min_distance: self.swipe_min_distance,
                        max_duration: self.swipe_max_duration,
                        dot_threshold: self.swipe_dot_threshold,
                    },
                }
            }
            StrategyName::Scripted => {
                if moves.is_empty() {
                    return Err(ConfigError::EmptyScript);
                }
                StrategyConfig::Scripted(moves)
            }
            StrategyName::Autopilot => {
                if self.lookahead == 0 {
                    return Err(ConfigError::Zero {
                        field: "input.lookahead",
                    });
                }
                StrategyConfig::Autopilot(Autopilot::new(self.lookahead))
            }
        })
    }
}

/// Parses a move list such as `"NNE W"`; whitespace and commas are ignored.
pub(crate) fn parse_moves(moves: &str) -> Result<Vec<Direction>, ConfigError> {
    moves
        .chars()
        .filter(|letter| !letter.is_whitespace() && *letter != ',')
        .map(|letter| {
            Direction::from_letter(letter).ok_or(ConfigError::UnknownMove { value: letter })
        })
        .collect()
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}
