#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic map generation for Grower levels.
//!
//! A level starts as a solid square of wall cells. Straight corridors are then
//! carved through the interior, each one starting where the previous one
//! ended, while the outer ring of walls is never touched.

use glam::Vec3;
use grower_core::{CellKind, Direction, GridCoord};
use grower_world::GridStore;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default side length of a generated map.
pub const DEFAULT_MAP_SIZE: u32 = 10;

/// Default bound on failed carve attempts before generation gives up.
pub const DEFAULT_RETRY_CAP: u32 = 32;

/// Smallest map that still has interior cells.
pub const MIN_CARVABLE_SIZE: u32 = 3;

/// Tuning for a single map generation run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationSettings {
    /// Number of cells along each side of the square map.
    pub map_size: u32,
    /// Whether the square is shifted so its centre sits on the origin.
    pub centered: bool,
    /// Additional shift applied to every coordinate.
    pub offset: GridCoord,
    /// Number of corridors carved after the walls are laid.
    pub number_of_paths: u32,
    /// Seed feeding the carve random number generator.
    pub seed: u64,
    /// Side length of a cell in world units.
    pub cell_size: f32,
    /// Number of failed carve attempts tolerated before stopping early.
    pub retry_cap: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            centered: true,
            offset: GridCoord::new(0, 0),
            number_of_paths: 3,
            seed: 0x6772_6f77_6572_0001,
            cell_size: 1.0,
            retry_cap: DEFAULT_RETRY_CAP,
        }
    }
}

/// Configuration problems that prevent a map from being generated.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GenerationError {
    /// The map would contain no cells.
    #[error("map size must be at least 1")]
    ZeroSize,
    /// Corridors were requested on a map without interior cells.
    #[error("a {size}x{size} map has no interior to carve {paths} path(s) into")]
    NoInterior {
        /// Side length of the map.
        size: u32,
        /// Number of corridors requested.
        paths: u32,
    },
    /// Cells must have a positive, finite size.
    #[error("cell size {0} must be positive and finite")]
    InvalidCellSize(f32),
}

/// One straight corridor removed from the walls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarvedPath {
    /// Interior cell the corridor started from.
    pub start: GridCoord,
    /// Direction the corridor was dug in.
    pub direction: Direction,
    /// Wall cells removed, in digging order.
    pub removed: Vec<GridCoord>,
    /// Last interior cell of the corridor, seeding the next one.
    pub terminal: GridCoord,
}

/// Summary of a carving pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CarveReport {
    /// Corridors in the order they were dug.
    pub paths: Vec<CarvedPath>,
    /// Set when the retry cap stopped carving before every path was dug.
    pub exhausted: bool,
}

impl CarveReport {
    /// Total number of wall cells removed.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.paths.iter().map(|path| path.removed.len()).sum()
    }

    /// First cell of the first corridor, a natural spawn point for the head.
    #[must_use]
    pub fn first_cell(&self) -> Option<GridCoord> {
        self.paths.first().map(|path| path.start)
    }
}

/// Seeded generator producing walled maps with carved corridors.
#[derive(Clone, Debug)]
pub struct MapGenerator {
    settings: GenerationSettings,
    rng: ChaCha8Rng,
}

impl MapGenerator {
    /// Validates the settings and seeds the generator.
    pub fn new(settings: GenerationSettings) -> Result<Self, GenerationError> {
        validate(&settings)?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
        })
    }

    /// Settings the generator was created with.
    #[must_use]
    pub const fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Lays the walls and carves the configured number of corridors.
    pub fn build(&mut self) -> Result<(GridStore, CarveReport), GenerationError> {
        let mut store = generate(
            self.settings.map_size,
            self.settings.centered,
            self.settings.offset,
            self.settings.cell_size,
        )?;
        let report = carve_paths(
            &mut store,
            self.settings.number_of_paths,
            self.settings.retry_cap,
            &mut self.rng,
        )?;
        info!(
            size = self.settings.map_size,
            seed = self.settings.seed,
            paths = report.paths.len(),
            removed = report.removed_count(),
            "map generated"
        );
        Ok((store, report))
    }
}

fn validate(settings: &GenerationSettings) -> Result<(), GenerationError> {
    if settings.map_size == 0 {
        return Err(GenerationError::ZeroSize);
    }
    if !(settings.cell_size.is_finite() && settings.cell_size > 0.0) {
        return Err(GenerationError::InvalidCellSize(settings.cell_size));
    }
    if settings.number_of_paths > 0 && settings.map_size < MIN_CARVABLE_SIZE {
        return Err(GenerationError::NoInterior {
            size: settings.map_size,
            paths: settings.number_of_paths,
        });
    }
    Ok(())
}

/// Fills a `size`x`size` square with wall cells.
///
/// When `centered` is set the square is shifted by `(-size/2, -size/2)` before
/// `offset` is added.
pub fn generate(
    size: u32,
    centered: bool,
    offset: GridCoord,
    cell_size: f32,
) -> Result<GridStore, GenerationError> {
    if size == 0 {
        return Err(GenerationError::ZeroSize);
    }
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(GenerationError::InvalidCellSize(cell_size));
    }

    let side = i32::try_from(size).unwrap_or(i32::MAX);
    let origin = if centered {
        offset.offset(-side / 2, -side / 2)
    } else {
        offset
    };

    let mut store = GridStore::new();
    for x in 0..side {
        for y in 0..side {
            let coord = origin.offset(x, y);
            let position = Vec3::new(
                coord.x() as f32 * cell_size,
                0.0,
                coord.y() as f32 * cell_size,
            );
            let _ = store.add_cell(coord, position, CellKind::Wall);
        }
    }
    debug!(size, ?origin, "walls laid");
    Ok(store)
}

/// Carves `number_of_paths` straight corridors through the interior walls.
///
/// The first corridor, and any corridor whose start has no diggable
/// neighbour, begins at a uniformly random interior wall. Every other one
/// begins where the previous corridor ended. At most `retry_cap` starts may
/// fail before carving stops early.
pub fn carve_paths<R>(
    store: &mut GridStore,
    number_of_paths: u32,
    retry_cap: u32,
    rng: &mut R,
) -> Result<CarveReport, GenerationError>
where
    R: Rng + ?Sized,
{
    let mut report = CarveReport::default();
    if number_of_paths == 0 {
        return Ok(report);
    }
    let Some(bounds) = Bounds::of(store) else {
        return Err(GenerationError::ZeroSize);
    };
    if !bounds.has_interior() {
        return Err(GenerationError::NoInterior {
            size: bounds.side(),
            paths: number_of_paths,
        });
    }

    let mut next_start: Option<GridCoord> = None;
    let mut failures = 0_u32;
    while report.paths.len() < number_of_paths as usize {
        let start = match next_start.take() {
            Some(start) => start,
            None => match random_interior_wall(store, &bounds, rng) {
                Some(start) => start,
                None => {
                    warn!(
                        carved = report.paths.len(),
                        requested = number_of_paths,
                        "no interior walls left to carve"
                    );
                    report.exhausted = true;
                    break;
                }
            },
        };

        let choices: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| {
                let neighbor = start.neighbor(*direction);
                bounds.is_interior(neighbor) && store.contains(neighbor)
            })
            .collect();
        if choices.is_empty() {
            failures = failures.saturating_add(1);
            debug!(?start, failures, "carve start has no diggable neighbour");
            if failures >= retry_cap {
                warn!(
                    carved = report.paths.len(),
                    requested = number_of_paths,
                    retry_cap,
                    "carve retries exhausted; stopping early"
                );
                report.exhausted = true;
                break;
            }
            continue;
        }

        let direction = choices[rng.gen_range(0..choices.len())];
        let path = dig(store, &bounds, start, direction);
        next_start = Some(path.terminal);
        report.paths.push(path);
    }

    Ok(report)
}

fn dig(
    store: &mut GridStore,
    bounds: &Bounds,
    start: GridCoord,
    direction: Direction,
) -> CarvedPath {
    let mut removed = Vec::new();
    let mut current = start;
    loop {
        if store.get(current).map(|record| record.kind) == Some(CellKind::Wall) {
            let _ = store.remove_cell(current);
            removed.push(current);
        }
        let next = current.neighbor(direction);
        if !bounds.is_interior(next) {
            break;
        }
        current = next;
    }
    CarvedPath {
        start,
        direction,
        removed,
        terminal: current,
    }
}

fn random_interior_wall<R>(store: &GridStore, bounds: &Bounds, rng: &mut R) -> Option<GridCoord>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<GridCoord> = store
        .cells_of_kind(CellKind::Wall)
        .map(|record| record.coordinate)
        .filter(|coord| bounds.is_interior(*coord))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

/// Inclusive extent of the generated square.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    min: GridCoord,
    max: GridCoord,
}

impl Bounds {
    fn of(store: &GridStore) -> Option<Self> {
        store.bounds().map(|(min, max)| Self { min, max })
    }

    fn side(&self) -> u32 {
        self.min.x().abs_diff(self.max.x()).saturating_add(1)
    }

    fn has_interior(&self) -> bool {
        self.max.x() - self.min.x() >= 2 && self.max.y() - self.min.y() >= 2
    }

    fn is_interior(&self, coord: GridCoord) -> bool {
        coord.x() > self.min.x()
            && coord.x() < self.max.x()
            && coord.y() > self.min.y()
            && coord.y() < self.max.y()
    }
}

/// Reports whether `coord` lies on the outer ring of a map with the given settings.
#[must_use]
pub fn is_edge(settings: &GenerationSettings, coord: GridCoord) -> bool {
    let side = i32::try_from(settings.map_size).unwrap_or(i32::MAX);
    let origin = if settings.centered {
        settings.offset.offset(-side / 2, -side / 2)
    } else {
        settings.offset
    };
    let far = origin.offset(side - 1, side - 1);
    coord.x() == origin.x()
        || coord.y() == origin.y()
        || coord.x() == far.x()
        || coord.y() == far.y()
}

/// Stable digest of the occupied layout, used to compare generated maps.
#[must_use]
pub fn layout_fingerprint(store: &GridStore) -> u64 {
    let mut hasher = Sha256::new();
    for coord in store.all_coordinates() {
        hasher.update(coord.x().to_le_bytes());
        hasher.update(coord.y().to_le_bytes());
        let kind: u8 = match store.get(coord).map(|record| record.kind) {
            Some(CellKind::Wall) => 1,
            Some(CellKind::Body) => 2,
            None => 0,
        };
        hasher.update([kind]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_square_straddles_origin() {
        let store = generate(4, true, GridCoord::new(0, 0), 1.0).expect("valid size");
        assert_eq!(store.len(), 16);
        assert_eq!(
            store.bounds(),
            Some((GridCoord::new(-2, -2), GridCoord::new(1, 1)))
        );
    }

    #[test]
    fn world_position_scales_with_cell_size() {
        let store = generate(3, false, GridCoord::new(1, 0), 2.0).expect("valid size");
        let record = store.get(GridCoord::new(2, 1)).expect("cell exists");
        assert_eq!(record.world_position, Vec3::new(4.0, 0.0, 2.0));
        assert_eq!(record.kind, CellKind::Wall);
    }

    #[test]
    fn dig_stops_before_edge() {
        let mut store = generate(6, false, GridCoord::new(0, 0), 1.0).expect("valid size");
        let bounds = Bounds::of(&store).expect("bounds");
        let path = dig(&mut store, &bounds, GridCoord::new(2, 2), Direction::Right);
        assert_eq!(
            path.removed,
            vec![
                GridCoord::new(2, 2),
                GridCoord::new(3, 2),
                GridCoord::new(4, 2)
            ]
        );
        assert_eq!(path.terminal, GridCoord::new(4, 2));
        assert!(store.contains(GridCoord::new(5, 2)));
    }

    #[test]
    fn edge_detection_matches_centered_layout() {
        let settings = GenerationSettings {
            map_size: 5,
            ..GenerationSettings::default()
        };
        assert!(is_edge(&settings, GridCoord::new(-2, 0)));
        assert!(is_edge(&settings, GridCoord::new(0, 2)));
        assert!(!is_edge(&settings, GridCoord::new(1, 1)));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let zero = GenerationSettings {
            map_size: 0,
            ..GenerationSettings::default()
        };
        assert_eq!(MapGenerator::new(zero).err(), Some(GenerationError::ZeroSize));

        let cramped = GenerationSettings {
            map_size: 2,
            number_of_paths: 1,
            ..GenerationSettings::default()
        };
        assert_eq!(
            MapGenerator::new(cramped).err(),
            Some(GenerationError::NoInterior { size: 2, paths: 1 })
        );

        let flat = GenerationSettings {
            cell_size: 0.0,
            ..GenerationSettings::default()
        };
        assert_eq!(
            MapGenerator::new(flat).err(),
            Some(GenerationError::InvalidCellSize(0.0))
        );
    }
}
