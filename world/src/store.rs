//! Sparse occupancy store keyed by grid coordinate.

use std::collections::{BTreeSet, HashMap};

use glam::Vec3;
use grower_core::{CellKind, CellRecord, GridCoord, ObstacleQuery};
use rand::Rng;

/// Occupied cells of a level, keyed by coordinate with insertion order kept.
///
/// The first writer of a coordinate wins; later inserts are ignored until the
/// cell is removed.
#[derive(Clone, Debug, Default)]
pub struct GridStore {
    cells: HashMap<GridCoord, CellRecord>,
    order: Vec<GridCoord>,
}

impl GridStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a cell if the coordinate is free. Returns whether it was added.
    pub fn add_cell(&mut self, coord: GridCoord, world_position: Vec3, kind: CellKind) -> bool {
        if self.cells.contains_key(&coord) {
            return false;
        }
        let _ = self.cells.insert(
            coord,
            CellRecord {
                coordinate: coord,
                world_position,
                kind,
            },
        );
        self.order.push(coord);
        true
    }

    /// Removes the cell at `coord`. Returns whether a cell was present.
    pub fn remove_cell(&mut self, coord: GridCoord) -> bool {
        self.take_cell(coord).is_some()
    }

    /// Removes and returns the cell at `coord`.
    pub fn take_cell(&mut self, coord: GridCoord) -> Option<CellRecord> {
        let record = self.cells.remove(&coord)?;
        if let Some(index) = self.order.iter().position(|stored| *stored == coord) {
            let _ = self.order.remove(index);
        }
        Some(record)
    }

    /// Reports whether `coord` is occupied.
    #[must_use]
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Record stored at `coord`, if any.
    #[must_use]
    pub fn get(&self, coord: GridCoord) -> Option<&CellRecord> {
        self.cells.get(&coord)
    }

    /// Uniformly random occupied cell.
    pub fn random_occupied<R>(&self, rng: &mut R) -> Option<&CellRecord>
    where
        R: Rng + ?Sized,
    {
        if self.order.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.order.len());
        self.cells.get(&self.order[index])
    }

    /// Oldest surviving cell.
    #[must_use]
    pub fn first(&self) -> Option<&CellRecord> {
        self.order.first().and_then(|coord| self.cells.get(coord))
    }

    /// Newest surviving cell.
    #[must_use]
    pub fn last(&self) -> Option<&CellRecord> {
        self.order.last().and_then(|coord| self.cells.get(coord))
    }

    /// Ordered snapshot of every occupied coordinate.
    #[must_use]
    pub fn all_coordinates(&self) -> BTreeSet<GridCoord> {
        self.cells.keys().copied().collect()
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the store holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over the records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CellRecord> + '_ {
        self.order.iter().filter_map(|coord| self.cells.get(coord))
    }

    /// Iterates over the records of one kind in insertion order.
    pub fn cells_of_kind(&self, kind: CellKind) -> impl Iterator<Item = &CellRecord> + '_ {
        self.iter().filter(move |record| record.kind == kind)
    }

    /// Removes every cell of `kind`, returning the removed records in insertion order.
    pub fn remove_kind(&mut self, kind: CellKind) -> Vec<CellRecord> {
        let doomed: Vec<GridCoord> = self
            .cells_of_kind(kind)
            .map(|record| record.coordinate)
            .collect();
        doomed
            .into_iter()
            .filter_map(|coord| self.take_cell(coord))
            .collect()
    }

    /// Inclusive `(min, max)` corners of the occupied area.
    #[must_use]
    pub fn bounds(&self) -> Option<(GridCoord, GridCoord)> {
        let mut coords = self.cells.keys();
        let first = *coords.next()?;
        let (mut min_x, mut min_y) = (first.x(), first.y());
        let (mut max_x, mut max_y) = (min_x, min_y);
        for coord in coords {
            min_x = min_x.min(coord.x());
            min_y = min_y.min(coord.y());
            max_x = max_x.max(coord.x());
            max_y = max_y.max(coord.y());
        }
        Some((GridCoord::new(min_x, min_y), GridCoord::new(max_x, max_y)))
    }
}

impl ObstacleQuery for GridStore {
    fn obstacle(&self, cell: GridCoord) -> Option<CellRecord> {
        self.cells.get(&cell).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn at(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    fn position(coord: GridCoord) -> Vec3 {
        Vec3::new(coord.x() as f32, 0.0, coord.y() as f32)
    }

    #[test]
    fn first_writer_wins() {
        let mut store = GridStore::new();
        assert!(store.add_cell(at(1, 1), position(at(1, 1)), CellKind::Wall));
        assert!(!store.add_cell(at(1, 1), Vec3::splat(9.0), CellKind::Body));

        let record = store.get(at(1, 1)).expect("cell stored");
        assert_eq!(record.kind, CellKind::Wall);
        assert_eq!(record.world_position, position(at(1, 1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removal_of_absent_cell_is_a_no_op() {
        let mut store = GridStore::new();
        assert!(!store.remove_cell(at(4, 4)));
        assert!(store.get(at(4, 4)).is_none());
        assert!(store.random_occupied(&mut ChaCha8Rng::seed_from_u64(1)).is_none());
        assert!(store.first().is_none());
        assert!(store.bounds().is_none());
    }

    #[test]
    fn first_and_last_follow_insertion_order() {
        let mut store = GridStore::new();
        for coord in [at(2, 0), at(0, 0), at(1, 0)] {
            let _ = store.add_cell(coord, position(coord), CellKind::Wall);
        }
        assert_eq!(store.first().map(|r| r.coordinate), Some(at(2, 0)));
        assert_eq!(store.last().map(|r| r.coordinate), Some(at(1, 0)));

        assert!(store.remove_cell(at(2, 0)));
        assert_eq!(store.first().map(|r| r.coordinate), Some(at(0, 0)));
        let ordered: Vec<_> = store.all_coordinates().into_iter().collect();
        assert_eq!(ordered, vec![at(0, 0), at(1, 0)]);
    }

    #[test]
    fn random_occupied_only_returns_live_cells() {
        let mut store = GridStore::new();
        for x in 0..5 {
            let _ = store.add_cell(at(x, 0), position(at(x, 0)), CellKind::Wall);
        }
        let _ = store.remove_cell(at(3, 0));

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..64 {
            let record = store.random_occupied(&mut rng).expect("store not empty");
            assert_ne!(record.coordinate, at(3, 0));
            assert!(store.contains(record.coordinate));
        }
    }

    #[test]
    fn remove_kind_keeps_other_kinds() {
        let mut store = GridStore::new();
        let _ = store.add_cell(at(0, 0), position(at(0, 0)), CellKind::Wall);
        let _ = store.add_cell(at(1, 0), position(at(1, 0)), CellKind::Body);
        let _ = store.add_cell(at(2, 0), position(at(2, 0)), CellKind::Body);

        let removed = store.remove_kind(CellKind::Body);

        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.cells_of_kind(CellKind::Body).count(), 0);
        assert_eq!(store.obstacle_at(at(0, 0)), Some(CellKind::Wall));
    }

    #[test]
    fn bounds_cover_all_cells() {
        let mut store = GridStore::new();
        for coord in [at(-2, 3), at(4, -1), at(0, 0)] {
            let _ = store.add_cell(coord, position(coord), CellKind::Wall);
        }
        assert_eq!(store.bounds(), Some((at(-2, -1), at(4, 3))));
    }
}
