#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text presentation for Grower adapters.
//!
//! [`TextCanvas`] materialises cells as characters, [`CellMirror`] keeps a
//! canvas in step with world events, and [`FrameSink`] implementations decide
//! where rendered frames go.

use anyhow::Result as AnyResult;
use grower_core::{CellKind, CellRecord, CellSpawner, Event, GridCoord};
use std::{
    collections::{BTreeMap, HashMap},
    error::Error,
    fmt,
};
use tracing::debug;

/// Characters used when drawing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyphs {
    /// Glyph for wall cells.
    pub wall: char,
    /// Glyph for trail cells.
    pub body: char,
    /// Glyph for the head.
    pub head: char,
    /// Glyph for free cells.
    pub empty: char,
}

impl Glyphs {
    /// Parses four distinct glyphs in the order wall, body, head, empty.
    pub fn parse(text: &str) -> Result<Self, RenderingError> {
        let glyphs: Vec<char> = text.chars().collect();
        let &[wall, body, head, empty] = glyphs.as_slice() else {
            return Err(RenderingError::GlyphCount {
                found: glyphs.len(),
            });
        };
        for (index, glyph) in glyphs.iter().enumerate() {
            if glyphs[..index].contains(glyph) {
                return Err(RenderingError::DuplicateGlyph { glyph: *glyph });
            }
        }
        Ok(Self {
            wall,
            body,
            head,
            empty,
        })
    }

    fn for_kind(&self, kind: CellKind) -> char {
        match kind {
            CellKind::Wall => self.wall,
            CellKind::Body => self.body,
        }
    }
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            wall: '#',
            body: 'o',
            head: '@',
            empty: '.',
        }
    }
}

/// Handle to a character materialised on a [`TextCanvas`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellHandle(u32);

impl CellHandle {
    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Character grid that cells are spawned onto.
#[derive(Clone, Debug, Default)]
pub struct TextCanvas {
    cells: BTreeMap<CellHandle, (GridCoord, CellKind)>,
    next_handle: u32,
}

impl TextCanvas {
    /// Creates an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells currently materialised.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.cells.len()
    }

    /// Kind drawn at `cell`, if anything is materialised there.
    #[must_use]
    pub fn kind_at(&self, cell: GridCoord) -> Option<CellKind> {
        self.cells
            .values()
            .find(|(coord, _)| *coord == cell)
            .map(|(_, kind)| *kind)
    }

    /// Draws every materialised cell plus the head.
    ///
    /// Rows run from the highest `y` to the lowest so `Up` points up the screen.
    #[must_use]
    pub fn render(&self, head: Option<GridCoord>, glyphs: &Glyphs) -> Frame {
        let mut kinds: HashMap<GridCoord, CellKind> = HashMap::with_capacity(self.cells.len());
        for (coord, kind) in self.cells.values() {
            let _ = kinds.insert(*coord, *kind);
        }

        let mut coords = kinds.keys().copied().chain(head);
        let Some(first) = coords.next() else {
            return Frame::default();
        };
        let (mut min, mut max) = (first, first);
        for coord in coords {
            min = GridCoord::new(min.x().min(coord.x()), min.y().min(coord.y()));
            max = GridCoord::new(max.x().max(coord.x()), max.y().max(coord.y()));
        }

        let rows: Vec<String> = (min.y()..=max.y())
            .rev()
            .map(|y| {
                (min.x()..=max.x())
                    .map(|x| {
                        let coord = GridCoord::new(x, y);
                        if head == Some(coord) {
                            glyphs.head
                        } else {
                            kinds
                                .get(&coord)
                                .map_or(glyphs.empty, |kind| glyphs.for_kind(*kind))
                        }
                    })
                    .collect()
            })
            .collect();
        Frame { rows }
    }
}

impl CellSpawner for TextCanvas {
    type Handle = CellHandle;

    fn spawn(&mut self, cell: GridCoord, kind: CellKind) -> CellHandle {
        let handle = CellHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let _ = self.cells.insert(handle, (cell, kind));
        handle
    }

    fn despawn(&mut self, handle: CellHandle) {
        if self.cells.remove(&handle).is_none() {
            debug!(handle = handle.get(), "despawn of unknown canvas handle");
        }
    }
}

/// Keeps spawned presentation handles in step with the world's cells.
#[derive(Debug)]
pub struct CellMirror<H> {
    handles: HashMap<GridCoord, H>,
}

impl<H> CellMirror<H> {
    /// Creates a mirror that has spawned nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Number of cells the mirror currently tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Reports whether the mirror tracks no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Spawns every record not yet mirrored, typically a freshly generated grid.
    pub fn populate<'a, S, I>(&mut self, records: I, spawner: &mut S)
    where
        S: CellSpawner<Handle = H>,
        I: IntoIterator<Item = &'a CellRecord>,
    {
        for record in records {
            self.place(record.coordinate, record.kind, spawner);
        }
    }

    /// Applies cell placement and removal events to the spawner.
    pub fn handle<S>(&mut self, events: &[Event], spawner: &mut S)
    where
        S: CellSpawner<Handle = H>,
    {
        for event in events {
            match event {
                Event::CellPlaced { cell, kind } => self.place(*cell, *kind, spawner),
                Event::CellRemoved { cell, .. } => {
                    if let Some(handle) = self.handles.remove(cell) {
                        spawner.despawn(handle);
                    }
                }
                _ => {}
            }
        }
    }

    /// Despawns everything the mirror tracks.
    pub fn clear<S>(&mut self, spawner: &mut S)
    where
        S: CellSpawner<Handle = H>,
    {
        for (_, handle) in self.handles.drain() {
            spawner.despawn(handle);
        }
    }

    fn place<S>(&mut self, cell: GridCoord, kind: CellKind, spawner: &mut S)
    where
        S: CellSpawner<Handle = H>,
    {
        if self.handles.contains_key(&cell) {
            return;
        }
        let handle = spawner.spawn(cell, kind);
        let _ = self.handles.insert(cell, handle);
    }
}

impl<H> Default for CellMirror<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// One rendered frame, top row first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// Rows of glyphs.
    pub rows: Vec<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.rows.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            f.write_str(row)?;
        }
        Ok(())
    }
}

/// Destination for rendered frames.
pub trait FrameSink {
    /// Presents a frame.
    fn present(&mut self, frame: &Frame) -> AnyResult<()>;
}

/// Sink that keeps every presented frame in memory.
#[derive(Clone, Debug, Default)]
pub struct FrameLog {
    frames: Vec<Frame>,
}

impl FrameLog {
    /// Frames presented so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FrameSink for FrameLog {
    fn present(&mut self, frame: &Frame) -> AnyResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Exactly four glyphs are required.
    GlyphCount {
        /// Number of glyphs supplied.
        found: usize,
    },
    /// Each cell kind needs its own glyph.
    DuplicateGlyph {
        /// Glyph that appeared more than once.
        glyph: char,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlyphCount { found } => {
                write!(f, "expected 4 glyphs (wall, body, head, empty), found {found}")
            }
            Self::DuplicateGlyph { glyph } => {
                write!(f, "glyph `{glyph}` is used for more than one cell kind")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn record(x: i32, y: i32, kind: CellKind) -> CellRecord {
        CellRecord {
            coordinate: GridCoord::new(x, y),
            world_position: Vec3::new(x as f32, 0.0, y as f32),
            kind,
        }
    }

    #[test]
    fn glyph_parsing_rejects_bad_specs() {
        assert_eq!(Glyphs::parse("#o@."), Ok(Glyphs::default()));
        assert_eq!(
            Glyphs::parse("#o@"),
            Err(RenderingError::GlyphCount { found: 3 })
        );
        assert_eq!(
            Glyphs::parse("#o#."),
            Err(RenderingError::DuplicateGlyph { glyph: '#' })
        );
    }

    #[test]
    fn mirror_follows_cell_events() {
        let mut canvas = TextCanvas::new();
        let mut mirror = CellMirror::new();
        let walls = [record(0, 0, CellKind::Wall), record(1, 0, CellKind::Wall)];
        mirror.populate(walls.iter(), &mut canvas);
        mirror.populate(walls.iter(), &mut canvas);
        assert_eq!(canvas.live_count(), 2);

        let events = [
            Event::CellRemoved {
                cell: GridCoord::new(1, 0),
                kind: CellKind::Wall,
            },
            Event::CellPlaced {
                cell: GridCoord::new(0, 1),
                kind: CellKind::Body,
            },
            Event::HeadArrived {
                cell: GridCoord::new(1, 1),
            },
        ];
        mirror.handle(&events, &mut canvas);

        assert_eq!(canvas.live_count(), 2);
        assert_eq!(canvas.kind_at(GridCoord::new(1, 0)), None);
        assert_eq!(canvas.kind_at(GridCoord::new(0, 1)), Some(CellKind::Body));

        mirror.clear(&mut canvas);
        assert!(mirror.is_empty());
        assert_eq!(canvas.live_count(), 0);
    }

    #[test]
    fn render_places_up_at_the_top() {
        let mut canvas = TextCanvas::new();
        let _ = canvas.spawn(GridCoord::new(0, 0), CellKind::Wall);
        let _ = canvas.spawn(GridCoord::new(1, 1), CellKind::Body);

        let frame = canvas.render(Some(GridCoord::new(0, 1)), &Glyphs::default());

        assert_eq!(frame.rows, vec!["@o".to_string(), "#.".to_string()]);
        assert_eq!(frame.to_string(), "@o\n#.");
    }

    #[test]
    fn frame_log_records_presented_frames() {
        let mut log = FrameLog::default();
        let frame = TextCanvas::new().render(None, &Glyphs::default());
        log.present(&frame).expect("in-memory sink never fails");
        assert_eq!(log.frames(), &[Frame::default()]);
    }
}
