//! Frames: positioned, prioritized grids of character cells.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use crate::cell::Cell;
use crate::error::CoreError;
use crate::types::{GridData, EMPTY_CELL, MAX_FRAME_CELLS};

/// Region shared by two frames, in absolute (parent) coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub rows: Range<u32>,
    pub cols: Range<u32>,
}

impl Overlap {
    pub fn height(&self) -> u32 {
        self.rows.end - self.rows.start
    }

    pub fn width(&self) -> u32 {
        self.cols.end - self.cols.start
    }
}

/// A `height x width` grid of cells with a display priority and the
/// position of its top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: u16,
    width: u16,
    priority: u8,
    row: u16,
    col: u16,
    cells: Vec<Cell>,
}

impl Frame {
    /// Blank frame at the origin with priority 1.
    pub fn new(height: u16, width: u16) -> Self {
        let len = (height as usize) * (width as usize);
        Self {
            height,
            width,
            priority: 1,
            row: 0,
            col: 0,
            cells: vec![Cell::EMPTY; len],
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Place the top-left corner at `(row, col)`.
    pub fn with_origin(mut self, row: u16, col: u16) -> Self {
        self.row = row;
        self.col = col;
        self
    }

    /// `(height, width)`
    pub fn size(&self) -> (u16, u16) {
        (self.height, self.width)
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    /// `(row, col)` of the top-left corner.
    pub fn origin(&self) -> (u16, u16) {
        (self.row, self.col)
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    pub fn set_origin(&mut self, row: u16, col: u16) {
        self.row = row;
        self.col = col;
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate rows top to bottom. A zero-width frame still yields
    /// `height` (empty) rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        let w = self.width as usize;
        (0..self.height as usize).map(move |r| &self.cells[r * w..(r + 1) * w])
    }

    #[inline(always)]
    fn idx(&self, row: u16, col: u16) -> Option<usize> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some((row as usize) * (self.width as usize) + (col as usize))
    }

    pub fn get(&self, row: u16, col: u16) -> Option<Cell> {
        self.idx(row, col).map(|i| self.cells[i])
    }

    /// Write one character. Out-of-range positions are ignored.
    pub fn set(&mut self, row: u16, col: u16, ch: char) {
        if let Some(i) = self.idx(row, col) {
            self.cells[i].write(ch);
        }
    }

    pub fn set_cell(&mut self, row: u16, col: u16, cell: Cell) {
        if let Some(i) = self.idx(row, col) {
            self.cells[i] = cell;
        }
    }

    /// Write `s` starting at `(row, col)`, clipped to the row.
    ///
    /// Returns the number of characters written.
    pub fn write_str(&mut self, row: u16, col: u16, s: &str) -> usize {
        if row >= self.height {
            return 0;
        }
        let mut written = 0;
        let mut c = col;
        for ch in s.chars() {
            if c >= self.width {
                break;
            }
            self.set(row, c, ch);
            written += 1;
            c += 1;
        }
        written
    }

    pub fn fill(&mut self, ch: char) {
        self.cells.fill(Cell::new(ch));
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Fill one row with `ch`.
    pub fn fill_row(&mut self, row: u16, ch: char) {
        for col in 0..self.width {
            self.set(row, col, ch);
        }
    }

    /// Move every row up by `n`, filling the freed rows with `ch`.
    pub fn scroll_up(&mut self, n: u16, ch: char) {
        let n = n.min(self.height);
        let w = self.width as usize;
        self.cells.copy_within(n as usize * w.., 0);
        for row in self.height - n..self.height {
            self.fill_row(row, ch);
        }
    }

    /// Resize, keeping the content of the overlapping top-left region.
    /// New cells are filled with `ch`.
    pub fn resize(&mut self, height: u16, width: u16, ch: char) {
        if self.height == height && self.width == width {
            return;
        }
        let mut next = Frame::new(height, width)
            .with_priority(self.priority)
            .with_origin(self.row, self.col);
        next.fill(ch);
        for r in 0..self.height.min(height) {
            for c in 0..self.width.min(width) {
                if let Some(cell) = self.get(r, c) {
                    next.set_cell(r, c, cell);
                }
            }
        }
        *self = next;
    }

    fn bounds(&self) -> (Range<u32>, Range<u32>) {
        let r = self.row as u32;
        let c = self.col as u32;
        (r..r + self.height as u32, c..c + self.width as u32)
    }

    /// Region where both frames overlap, or `None` if they do not
    /// overlap in both dimensions.
    pub fn intersect(&self, other: &Frame) -> Option<Overlap> {
        let (ar, ac) = self.bounds();
        let (br, bc) = other.bounds();
        let rows = ar.start.max(br.start)..ar.end.min(br.end);
        let cols = ac.start.max(bc.start)..ac.end.min(bc.end);
        if rows.is_empty() || cols.is_empty() {
            return None;
        }
        Some(Overlap { rows, cols })
    }

    /// Write the non-empty cells of `top` onto `self` where they overlap,
    /// ignoring priorities.
    ///
    /// Returns the number of cells written.
    pub fn overlay(&mut self, top: &Frame) -> Result<usize, CoreError> {
        let overlap = self.intersect(top).ok_or(CoreError::NoIntersection)?;
        Ok(self.overlay_region(top, &overlap))
    }

    fn overlay_region(&mut self, top: &Frame, overlap: &Overlap) -> usize {
        let mut written = 0;
        for abs_r in overlap.rows.clone() {
            for abs_c in overlap.cols.clone() {
                let top_r = (abs_r - top.row as u32) as u16;
                let top_c = (abs_c - top.col as u32) as u16;
                let Some(cell) = top.get(top_r, top_c) else {
                    continue;
                };
                if cell.is_empty() {
                    continue;
                }
                let r = (abs_r - self.row as u32) as u16;
                let c = (abs_c - self.col as u32) as u16;
                self.set_cell(r, c, cell);
                written += 1;
            }
        }
        written
    }

    /// Composite two frames over their overlap.
    ///
    /// The higher-priority frame (`other` on ties) is written onto the
    /// lower one, and the lower one is returned.
    pub fn merge(self, other: Frame) -> Result<Frame, CoreError> {
        let overlap = self.intersect(&other).ok_or(CoreError::NoIntersection)?;
        let (top, mut bottom) = if other.priority >= self.priority {
            (other, self)
        } else {
            (self, other)
        };
        bottom.overlay_region(&top, &overlap);
        Ok(bottom)
    }

    /// The frame as one printable string, rows separated by `\n`.
    pub fn flatten(&self) -> String {
        self.to_string()
    }

    /// Stable FNV-1a hash of the visible content.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1aHasher::new();
        self.height.hash(&mut h);
        self.width.hash(&mut h);
        for cell in &self.cells {
            cell.glyph().hash(&mut h);
        }
        h.finish()
    }

    pub fn to_grid(&self) -> GridData {
        let rows = self
            .rows()
            .map(|row| row.iter().map(|c| c.value().unwrap_or(EMPTY_CELL)).collect())
            .collect();
        GridData {
            height: self.height,
            width: self.width,
            priority: self.priority,
            row: self.row,
            col: self.col,
            rows,
        }
    }

    /// Decode a wire grid. The shape is validated before any cell is
    /// allocated.
    pub fn from_grid(grid: &GridData) -> Result<Self, CoreError> {
        if grid.rows.len() != grid.height as usize {
            return Err(CoreError::GridShape {
                expected: format!("{} rows", grid.height),
                found: format!("{} rows", grid.rows.len()),
            });
        }
        checked_size(grid.height as usize, grid.width as usize)?;
        for (r, line) in grid.rows.iter().enumerate() {
            let n = line.chars().count();
            if n != grid.width as usize {
                return Err(CoreError::GridShape {
                    expected: format!("{} columns", grid.width),
                    found: format!("{n} columns in row {r}"),
                });
            }
        }
        let mut frame = Frame::new(grid.height, grid.width)
            .with_priority(grid.priority)
            .with_origin(grid.row, grid.col);
        for (r, line) in (0..grid.height).zip(&grid.rows) {
            for (c, ch) in (0..grid.width).zip(line.chars()) {
                if ch != EMPTY_CELL {
                    frame.set(r, c, ch);
                }
            }
        }
        Ok(frame)
    }
}

/// Narrow a `height x width` request to frame dimensions, refusing anything
/// past [`MAX_FRAME_CELLS`].
pub fn checked_size(height: usize, width: usize) -> Result<(u16, u16), CoreError> {
    let too_large = || CoreError::FrameTooLarge {
        height,
        width,
        max: MAX_FRAME_CELLS,
    };
    let h = u16::try_from(height).map_err(|_| too_large())?;
    let w = u16::try_from(width).map_err(|_| too_large())?;
    if height.saturating_mul(width) > MAX_FRAME_CELLS {
        return Err(too_large());
    }
    Ok((h, w))
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            for cell in row {
                write!(f, "{}", cell.glyph())?;
            }
        }
        Ok(())
    }
}

/// Build one frame out of a stack of frames.
///
/// A blank master of the first frame's size and origin (priority 0)
/// receives every frame in ascending priority order; equal priorities keep
/// their input order, so later frames end up on top.
pub fn compose(frames: &[Frame]) -> Result<Frame, CoreError> {
    let first = frames.first().ok_or(CoreError::EmptyComposition)?;
    let (h, w) = first.size();
    let (r, c) = first.origin();
    let mut master = Frame::new(h, w).with_priority(0).with_origin(r, c);

    let mut order: Vec<&Frame> = frames.iter().collect();
    order.sort_by_key(|f| f.priority());
    for frame in order {
        master.overlay(frame)?;
    }
    Ok(master)
}

/// Stable 64-bit FNV-1a hasher.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(h: u16, w: u16, ch: char) -> Frame {
        let mut f = Frame::new(h, w);
        f.fill(ch);
        f
    }

    #[test]
    fn new_frame_defaults() {
        let f = Frame::new(50, 50).with_priority(0);
        assert_eq!(f.priority(), 0);
        assert_eq!(f.origin(), (0, 0));
        assert_eq!(f.size(), (50, 50));
        assert!(f.cells().iter().all(Cell::is_empty));
    }

    #[test]
    fn intersect_detects_disjoint_and_overlapping() {
        let a = Frame::new(10, 10).with_origin(0, 0);
        let b = Frame::new(10, 5).with_origin(11, 11);
        let c = Frame::new(10, 10).with_origin(2, 2);

        assert!(a.intersect(&b).is_none());
        let ov = b.intersect(&c).unwrap();
        assert_eq!(ov.rows, 11..12);
        assert_eq!(ov.cols, 11..12);
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Frame::new(2, 2);
        let b = Frame::new(2, 2).with_origin(2, 0);
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn merge_writes_higher_priority_onto_lower() {
        let low = filled(3, 3, '.').with_priority(1);
        let high = filled(1, 1, '#').with_priority(5).with_origin(1, 1);

        let out = low.merge(high).unwrap();
        assert_eq!(out.priority(), 1);
        assert_eq!(out.to_string(), "...\n.#.\n...");
    }

    #[test]
    fn merge_returns_lower_frame_regardless_of_order() {
        let high = filled(1, 1, '#').with_priority(5).with_origin(1, 1);
        let low = filled(3, 3, '.').with_priority(1);

        let out = high.merge(low).unwrap();
        assert_eq!(out.size(), (3, 3));
        assert_eq!(out.get(1, 1).unwrap().value(), Some('#'));
    }

    #[test]
    fn merge_tie_goes_to_other() {
        let a = filled(1, 2, 'a');
        let b = filled(1, 2, 'b');
        let out = a.merge(b).unwrap();
        assert_eq!(out.to_string(), "bb");
    }

    #[test]
    fn merge_keeps_lower_cells_under_empty_top_cells() {
        let low = filled(1, 3, '.');
        let mut high = Frame::new(1, 3).with_priority(2);
        high.set(0, 2, 'x');
        let out = low.merge(high).unwrap();
        assert_eq!(out.to_string(), "..x");
    }

    #[test]
    fn merge_disjoint_fails() {
        let a = Frame::new(1, 1);
        let b = Frame::new(1, 1).with_origin(5, 5);
        assert_eq!(a.merge(b), Err(CoreError::NoIntersection));
    }

    #[test]
    fn compose_orders_by_priority() {
        let back = filled(2, 2, 'b').with_priority(1);
        let mut front = Frame::new(2, 2).with_priority(3);
        front.set(0, 0, 'F');
        let mut mid = Frame::new(2, 2).with_priority(2);
        mid.set(0, 0, 'm');
        mid.set(1, 1, 'm');

        let out = compose(&[front, back, mid]).unwrap();
        assert_eq!(out.priority(), 0);
        assert_eq!(out.to_string(), "Fb\nbm");
    }

    #[test]
    fn compose_empty_is_error() {
        assert_eq!(compose(&[]), Err(CoreError::EmptyComposition));
    }

    #[test]
    fn write_str_clips_to_width() {
        let mut f = Frame::new(1, 4);
        assert_eq!(f.write_str(0, 2, "hello"), 2);
        assert_eq!(f.to_string(), "  he");
        assert_eq!(f.write_str(3, 0, "x"), 0);
    }

    #[test]
    fn scroll_up_moves_rows() {
        let mut f = Frame::new(3, 2);
        f.write_str(0, 0, "aa");
        f.write_str(1, 0, "bb");
        f.write_str(2, 0, "cc");
        f.scroll_up(1, '.');
        assert_eq!(f.to_string(), "bb\ncc\n..");
    }

    #[test]
    fn resize_keeps_top_left_content() {
        let mut f = Frame::new(2, 2);
        f.write_str(0, 0, "ab");
        f.write_str(1, 0, "cd");
        f.resize(3, 3, '.');
        assert_eq!(f.to_string(), "ab.\ncd.\n...");
        f.resize(1, 1, '.');
        assert_eq!(f.to_string(), "a");
    }

    #[test]
    fn grid_keeps_empty_cells() {
        let mut f = Frame::new(2, 2).with_priority(4).with_origin(1, 2);
        f.set(0, 1, 'x');
        let grid = f.to_grid();
        assert_eq!(grid.rows[0], format!("{EMPTY_CELL}x"));
        let back = Frame::from_grid(&grid).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn grid_with_wrong_shape_is_rejected() {
        let grid = GridData {
            height: 2,
            width: 2,
            priority: 1,
            row: 0,
            col: 0,
            rows: vec!["ab".into(), "c".into()],
        };
        assert!(matches!(
            Frame::from_grid(&grid),
            Err(CoreError::GridShape { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = filled(2, 2, '.');
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.set(0, 0, '#');
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn zero_width_frame_survives_grid_round_trip() {
        let f = Frame::new(3, 0).with_priority(2);
        let grid = f.to_grid();
        assert_eq!(grid.rows, vec![String::new(); 3]);
        assert_eq!(Frame::from_grid(&grid).unwrap(), f);
    }

    #[test]
    fn checked_size_bounds_cells() {
        assert_eq!(checked_size(40, 70), Ok((40, 70)));
        assert_eq!(checked_size(MAX_FRAME_CELLS, 1), Err(CoreError::FrameTooLarge {
            height: MAX_FRAME_CELLS,
            width: 1,
            max: MAX_FRAME_CELLS,
        }));
        assert!(checked_size(65535, 65535).is_err());
        assert!(checked_size(1024, 1024).is_ok());
        assert!(checked_size(1025, 1024).is_err());
    }

    #[test]
    fn huge_grid_header_is_rejected() {
        let grid = GridData {
            height: u16::MAX,
            width: u16::MAX,
            priority: 1,
            row: 0,
            col: 0,
            rows: vec![String::new(); u16::MAX as usize],
        };
        assert!(matches!(
            Frame::from_grid(&grid),
            Err(CoreError::FrameTooLarge { .. })
        ));
    }
}
