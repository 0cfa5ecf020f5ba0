use glam::IVec2;
use proxgrid_common::{MapSize, TILE_SHIFT, TILE_UNITS};

/// Largest cell edge, in tiles, whose length in world units fits an `i32`.
pub const MAX_GRID_SIZE_TILES: u32 = (i32::MAX >> TILE_SHIFT) as u32;

/// Cell edge length in world units, or `None` if it overflows an `i32`.
pub fn cell_units_for(grid_size_tiles: u32) -> Option<i32> {
    i32::try_from(grid_size_tiles).ok()?.checked_mul(TILE_UNITS)
}

/// A 2D cell coordinate in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Grid dimensions derived from a map: cell counts per axis and the cell
/// edge length in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    pub width: u32,
    pub height: u32,
    pub cell_units: i32,
}

impl GridDims {
    /// Cover a map with square cells of `grid_size_tiles` tiles, rounding up
    /// so partial cells at the map edge are included.
    pub fn for_map(map: MapSize, grid_size_tiles: u32) -> Self {
        assert!(grid_size_tiles > 0, "grid_size_tiles must be positive");
        let Some(cell_units) = cell_units_for(grid_size_tiles) else {
            panic!("grid_size_tiles {grid_size_tiles} exceeds {MAX_GRID_SIZE_TILES}");
        };
        Self {
            width: map.width.div_ceil(grid_size_tiles),
            height: map.height.div_ceil(grid_size_tiles),
            cell_units,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    /// Cell containing a world position. May be outside the grid.
    pub fn world_to_cell(&self, pos: IVec2) -> CellCoord {
        CellCoord::new(
            pos.x.div_euclid(self.cell_units),
            pos.y.div_euclid(self.cell_units),
        )
    }

    /// World-space rectangle of a cell as `(min, max)` corners, saturating
    /// at the `i32` range.
    pub fn cell_rect(&self, coord: CellCoord) -> (IVec2, IVec2) {
        let edge = IVec2::splat(self.cell_units);
        let min = IVec2::new(coord.x, coord.y).saturating_mul(edge);
        (min, min.saturating_add(edge))
    }

    /// Flat index of a cell, or `None` outside the grid.
    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn coord_of(&self, index: usize) -> CellCoord {
        let width = self.width.max(1) as usize;
        CellCoord::new((index % width) as i32, (index / width) as i32)
    }
}

/// Bounds-checked 2D array of per-cell values, stored row-major.
#[derive(Debug)]
pub struct CellGrid<T> {
    dims: GridDims,
    cells: Vec<T>,
}

impl<T: Default> CellGrid<T> {
    pub fn new(dims: GridDims) -> Self {
        let mut cells = Vec::with_capacity(dims.cell_count());
        cells.resize_with(dims.cell_count(), T::default);
        Self { dims, cells }
    }
}

impl<T> CellGrid<T> {
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, coord: CellCoord) -> Option<&T> {
        self.dims.index_of(coord).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, coord: CellCoord) -> Option<&mut T> {
        self.dims.index_of(coord).map(|i| &mut self.cells[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.cells.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut T> {
        self.cells.get_mut(index)
    }

    /// All cells with their coordinates, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &T)> + '_ {
        let dims = self.dims;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (dims.coord_of(i), cell))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.cells.iter_mut()
    }
}
