//! The constraints grid.
//!
//! A dense `[col][row]` matrix of [`TileConstraint`], owned by the routing
//! instance. Tiles are stored in a flat `Vec` with `col * rows + row`
//! indexing for cache-friendly column iteration.

use crate::geometry::{DeviceGeometry, Direction, Polarity, TileLoc};
use crate::routing::constraint::TileConstraint;

/// Dense per-tile constraint matrix.
#[derive(Debug, Clone)]
pub struct ConstraintGrid {
    cols: u8,
    rows: u8,
    tiles: Vec<TileConstraint>,
}

impl ConstraintGrid {
    /// Build the grid from the device geometry, loading the initial masks
    /// for each tile's row band.
    pub fn new(geometry: &DeviceGeometry) -> Self {
        let mut tiles = Vec::with_capacity(geometry.tile_count());
        for _col in 0..geometry.num_cols {
            for row in 0..geometry.num_rows {
                tiles.push(TileConstraint::for_type(geometry.tile_type(row)));
            }
        }
        Self { cols: geometry.num_cols, rows: geometry.num_rows, tiles }
    }

    #[inline]
    pub fn cols(&self) -> u8 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> u8 {
        self.rows
    }

    #[inline]
    fn index(&self, tile: TileLoc) -> usize {
        (tile.col as usize) * (self.rows as usize) + (tile.row as usize)
    }

    /// Whether a location is on the grid.
    #[inline]
    pub fn contains(&self, tile: TileLoc) -> bool {
        tile.col < self.cols && tile.row < self.rows
    }

    /// Constraint at a location, or `None` when off-grid.
    #[inline]
    pub fn get(&self, tile: TileLoc) -> Option<&TileConstraint> {
        if self.contains(tile) {
            Some(&self.tiles[self.index(tile)])
        } else {
            None
        }
    }

    /// Mutable constraint at a location, or `None` when off-grid.
    #[inline]
    pub fn get_mut(&mut self, tile: TileLoc) -> Option<&mut TileConstraint> {
        if self.contains(tile) {
            let idx = self.index(tile);
            Some(&mut self.tiles[idx])
        } else {
            None
        }
    }

    /// Constraint at a location; bounds are the caller's responsibility.
    #[inline]
    pub fn tile(&self, tile: TileLoc) -> &TileConstraint {
        debug_assert!(self.contains(tile));
        &self.tiles[self.index(tile)]
    }

    /// Mutable constraint at a location; bounds are the caller's
    /// responsibility.
    #[inline]
    pub fn tile_mut(&mut self, tile: TileLoc) -> &mut TileConstraint {
        debug_assert!(self.contains(tile));
        let idx = self.index(tile);
        &mut self.tiles[idx]
    }

    /// Iterate over all locations in column-major order.
    pub fn locations(&self) -> impl Iterator<Item = TileLoc> {
        let (cols, rows) = (self.cols, self.rows);
        (0..cols).flat_map(move |col| (0..rows).map(move |row| TileLoc::new(col, row)))
    }

    /// Lowest port free on both sides of the link from `src` towards `dir`.
    ///
    /// Traffic leaves `src` on its `dir` master byte and enters the
    /// neighbour on the mirrored slave byte; the first common set bit is the
    /// usable port.
    pub fn first_matching_port(&self, src: TileLoc, dst: TileLoc, dir: Direction) -> Option<u8> {
        let src_mask = self.get(src)?.port_mask(dir, Polarity::Master);
        let dst_mask = self.get(dst)?.port_mask(dir.opposite(), Polarity::Slave);
        let both = src_mask & dst_mask;
        (0..8).find(|i| both & (1 << i) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TileType;

    #[test]
    fn test_grid_layout() {
        let grid = ConstraintGrid::new(&DeviceGeometry::aie2(8));
        assert_eq!(grid.cols(), 8);
        assert_eq!(grid.rows(), 6);
        assert_eq!(grid.tile(TileLoc::new(0, 0)).tile_type, TileType::Shim);
        assert_eq!(grid.tile(TileLoc::new(5, 1)).tile_type, TileType::Mem);
        assert_eq!(grid.tile(TileLoc::new(7, 5)).tile_type, TileType::Compute);
        assert!(grid.get(TileLoc::new(8, 0)).is_none());
        assert_eq!(grid.locations().count(), 48);
    }

    #[test]
    fn test_first_matching_port() {
        let mut grid = ConstraintGrid::new(&DeviceGeometry::aie2(8));
        let src = TileLoc::new(2, 3);
        let dst = TileLoc::new(3, 3);
        assert_eq!(grid.first_matching_port(src, dst, Direction::East), Some(0));

        // Claim bit 0 on the source master side; the common bit moves up.
        grid.tile_mut(src).claim_port(Direction::East, Polarity::Master, 0);
        assert_eq!(grid.first_matching_port(src, dst, Direction::East), Some(1));

        // No overlap at all between a memory tile and its east neighbour.
        let mem = TileLoc::new(2, 1);
        let mem_east = TileLoc::new(3, 1);
        assert_eq!(grid.first_matching_port(mem, mem_east, Direction::East), None);
    }
}
