//! Tile coordinates, tile types, and device geometry.
//!
//! The tile array is a 2-D grid addressed by `(col, row)`. Row bands decide
//! the tile type: the shim row bridges to host memory, memory-tile rows sit
//! directly above it, and compute rows fill the rest of the array.
//!
//! # Array Layouts
//!
//! | Device | Columns | Rows | Layout |
//! |--------|---------|------|--------|
//! | AIE2   | n       | 6    | Row 0 shim, row 1 mem, rows 2-5 compute |

use std::fmt;

/// A tile location in the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileLoc {
    /// Column index
    pub col: u8,
    /// Row index
    pub row: u8,
}

impl TileLoc {
    /// Create a tile location.
    #[inline]
    pub fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Step one tile in the given direction, if the result stays on the grid.
    pub fn step(&self, dir: Direction, cols: u8, rows: u8) -> Option<TileLoc> {
        let (dc, dr) = dir.offset()?;
        let col = self.col as i16 + dc;
        let row = self.row as i16 + dr;
        if col < 0 || row < 0 || col >= cols as i16 || row >= rows as i16 {
            return None;
        }
        Some(TileLoc::new(col as u8, row as u8))
    }
}

impl fmt::Display for TileLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Tile type determines available resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    /// Shim tile (shim row) - interface to host DMA
    Shim,
    /// Memory tile - large BD pool, north/south streaming only
    Mem,
    /// Compute tile - core + local memory
    Compute,
}

impl TileType {
    /// Number of DMA buffer descriptors for this tile type.
    #[inline]
    pub fn bd_count(&self) -> u8 {
        match self {
            TileType::Mem => 48,
            _ => 16,
        }
    }

    /// Number of DMA channels per direction (S2MM or MM2S).
    #[inline]
    pub fn channels_per_dir(&self) -> u8 {
        match self {
            TileType::Mem => 6,
            _ => 2,
        }
    }

    /// Display name used in dumps.
    pub fn name(&self) -> &'static str {
        match self {
            TileType::Shim => "SHIM",
            TileType::Mem => "MEM",
            TileType::Compute => "COMPUTE",
        }
    }
}

/// Stream-switch port direction.
///
/// The four cardinals address neighbouring tiles; `Dma` addresses the
/// tile-local DMA endpoint ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Dma,
}

impl Direction {
    /// The four cardinal directions in BFS exploration order.
    pub const CARDINALS: [Direction; 4] =
        [Direction::North, Direction::South, Direction::East, Direction::West];

    /// Grid offset `(d_col, d_row)` for a cardinal direction.
    /// `Dma` is tile-local and has no offset.
    #[inline]
    pub fn offset(&self) -> Option<(i16, i16)> {
        match self {
            Direction::North => Some((0, 1)),
            Direction::South => Some((0, -1)),
            Direction::East => Some((1, 0)),
            Direction::West => Some((-1, 0)),
            Direction::Dma => None,
        }
    }

    /// The mirrored direction: traffic leaving a tile on `d` enters the
    /// neighbour on `d.opposite()`.
    #[inline]
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Dma => Direction::Dma,
        }
    }

    /// Direction of travel from `a` to an adjacent tile `b`.
    pub fn between(a: TileLoc, b: TileLoc) -> Option<Direction> {
        if a.col == b.col {
            match (b.row as i16) - (a.row as i16) {
                1 => Some(Direction::North),
                -1 => Some(Direction::South),
                _ => None,
            }
        } else if a.row == b.row {
            match (b.col as i16) - (a.col as i16) {
                1 => Some(Direction::East),
                -1 => Some(Direction::West),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Display name used in dumps and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
            Direction::East => "EAST",
            Direction::West => "WEST",
            Direction::Dma => "DMA",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Polarity of a stream-switch port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Ingress into the switch
    Slave,
    /// Egress out of the switch
    Master,
}

/// DMA channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelDir {
    /// Memory to stream (source side)
    MM2S,
    /// Stream to memory (destination side)
    S2MM,
}

impl ChannelDir {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelDir::MM2S => "DMA_MM2S",
            ChannelDir::S2MM => "DMA_S2MM",
        }
    }
}

/// Device geometry: array dimensions and tile-type row bands.
///
/// Mirrors the fields a device instance reports at probe time. The routing
/// engine only needs the dimensions and the band boundaries; everything else
/// about the device stays behind the backend interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Number of columns
    pub num_cols: u8,
    /// Number of rows
    pub num_rows: u8,
    /// Row of the shim tiles
    pub shim_row: u8,
    /// First memory-tile row
    pub mem_tile_row_start: u8,
    /// Number of memory-tile rows
    pub mem_tile_num_rows: u8,
    /// First compute-tile row
    pub aie_tile_row_start: u8,
    /// Number of compute-tile rows
    pub aie_tile_num_rows: u8,
}

impl DeviceGeometry {
    /// Create a geometry from explicit row bands.
    pub fn new(
        num_cols: u8,
        num_rows: u8,
        shim_row: u8,
        mem_tile_row_start: u8,
        mem_tile_num_rows: u8,
        aie_tile_row_start: u8,
        aie_tile_num_rows: u8,
    ) -> Self {
        Self {
            num_cols,
            num_rows,
            shim_row,
            mem_tile_row_start,
            mem_tile_num_rows,
            aie_tile_row_start,
            aie_tile_num_rows,
        }
    }

    /// Standard AIE2 layout: shim row 0, one memory row, four compute rows.
    pub fn aie2(num_cols: u8) -> Self {
        Self::new(num_cols, 6, 0, 1, 1, 2, 4)
    }

    /// Total number of tiles.
    #[inline]
    pub fn tile_count(&self) -> usize {
        (self.num_cols as usize) * (self.num_rows as usize)
    }

    /// Check whether a location is on the grid.
    #[inline]
    pub fn contains(&self, tile: TileLoc) -> bool {
        tile.col < self.num_cols && tile.row < self.num_rows
    }

    /// Classify a row into its tile type.
    ///
    /// Rows outside the declared bands fall back to `Compute`, matching the
    /// device families where the compute band extends to the top of the
    /// array.
    pub fn tile_type(&self, row: u8) -> TileType {
        if row == self.shim_row {
            TileType::Shim
        } else if self.mem_tile_num_rows > 0
            && row >= self.mem_tile_row_start
            && row < self.mem_tile_row_start + self.mem_tile_num_rows
        {
            TileType::Mem
        } else {
            TileType::Compute
        }
    }

    /// Tile type at a location, or `None` if off-grid.
    pub fn tile_type_at(&self, tile: TileLoc) -> Option<TileType> {
        if self.contains(tile) {
            Some(self.tile_type(tile.row))
        } else {
            None
        }
    }
}
