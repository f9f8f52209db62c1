//! Diagnostics: route drawings and constraint dumps.
//!
//! Everything here is read-only. The renderers return strings so tools and
//! tests can capture them; the engine also logs them at debug level where
//! the original driver printed.

use std::fmt::Write;

use crate::backend::Backend;
use crate::error::{Result, RouteError};
use crate::geometry::{Direction, Polarity, TileLoc, TileType};
use crate::routing::Router;

/// Render an 8-bit free mask as `0b|b7|...|b0|`.
pub(crate) fn format_bits(value: u8) -> String {
    let mut out = String::from("0b");
    for i in (0..8).rev() {
        let _ = write!(out, "|{}", (value >> i) & 1);
    }
    out.push('|');
    out
}

/// Render a BD free mask, grouped by byte.
pub(crate) fn format_bd_bits(value: u64, bits: u32) -> String {
    let mut out = String::from("0b");
    for i in (0..bits).rev() {
        let _ = write!(out, "|{}", (value >> i) & 1);
        if i % 8 == 0 {
            out.push('|');
        }
    }
    out
}

/// Draw a planned path on the grid with source/destination/arrow marks.
///
/// Row 0 of the array renders at the bottom, matching the physical layout.
pub(crate) fn draw_route(
    cols: u8,
    rows: u8,
    path: &[TileLoc],
    source: TileLoc,
    destination: TileLoc,
) -> String {
    let mut grid = vec![vec!['.'; cols as usize]; rows as usize];

    for (i, tile) in path.iter().enumerate() {
        let grid_row = (rows - 1 - tile.row) as usize;
        let grid_col = tile.col as usize;
        let mark = if i == 0 {
            'S'
        } else if i == path.len() - 1 {
            'D'
        } else {
            let d_row = tile.row as i16 - path[i - 1].row as i16;
            let d_col = tile.col as i16 - path[i - 1].col as i16;
            match (d_row, d_col) {
                (-1, 0) => 'v',
                (1, 0) => '^',
                (0, -1) => '<',
                (0, 1) => '>',
                _ => '*',
            }
        };
        grid[grid_row][grid_col] = mark;
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        " Routing Path between S[{} {}] and D[{} {}]",
        source.col, source.row, destination.col, destination.row
    );
    let border: String = "--".repeat(cols as usize);
    let _ = writeln!(out, " +{border}+");
    for row in &grid {
        out.push_str(" | ");
        for c in row {
            out.push(*c);
            out.push(' ');
        }
        out.push_str("|\n");
    }
    let _ = writeln!(out, " +{border}+");
    out
}

impl<B: Backend> Router<B> {
    /// Trace the programmed route between two tiles onto an ASCII grid.
    ///
    /// Each step's tile is marked with `*`; row 0 renders at the bottom.
    /// Fails with [`RouteError::NoRoute`] when the pair has no route.
    pub fn reveal_route(&self, source: TileLoc, destination: TileLoc) -> Result<String> {
        let constraint = self
            .grid
            .get(source)
            .ok_or_else(|| RouteError::InvalidArgs(format!("tile {source} is outside the array")))?;
        let path = constraint.routes.find(source, destination).ok_or_else(|| {
            log::error!("reveal failed: no route between {source} and {destination}");
            RouteError::NoRoute { src: source, destination }
        })?;

        let rows = self.grid.rows() as usize;
        let cols = self.grid.cols() as usize;
        let mut grid = vec![vec!['.'; cols]; rows];
        for step in &path.steps {
            let grid_row = rows - 1 - step.tile.row as usize;
            grid[grid_row][step.tile.col as usize] = '*';
        }

        let mut out = String::new();
        for row in &grid {
            for c in row {
                out.push(*c);
                out.push(' ');
            }
            out.push('\n');
        }
        log::debug!("route {source} -> {destination}:\n{out}");
        Ok(out)
    }

    /// Dump the masks, host-edge state, and rooted routes of the listed
    /// tiles.
    pub fn dump_switch_info(&self, tiles: &[TileLoc]) -> Result<String> {
        let mut out = String::new();
        for &tile in tiles {
            let c = self
                .grid
                .get(tile)
                .ok_or_else(|| RouteError::InvalidArgs(format!("tile {tile} is outside the array")))?;

            let _ = writeln!(out, "*********************************************");
            let _ = writeln!(out, "Tile[{}, {}]:", tile.col, tile.row);
            let _ = writeln!(out, "\tisAutoConfigured: {}", c.auto_configured);
            let _ = writeln!(
                out,
                "\tMM2S_State: {}",
                format_bits(c.port_mask(Direction::Dma, Polarity::Slave))
            );
            let _ = writeln!(
                out,
                "\tS2MM_State: {}",
                format_bits(c.port_mask(Direction::Dma, Polarity::Master))
            );
            if c.tile_type == TileType::Shim {
                let _ = writeln!(
                    out,
                    "\tShimMM2S_State: {}",
                    format_bits(c.shim_dma_mask(Polarity::Slave))
                );
                let _ = writeln!(
                    out,
                    "\tShimS2MM_State: {}",
                    format_bits(c.shim_dma_mask(Polarity::Master))
                );
            }
            let bd_bits = if c.tile_type == TileType::Mem { 48 } else { 16 };
            let _ = writeln!(out, "\tBDState: {}", format_bd_bits(c.bd_mask(), bd_bits));

            for (name, dir, polarity) in [
                ("SlaveEast", Direction::East, Polarity::Slave),
                ("SlaveWest", Direction::West, Polarity::Slave),
                ("SlaveSouth", Direction::South, Polarity::Slave),
                ("SlaveNorth", Direction::North, Polarity::Slave),
                ("MasterEast", Direction::East, Polarity::Master),
                ("MasterWest", Direction::West, Polarity::Master),
                ("MasterSouth", Direction::South, Polarity::Master),
                ("MasterNorth", Direction::North, Polarity::Master),
            ] {
                let _ = writeln!(out, "\t{name}: {}", format_bits(c.port_mask(dir, polarity)));
            }
            let _ = writeln!(out, "\tisCoreExecuting: {}", c.core_executing);

            for route in c.routes.iter() {
                let _ = writeln!(out, "\tRouting Path:");
                let _ = writeln!(
                    out,
                    "\tSource[{}, {}] -> Destination[{}, {}], MM2S_portNo: {}, S2MM_portNo: {}",
                    route.source.col,
                    route.source.row,
                    route.destination.col,
                    route.destination.row,
                    route.mm2s_port,
                    route.s2mm_port
                );
                for (i, step) in route.steps.iter().enumerate() {
                    let _ =
                        writeln!(out, "\t------------------------------------------------");
                    let _ = writeln!(out, "\t| Step: {i}");
                    let _ = writeln!(
                        out,
                        "\t| Source Tile: [{}, {}]",
                        step.tile.col, step.tile.row
                    );
                    let _ = writeln!(
                        out,
                        "\t| Source Stream: {}, Direction: {}",
                        step.source_port, step.source_dir
                    );
                    let _ = writeln!(
                        out,
                        "\t| Dest Stream: {}, Direction: {}",
                        step.dest_port, step.dest_dir
                    );
                    let _ =
                        writeln!(out, "\t------------------------------------------------");
                }
            }
            let _ = writeln!(out, "*********************************************");
        }
        Ok(out)
    }

    /// Dump a single tile's constraint state.
    pub fn dump_tile_constraint(&self, tile: TileLoc) -> Result<String> {
        let c = self
            .grid
            .get(tile)
            .ok_or_else(|| RouteError::InvalidArgs(format!("tile {tile} is outside the array")))?;

        let mut out = String::new();
        let _ = writeln!(out, "    {{");
        let _ = writeln!(out, "      \"row\": {},", tile.row);
        let _ = writeln!(out, "      \"col\": {},", tile.col);
        let _ = writeln!(out, "      \"tile_type\": \"{}\",", c.tile_type.name());
        let _ = writeln!(
            out,
            "      \"MM2S_State\": [{}],",
            format_bits(c.port_mask(Direction::Dma, Polarity::Slave))
        );
        let _ = writeln!(
            out,
            "      \"S2MM_State\": [{}],",
            format_bits(c.port_mask(Direction::Dma, Polarity::Master))
        );
        let bd_bits = if c.tile_type == TileType::Mem { 48 } else { 16 };
        let _ = writeln!(out, "      \"BDState\": [{}],", format_bd_bits(c.bd_mask(), bd_bits));
        for (name, dir, polarity) in [
            ("SlaveEast", Direction::East, Polarity::Slave),
            ("SlaveWest", Direction::West, Polarity::Slave),
            ("SlaveSouth", Direction::South, Polarity::Slave),
            ("SlaveNorth", Direction::North, Polarity::Slave),
            ("MasterEast", Direction::East, Polarity::Master),
            ("MasterWest", Direction::West, Polarity::Master),
            ("MasterNorth", Direction::North, Polarity::Master),
        ] {
            let _ = writeln!(
                out,
                "      \"{name}\": [{}],",
                format_bits(c.port_mask(dir, polarity))
            );
        }
        let _ = write!(out, "    }}");
        Ok(out)
    }

    /// Dump the whole constraints grid.
    pub fn dump_constraints(&self) -> String {
        let mut out = String::from("{\n  \"tiles\": [\n");
        let mut first = true;
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                if !first {
                    out.push_str(",\n");
                }
                first = false;
                // In-bounds by construction.
                if let Ok(tile) = self.dump_tile_constraint(TileLoc::new(col, row)) {
                    out.push_str(&tile);
                }
            }
        }
        out.push_str("\n  ]\n}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimBackend;
    use crate::geometry::DeviceGeometry;

    fn router() -> Router<SimBackend> {
        let geometry = DeviceGeometry::aie2(8);
        Router::new(geometry, SimBackend::new(geometry))
    }

    #[test]
    fn test_format_bits() {
        assert_eq!(format_bits(0x03), "0b|0|0|0|0|0|0|1|1|");
        assert_eq!(format_bits(0x80), "0b|1|0|0|0|0|0|0|0|");
    }

    #[test]
    fn test_reveal_route_marks_path() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();
        let grid = r.reveal_route(src, dst).unwrap();
        // Three tiles on row 3 are starred.
        assert_eq!(grid.matches('*').count(), 3);
        assert!(r.reveal_route(dst, src).is_err());
    }

    #[test]
    fn test_draw_route_endpoints() {
        let path = [TileLoc::new(2, 3), TileLoc::new(3, 3), TileLoc::new(4, 3)];
        let drawing = draw_route(8, 6, &path, path[0], path[2]);
        assert!(drawing.contains('S'));
        assert!(drawing.contains('D'));
        assert!(drawing.contains('>'));
    }

    #[test]
    fn test_dump_switch_info() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();
        let dump = r.dump_switch_info(&[src]).unwrap();
        assert!(dump.contains("Tile[2, 3]:"));
        assert!(dump.contains("isAutoConfigured: true"));
        assert!(dump.contains("MM2S_portNo: 0"));
        assert!(dump.contains("Source Tile: [2, 3]"));

        // Shim tiles additionally report the shim DMA states.
        let dump = r.dump_switch_info(&[TileLoc::new(0, 0)]).unwrap();
        assert!(dump.contains("ShimMM2S_State"));
    }

    #[test]
    fn test_dump_constraints_covers_grid() {
        let r = router();
        let dump = r.dump_constraints();
        assert!(dump.contains("\"tiles\""));
        assert_eq!(dump.matches("\"row\":").count(), 48);
        assert!(r.dump_tile_constraint(TileLoc::new(9, 0)).is_err());
    }
}
