//! Error types for the routing engine.

use crate::backend::HardwareError;
use crate::geometry::{Direction, TileLoc};
use thiserror::Error;

/// Routing engine error.
///
/// All fallible engine operations return this by value. The engine attempts
/// no recovery; a caller that sees an error is expected to discard the
/// half-configured route or reset the affected tiles with
/// [`switch_reset`](crate::routing::Router::switch_reset).
#[derive(Debug, Error)]
pub enum RouteError {
    /// Arguments out of range (off-grid tile, bad column, ...)
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// No admissible path between the tiles.
    #[error("no path between {src} and {destination}")]
    NoPath { src: TileLoc, destination: TileLoc },

    /// Every candidate port on a hop is already claimed.
    #[error("no available port on tile {tile} in the direction {dir}")]
    NoAvailablePort { tile: TileLoc, dir: Direction },

    /// A route between the pair is already programmed.
    #[error("route already programmed between {src} and {destination}")]
    AlreadyRouted { src: TileLoc, destination: TileLoc },

    /// No programmed route between the pair.
    #[error("no programmed path between {src} and {destination}")]
    NoRoute { src: TileLoc, destination: TileLoc },

    /// Buffer-descriptor pool exhausted on a tile.
    #[error("no available buffer descriptor on tile {0}")]
    NoBd(TileLoc),

    /// A downstream hardware call failed.
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Memory allocation failed.
    #[error("allocation failure: {0}")]
    Allocation(&'static str),
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, RouteError>;
