//! aie-router library
//!
//! Automatic stream-routing and data-movement engine for AIE tile arrays.
//!
//! # Module Organization
//!
//! - [`geometry`]: Tile coordinates, tile types, device geometry
//! - [`backend`]: Hardware interface trait and the in-memory simulator
//! - [`routing`]: The routing engine (constraints grid, planner, committer,
//!   DMA driver, diagnostics)
//! - [`config`]: TOML device descriptions (geometry, host-edge wiring,
//!   back-end selection)
//! - [`error`]: Error taxonomy
//!
//! # Example
//!
//! ```
//! use aie_router::{Backend, DeviceGeometry, Router, SimBackend, TileLoc, TransferObject};
//!
//! let geometry = DeviceGeometry::aie2(8);
//! let mut router = Router::new(geometry, SimBackend::new(geometry));
//!
//! let source = TileLoc::new(2, 3);
//! let destination = TileLoc::new(4, 3);
//! router.route(None, source, destination)?;
//!
//! router.backend_mut().data_mem_write(source, 0x2000, &[1, 2, 3, 4])?;
//! router.move_data(
//!     source,
//!     TransferObject::DevAddr(0x2000),
//!     4,
//!     TransferObject::DevAddr(0x2000),
//!     destination,
//! )?;
//! router.deroute(source, destination, true)?;
//! # Ok::<(), aie_router::RouteError>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod routing;

pub use backend::{Backend, BackendKind, DmaDescriptor, HardwareError, MemHandle, SimBackend};
pub use config::{ConfigError, DeviceConfig};
pub use error::RouteError;
pub use geometry::{ChannelDir, DeviceGeometry, Direction, Polarity, TileLoc, TileType};
pub use routing::{
    HostEdgeConstraint, HostEdgeConstraints, PortChannel, RouteConstraints, RoutePath, RouteStep,
    Router, TransferObject,
};
