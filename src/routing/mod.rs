//! The automatic stream-routing engine.
//!
//! A [`Router`] is bound to one device through a [`Backend`] and owns the
//! complete routing state for it: the constraints grid (per-tile port and
//! BD availability) and, on every source tile, a database of the routes
//! programmed from it.
//!
//! # Data flow
//!
//! 1. [`Router::route`] plans a shortest legal path (BFS), claims a port
//!    pair on every hop, issues the stream-switch enables, and records the
//!    finished path in the source tile's routes DB.
//! 2. [`Router::move_data`] reserves a BD on each endpoint, programs the
//!    endpoint DMA descriptors, pushes them onto the MM2S/S2MM channel
//!    queues, and polls the destination until the transfer drains.
//! 3. [`Router::deroute`] walks the recorded steps, disables each switch
//!    connection, and returns the ports to the free pool.
//!
//! The engine performs no internal locking; callers serialise all calls
//! against one instance. Waits poll the hardware without timeout.

pub mod constraint;
pub mod db;
pub mod dma;
pub mod dump;
pub mod grid;
pub mod planner;

pub use constraint::{DirSupported, HostEdgeList, PortChannel, TileConstraint};
pub use db::{RoutePath, RouteStep, RoutesDb};
pub use dma::TransferObject;
pub use planner::RouteConstraints;

use crate::backend::Backend;
use crate::config::DeviceConfig;
use crate::error::{Result, RouteError};
use crate::geometry::{DeviceGeometry, Direction, Polarity, TileLoc, TileType};
use grid::ConstraintGrid;

/// Host-edge remapping for one shim column.
#[derive(Debug, Clone)]
pub struct HostEdgeConstraint {
    /// Shim column the mapping applies to
    pub column: u8,
    /// Host-to-array table if true, array-to-host otherwise
    pub host_to_aie: bool,
    /// Replacement port/channel mappings
    pub mappings: Vec<PortChannel>,
}

/// User-supplied host-edge constraints.
#[derive(Debug, Clone, Default)]
pub struct HostEdgeConstraints {
    pub constraints: Vec<HostEdgeConstraint>,
}

/// Routing instance: the engine bound to one device.
pub struct Router<B: Backend> {
    geometry: DeviceGeometry,
    grid: ConstraintGrid,
    backend: B,
}

impl<B: Backend> Router<B> {
    /// Initialise the routing handler for a device.
    ///
    /// Builds the constraints grid from the device geometry; every tile
    /// starts with the initial masks of its row band and an empty routes
    /// DB. All state is dropped with the instance.
    pub fn new(geometry: DeviceGeometry, backend: B) -> Self {
        Self { geometry, grid: ConstraintGrid::new(&geometry), backend }
    }

    /// Initialise the routing handler from a device description.
    ///
    /// Builds the grid for the described geometry and applies any
    /// `[[host_edge]]` rewiring the description carries.
    pub fn with_config(config: &DeviceConfig, backend: B) -> Result<Self> {
        let mut router = Self::new(config.geometry(), backend);
        let overrides = config.host_edge_constraints();
        if !overrides.constraints.is_empty() {
            router.config_host_edge_constraints(&overrides)?;
        }
        Ok(router)
    }

    /// Device geometry this instance routes on.
    #[inline]
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// The hardware backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The hardware backend, mutably (data-memory access, payload setup).
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Constraint state of a tile.
    pub fn constraint(&self, tile: TileLoc) -> Option<&TileConstraint> {
        self.grid.get(tile)
    }

    /// The programmed route between two tiles, if any.
    pub fn find_route(&self, source: TileLoc, destination: TileLoc) -> Option<&RoutePath> {
        self.grid.get(source)?.routes.find(source, destination)
    }

    pub(crate) fn grid_mut(&mut self) -> &mut ConstraintGrid {
        &mut self.grid
    }

    fn check_tile(&self, tile: TileLoc) -> Result<()> {
        if self.geometry.contains(tile) {
            Ok(())
        } else {
            Err(RouteError::InvalidArgs(format!("tile {tile} is outside the array")))
        }
    }

    /// Create a route between `source` and `destination`.
    ///
    /// Plans the shortest path admitted by the optional constraints, then
    /// commits it hop by hop against the hardware. Fails with
    /// [`RouteError::AlreadyRouted`] if the pair already has a route. After
    /// a successful commit both compute endpoints are marked executable.
    ///
    /// `source == destination` is a no-op: the hardware is untouched and no
    /// route is recorded.
    pub fn route(
        &mut self,
        constraints: Option<&RouteConstraints>,
        source: TileLoc,
        destination: TileLoc,
    ) -> Result<()> {
        self.check_tile(source)?;
        self.check_tile(destination)?;

        if self.grid.tile(source).routes.find(source, destination).is_some() {
            log::error!(
                "route failed: a route is already programmed between {source} and {destination}"
            );
            return Err(RouteError::AlreadyRouted { src: source, destination });
        }

        let path = planner::find_shortest_path(&self.grid, constraints, source, destination)
            .ok_or_else(|| {
                log::error!("route failed: no path between {source} and {destination}");
                RouteError::NoPath { src: source, destination }
            })?;

        if !path.is_empty() {
            log::debug!(
                "\n{}",
                dump::draw_route(self.grid.cols(), self.grid.rows(), &path, source, destination)
            );
            self.commit_path(source, destination, &path)?;
        }

        if self.grid.tile(source).tile_type == TileType::Compute {
            self.grid.tile_mut(source).core_executing = true;
        }
        if self.grid.tile(destination).tile_type == TileType::Compute {
            self.grid.tile_mut(destination).core_executing = true;
        }
        Ok(())
    }

    /// Commit a planned path: one switch-level step per tile.
    ///
    /// Carries `(last_dir, last_port)` across hops: the master port used to
    /// leave a tile is the slave port the next tile is entered on. On
    /// failure previously claimed ports stay claimed; the caller recovers
    /// with [`Router::switch_reset`].
    fn commit_path(
        &mut self,
        source: TileLoc,
        destination: TileLoc,
        path: &[TileLoc],
    ) -> Result<()> {
        let mut route = RoutePath::new(source, destination);
        route.steps.reserve(path.len());
        let mut last_dir = Direction::South;
        let mut last_port: u8 = 0;

        for (i, &tile) in path.iter().enumerate() {
            if i == path.len() - 1 {
                // Terminal tile: drain into the endpoint DMA, or the host
                // edge for a shim destination.
                let is_shim = self.grid.tile(tile).is_shim();
                let dest_dir = if is_shim { Direction::South } else { Direction::Dma };
                let dest_port =
                    self.grid.tile(tile).first_free_port(dest_dir, true).ok_or_else(|| {
                        log::error!(
                            "route failed: no available port on tile {tile} in the direction {dest_dir}"
                        );
                        RouteError::NoAvailablePort { tile, dir: dest_dir }
                    })?;

                self.grid.tile_mut(tile).auto_configured = true;
                log::debug!(
                    "[command] stream_connect_enable({tile}, {last_dir}, {last_port}, {dest_dir}, {dest_port})"
                );
                self.backend
                    .stream_connect_enable(tile, last_dir, last_port, dest_dir, dest_port)
                    .map_err(|e| {
                        log::error!("route failed: stream_connect_enable on {tile}: {e}");
                        e
                    })?;
                self.grid.tile_mut(tile).claim_connection(
                    last_dir, last_port, dest_dir, dest_port,
                );
                route.s2mm_port = dest_port;
                route.steps.push(RouteStep {
                    tile,
                    source_dir: last_dir,
                    source_port: last_port,
                    dest_dir,
                    dest_port,
                });

                if is_shim {
                    log::debug!("[command] enable_aie_to_shim_dma({tile}, {dest_port})");
                    self.backend.enable_aie_to_shim_dma(tile, dest_port).map_err(|e| {
                        log::error!("route failed: enable_aie_to_shim_dma on {tile}: {e}");
                        e
                    })?;
                    self.grid.tile_mut(tile).set_host_edge_available(false, dest_port, false);
                }
            } else {
                let next = path[i + 1];
                let fwd = Direction::between(tile, next).ok_or_else(|| {
                    RouteError::InvalidArgs(format!("path tiles {tile} and {next} not adjacent"))
                })?;
                let tile_is_shim = self.grid.tile(tile).is_shim();

                // Entry side of this hop: the endpoint DMA on the first
                // tile (host edge for a shim source), the previous hop's
                // exit wire afterwards.
                let slave_dir = if tile_is_shim {
                    last_dir
                } else if i == 0 {
                    Direction::Dma
                } else {
                    last_dir
                };
                let source_port = if tile_is_shim && i > 0 {
                    // A shim mid-route keeps the wire port; its free-port
                    // lookup would answer from the host-edge table.
                    last_port
                } else {
                    self.grid.tile(tile).first_free_port(slave_dir, false).ok_or_else(|| {
                        log::error!(
                            "route failed: no available port on tile {tile} in the direction {slave_dir}"
                        );
                        RouteError::NoAvailablePort { tile, dir: slave_dir }
                    })?
                };
                let dest_port =
                    self.grid.first_matching_port(tile, next, fwd).ok_or_else(|| {
                        log::error!(
                            "route failed: no available stream between {tile} and {next} in the direction {fwd}"
                        );
                        RouteError::NoAvailablePort { tile, dir: fwd }
                    })?;

                self.grid.tile_mut(tile).auto_configured = true;
                log::debug!(
                    "[command] stream_connect_enable({tile}, {slave_dir}, {source_port}, {fwd}, {dest_port})"
                );
                self.backend
                    .stream_connect_enable(tile, slave_dir, source_port, fwd, dest_port)
                    .map_err(|e| {
                        log::error!("route failed: stream_connect_enable on {tile}: {e}");
                        e
                    })?;
                self.grid.tile_mut(tile).claim_connection(slave_dir, source_port, fwd, dest_port);
                route.steps.push(RouteStep {
                    tile,
                    source_dir: slave_dir,
                    source_port,
                    dest_dir: fwd,
                    dest_port,
                });

                if i == 0 {
                    route.mm2s_port = source_port;
                }
                if tile_is_shim && i == 0 {
                    log::debug!("[command] enable_shim_dma_to_aie({tile}, {source_port})");
                    self.backend.enable_shim_dma_to_aie(tile, source_port).map_err(|e| {
                        log::error!("route failed: enable_shim_dma_to_aie on {tile}: {e}");
                        e
                    })?;
                    self.grid.tile_mut(tile).set_host_edge_available(true, source_port, false);
                }

                last_dir = fwd.opposite();
                last_port = dest_port;
            }
        }

        self.grid.tile_mut(source).routes.insert(route);
        Ok(())
    }

    /// Remove the route between `source` and `destination`.
    ///
    /// Disables every recorded switch connection, returns the port bits to
    /// the free pool, re-opens host-edge entries used by shim endpoints,
    /// and unlinks the path from the routes DB. With `modify_core_config`
    /// the compute endpoints lose their executable mark.
    pub fn deroute(
        &mut self,
        source: TileLoc,
        destination: TileLoc,
        modify_core_config: bool,
    ) -> Result<()> {
        self.check_tile(source)?;
        self.check_tile(destination)?;

        let steps: Vec<RouteStep> =
            match self.grid.tile(source).routes.find(source, destination) {
                Some(path) => path.steps.clone(),
                None => {
                    log::error!(
                        "deroute failed: no route between {source} and {destination}"
                    );
                    return Err(RouteError::NoRoute { src: source, destination });
                }
            };

        if modify_core_config {
            if self.grid.tile(source).tile_type == TileType::Compute {
                self.grid.tile_mut(source).core_executing = false;
            }
            if self.grid.tile(destination).tile_type == TileType::Compute {
                self.grid.tile_mut(destination).core_executing = false;
            }
        }

        let last = steps.len().saturating_sub(1);
        for (i, step) in steps.iter().enumerate() {
            log::debug!(
                "[command] stream_connect_disable({}, {}, {}, {}, {})",
                step.tile, step.source_dir, step.source_port, step.dest_dir, step.dest_port
            );
            self.backend
                .stream_connect_disable(
                    step.tile,
                    step.source_dir,
                    step.source_port,
                    step.dest_dir,
                    step.dest_port,
                )
                .map_err(|e| {
                    log::error!("deroute failed: stream_connect_disable on {}: {e}", step.tile);
                    e
                })?;
            self.grid.tile_mut(step.tile).release_connection(
                step.source_dir,
                step.source_port,
                step.dest_dir,
                step.dest_port,
            );

            if self.grid.tile(step.tile).is_shim() {
                if i == 0 {
                    self.grid.tile_mut(step.tile).set_host_edge_available(
                        true,
                        step.source_port,
                        true,
                    );
                }
                if i == last {
                    self.grid.tile_mut(step.tile).set_host_edge_available(
                        false,
                        step.dest_port,
                        true,
                    );
                }
            }
        }

        self.grid.tile_mut(source).routes.remove(source, destination);
        Ok(())
    }

    /// Blanket-clear the stream switches of externally configured tiles.
    ///
    /// Tiles the router configured itself (`auto_configured`) are skipped.
    /// For every other listed tile, each `(slave, master)` port combination
    /// whose bits are in-use is disabled with the silenced variant; invalid
    /// combinations are expected and swallowed.
    pub fn switch_reset(&mut self, tiles: &[TileLoc]) -> Result<()> {
        const DIRECTIONS: [Direction; 5] = [
            Direction::Dma,
            Direction::South,
            Direction::West,
            Direction::North,
            Direction::East,
        ];

        for &tile in tiles {
            self.check_tile(tile)?;
            let constraint = self.grid.tile(tile);
            if constraint.auto_configured {
                log::debug!("switch reset: skipping auto-configured tile {tile}");
                continue;
            }
            let is_shim = constraint.is_shim();

            for slave_dir in DIRECTIONS {
                let slave_free = match slave_dir {
                    Direction::Dma if is_shim => constraint.shim_dma_mask(Polarity::Slave),
                    d => constraint.port_mask(d, Polarity::Slave),
                };
                for master_dir in DIRECTIONS {
                    let master_free = match master_dir {
                        Direction::Dma if is_shim => constraint.shim_dma_mask(Polarity::Master),
                        d => constraint.port_mask(d, Polarity::Master),
                    };
                    for slave_bit in 0..8u8 {
                        if slave_free & (1 << slave_bit) != 0 {
                            continue;
                        }
                        for master_bit in 0..8u8 {
                            if master_free & (1 << master_bit) != 0 {
                                continue;
                            }
                            self.backend.stream_connect_disable_silent(
                                tile, slave_dir, slave_bit, master_dir, master_bit,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Enable every core marked executable, `count` times over.
    pub fn run(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            for tile in self.grid.locations() {
                if self.grid.tile(tile).core_executing {
                    log::debug!("[program] core_enable({tile})");
                    self.backend.core_enable(tile)?;
                }
            }
        }
        Ok(())
    }

    /// Block until a tile's core reports done.
    pub fn core_wait(&mut self, tile: TileLoc) -> Result<()> {
        self.check_tile(tile)?;
        loop {
            if self.backend.core_done(tile)? {
                return Ok(());
            }
            log::debug!("waiting for core {tile} to finish");
        }
    }

    /// Mark a core executable (or not) for [`Router::run`].
    pub fn set_core_execute(&mut self, tile: TileLoc, is_execute: bool) -> Result<()> {
        self.check_tile(tile)?;
        self.grid.tile_mut(tile).core_executing = is_execute;
        Ok(())
    }

    /// Replace host-edge port/channel tables on the given shim columns.
    ///
    /// The engine takes ownership of the mappings; later edits by the
    /// caller have no effect on the routing state.
    pub fn config_host_edge_constraints(&mut self, user: &HostEdgeConstraints) -> Result<()> {
        for c in &user.constraints {
            let tile = TileLoc::new(c.column, self.geometry.shim_row);
            let constraint = self.grid.get_mut(tile).ok_or_else(|| {
                RouteError::InvalidArgs(format!("column {} is outside the array", c.column))
            })?;
            let table: HostEdgeList = c.mappings.iter().copied().collect();
            if c.host_to_aie {
                constraint.host2aie_ports = table;
            } else {
                constraint.aie2host_ports = table;
            }
        }
        Ok(())
    }

    /// Clear all host-edge constraints on every shim column.
    pub fn reset_host_edge_constraints(&mut self) -> Result<()> {
        let shim_row = self.geometry.shim_row;
        for col in 0..self.geometry.num_cols {
            let constraint = self.grid.tile_mut(TileLoc::new(col, shim_row));
            constraint.host2aie_ports.clear();
            constraint.aie2host_ports.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimBackend;

    fn router() -> Router<SimBackend> {
        let geometry = DeviceGeometry::aie2(8);
        Router::new(geometry, SimBackend::new(geometry))
    }

    #[test]
    fn test_route_same_tile_is_noop() {
        let mut r = router();
        let tile = TileLoc::new(2, 3);
        r.route(None, tile, tile).unwrap();
        assert!(r.find_route(tile, tile).is_none());
        assert_eq!(r.backend().connection_count(tile), 0);
        // The compute endpoint is still marked executable.
        assert!(r.constraint(tile).unwrap().core_executing);
    }

    #[test]
    fn test_route_out_of_bounds() {
        let mut r = router();
        let err = r.route(None, TileLoc::new(2, 3), TileLoc::new(40, 3)).unwrap_err();
        assert!(matches!(err, RouteError::InvalidArgs(_)));
    }

    #[test]
    fn test_already_routed() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();
        let err = r.route(None, src, dst).unwrap_err();
        assert!(matches!(err, RouteError::AlreadyRouted { .. }));
        // The reverse direction is a different route and still allowed.
        r.route(None, dst, src).unwrap();
    }

    #[test]
    fn test_commit_records_ports_and_steps() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();

        let path = r.find_route(src, dst).unwrap();
        assert_eq!(path.mm2s_port, 0);
        assert_eq!(path.s2mm_port, 0);
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[0].tile, src);
        assert_eq!(path.steps[0].source_dir, Direction::Dma);
        assert_eq!(path.steps[2].tile, dst);
        assert_eq!(path.steps[2].dest_dir, Direction::Dma);

        // Hardware saw the three enables.
        assert!(r.backend().has_connection(src, Direction::Dma, 0, Direction::East, 0));
        assert!(r.backend().has_connection(
            TileLoc::new(3, 3),
            Direction::West,
            0,
            Direction::East,
            0
        ));
        assert!(r.backend().has_connection(dst, Direction::West, 0, Direction::Dma, 0));
    }

    #[test]
    fn test_route_claims_and_deroute_releases() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));

        let before_src = r.constraint(src).unwrap().port_mask(Direction::East, Polarity::Master);
        r.route(None, src, dst).unwrap();
        assert_ne!(
            r.constraint(src).unwrap().port_mask(Direction::East, Polarity::Master),
            before_src
        );
        assert!(!r.constraint(src).unwrap().port_available(Direction::Dma, Polarity::Slave, 0));

        r.deroute(src, dst, false).unwrap();
        assert_eq!(
            r.constraint(src).unwrap().port_mask(Direction::East, Polarity::Master),
            before_src
        );
        assert!(r.constraint(src).unwrap().port_available(Direction::Dma, Polarity::Slave, 0));
        assert!(r.find_route(src, dst).is_none());
        assert_eq!(r.backend().connection_count(src), 0);
    }

    #[test]
    fn test_deroute_without_route() {
        let mut r = router();
        let err = r.deroute(TileLoc::new(2, 3), TileLoc::new(4, 3), false).unwrap_err();
        assert!(matches!(err, RouteError::NoRoute { .. }));
    }

    #[test]
    fn test_deroute_clears_core_config() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();
        assert!(r.constraint(src).unwrap().core_executing);
        r.deroute(src, dst, true).unwrap();
        assert!(!r.constraint(src).unwrap().core_executing);
        assert!(!r.constraint(dst).unwrap().core_executing);
    }

    #[test]
    fn test_port_exhaustion() {
        let mut r = router();
        let src = TileLoc::new(2, 3);
        // The compute DMA byte has two MM2S ports; the third route from the
        // same source cannot claim one.
        r.route(None, src, TileLoc::new(3, 3)).unwrap();
        r.route(None, src, TileLoc::new(2, 4)).unwrap();
        let err = r.route(None, src, TileLoc::new(4, 3)).unwrap_err();
        assert!(matches!(
            err,
            RouteError::NoAvailablePort { dir: Direction::Dma, .. }
        ));
    }

    #[test]
    fn test_saturated_link_aborts_commit() {
        let mut r = router();
        // The planner prechecks the slave byte of the current tile against
        // the master byte of the neighbour; the committer intersects the
        // opposite pair. A saturated entry byte on the middle tile slips
        // past the search and aborts the commit instead.
        let middle = TileLoc::new(2, 4);
        for port in 0..8 {
            r.grid_mut().tile_mut(middle).claim_port(Direction::South, Polarity::Slave, port);
        }
        let err = r.route(None, TileLoc::new(2, 3), TileLoc::new(2, 5)).unwrap_err();
        assert!(matches!(
            err,
            RouteError::NoAvailablePort { dir: Direction::North, .. }
        ));
        // The abort left no route behind.
        assert!(r.find_route(TileLoc::new(2, 3), TileLoc::new(2, 5)).is_none());
    }

    #[test]
    fn test_switch_reset_skips_auto_configured() {
        let mut r = router();
        let (src, dst) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
        r.route(None, src, dst).unwrap();
        r.deroute(src, dst, false).unwrap();

        // auto_configured is sticky across deroute, so the sweep skips the
        // whole path.
        r.switch_reset(&[src, TileLoc::new(3, 3), dst]).unwrap();
        assert_eq!(r.backend().silent_disable_attempts(), 0);
    }

    #[test]
    fn test_switch_reset_sweeps_in_use_bits() {
        let mut r = router();
        let tile = TileLoc::new(5, 4);
        // Externally claimed ports on a never-routed tile.
        r.grid_mut().tile_mut(tile).claim_port(Direction::North, Polarity::Slave, 1);
        r.grid_mut().tile_mut(tile).claim_port(Direction::East, Polarity::Master, 2);
        r.switch_reset(&[tile]).unwrap();
        assert!(r.backend().silent_disable_attempts() > 0);
    }

    #[test]
    fn test_set_core_execute_and_run() {
        let mut r = router();
        let tile = TileLoc::new(3, 4);
        r.set_core_execute(tile, true).unwrap();
        r.run(2).unwrap();
        r.core_wait(tile).unwrap();
        r.set_core_execute(tile, false).unwrap();
        assert!(!r.constraint(tile).unwrap().core_executing);
    }

    #[test]
    fn test_host_edge_config_and_reset() {
        let mut r = router();
        let shim = TileLoc::new(1, 0);
        let user = HostEdgeConstraints {
            constraints: vec![HostEdgeConstraint {
                column: 1,
                host_to_aie: true,
                mappings: vec![PortChannel::new(5, 0)],
            }],
        };
        r.config_host_edge_constraints(&user).unwrap();
        assert_eq!(r.constraint(shim).unwrap().host2aie_ports.len(), 1);
        assert_eq!(r.constraint(shim).unwrap().host2aie_ports[0].port, 5);
        // Other direction untouched.
        assert_eq!(r.constraint(shim).unwrap().aie2host_ports.len(), 2);

        r.reset_host_edge_constraints().unwrap();
        assert!(r.constraint(shim).unwrap().host2aie_ports.is_empty());
        assert!(r.constraint(shim).unwrap().aie2host_ports.is_empty());
    }

    #[test]
    fn test_with_config_applies_description() {
        let config = DeviceConfig::parse(
            "[device]\ncolumns = 4\n\n[[host_edge]]\ncolumn = 0\ndirection = \"aie-to-host\"\nports = [[6, 1]]\n",
        )
        .unwrap();
        let r = Router::with_config(&config, SimBackend::new(config.geometry())).unwrap();
        assert_eq!(r.geometry().num_cols, 4);
        let shim = r.constraint(TileLoc::new(0, 0)).unwrap();
        assert_eq!(shim.aie2host_ports.len(), 1);
        assert_eq!(shim.aie2host_ports[0].port, 6);
        // The host-to-array side keeps its default table.
        assert_eq!(shim.host2aie_ports.len(), 2);
    }

    #[test]
    fn test_config_host_edge_bad_column() {
        let mut r = router();
        let user = HostEdgeConstraints {
            constraints: vec![HostEdgeConstraint {
                column: 99,
                host_to_aie: true,
                mappings: vec![],
            }],
        };
        assert!(matches!(
            r.config_host_edge_constraints(&user),
            Err(RouteError::InvalidArgs(_))
        ));
    }
}
