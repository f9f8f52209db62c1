//! Per-tile routing constraints.
//!
//! A [`TileConstraint`] is the in-memory shadow of one tile's routable
//! resources: port-availability bit-vectors for the four cardinal
//! directions in both polarities, the endpoint DMA port states, the
//! buffer-descriptor free mask, and (on shim tiles) the host-edge
//! port/channel tables. Bit `i` set means port/BD `i` is free.
//!
//! The shadow must stay consistent with the hardware: every switch enable
//! claims the two port bits it consumes and every disable releases them.
//! Claim and release are idempotent.
//!
//! Shim tiles are special in two ways: they terminate the grid southwards
//! (their South bytes stay zero; the host edge is tracked by the
//! availability flags in the port/channel tables instead), and their
//! endpoint lookups go through those tables rather than the DMA state
//! bytes.

use smallvec::{smallvec, SmallVec};

use crate::geometry::{Direction, Polarity, TileType};
use crate::routing::db::RoutesDb;

/// A host-edge port with its DMA channel and availability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortChannel {
    pub port: u8,
    pub channel: u8,
    pub available: bool,
}

impl PortChannel {
    pub fn new(port: u8, channel: u8) -> Self {
        Self { port, channel, available: true }
    }
}

/// Host-edge table; two entries on current devices.
pub type HostEdgeList = SmallVec<[PortChannel; 2]>;

/// Which cardinal directions a tile can stream in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirSupported {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl DirSupported {
    const ALL: Self = Self { north: true, south: true, east: true, west: true };
    const NORTH_SOUTH: Self = Self { north: true, south: true, east: false, west: false };
}

/// Routing constraints and live resource state for one tile.
#[derive(Debug, Clone)]
pub struct TileConstraint {
    pub tile_type: TileType,
    /// Tile has been configured by the router; blanket resets skip it
    pub auto_configured: bool,
    /// Core is marked executable for [`Router::run`](crate::routing::Router::run)
    pub core_executing: bool,

    slave_north: u8,
    slave_south: u8,
    slave_east: u8,
    slave_west: u8,
    master_north: u8,
    master_south: u8,
    master_east: u8,
    master_west: u8,

    /// Free mask of endpoint ports into the local DMA (MM2S side)
    mm2s_state: u8,
    /// Free mask of endpoint ports out of the local DMA (S2MM side)
    s2mm_state: u8,
    shim_mm2s_state: u8,
    shim_s2mm_state: u8,

    /// BD free mask; 16 bits for compute/shim tiles, 48 for memory tiles
    bd_state: u64,

    pub dir_supported: DirSupported,
    /// Shim ports usable host-to-array; empty on non-shim tiles
    pub host2aie_ports: HostEdgeList,
    /// Shim ports usable array-to-host; empty on non-shim tiles
    pub aie2host_ports: HostEdgeList,

    /// Routes whose source is this tile
    pub routes: RoutesDb,
    /// MM2S channels with queued work
    pub mm2s_in_use: SmallVec<[u8; 4]>,
    /// S2MM channels with queued work
    pub s2mm_in_use: SmallVec<[u8; 4]>,
}

impl TileConstraint {
    /// Default shim host-to-array port/channel mapping.
    pub fn default_host2aie() -> HostEdgeList {
        smallvec![PortChannel::new(3, 0), PortChannel::new(7, 1)]
    }

    /// Default shim array-to-host port/channel mapping.
    pub fn default_aie2host() -> HostEdgeList {
        smallvec![PortChannel::new(2, 0), PortChannel::new(3, 1)]
    }

    /// Initial constraint for a tile of the given type.
    pub fn for_type(tile_type: TileType) -> Self {
        match tile_type {
            TileType::Compute => Self {
                tile_type,
                auto_configured: false,
                core_executing: false,
                slave_north: 0x0F,
                slave_south: 0x3F,
                slave_east: 0x0F,
                slave_west: 0x0F,
                master_north: 0x3F,
                master_south: 0x0F,
                master_east: 0x0F,
                master_west: 0x0F,
                mm2s_state: 0x03,
                s2mm_state: 0x03,
                shim_mm2s_state: 0x00,
                shim_s2mm_state: 0x00,
                bd_state: 0xFFFF,
                dir_supported: DirSupported::ALL,
                host2aie_ports: SmallVec::new(),
                aie2host_ports: SmallVec::new(),
                routes: RoutesDb::default(),
                mm2s_in_use: SmallVec::new(),
                s2mm_in_use: SmallVec::new(),
            },
            TileType::Mem => Self {
                tile_type,
                auto_configured: false,
                core_executing: false,
                slave_north: 0x0F,
                slave_south: 0x3F,
                slave_east: 0x00,
                slave_west: 0x00,
                master_north: 0x3F,
                master_south: 0x0F,
                master_east: 0x00,
                master_west: 0x00,
                mm2s_state: 0x3F,
                s2mm_state: 0x3F,
                shim_mm2s_state: 0x00,
                shim_s2mm_state: 0x00,
                bd_state: 0xFFFF_FFFF_FFFF,
                dir_supported: DirSupported::NORTH_SOUTH,
                host2aie_ports: SmallVec::new(),
                aie2host_ports: SmallVec::new(),
                routes: RoutesDb::default(),
                mm2s_in_use: SmallVec::new(),
                s2mm_in_use: SmallVec::new(),
            },
            TileType::Shim => Self {
                tile_type,
                auto_configured: false,
                core_executing: false,
                slave_north: 0x0F,
                slave_south: 0x00,
                slave_east: 0x0F,
                slave_west: 0x0F,
                master_north: 0x3F,
                master_south: 0x00,
                master_east: 0x0F,
                master_west: 0x0F,
                mm2s_state: 0x03,
                s2mm_state: 0x03,
                shim_mm2s_state: 0x03,
                shim_s2mm_state: 0x03,
                bd_state: 0xFFFF,
                dir_supported: DirSupported::ALL,
                host2aie_ports: Self::default_host2aie(),
                aie2host_ports: Self::default_aie2host(),
                routes: RoutesDb::default(),
                mm2s_in_use: SmallVec::new(),
                s2mm_in_use: SmallVec::new(),
            },
        }
    }

    #[inline]
    pub fn is_shim(&self) -> bool {
        self.tile_type == TileType::Shim
    }

    #[inline]
    pub fn is_mem(&self) -> bool {
        self.tile_type == TileType::Mem
    }

    // === Port bit-vector accessors ===

    /// The free mask guarding `(dir, polarity)`.
    ///
    /// `Dma` maps to the endpoint states: ingress into the local DMA is the
    /// MM2S side (slave polarity), egress out of it is the S2MM side.
    pub fn port_mask(&self, dir: Direction, polarity: Polarity) -> u8 {
        match (dir, polarity) {
            (Direction::North, Polarity::Slave) => self.slave_north,
            (Direction::South, Polarity::Slave) => self.slave_south,
            (Direction::East, Polarity::Slave) => self.slave_east,
            (Direction::West, Polarity::Slave) => self.slave_west,
            (Direction::North, Polarity::Master) => self.master_north,
            (Direction::South, Polarity::Master) => self.master_south,
            (Direction::East, Polarity::Master) => self.master_east,
            (Direction::West, Polarity::Master) => self.master_west,
            (Direction::Dma, Polarity::Slave) => self.mm2s_state,
            (Direction::Dma, Polarity::Master) => self.s2mm_state,
        }
    }

    fn port_mask_mut(&mut self, dir: Direction, polarity: Polarity) -> &mut u8 {
        match (dir, polarity) {
            (Direction::North, Polarity::Slave) => &mut self.slave_north,
            (Direction::South, Polarity::Slave) => &mut self.slave_south,
            (Direction::East, Polarity::Slave) => &mut self.slave_east,
            (Direction::West, Polarity::Slave) => &mut self.slave_west,
            (Direction::North, Polarity::Master) => &mut self.master_north,
            (Direction::South, Polarity::Master) => &mut self.master_south,
            (Direction::East, Polarity::Master) => &mut self.master_east,
            (Direction::West, Polarity::Master) => &mut self.master_west,
            (Direction::Dma, Polarity::Slave) => &mut self.mm2s_state,
            (Direction::Dma, Polarity::Master) => &mut self.s2mm_state,
        }
    }

    /// Shim DMA free masks (meaningful on shim tiles only).
    #[inline]
    pub fn shim_dma_mask(&self, polarity: Polarity) -> u8 {
        match polarity {
            Polarity::Slave => self.shim_mm2s_state,
            Polarity::Master => self.shim_s2mm_state,
        }
    }

    /// Whether port `idx` of `(dir, polarity)` is free.
    #[inline]
    pub fn port_available(&self, dir: Direction, polarity: Polarity, idx: u8) -> bool {
        self.port_mask(dir, polarity) & (1 << idx) != 0
    }

    /// Mark a port in-use. Idempotent.
    ///
    /// The shim South edge is bookkept by the host-edge availability flags,
    /// so South claims on shim tiles leave the bytes untouched.
    pub fn claim_port(&mut self, dir: Direction, polarity: Polarity, idx: u8) {
        if self.is_shim() && dir == Direction::South {
            return;
        }
        *self.port_mask_mut(dir, polarity) &= !(1 << idx);
    }

    /// Mark a port free again. Idempotent; mirror of [`claim_port`].
    ///
    /// [`claim_port`]: TileConstraint::claim_port
    pub fn release_port(&mut self, dir: Direction, polarity: Polarity, idx: u8) {
        if self.is_shim() && dir == Direction::South {
            return;
        }
        *self.port_mask_mut(dir, polarity) |= 1 << idx;
    }

    /// Claim both sides of a switch connection through this tile.
    pub fn claim_connection(
        &mut self,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) {
        self.claim_port(slave_dir, Polarity::Slave, slave_port);
        self.claim_port(master_dir, Polarity::Master, master_port);
    }

    /// Release both sides of a switch connection through this tile.
    pub fn release_connection(
        &mut self,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) {
        self.release_port(slave_dir, Polarity::Slave, slave_port);
        self.release_port(master_dir, Polarity::Master, master_port);
    }

    // === Buffer descriptors ===

    /// Number of BD slots on this tile.
    #[inline]
    pub fn bd_limit(&self) -> u8 {
        self.tile_type.bd_count()
    }

    /// The BD free mask.
    #[inline]
    pub fn bd_mask(&self) -> u64 {
        self.bd_state
    }

    /// Claim the lowest free BD slot.
    pub fn find_free_bd(&mut self) -> Option<u8> {
        for bd in 0..self.bd_limit() {
            if self.bd_state & (1 << bd) != 0 {
                self.bd_state &= !(1 << bd);
                return Some(bd);
            }
        }
        None
    }

    /// Return a BD slot to the pool. Idempotent.
    pub fn release_bd(&mut self, bd: u8) {
        if bd < self.bd_limit() {
            self.bd_state |= 1 << bd;
        }
    }

    // === Endpoint port lookup ===

    /// First free endpoint/slave port for a hop in `dir`.
    ///
    /// Shim tiles consult the host-edge table: the host-to-array list when
    /// the tile starts a route, the array-to-host list when it ends one.
    /// Otherwise the matching free mask is scanned; for `Dma` that is the
    /// MM2S byte on a starting tile and the S2MM byte on an ending tile.
    pub fn first_free_port(&self, dir: Direction, is_end_tile: bool) -> Option<u8> {
        if self.is_shim() {
            let table = if is_end_tile { &self.aie2host_ports } else { &self.host2aie_ports };
            if let Some(entry) = table.iter().find(|p| p.available) {
                return Some(entry.port);
            }
        }

        let mask = match dir {
            Direction::Dma => {
                if is_end_tile {
                    self.s2mm_state
                } else {
                    self.mm2s_state
                }
            }
            d => self.port_mask(d, Polarity::Slave),
        };
        (0..8).find(|i| mask & (1 << i) != 0)
    }

    // === Host-edge tables ===

    /// Flip the availability flag of a host-edge port.
    pub fn set_host_edge_available(&mut self, host_to_aie: bool, port: u8, available: bool) {
        let table = if host_to_aie { &mut self.host2aie_ports } else { &mut self.aie2host_ports };
        for entry in table.iter_mut() {
            if entry.port == port {
                entry.available = available;
            }
        }
    }

    /// DMA channel wired to a host-edge port, or 0 if the port is unmapped.
    pub fn host_edge_channel(&self, host_to_aie: bool, port: u8) -> u8 {
        let table = if host_to_aie { &self.host2aie_ports } else { &self.aie2host_ports };
        table.iter().find(|p| p.port == port).map(|p| p.channel).unwrap_or(0)
    }
}
