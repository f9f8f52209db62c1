//! In-memory simulator backend.
//!
//! `SimBackend` implements [`Backend`] against a software model of the tile
//! array: a per-tile stream-switch connection table, DMA channel queues and
//! BD slots, tile data memory, and a flat host memory region behind the shim
//! row.
//!
//! Data movement is modelled at transfer granularity rather than per stream
//! word. Whenever both sides of a transfer are armed (an MM2S BD queued on
//! an enabled source channel and an S2MM BD queued on an enabled destination
//! channel), the simulator walks the programmed circuit connections hop by
//! hop from the source port to the destination port and copies the payload
//! in one step. A transfer whose circuit is incomplete stays pending, which
//! is exactly what the pending-BD count reports.

use std::collections::VecDeque;

use super::{Backend, BackendKind, DmaDescriptor, HardwareError, MemHandle};
use crate::geometry::{ChannelDir, DeviceGeometry, Direction, TileLoc, TileType};

/// Data memory size of a compute tile (64 KiB).
const COMPUTE_TILE_MEMORY_SIZE: usize = 64 * 1024;

/// Data memory size of a memory tile (512 KiB).
const MEM_TILE_MEMORY_SIZE: usize = 512 * 1024;

/// Size of the simulated host memory behind the shim row (1 MiB).
const HOST_MEMORY_SIZE: usize = 1024 * 1024;

/// One programmed circuit connection through a tile's stream switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    slave_dir: Direction,
    slave_port: u8,
    master_dir: Direction,
    master_port: u8,
}

/// Software model of a single tile.
#[derive(Debug)]
struct SimTile {
    tile_type: TileType,
    connections: Vec<Connection>,
    bds: Vec<Option<DmaDescriptor>>,
    mm2s_queues: Vec<VecDeque<u8>>,
    s2mm_queues: Vec<VecDeque<u8>>,
    mm2s_enabled: Vec<bool>,
    s2mm_enabled: Vec<bool>,
    /// Host-edge ports enabled in the host-to-array direction
    shim_to_aie: Vec<u8>,
    /// Host-edge ports enabled in the array-to-host direction
    aie_to_shim: Vec<u8>,
    data_mem: Vec<u8>,
    core_enabled: bool,
}

impl SimTile {
    fn new(tile_type: TileType) -> Self {
        let channels = tile_type.channels_per_dir() as usize;
        let data_mem_size = match tile_type {
            TileType::Shim => 0,
            TileType::Mem => MEM_TILE_MEMORY_SIZE,
            TileType::Compute => COMPUTE_TILE_MEMORY_SIZE,
        };
        Self {
            tile_type,
            connections: Vec::new(),
            bds: vec![None; tile_type.bd_count() as usize],
            mm2s_queues: vec![VecDeque::new(); channels],
            s2mm_queues: vec![VecDeque::new(); channels],
            mm2s_enabled: vec![false; channels],
            s2mm_enabled: vec![false; channels],
            shim_to_aie: Vec::new(),
            aie_to_shim: Vec::new(),
            data_mem: vec![0u8; data_mem_size],
            core_enabled: false,
        }
    }
}

/// Allocated host memory region.
#[derive(Debug, Clone, Copy)]
struct HostRegion {
    base: usize,
    size: usize,
}

/// In-memory [`Backend`] implementation.
pub struct SimBackend {
    kind: BackendKind,
    geometry: DeviceGeometry,
    tiles: Vec<SimTile>,
    host_mem: Vec<u8>,
    regions: Vec<HostRegion>,
    host_brk: usize,
    silent_disables: usize,
}

impl SimBackend {
    /// Create a simulator for the given geometry, bare-metal addressing.
    pub fn new(geometry: DeviceGeometry) -> Self {
        Self::with_kind(geometry, BackendKind::BareMetal)
    }

    /// Create a simulator advertising a specific back-end kind.
    pub fn with_kind(geometry: DeviceGeometry, kind: BackendKind) -> Self {
        let mut tiles = Vec::with_capacity(geometry.tile_count());
        for col in 0..geometry.num_cols {
            for row in 0..geometry.num_rows {
                let _ = col;
                tiles.push(SimTile::new(geometry.tile_type(row)));
            }
        }
        Self {
            kind,
            geometry,
            tiles,
            host_mem: vec![0u8; HOST_MEMORY_SIZE],
            regions: Vec::new(),
            host_brk: 0x1000,
            silent_disables: 0,
        }
    }

    #[inline]
    fn index(&self, tile: TileLoc) -> Option<usize> {
        if self.geometry.contains(tile) {
            Some((tile.col as usize) * (self.geometry.num_rows as usize) + (tile.row as usize))
        } else {
            None
        }
    }

    #[inline]
    fn loc_of(&self, idx: usize) -> TileLoc {
        let rows = self.geometry.num_rows as usize;
        TileLoc::new((idx / rows) as u8, (idx % rows) as u8)
    }

    fn tile(&self, tile: TileLoc) -> Result<&SimTile, HardwareError> {
        self.index(tile)
            .map(|i| &self.tiles[i])
            .ok_or(HardwareError::InvalidTile(tile))
    }

    fn tile_mut(&mut self, tile: TileLoc) -> Result<&mut SimTile, HardwareError> {
        match self.index(tile) {
            Some(i) => Ok(&mut self.tiles[i]),
            None => Err(HardwareError::InvalidTile(tile)),
        }
    }

    fn region(&self, mem: MemHandle) -> Result<HostRegion, HardwareError> {
        self.regions
            .get(mem.0 as usize)
            .copied()
            .ok_or(HardwareError::BadMemHandle(mem.0))
    }

    // === Test and tooling introspection ===

    /// Number of circuit connections programmed on a tile.
    pub fn connection_count(&self, tile: TileLoc) -> usize {
        self.index(tile).map(|i| self.tiles[i].connections.len()).unwrap_or(0)
    }

    /// Whether a specific circuit connection is programmed.
    pub fn has_connection(
        &self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> bool {
        let Some(i) = self.index(tile) else { return false };
        self.tiles[i].connections.contains(&Connection {
            slave_dir,
            slave_port,
            master_dir,
            master_port,
        })
    }

    /// Whether a host-to-array shim DMA port is enabled.
    pub fn shim_to_aie_enabled(&self, tile: TileLoc, port: u8) -> bool {
        self.index(tile).map(|i| self.tiles[i].shim_to_aie.contains(&port)).unwrap_or(false)
    }

    /// Whether an array-to-host shim DMA port is enabled.
    pub fn aie_to_shim_enabled(&self, tile: TileLoc, port: u8) -> bool {
        self.index(tile).map(|i| self.tiles[i].aie_to_shim.contains(&port)).unwrap_or(false)
    }

    /// How many silenced disconnect attempts the backend has seen.
    pub fn silent_disable_attempts(&self) -> usize {
        self.silent_disables
    }

    /// Raw write into the simulated host memory (bare-metal address view).
    pub fn host_write(&mut self, addr: u64, data: &[u8]) {
        let addr = addr as usize;
        self.host_mem[addr..addr + data.len()].copy_from_slice(data);
    }

    /// Raw read from the simulated host memory (bare-metal address view).
    pub fn host_read(&self, addr: u64, buf: &mut [u8]) {
        let addr = addr as usize;
        buf.copy_from_slice(&self.host_mem[addr..addr + buf.len()]);
    }

    // === Transfer resolution ===

    /// Follow the programmed circuit from `(src_idx, channel)` to a
    /// destination tile with an armed S2MM channel.
    ///
    /// Returns `(dst_idx, dst_channel)` when the circuit is complete and the
    /// destination is ready to receive.
    fn resolve_circuit(&self, src_idx: usize, channel: u8) -> Option<(usize, u8)> {
        let src = &self.tiles[src_idx];
        let starts: Vec<Connection> = if src.tile_type == TileType::Shim {
            // Shim MM2S enters the switch on an enabled host-edge South port.
            src.connections
                .iter()
                .filter(|c| {
                    c.slave_dir == Direction::South && src.shim_to_aie.contains(&c.slave_port)
                })
                .copied()
                .collect()
        } else {
            src.connections
                .iter()
                .filter(|c| c.slave_dir == Direction::Dma && c.slave_port == channel)
                .copied()
                .collect()
        };

        'candidate: for start in starts {
            let mut idx = src_idx;
            let mut conn = start;
            for _ in 0..self.geometry.tile_count() {
                let here = &self.tiles[idx];
                match conn.master_dir {
                    Direction::Dma => {
                        let ch = conn.master_port as usize;
                        if ch < here.s2mm_queues.len()
                            && here.s2mm_enabled[ch]
                            && !here.s2mm_queues[ch].is_empty()
                        {
                            return Some((idx, conn.master_port));
                        }
                        continue 'candidate;
                    }
                    Direction::South if here.tile_type == TileType::Shim => {
                        // Array-to-host edge: any armed S2MM channel drains it.
                        if !here.aie_to_shim.contains(&conn.master_port) {
                            continue 'candidate;
                        }
                        for ch in 0..here.s2mm_queues.len() {
                            if here.s2mm_enabled[ch] && !here.s2mm_queues[ch].is_empty() {
                                return Some((idx, ch as u8));
                            }
                        }
                        continue 'candidate;
                    }
                    dir => {
                        let here_loc = self.loc_of(idx);
                        let Some(next) =
                            here_loc.step(dir, self.geometry.num_cols, self.geometry.num_rows)
                        else {
                            continue 'candidate;
                        };
                        let next_idx = match self.index(next) {
                            Some(i) => i,
                            None => continue 'candidate,
                        };
                        let entry_dir = dir.opposite();
                        let entry_port = conn.master_port;
                        match self.tiles[next_idx]
                            .connections
                            .iter()
                            .find(|c| c.slave_dir == entry_dir && c.slave_port == entry_port)
                        {
                            Some(c) => {
                                conn = *c;
                                idx = next_idx;
                            }
                            None => continue 'candidate,
                        }
                    }
                }
            }
        }
        None
    }

    /// Deliver every transfer whose circuit is complete.
    fn try_deliver(&mut self) {
        loop {
            let mut plan: Option<(usize, u8, usize, u8)> = None;
            'scan: for src_idx in 0..self.tiles.len() {
                let channels = self.tiles[src_idx].mm2s_queues.len();
                for ch in 0..channels {
                    if !self.tiles[src_idx].mm2s_enabled[ch]
                        || self.tiles[src_idx].mm2s_queues[ch].is_empty()
                    {
                        continue;
                    }
                    if let Some((dst_idx, dst_ch)) = self.resolve_circuit(src_idx, ch as u8) {
                        plan = Some((src_idx, ch as u8, dst_idx, dst_ch));
                        break 'scan;
                    }
                }
            }

            let Some((src_idx, src_ch, dst_idx, dst_ch)) = plan else { break };

            let src_bd_id = self.tiles[src_idx].mm2s_queues[src_ch as usize].pop_front();
            let dst_bd_id = self.tiles[dst_idx].s2mm_queues[dst_ch as usize].pop_front();
            let src_bd = src_bd_id.and_then(|bd| self.tiles[src_idx].bds[bd as usize]);
            let dst_bd = dst_bd_id.and_then(|bd| self.tiles[dst_idx].bds[bd as usize]);
            let (Some(src_desc), Some(dst_desc)) = (src_bd, dst_bd) else { continue };

            let len = src_desc.len.min(dst_desc.len) as usize;
            let mut payload = vec![0u8; len];
            {
                let src_addr = src_desc.addr as usize;
                if self.tiles[src_idx].tile_type == TileType::Shim {
                    payload.copy_from_slice(&self.host_mem[src_addr..src_addr + len]);
                } else {
                    payload
                        .copy_from_slice(&self.tiles[src_idx].data_mem[src_addr..src_addr + len]);
                }
            }
            {
                let dst_addr = dst_desc.addr as usize;
                if self.tiles[dst_idx].tile_type == TileType::Shim {
                    self.host_mem[dst_addr..dst_addr + len].copy_from_slice(&payload);
                } else {
                    self.tiles[dst_idx].data_mem[dst_addr..dst_addr + len]
                        .copy_from_slice(&payload);
                }
            }
            log::debug!(
                "sim: delivered {} bytes {} ch{} -> {} ch{}",
                len,
                self.loc_of(src_idx),
                src_ch,
                self.loc_of(dst_idx),
                dst_ch
            );
        }
    }
}

impl Backend for SimBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn stream_connect_enable(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), HardwareError> {
        let conn = Connection { slave_dir, slave_port, master_dir, master_port };
        let t = self.tile_mut(tile)?;
        if !t.connections.contains(&conn) {
            t.connections.push(conn);
        }
        log::trace!(
            "sim: connect {} {} {} -> {} {}",
            tile, slave_dir, slave_port, master_dir, master_port
        );
        Ok(())
    }

    fn stream_connect_disable(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), HardwareError> {
        let conn = Connection { slave_dir, slave_port, master_dir, master_port };
        let t = self.tile_mut(tile)?;
        match t.connections.iter().position(|c| *c == conn) {
            Some(pos) => {
                t.connections.remove(pos);
                Ok(())
            }
            None => Err(HardwareError::NoSuchConnection {
                tile,
                slave_dir,
                slave_port,
                master_dir,
                master_port,
            }),
        }
    }

    fn stream_connect_disable_silent(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) {
        self.silent_disables += 1;
        let conn = Connection { slave_dir, slave_port, master_dir, master_port };
        if let Ok(t) = self.tile_mut(tile) {
            if let Some(pos) = t.connections.iter().position(|c| *c == conn) {
                t.connections.remove(pos);
            }
        }
    }

    fn enable_shim_dma_to_aie(&mut self, tile: TileLoc, port: u8) -> Result<(), HardwareError> {
        let t = self.tile_mut(tile)?;
        if t.tile_type != TileType::Shim {
            return Err(HardwareError::InvalidTile(tile));
        }
        if !t.shim_to_aie.contains(&port) {
            t.shim_to_aie.push(port);
        }
        Ok(())
    }

    fn enable_aie_to_shim_dma(&mut self, tile: TileLoc, port: u8) -> Result<(), HardwareError> {
        let t = self.tile_mut(tile)?;
        if t.tile_type != TileType::Shim {
            return Err(HardwareError::InvalidTile(tile));
        }
        if !t.aie_to_shim.contains(&port) {
            t.aie_to_shim.push(port);
        }
        Ok(())
    }

    fn dma_write_bd(
        &mut self,
        tile: TileLoc,
        bd: u8,
        desc: &DmaDescriptor,
    ) -> Result<(), HardwareError> {
        let host_limit = self.host_mem.len() as u64;
        let t = self.tile_mut(tile)?;
        if bd as usize >= t.bds.len() {
            return Err(HardwareError::InvalidBd { tile, bd });
        }
        let limit = if t.tile_type == TileType::Shim {
            host_limit
        } else {
            t.data_mem.len() as u64
        };
        let in_bounds = desc
            .addr
            .checked_add(desc.len as u64)
            .map(|end| end <= limit)
            .unwrap_or(false);
        if !in_bounds {
            return Err(HardwareError::AddressOutOfBounds { addr: desc.addr, limit });
        }
        t.bds[bd as usize] = Some(*desc);
        Ok(())
    }

    fn dma_push_bd(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
        bd: u8,
    ) -> Result<(), HardwareError> {
        {
            let t = self.tile_mut(tile)?;
            if channel as usize >= t.mm2s_queues.len() {
                return Err(HardwareError::InvalidChannel { tile, channel });
            }
            if t.bds.get(bd as usize).map(|b| b.is_none()).unwrap_or(true) {
                return Err(HardwareError::InvalidBd { tile, bd });
            }
            match dir {
                ChannelDir::MM2S => t.mm2s_queues[channel as usize].push_back(bd),
                ChannelDir::S2MM => t.s2mm_queues[channel as usize].push_back(bd),
            }
        }
        self.try_deliver();
        Ok(())
    }

    fn dma_channel_enable(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
    ) -> Result<(), HardwareError> {
        {
            let t = self.tile_mut(tile)?;
            if channel as usize >= t.mm2s_enabled.len() {
                return Err(HardwareError::InvalidChannel { tile, channel });
            }
            match dir {
                ChannelDir::MM2S => t.mm2s_enabled[channel as usize] = true,
                ChannelDir::S2MM => t.s2mm_enabled[channel as usize] = true,
            }
        }
        self.try_deliver();
        Ok(())
    }

    fn dma_pending_bd_count(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
    ) -> Result<u8, HardwareError> {
        let t = self.tile(tile)?;
        if channel as usize >= t.mm2s_queues.len() {
            return Err(HardwareError::InvalidChannel { tile, channel });
        }
        let count = match dir {
            ChannelDir::MM2S => t.mm2s_queues[channel as usize].len(),
            ChannelDir::S2MM => t.s2mm_queues[channel as usize].len(),
        };
        Ok(count as u8)
    }

    fn core_enable(&mut self, tile: TileLoc) -> Result<(), HardwareError> {
        self.tile_mut(tile)?.core_enabled = true;
        Ok(())
    }

    fn core_done(&mut self, tile: TileLoc) -> Result<bool, HardwareError> {
        // Simulated cores retire instantly.
        self.tile(tile)?;
        Ok(true)
    }

    fn mem_allocate(&mut self, size: u32) -> Result<MemHandle, HardwareError> {
        let base = (self.host_brk + 0xF) & !0xF;
        if base + size as usize > self.host_mem.len() {
            return Err(HardwareError::OutOfMemory);
        }
        self.host_brk = base + size as usize;
        self.regions.push(HostRegion { base, size: size as usize });
        Ok(MemHandle((self.regions.len() - 1) as u32))
    }

    fn mem_dev_addr(&self, mem: MemHandle) -> Result<u64, HardwareError> {
        Ok(self.region(mem)?.base as u64)
    }

    fn mem_sync_for_cpu(&mut self, mem: MemHandle) -> Result<(), HardwareError> {
        self.region(mem).map(|_| ())
    }

    fn mem_sync_for_dev(&mut self, mem: MemHandle) -> Result<(), HardwareError> {
        self.region(mem).map(|_| ())
    }

    fn mem_write(&mut self, mem: MemHandle, offset: u32, data: &[u8]) -> Result<(), HardwareError> {
        let region = self.region(mem)?;
        if offset as usize + data.len() > region.size {
            return Err(HardwareError::AddressOutOfBounds {
                addr: offset as u64,
                limit: region.size as u64,
            });
        }
        let start = region.base + offset as usize;
        self.host_mem[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn mem_read(&self, mem: MemHandle, offset: u32, buf: &mut [u8]) -> Result<(), HardwareError> {
        let region = self.region(mem)?;
        if offset as usize + buf.len() > region.size {
            return Err(HardwareError::AddressOutOfBounds {
                addr: offset as u64,
                limit: region.size as u64,
            });
        }
        let start = region.base + offset as usize;
        buf.copy_from_slice(&self.host_mem[start..start + buf.len()]);
        Ok(())
    }

    fn data_mem_write(
        &mut self,
        tile: TileLoc,
        addr: u32,
        data: &[u8],
    ) -> Result<(), HardwareError> {
        let t = self.tile_mut(tile)?;
        let end = addr as usize + data.len();
        if end > t.data_mem.len() {
            return Err(HardwareError::AddressOutOfBounds {
                addr: addr as u64,
                limit: t.data_mem.len() as u64,
            });
        }
        t.data_mem[addr as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn data_mem_read(
        &mut self,
        tile: TileLoc,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), HardwareError> {
        let t = self.tile(tile)?;
        let end = addr as usize + buf.len();
        if end > t.data_mem.len() {
            return Err(HardwareError::AddressOutOfBounds {
                addr: addr as u64,
                limit: t.data_mem.len() as u64,
            });
        }
        buf.copy_from_slice(&t.data_mem[addr as usize..end]);
        Ok(())
    }
}
