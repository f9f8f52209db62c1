//! Hardware backend interface.
//!
//! The routing engine never touches registers directly; every hardware
//! effect goes through the [`Backend`] trait. The trait surface is exactly
//! the set of downstream primitives the engine consumes:
//!
//! - stream-switch circuit connect/disconnect (plus a silenced disconnect
//!   used by the blanket switch reset)
//! - shim DMA port enables on the host edge
//! - DMA buffer-descriptor write, queue push, channel enable, and
//!   pending-count query
//! - core enable / completion query
//! - host memory allocation and sync, tile data-memory block access
//!
//! The backend identity ([`BackendKind`]) is inspected in exactly one place:
//! shim-tile DMA descriptors encode a raw address on bare-metal and socket
//! back-ends and a memory-instance offset everywhere else.

pub mod sim;

pub use sim::SimBackend;

use crate::geometry::{ChannelDir, Direction, TileLoc};
use thiserror::Error;

/// Platform I/O back-end identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Direct register access, addresses are raw pointers
    BareMetal,
    /// Socket-attached simulator, addresses are raw pointers
    Socket,
    /// Kernel-driver back-end, host buffers are memory instances
    Hosted,
}

/// Error from a downstream hardware call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("invalid tile {0}")]
    InvalidTile(TileLoc),

    #[error("invalid {dir} port {port} on tile {tile}")]
    InvalidPort { tile: TileLoc, dir: Direction, port: u8 },

    #[error("no such stream connection on tile {tile}: {slave_dir} {slave_port} -> {master_dir} {master_port}")]
    NoSuchConnection {
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    },

    #[error("invalid DMA channel {channel} on tile {tile}")]
    InvalidChannel { tile: TileLoc, channel: u8 },

    #[error("invalid buffer descriptor {bd} on tile {tile}")]
    InvalidBd { tile: TileLoc, bd: u8 },

    #[error("address 0x{addr:08x} out of bounds (limit 0x{limit:08x})")]
    AddressOutOfBounds { addr: u64, limit: u64 },

    #[error("bad memory handle {0}")]
    BadMemHandle(u32),

    #[error("out of device memory")]
    OutOfMemory,
}

/// Handle to a backend-owned host memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemHandle(pub u32);

/// A DMA buffer descriptor under construction.
///
/// Built up by the engine and handed to [`Backend::dma_write_bd`], which
/// packs it into the hardware slot. Address interpretation depends on the
/// endpoint: tile-local offset for compute and memory tiles, host address
/// for shim tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DmaDescriptor {
    /// Transfer base address
    pub addr: u64,
    /// Transfer length in bytes
    pub len: u32,
    /// Descriptor is enabled
    pub valid: bool,
}

impl DmaDescriptor {
    /// Create an empty, disabled descriptor.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a direct address and length.
    #[inline]
    pub fn set_addr_len(&mut self, addr: u64, len: u32) {
        self.addr = addr;
        self.len = len;
    }

    /// Set an address as base-plus-offset and length.
    #[inline]
    pub fn set_addr_offset_len(&mut self, base: u64, offset: u64, len: u32) {
        self.addr = base + offset;
        self.len = len;
    }

    /// Enable the descriptor.
    #[inline]
    pub fn enable(&mut self) {
        self.valid = true;
    }
}

/// Downstream hardware primitives consumed by the routing engine.
pub trait Backend {
    /// Identity of the platform I/O back-end.
    fn kind(&self) -> BackendKind;

    // === Stream switch ===

    /// Enable a circuit connection through a tile's stream switch.
    fn stream_connect_enable(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), HardwareError>;

    /// Disable a circuit connection through a tile's stream switch.
    fn stream_connect_disable(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), HardwareError>;

    /// Error-suppressing variant of [`stream_connect_disable`].
    ///
    /// The blanket switch reset brute-forces port tuples and is expected to
    /// hit invalid combinations; this variant swallows them.
    ///
    /// [`stream_connect_disable`]: Backend::stream_connect_disable
    fn stream_connect_disable_silent(
        &mut self,
        tile: TileLoc,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    );

    /// Enable a shim DMA port in the host-to-array direction.
    fn enable_shim_dma_to_aie(&mut self, tile: TileLoc, port: u8) -> Result<(), HardwareError>;

    /// Enable a shim DMA port in the array-to-host direction.
    fn enable_aie_to_shim_dma(&mut self, tile: TileLoc, port: u8) -> Result<(), HardwareError>;

    // === DMA ===

    /// Write a descriptor into a tile's BD slot.
    fn dma_write_bd(
        &mut self,
        tile: TileLoc,
        bd: u8,
        desc: &DmaDescriptor,
    ) -> Result<(), HardwareError>;

    /// Push a BD onto a DMA channel queue.
    fn dma_push_bd(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
        bd: u8,
    ) -> Result<(), HardwareError>;

    /// Enable a DMA channel.
    fn dma_channel_enable(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
    ) -> Result<(), HardwareError>;

    /// Number of BDs still pending on a DMA channel.
    fn dma_pending_bd_count(
        &mut self,
        tile: TileLoc,
        channel: u8,
        dir: ChannelDir,
    ) -> Result<u8, HardwareError>;

    // === Core ===

    /// Enable a tile's core.
    fn core_enable(&mut self, tile: TileLoc) -> Result<(), HardwareError>;

    /// Whether a tile's core has finished executing.
    fn core_done(&mut self, tile: TileLoc) -> Result<bool, HardwareError>;

    // === Memory ===

    /// Allocate a host memory region visible to the device.
    fn mem_allocate(&mut self, size: u32) -> Result<MemHandle, HardwareError>;

    /// Device address of an allocated region.
    fn mem_dev_addr(&self, mem: MemHandle) -> Result<u64, HardwareError>;

    /// Make device writes to a region visible to the CPU.
    fn mem_sync_for_cpu(&mut self, mem: MemHandle) -> Result<(), HardwareError>;

    /// Make CPU writes to a region visible to the device.
    fn mem_sync_for_dev(&mut self, mem: MemHandle) -> Result<(), HardwareError>;

    /// CPU-side write into an allocated region.
    fn mem_write(&mut self, mem: MemHandle, offset: u32, data: &[u8]) -> Result<(), HardwareError>;

    /// CPU-side read from an allocated region.
    fn mem_read(&self, mem: MemHandle, offset: u32, buf: &mut [u8]) -> Result<(), HardwareError>;

    /// Block-write into a tile's data memory.
    fn data_mem_write(&mut self, tile: TileLoc, addr: u32, data: &[u8])
        -> Result<(), HardwareError>;

    /// Block-read from a tile's data memory.
    fn data_mem_read(
        &mut self,
        tile: TileLoc,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), HardwareError>;
}
