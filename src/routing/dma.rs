//! Data movement over committed routes.
//!
//! `move_data` drives one transfer end to end: it resolves the programmed
//! route, reserves a BD on each endpoint, programs and writes the endpoint
//! descriptors, pushes them onto the MM2S (source) and S2MM (destination)
//! channel queues, and polls the destination until the transfer drains.
//! Both BDs are returned to the pool before the call ends.
//!
//! Shim endpoints address host memory. On bare-metal and socket back-ends
//! the transfer object is a raw address; on hosted back-ends it is a
//! backend-allocated memory instance addressed at offset 0.

use crate::backend::{Backend, BackendKind, DmaDescriptor, MemHandle};
use crate::error::{Result, RouteError};
use crate::geometry::{ChannelDir, TileLoc};
use crate::routing::Router;

/// A transfer endpoint handed to [`Router::move_data`].
#[derive(Debug, Clone, Copy)]
pub enum TransferObject {
    /// A raw device-visible address: a data-memory offset for compute and
    /// memory tiles, a host address for shim tiles on raw-address back-ends
    DevAddr(u64),
    /// A backend-allocated host memory region (shim endpoints on hosted
    /// back-ends)
    HostMem(MemHandle),
}

impl<B: Backend> Router<B> {
    /// Build and enable the endpoint descriptor for one side of a transfer.
    fn endpoint_descriptor(
        &mut self,
        tile: TileLoc,
        obj: TransferObject,
        size: u32,
    ) -> Result<DmaDescriptor> {
        let is_shim = self.grid.tile(tile).is_shim();
        let raw_addr_backend =
            matches!(self.backend.kind(), BackendKind::BareMetal | BackendKind::Socket);

        let mut desc = DmaDescriptor::new();
        match obj {
            TransferObject::DevAddr(addr) => desc.set_addr_len(addr, size),
            TransferObject::HostMem(mem) => {
                let base = self.backend.mem_dev_addr(mem)?;
                if is_shim && !raw_addr_backend {
                    desc.set_addr_offset_len(base, 0, size);
                } else {
                    desc.set_addr_len(base, size);
                }
            }
        }
        desc.enable();
        Ok(desc)
    }

    /// DMA channel serving an endpoint port of a route.
    ///
    /// Non-shim endpoint ports are the channel; shim ports translate
    /// through the host-edge table.
    fn endpoint_channel(&self, tile: TileLoc, port: u8, host_to_aie: bool) -> u8 {
        let constraint = self.grid.tile(tile);
        if constraint.is_shim() {
            constraint.host_edge_channel(host_to_aie, port)
        } else {
            port
        }
    }

    /// Move `size` bytes from `source_obj` on `source` to `dest_obj` on
    /// `destination` over the route programmed between them.
    ///
    /// Fails with [`RouteError::NoRoute`] when no route exists and
    /// [`RouteError::NoBd`] when an endpoint BD pool is exhausted. Blocks
    /// until the destination reports zero pending BDs.
    pub fn move_data(
        &mut self,
        source: TileLoc,
        source_obj: TransferObject,
        size: u32,
        dest_obj: TransferObject,
        destination: TileLoc,
    ) -> Result<()> {
        self.check_tile(source)?;
        self.check_tile(destination)?;

        let (mm2s_port, s2mm_port) =
            match self.grid.tile(source).routes.find(source, destination) {
                Some(path) => (path.mm2s_port, path.s2mm_port),
                None => {
                    log::error!(
                        "move data failed: no programmed path between {source} and {destination}"
                    );
                    return Err(RouteError::NoRoute { src: source, destination });
                }
            };

        let source_bd = self.grid.tile_mut(source).find_free_bd().ok_or_else(|| {
            log::error!("move data failed: no available BD on tile {source}");
            RouteError::NoBd(source)
        })?;
        let dest_bd = self.grid.tile_mut(destination).find_free_bd().ok_or_else(|| {
            log::error!("move data failed: no available BD on tile {destination}");
            RouteError::NoBd(destination)
        })?;

        let source_desc = self.endpoint_descriptor(source, source_obj, size)?;
        log::debug!("[command] dma_write_bd({source}, {source_bd})");
        self.backend.dma_write_bd(source, source_bd, &source_desc)?;

        let dest_desc = self.endpoint_descriptor(destination, dest_obj, size)?;
        log::debug!("[command] dma_write_bd({destination}, {dest_bd})");
        self.backend.dma_write_bd(destination, dest_bd, &dest_desc)?;

        let source_channel = self.endpoint_channel(source, mm2s_port, true);
        let dest_channel = self.endpoint_channel(destination, s2mm_port, false);

        log::debug!(
            "[command] dma_channel_push_bd({source}, {source_channel}, DMA_MM2S, {source_bd})"
        );
        self.backend.dma_push_bd(source, source_channel, ChannelDir::MM2S, source_bd)?;
        self.backend.dma_channel_enable(source, source_channel, ChannelDir::MM2S)?;
        self.grid.tile_mut(source).mm2s_in_use.push(source_channel);

        log::debug!(
            "[command] dma_channel_push_bd({destination}, {dest_channel}, DMA_S2MM, {dest_bd})"
        );
        self.backend.dma_push_bd(destination, dest_channel, ChannelDir::S2MM, dest_bd)?;
        self.backend.dma_channel_enable(destination, dest_channel, ChannelDir::S2MM)?;
        self.grid.tile_mut(destination).s2mm_in_use.push(dest_channel);

        loop {
            let pending =
                self.backend.dma_pending_bd_count(destination, dest_channel, ChannelDir::S2MM)?;
            if pending == 0 {
                break;
            }
            log::trace!(
                "pending BDs ({pending}) on channel {dest_channel}, destination {destination}"
            );
        }

        let src_constraint = self.grid.tile_mut(source);
        if let Some(pos) = src_constraint.mm2s_in_use.iter().position(|&c| c == source_channel) {
            src_constraint.mm2s_in_use.remove(pos);
        }
        let dst_constraint = self.grid.tile_mut(destination);
        if let Some(pos) = dst_constraint.s2mm_in_use.iter().position(|&c| c == dest_channel) {
            dst_constraint.s2mm_in_use.remove(pos);
        }

        self.grid.tile_mut(destination).release_bd(dest_bd);
        self.grid.tile_mut(source).release_bd(source_bd);
        log::debug!("data routed successfully between {source} and {destination}");
        Ok(())
    }

    /// Block until the DMA accesses of the route between `source` and
    /// `destination` have drained.
    ///
    /// Polls the destination S2MM channel when `is_s2mm`, the source MM2S
    /// channel otherwise.
    pub fn route_dma_wait(
        &mut self,
        source: TileLoc,
        destination: TileLoc,
        is_s2mm: bool,
    ) -> Result<()> {
        self.check_tile(source)?;
        self.check_tile(destination)?;

        let (mm2s_port, s2mm_port) =
            match self.grid.tile(source).routes.find(source, destination) {
                Some(path) => (path.mm2s_port, path.s2mm_port),
                None => {
                    log::error!(
                        "dma wait failed: no programmed path between {source} and {destination}"
                    );
                    return Err(RouteError::NoRoute { src: source, destination });
                }
            };

        let (tile, channel, dir) = if is_s2mm {
            (destination, self.endpoint_channel(destination, s2mm_port, false), ChannelDir::S2MM)
        } else {
            (source, self.endpoint_channel(source, mm2s_port, true), ChannelDir::MM2S)
        };

        loop {
            let pending = self.backend.dma_pending_bd_count(tile, channel, dir)?;
            if pending == 0 {
                return Ok(());
            }
            log::debug!(
                "pending BDs ({pending}) on {} channel {channel}, source {source}, destination {destination}",
                dir.name()
            );
        }
    }
}
