//! End-to-end automatic routing scenarios.
//!
//! Each scenario programs a route between a source and a destination tile,
//! pushes a payload through it with `move_data`, and checks the payload and
//! the constraint bookkeeping on the way back out.

use aie_router::{
    Backend, BackendKind, DeviceConfig, DeviceGeometry, Direction, Polarity, RouteConstraints,
    RouteError, Router, SimBackend, TileLoc, TileType, TransferObject,
};

const DATA_SIZE: usize = 32;

fn router() -> Router<SimBackend> {
    let _ = env_logger::try_init();
    let geometry = DeviceGeometry::aie2(8);
    Router::new(geometry, SimBackend::new(geometry))
}

fn payload() -> Vec<u8> {
    (0..DATA_SIZE * 4).map(|i| (i * 7 % 127) as u8).collect()
}

/// Every mask a route can disturb, for bit-identical round-trip checks.
fn mask_snapshot(router: &Router<SimBackend>) -> Vec<(u64, Vec<u8>, Vec<bool>)> {
    let geometry = *router.geometry();
    let mut snapshot = Vec::new();
    for col in 0..geometry.num_cols {
        for row in 0..geometry.num_rows {
            let c = router.constraint(TileLoc::new(col, row)).unwrap();
            let mut masks = Vec::new();
            for dir in [
                Direction::North,
                Direction::South,
                Direction::East,
                Direction::West,
                Direction::Dma,
            ] {
                masks.push(c.port_mask(dir, Polarity::Slave));
                masks.push(c.port_mask(dir, Polarity::Master));
            }
            let host_edge: Vec<bool> = c
                .host2aie_ports
                .iter()
                .chain(c.aie2host_ports.iter())
                .map(|p| p.available)
                .collect();
            snapshot.push((c.bd_mask(), masks, host_edge));
        }
    }
    snapshot
}

#[test]
fn aie_to_aie_single_route() {
    let mut r = router();
    let source = TileLoc::new(2, 3);
    let destination = TileLoc::new(4, 3);

    let before = mask_snapshot(&r);
    r.route(None, source, destination).unwrap();

    // BFS length 3, east hops, endpoint ports 0 on both sides.
    let path = r.find_route(source, destination).unwrap();
    assert_eq!(path.steps.len(), 3);
    assert_eq!(path.mm2s_port, 0);
    assert_eq!(path.s2mm_port, 0);
    assert_eq!(path.steps[1].tile, TileLoc::new(3, 3));
    assert_eq!(path.steps[2].tile, destination);

    let input = payload();
    r.backend_mut().data_mem_write(source, 0x2000, &input).unwrap();
    r.move_data(
        source,
        TransferObject::DevAddr(0x2000),
        input.len() as u32,
        TransferObject::DevAddr(0x2000),
        destination,
    )
    .unwrap();
    r.route_dma_wait(source, destination, true).unwrap();

    let mut output = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(destination, 0x2000, &mut output).unwrap();
    assert_eq!(input, output);

    // Teardown restores the constraint grid bit-identically.
    r.deroute(source, destination, true).unwrap();
    assert_eq!(before, mask_snapshot(&r));
    assert!(r.find_route(source, destination).is_none());
}

#[test]
fn aie_to_aie_chained_hops() {
    let mut r = router();
    let a = TileLoc::new(2, 3);
    let b = TileLoc::new(3, 3);
    let c = TileLoc::new(4, 3);

    r.route(None, a, b).unwrap();
    r.route(None, b, c).unwrap();

    let input = payload();
    r.backend_mut().data_mem_write(a, 0x2000, &input).unwrap();

    r.move_data(a, TransferObject::DevAddr(0x2000), input.len() as u32,
        TransferObject::DevAddr(0x2000), b)
        .unwrap();
    r.move_data(b, TransferObject::DevAddr(0x2000), input.len() as u32,
        TransferObject::DevAddr(0x2000), c)
        .unwrap();

    let mut output = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(c, 0x2000, &mut output).unwrap();
    assert_eq!(input, output);
}

#[test]
fn aie_to_aie_loopback() {
    let mut r = router();
    let a = TileLoc::new(2, 3);
    let b = TileLoc::new(3, 3);

    // Two disjoint routes coexist between the same pair of tiles.
    r.route(None, a, b).unwrap();
    r.route(None, b, a).unwrap();
    let forward = r.find_route(a, b).unwrap().clone();
    let reverse = r.find_route(b, a).unwrap().clone();

    // No two live steps on a shared tile occupy the same port triple.
    let mut claimed = std::collections::HashSet::new();
    for step in forward.steps.iter().chain(reverse.steps.iter()) {
        assert!(
            claimed.insert((step.tile, Polarity::Slave as u8, step.source_dir, step.source_port)),
            "slave port double-claimed on {}",
            step.tile
        );
        assert!(
            claimed.insert((step.tile, Polarity::Master as u8, step.dest_dir, step.dest_port)),
            "master port double-claimed on {}",
            step.tile
        );
    }

    let input = payload();
    r.backend_mut().data_mem_write(a, 0x1000, &input).unwrap();
    r.move_data(a, TransferObject::DevAddr(0x1000), input.len() as u32,
        TransferObject::DevAddr(0x1000), b)
        .unwrap();
    r.move_data(b, TransferObject::DevAddr(0x1000), input.len() as u32,
        TransferObject::DevAddr(0x3000), a)
        .unwrap();

    let mut round_tripped = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(a, 0x3000, &mut round_tripped).unwrap();
    assert_eq!(input, round_tripped);
}

#[test]
fn shim_to_aie_uses_host_edge() {
    let mut r = router();
    let shim = TileLoc::new(2, 0);
    let destination = TileLoc::new(4, 4);

    let before = mask_snapshot(&r);
    r.route(None, shim, destination).unwrap();

    let path = r.find_route(shim, destination).unwrap();
    // First hop enters on the default host-edge port 3.
    assert_eq!(path.steps[0].source_dir, Direction::South);
    assert_eq!(path.steps[0].source_port, 3);
    assert_eq!(path.mm2s_port, 3);
    // The terminal step drains into the compute tile's DMA.
    assert_eq!(path.steps.last().unwrap().dest_dir, Direction::Dma);
    assert!(r.backend().shim_to_aie_enabled(shim, 3));
    assert!(!r.constraint(shim).unwrap().host2aie_ports[0].available);

    // Host payload lands in the destination tile's data memory.
    let input = payload();
    r.backend_mut().host_write(0x8000, &input);
    r.move_data(
        shim,
        TransferObject::DevAddr(0x8000),
        input.len() as u32,
        TransferObject::DevAddr(0x2000),
        destination,
    )
    .unwrap();
    let mut output = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(destination, 0x2000, &mut output).unwrap();
    assert_eq!(input, output);

    r.deroute(shim, destination, false).unwrap();
    assert_eq!(before, mask_snapshot(&r));
}

#[test]
fn shim_transfer_on_hosted_backend() {
    let _ = env_logger::try_init();
    let geometry = DeviceGeometry::aie2(8);
    let mut r = Router::new(geometry, SimBackend::with_kind(geometry, BackendKind::Hosted));
    let shim = TileLoc::new(1, 0);
    let destination = TileLoc::new(1, 2);

    r.route(None, shim, destination).unwrap();

    let input = payload();
    let mem = r.backend_mut().mem_allocate(input.len() as u32).unwrap();
    r.backend_mut().mem_write(mem, 0, &input).unwrap();
    r.backend_mut().mem_sync_for_dev(mem).unwrap();

    r.move_data(
        shim,
        TransferObject::HostMem(mem),
        input.len() as u32,
        TransferObject::DevAddr(0x2000),
        destination,
    )
    .unwrap();

    let mut output = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(destination, 0x2000, &mut output).unwrap();
    assert_eq!(input, output);
}

#[test]
fn aie_to_shim_terminates_on_host_edge() {
    let mut r = router();
    let source = TileLoc::new(4, 4);
    let shim = TileLoc::new(6, 0);

    r.route(None, source, shim).unwrap();
    let path = r.find_route(source, shim).unwrap();
    let last = path.steps.last().unwrap();
    assert_eq!(last.dest_dir, Direction::South);
    // Default array-to-host mapping starts at port 2.
    assert_eq!(last.dest_port, 2);
    assert_eq!(path.s2mm_port, 2);
    assert!(r.backend().aie_to_shim_enabled(shim, 2));

    // The host-edge entry comes back on deroute.
    r.deroute(source, shim, false).unwrap();
    assert!(r.constraint(shim).unwrap().aie2host_ports[0].available);
}

#[test]
fn blacklist_avoids_shim_columns() {
    let _ = env_logger::try_init();
    let geometry = DeviceGeometry::aie2(36);
    let mut r = Router::new(geometry, SimBackend::new(geometry));
    let source = TileLoc::new(4, 4);
    let destination = TileLoc::new(35, 0);

    let constraints = RouteConstraints::with_blacklist(vec![
        TileLoc::new(10, 0),
        TileLoc::new(20, 0),
    ]);
    r.route(Some(&constraints), source, destination).unwrap();

    let path = r.find_route(source, destination).unwrap();
    assert_eq!(path.steps.first().unwrap().tile, source);
    assert_eq!(path.steps.last().unwrap().tile, destination);
    for step in &path.steps {
        assert_ne!(step.tile, TileLoc::new(10, 0));
        assert_ne!(step.tile, TileLoc::new(20, 0));
    }
}

#[test]
fn double_route_rejected() {
    let mut r = router();
    let (a, b) = (TileLoc::new(1, 2), TileLoc::new(3, 2));
    r.route(None, a, b).unwrap();
    assert!(matches!(
        r.route(None, a, b),
        Err(RouteError::AlreadyRouted { .. })
    ));
}

#[test]
fn route_to_self_moves_no_data() {
    let mut r = router();
    let tile = TileLoc::new(2, 3);
    r.route(None, tile, tile).unwrap();
    assert!(matches!(
        r.move_data(
            tile,
            TransferObject::DevAddr(0x1000),
            16,
            TransferObject::DevAddr(0x2000),
            tile
        ),
        Err(RouteError::NoRoute { .. })
    ));
}

#[test]
fn endpoint_ports_exhaust() {
    let mut r = router();
    let source = TileLoc::new(2, 3);
    // Two MM2S endpoint ports on a compute tile.
    r.route(None, source, TileLoc::new(3, 3)).unwrap();
    r.route(None, source, TileLoc::new(2, 4)).unwrap();
    assert!(matches!(
        r.route(None, source, TileLoc::new(4, 3)),
        Err(RouteError::NoAvailablePort { dir: Direction::Dma, .. })
    ));

    // Releasing one route frees the port for the next.
    r.deroute(source, TileLoc::new(3, 3), false).unwrap();
    r.route(None, source, TileLoc::new(4, 3)).unwrap();
}

#[test]
fn planner_never_crosses_mem_row_sideways() {
    let mut r = router();
    let source = TileLoc::new(1, 1);
    let destination = TileLoc::new(4, 1);
    r.route(None, source, destination).unwrap();

    for step in &r.find_route(source, destination).unwrap().steps {
        let is_mem = r.constraint(step.tile).unwrap().tile_type == TileType::Mem;
        if is_mem {
            assert!(!matches!(step.dest_dir, Direction::East | Direction::West));
            assert!(!matches!(step.source_dir, Direction::East | Direction::West));
        }
    }
}

#[test]
fn router_built_from_device_description() {
    let _ = env_logger::try_init();
    let description = r#"
[device]
columns = 8
backend = "bare-metal"

[[host_edge]]
column = 2
direction = "host-to-aie"
ports = [[5, 0], [6, 1]]
"#;
    let config = DeviceConfig::parse(description).unwrap();
    let backend = SimBackend::with_kind(config.geometry(), config.backend_kind());
    let mut r = Router::with_config(&config, backend).unwrap();

    let shim = TileLoc::new(2, 0);
    let destination = TileLoc::new(2, 3);
    r.route(None, shim, destination).unwrap();

    // The rewired host edge feeds the route through port 5 instead of the
    // default port 3; unlisted columns keep the default mapping.
    let path = r.find_route(shim, destination).unwrap();
    assert_eq!(path.mm2s_port, 5);
    assert!(r.backend().shim_to_aie_enabled(shim, 5));
    assert_eq!(r.constraint(TileLoc::new(3, 0)).unwrap().host2aie_ports[0].port, 3);

    let input = payload();
    r.backend_mut().host_write(0x6000, &input);
    r.move_data(
        shim,
        TransferObject::DevAddr(0x6000),
        input.len() as u32,
        TransferObject::DevAddr(0x2000),
        destination,
    )
    .unwrap();
    let mut output = vec![0u8; input.len()];
    r.backend_mut().data_mem_read(destination, 0x2000, &mut output).unwrap();
    assert_eq!(input, output);
}

#[test]
fn reveal_and_dump_after_routing() {
    let mut r = router();
    let (a, b) = (TileLoc::new(2, 3), TileLoc::new(4, 3));
    r.route(None, a, b).unwrap();

    let reveal = r.reveal_route(a, b).unwrap();
    assert_eq!(reveal.matches('*').count(), 3);

    let dump = r.dump_switch_info(&[a, b]).unwrap();
    assert!(dump.contains("Tile[2, 3]:"));
    assert!(dump.contains("Routing Path:"));
}
