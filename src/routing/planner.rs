//! BFS path planner.
//!
//! Finds the shortest legal path between two tiles on the 4-neighbour grid.
//! A hop is traversable when the current tile's slave byte for the travel
//! direction and the neighbour's mirrored master byte share at least one
//! free port (the concrete port pair is chosen later by the committer), the
//! neighbour is on the grid, unvisited, and not blacklisted.
//!
//! When a whitelist is supplied, a reconstructed path is rejected unless
//! every non-source tile on it is whitelisted, and the search continues.

use std::collections::VecDeque;

use crate::geometry::{Direction, Polarity, TileLoc};
use crate::routing::grid::ConstraintGrid;

/// User-supplied route constraints.
#[derive(Debug, Clone, Default)]
pub struct RouteConstraints {
    /// Tiles the path must not cross
    pub blacklist: Vec<TileLoc>,
    /// If non-empty, every non-source tile of the path must be listed here
    pub whitelist: Vec<TileLoc>,
}

impl RouteConstraints {
    /// Constraints with only a blacklist.
    pub fn with_blacklist(blacklist: Vec<TileLoc>) -> Self {
        Self { blacklist, whitelist: Vec::new() }
    }

    /// Constraints with only a whitelist.
    pub fn with_whitelist(whitelist: Vec<TileLoc>) -> Self {
        Self { blacklist: Vec::new(), whitelist }
    }

    #[inline]
    fn is_blacklisted(&self, tile: TileLoc) -> bool {
        self.blacklist.contains(&tile)
    }

    #[inline]
    fn is_whitelisted(&self, tile: TileLoc) -> bool {
        self.whitelist.contains(&tile)
    }
}

/// Predecessor map and visited flags for one search.
struct Search {
    rows: usize,
    visited: Vec<bool>,
    pred: Vec<Option<TileLoc>>,
}

impl Search {
    fn new(cols: usize, rows: usize) -> Self {
        Self { rows, visited: vec![false; cols * rows], pred: vec![None; cols * rows] }
    }

    #[inline]
    fn idx(&self, tile: TileLoc) -> usize {
        (tile.col as usize) * self.rows + (tile.row as usize)
    }
}

/// Whether the hop from `current` towards `dir` can carry a connection.
fn traversable(
    grid: &ConstraintGrid,
    constraints: Option<&RouteConstraints>,
    search: &Search,
    current: TileLoc,
    adj: TileLoc,
    dir: Direction,
) -> bool {
    if search.visited[search.idx(adj)] {
        return false;
    }
    if let Some(c) = constraints {
        if c.is_blacklisted(adj) {
            return false;
        }
    }
    let slave = grid.tile(current).port_mask(dir, Polarity::Slave);
    let master = grid.tile(adj).port_mask(dir.opposite(), Polarity::Master);
    slave & master != 0
}

/// Walk the predecessor chain and check the whitelist on every non-source
/// tile.
fn all_whitelisted(
    constraints: &RouteConstraints,
    search: &Search,
    source: TileLoc,
    destination: TileLoc,
) -> bool {
    let mut at = destination;
    while at != source {
        if !constraints.is_whitelisted(at) {
            return false;
        }
        match search.pred[search.idx(at)] {
            Some(prev) => at = prev,
            None => return false,
        }
    }
    true
}

/// Find the shortest admissible path from `source` to `destination`.
///
/// Returns the tile sequence including both endpoints, the empty path when
/// `source == destination`, or `None` when no path is admissible.
pub(crate) fn find_shortest_path(
    grid: &ConstraintGrid,
    constraints: Option<&RouteConstraints>,
    source: TileLoc,
    destination: TileLoc,
) -> Option<Vec<TileLoc>> {
    if source == destination {
        return Some(Vec::new());
    }

    let cols = grid.cols() as usize;
    let rows = grid.rows() as usize;
    let mut search = Search::new(cols, rows);
    let mut queue = VecDeque::with_capacity(cols * rows);

    log::debug!("finding shortest path from {} to {}", source, destination);

    let source_idx = search.idx(source);
    search.visited[source_idx] = true;
    queue.push_back(source);
    let mut found = false;

    'bfs: while let Some(current) = queue.pop_front() {
        for dir in Direction::CARDINALS {
            let Some(adj) = current.step(dir, grid.cols(), grid.rows()) else { continue };
            if !traversable(grid, constraints, &search, current, adj, dir) {
                continue;
            }
            let adj_idx = search.idx(adj);
            search.visited[adj_idx] = true;
            search.pred[adj_idx] = Some(current);

            if adj == destination {
                let whitelist_ok = match constraints {
                    Some(c) if !c.whitelist.is_empty() => {
                        all_whitelisted(c, &search, source, destination)
                    }
                    _ => true,
                };
                if whitelist_ok {
                    found = true;
                    break 'bfs;
                }
                // Reject this arrival and keep searching; leave the
                // destination claimable by another predecessor.
                search.visited[adj_idx] = false;
                continue;
            }
            queue.push_back(adj);
        }
    }

    if !found {
        log::debug!("no admissible path from {} to {}", source, destination);
        return None;
    }

    let mut path = Vec::new();
    let mut at = destination;
    while at != source {
        path.push(at);
        at = search.pred[search.idx(at)]?;
    }
    path.push(source);
    path.reverse();

    log::debug!("shortest path found, length {}", path.len());
    Some(path)
}
