//! Shortest-path routing with dynamic edge costs
//!
//! Dijkstra over the undirected edge set using a `BinaryHeap` (min-heap via
//! reversed ordering). Distances and back-pointers live in `Vec`s indexed by
//! node position in the level.
//!
//! Edge costs depend on tags, the current congestion snapshot and the pinned
//! set. The snapshot is read-only during a search.
//!
//! Ties between equal-distance frontier nodes go to the lower node index
//! (declaration order in the level file), and a node's predecessor is only
//! replaced by a strictly cheaper path. Routes in symmetric graphs are
//! therefore stable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use super::level::{EdgeId, EdgeTag, Level, LevelEdge, NodeId};
use crate::tuning::NetBalance;

/// Smallest cost any edge can have before the pin discount
pub const MIN_EDGE_COST: f32 = 0.05;

/// A planned path, anchor first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    /// One edge per hop (`nodes.len() - 1`)
    pub edges: Vec<EdgeId>,
    pub total_cost: f32,
}

/// Cost terms taken from the balance table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub firewall_penalty: f32,
    pub latency_penalty: f32,
    pub congestion_weight: f32,
    pub pin_multiplier: f32,
}

impl From<&NetBalance> for CostWeights {
    fn from(balance: &NetBalance) -> Self {
        Self {
            firewall_penalty: balance.firewall_cost_penalty,
            latency_penalty: balance.latency_cost_penalty,
            congestion_weight: balance.congestion_cost_weight,
            pin_multiplier: balance.pin_cost_multiplier,
        }
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        Self::from(&NetBalance::default())
    }
}

/// Dynamic inputs to a search
#[derive(Debug, Clone, Copy)]
pub struct RouteOptions<'a> {
    pub pinned: &'a BTreeSet<EdgeId>,
    pub congestion: &'a BTreeMap<EdgeId, f32>,
    pub weights: CostWeights,
}

/// Cost of crossing `edge` under the given options
///
/// `max(0.05, base * (1 + load * weight) + firewall + latency) * pin`
pub fn traversal_cost(edge: &LevelEdge, options: &RouteOptions<'_>) -> f32 {
    let weights = &options.weights;

    let mut cost = edge.base_cost;
    if edge.has_tag(EdgeTag::Congestion) {
        let load = options.congestion.get(&edge.id).copied().unwrap_or(0.0);
        cost *= 1.0 + load * weights.congestion_weight;
    }
    if edge.has_tag(EdgeTag::Firewall) {
        cost += weights.firewall_penalty;
    }
    if edge.has_tag(EdgeTag::Latency) {
        cost += weights.latency_penalty;
    }

    let cost = cost.max(MIN_EDGE_COST);
    if options.pinned.contains(&edge.id) {
        cost * weights.pin_multiplier
    } else {
        cost
    }
}

/// Frontier entry (min-heap via reversed ordering)
struct OpenEntry {
    node: usize,
    distance: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest distance, then lowest index, is "greatest".
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Cheapest route from `start` to `destination`
///
/// Returns `None` when either node is unknown or the destination is not
/// reachable. `start == destination` is a zero-cost single-node route.
pub fn find_route(
    level: &Level,
    start: &NodeId,
    destination: &NodeId,
    options: &RouteOptions<'_>,
) -> Option<Route> {
    if start == destination {
        return Some(Route {
            nodes: vec![start.clone()],
            edges: Vec::new(),
            total_cost: 0.0,
        });
    }

    let start_index = level.node_index(start)?;
    let goal_index = level.node_index(destination)?;
    let n = level.nodes().len();

    // Edge costs are fixed for the duration of the search
    let edge_costs: Vec<f32> = level
        .edges()
        .iter()
        .map(|edge| traversal_cost(edge, options))
        .collect();

    let mut distance = vec![f32::INFINITY; n];
    // came_from[node] = (previous node, edge index used to get there)
    let mut came_from: Vec<Option<(usize, usize)>> = vec![None; n];
    let mut closed = vec![false; n];

    distance[start_index] = 0.0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        node: start_index,
        distance: 0.0,
    });

    while let Some(current) = open.pop() {
        let ci = current.node;
        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        if ci == goal_index {
            break;
        }

        for &(edge_index, neighbor) in level.neighbors(ci) {
            if closed[neighbor] {
                continue;
            }
            let candidate = distance[ci] + edge_costs[edge_index];
            if candidate < distance[neighbor] {
                distance[neighbor] = candidate;
                came_from[neighbor] = Some((ci, edge_index));
                open.push(OpenEntry {
                    node: neighbor,
                    distance: candidate,
                });
            }
        }
    }

    if !closed[goal_index] {
        return None;
    }

    let mut nodes = vec![level.node_at(goal_index).id.clone()];
    let mut edges = Vec::new();
    let mut cursor = goal_index;
    while cursor != start_index {
        let (previous, edge_index) = came_from[cursor]?;
        nodes.push(level.node_at(previous).id.clone());
        edges.push(level.edge_at(edge_index).id.clone());
        cursor = previous;
    }
    nodes.reverse();
    edges.reverse();

    Some(Route {
        nodes,
        edges,
        total_cost: distance[goal_index],
    })
}
