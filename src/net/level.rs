//! Static network graph
//!
//! A level is an immutable set of nodes and undirected edges plus the
//! objectives placed on them. `Level::new` validates a `LevelDefinition` and
//! builds index tables so lookups during a step never scan the node list.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Node identifier as written in level files
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

/// Edge identifier as written in level files
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(NodeId);
string_id!(EdgeId);

/// Role of a node in the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Checkpoint,
    Goal,
    #[default]
    Normal,
}

/// Link properties that change cost and traversal behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeTag {
    /// Damages the packet unless mitigated
    Firewall,
    /// Slows traversal and accrues latency penalty
    Latency,
    /// Carries a dynamic load that inflates cost
    Congestion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelNode {
    pub id: NodeId,
    pub label: String,
    pub position: Vec3,
    #[serde(default)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub base_cost: f32,
    #[serde(default)]
    pub tags: Vec<EdgeTag>,
}

impl LevelEdge {
    pub fn has_tag(&self, tag: EdgeTag) -> bool {
        self.tags.contains(&tag)
    }

    /// The endpoint opposite `node`, if `node` is an endpoint
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.from == node {
            Some(&self.to)
        } else if &self.to == node {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// A rotating scanner anchored on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnifferHazard {
    pub id: String,
    pub node_id: NodeId,
    pub radius: f32,
    pub sweep_speed: f32,
    #[serde(default)]
    pub phase_offset: f32,
}

/// Level file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub id: String,
    pub name: String,
    pub nodes: Vec<LevelNode>,
    pub edges: Vec<LevelEdge>,
    #[serde(default)]
    pub sniffers: Vec<SnifferHazard>,
    #[serde(default)]
    pub collectible_node_ids: Vec<NodeId>,
    #[serde(default)]
    pub required_checkpoint_ids: Vec<NodeId>,
    pub start_node_id: NodeId,
    pub goal_node_id: NodeId,
    pub speedrun_target_seconds: f32,
}

/// Reasons a level definition is rejected
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate node id `{0}`")]
    DuplicateNode(NodeId),
    #[error("duplicate edge id `{0}`")]
    DuplicateEdge(EdgeId),
    #[error("edge `{edge}` references unknown node `{node}`")]
    DanglingEdge { edge: EdgeId, node: NodeId },
    #[error("edge `{edge}` has invalid base cost {cost}")]
    InvalidCost { edge: EdgeId, cost: f32 },
    #[error("{role} references unknown node `{node}`")]
    UnknownNode { role: &'static str, node: NodeId },
}

/// Validated, indexed level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LevelDefinition", into = "LevelDefinition")]
pub struct Level {
    definition: LevelDefinition,
    node_index: BTreeMap<NodeId, usize>,
    edge_index: BTreeMap<EdgeId, usize>,
    /// Per node: (edge index, neighbor node index) in edge declaration order
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Level {
    pub fn new(definition: LevelDefinition) -> Result<Self, LevelError> {
        let mut node_index = BTreeMap::new();
        for (i, node) in definition.nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(LevelError::DuplicateNode(node.id.clone()));
            }
        }

        let mut edge_index = BTreeMap::new();
        let mut adjacency = vec![Vec::new(); definition.nodes.len()];
        for (i, edge) in definition.edges.iter().enumerate() {
            if edge_index.insert(edge.id.clone(), i).is_some() {
                return Err(LevelError::DuplicateEdge(edge.id.clone()));
            }
            if !(edge.base_cost.is_finite() && edge.base_cost > 0.0) {
                return Err(LevelError::InvalidCost {
                    edge: edge.id.clone(),
                    cost: edge.base_cost,
                });
            }
            let endpoint = |node: &NodeId| {
                node_index.get(node).copied().ok_or_else(|| LevelError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: node.clone(),
                })
            };
            let from = endpoint(&edge.from)?;
            let to = endpoint(&edge.to)?;
            adjacency[from].push((i, to));
            if from != to {
                adjacency[to].push((i, from));
            }
        }

        let require = |role: &'static str, node: &NodeId| {
            if node_index.contains_key(node) {
                Ok(())
            } else {
                Err(LevelError::UnknownNode {
                    role,
                    node: node.clone(),
                })
            }
        };
        require("start node", &definition.start_node_id)?;
        require("goal node", &definition.goal_node_id)?;
        for node in &definition.required_checkpoint_ids {
            require("required checkpoint", node)?;
        }
        for node in &definition.collectible_node_ids {
            require("collectible", node)?;
        }
        for sniffer in &definition.sniffers {
            require("sniffer", &sniffer.node_id)?;
        }

        Ok(Self {
            definition,
            node_index,
            edge_index,
            adjacency,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, LevelError> {
        let definition: LevelDefinition = serde_json::from_str(json)?;
        Self::new(definition)
    }

    pub fn definition(&self) -> &LevelDefinition {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn nodes(&self) -> &[LevelNode] {
        &self.definition.nodes
    }

    pub fn edges(&self) -> &[LevelEdge] {
        &self.definition.edges
    }

    pub fn sniffers(&self) -> &[SnifferHazard] {
        &self.definition.sniffers
    }

    pub fn start_node_id(&self) -> &NodeId {
        &self.definition.start_node_id
    }

    pub fn goal_node_id(&self) -> &NodeId {
        &self.definition.goal_node_id
    }

    pub fn required_checkpoint_ids(&self) -> &[NodeId] {
        &self.definition.required_checkpoint_ids
    }

    pub fn is_collectible(&self, node: &NodeId) -> bool {
        self.definition.collectible_node_ids.contains(node)
    }

    pub fn speedrun_target_seconds(&self) -> f32 {
        self.definition.speedrun_target_seconds
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn edge_index(&self, id: &EdgeId) -> Option<usize> {
        self.edge_index.get(id).copied()
    }

    pub fn node(&self, id: &NodeId) -> Option<&LevelNode> {
        self.node_index(id).map(|i| &self.definition.nodes[i])
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&LevelEdge> {
        self.edge_index(id).map(|i| &self.definition.edges[i])
    }

    pub fn node_at(&self, index: usize) -> &LevelNode {
        &self.definition.nodes[index]
    }

    pub fn edge_at(&self, index: usize) -> &LevelEdge {
        &self.definition.edges[index]
    }

    /// `(edge index, neighbor index)` pairs for a node, in declaration order
    pub fn neighbors(&self, node_index: usize) -> &[(usize, usize)] {
        &self.adjacency[node_index]
    }

    /// First edge joining `a` and `b` in either direction
    pub fn edge_between(&self, a: &NodeId, b: &NodeId) -> Option<&LevelEdge> {
        let ai = self.node_index(a)?;
        let bi = self.node_index(b)?;
        self.adjacency[ai]
            .iter()
            .find(|&&(_, neighbor)| neighbor == bi)
            .map(|&(edge, _)| &self.definition.edges[edge])
    }
}

impl TryFrom<LevelDefinition> for Level {
    type Error = LevelError;

    fn try_from(definition: LevelDefinition) -> Result<Self, Self::Error> {
        Self::new(definition)
    }
}

impl From<Level> for LevelDefinition {
    fn from(level: Level) -> Self {
        level.definition
    }
}

/// The first network: two checkpoints, two collectibles, three sniffers
pub fn network01() -> LevelDefinition {
    fn node(id: &str, label: &str, x: f32, z: f32, kind: NodeKind) -> LevelNode {
        LevelNode {
            id: id.into(),
            label: label.to_owned(),
            position: Vec3::new(x, 0.0, z),
            kind,
        }
    }
    fn edge(id: &str, from: &str, to: &str, base_cost: f32, tags: &[EdgeTag]) -> LevelEdge {
        LevelEdge {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            base_cost,
            tags: tags.to_vec(),
        }
    }
    fn sniffer(id: &str, node_id: &str, radius: f32, sweep_speed: f32, phase_offset: f32) -> SnifferHazard {
        SnifferHazard {
            id: id.to_owned(),
            node_id: node_id.into(),
            radius,
            sweep_speed,
            phase_offset,
        }
    }

    use EdgeTag::*;
    use NodeKind::*;

    LevelDefinition {
        id: "network01".to_owned(),
        name: "Backbone Breach".to_owned(),
        nodes: vec![
            node("n_start", "Ingress", 0.0, 0.0, Start),
            node("n_a", "Edge Switch", 4.0, 2.0, Normal),
            node("n_b", "Auth Relay", 8.0, 4.0, Normal),
            node("n_c", "Checkpoint Alpha", 8.0, -2.0, Checkpoint),
            node("n_d", "Cache Array", 12.0, -3.0, Normal),
            node("n_e", "Mirror Hub", 6.0, 7.0, Normal),
            node("n_f", "Cold Storage", 11.0, 8.0, Normal),
            node("n_g", "Load Balancer", 14.0, 2.0, Normal),
            node("n_h", "Checkpoint Beta", 16.0, -1.0, Checkpoint),
            node("n_i", "Telemetry Sink", 18.0, 5.0, Normal),
            node("n_j", "Backup Link", 16.0, 9.0, Normal),
            node("n_k", "Outer Gateway", 21.0, 8.0, Normal),
            node("n_goal", "Core Vault", 24.0, 3.0, Goal),
        ],
        edges: vec![
            edge("e_start_a", "n_start", "n_a", 2.0, &[]),
            edge("e_a_b", "n_a", "n_b", 2.2, &[Firewall]),
            edge("e_a_c", "n_a", "n_c", 2.4, &[]),
            edge("e_b_g", "n_b", "n_g", 2.6, &[]),
            edge("e_c_d", "n_c", "n_d", 2.0, &[Congestion]),
            edge("e_c_g", "n_c", "n_g", 2.8, &[]),
            edge("e_d_h", "n_d", "n_h", 2.2, &[]),
            edge("e_g_h", "n_g", "n_h", 1.8, &[Latency]),
            edge("e_h_i", "n_h", "n_i", 2.4, &[]),
            edge("e_i_goal", "n_i", "n_goal", 2.8, &[Congestion]),
            edge("e_h_goal", "n_h", "n_goal", 3.6, &[Firewall]),
            edge("e_a_e", "n_a", "n_e", 2.8, &[]),
            edge("e_e_f", "n_e", "n_f", 2.6, &[Latency]),
            edge("e_f_j", "n_f", "n_j", 2.4, &[]),
            edge("e_j_k", "n_j", "n_k", 2.2, &[]),
            edge("e_k_goal", "n_k", "n_goal", 2.6, &[]),
        ],
        sniffers: vec![
            sniffer("s_cache", "n_d", 4.0, 1.3, 0.0),
            sniffer("s_balancer", "n_g", 3.5, 0.9, 1.7),
            sniffer("s_gateway", "n_k", 4.0, 1.1, 3.1),
        ],
        collectible_node_ids: vec!["n_f".into(), "n_i".into()],
        required_checkpoint_ids: vec!["n_c".into(), "n_h".into()],
        start_node_id: "n_start".into(),
        goal_node_id: "n_goal".into(),
        speedrun_target_seconds: 60.0,
    }
}
