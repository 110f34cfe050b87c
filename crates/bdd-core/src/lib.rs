//! # bdd-core: model for state-estimation bad-data detection
//!
//! Provides the network graph, the measurement inventory, the solved-state
//! container and the statistics backends consumed by `bdd-algo`.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: Buses, Generators (gen), Loads (load)
//! - **Edges**: Branches
//!
//! Loads and generators are attached to buses by id only. For the bad-data
//! test the interesting topological facts are which bus is the reference,
//! how many terminals each bus has (1 for single-phase, 3 for three-phase,
//! ...) and which buses carry an injection at all.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bdd_core::*;
//!
//! let mut network = Network::new();
//!
//! let slack = network.graph.add_node(Node::Bus(
//!     Bus::new(BusId::new(1), "Source", BusType::Reference).with_terminals(3),
//! ));
//! let feeder = network.graph.add_node(Node::Bus(
//!     Bus::new(BusId::new(2), "Feeder", BusType::Pq).with_terminals(3),
//! ));
//!
//! network.graph.add_node(Node::Gen(Gen::new(GenId::new(1), "Grid", BusId::new(1))));
//! network.graph.add_node(Node::Load(Load::new(LoadId::new(1), "House", BusId::new(2))));
//!
//! network.graph.add_edge(
//!     slack,
//!     feeder,
//!     Edge::Branch(Branch::new(BranchId::new(1), "Line 1-2", BusId::new(1), BusId::new(2))),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`measurement`] - Measurements and their per-phase distributions
//! - [`solution`] - Solved state and the typed [`SolutionLookup`] accessor
//! - [`stats`] - Chi-squared quantile backends
//! - [`error`] - [`BddError`] / [`BddResult`]

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod error;
pub mod measurement;
pub mod solution;
pub mod stats;

pub use error::{BddError, BddResult};
pub use measurement::{
    ComponentKind, Distribution, Measurement, MeasurementId, MeasurementSet, Moments,
};
pub use petgraph::graph::NodeIndex;
pub use solution::{MeasurementResult, ResidualRecord, Solution, SolutionLookup};
pub use stats::{SeriesBackend, StatrsBackend, StatsBackend, StatsKind};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);

macro_rules! impl_id {
    ($($id:ident),*) => {$(
        impl $id {
            #[inline]
            pub fn new(value: usize) -> Self {
                $id(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }
    )*};
}

impl_id!(BusId, BranchId, GenId, LoadId);

/// Bus classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Pq,
    Pv,
    /// Angle reference (slack) bus
    #[serde(alias = "slack", alias = "ref")]
    Reference,
    Isolated,
}

// Basic component structs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bus_type: BusType,
    /// Terminal (conductor) labels; the length is the bus's phase count
    #[serde(default = "default_terminals")]
    pub terminals: Vec<usize>,
}

fn default_terminals() -> Vec<usize> {
    vec![1]
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            bus_type: BusType::Pq,
            terminals: default_terminals(),
        }
    }
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>, bus_type: BusType) -> Self {
        Self {
            id,
            name: name.into(),
            bus_type,
            ..Self::default()
        }
    }

    /// Label terminals `1..=count`.
    pub fn with_terminals(mut self, count: usize) -> Self {
        self.terminals = (1..=count).collect();
        self
    }

    #[inline]
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.bus_type == BusType::Reference
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    #[serde(default)]
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
}

impl Branch {
    pub fn new(id: BranchId, name: impl Into<String>, from_bus: BusId, to_bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            from_bus,
            to_bus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gen {
    pub id: GenId,
    #[serde(default)]
    pub name: String,
    pub bus: BusId,
}

impl Gen {
    pub fn new(id: GenId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    #[serde(default)]
    pub name: String,
    pub bus: BusId,
}

impl Load {
    pub fn new(id: LoadId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
        }
    }
}

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
}

// Enum to represent different types of edges in the graph
#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
}

/// Flat, serializable description of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkData {
    #[serde(default, alias = "bus")]
    pub buses: Vec<Bus>,
    #[serde(default, alias = "load")]
    pub loads: Vec<Load>,
    #[serde(default, alias = "gen", alias = "generators")]
    pub gens: Vec<Gen>,
    #[serde(default, alias = "branch")]
    pub branches: Vec<Branch>,
}

/// The power network graph
#[derive(Debug, Default)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
        }
    }

    /// Build the graph from a flat description.
    ///
    /// Bus ids must be unique and every branch endpoint must name a bus in the
    /// description.
    pub fn from_data(data: NetworkData) -> BddResult<Self> {
        let mut network = Network::new();
        let mut index: HashMap<BusId, NodeIndex> = HashMap::with_capacity(data.buses.len());

        for bus in data.buses {
            let id = bus.id;
            let node = network.graph.add_node(Node::Bus(bus));
            if index.insert(id, node).is_some() {
                return Err(BddError::Network(format!(
                    "duplicate bus id {}",
                    id.value()
                )));
            }
        }
        for load in data.loads {
            network.graph.add_node(Node::Load(load));
        }
        for gen in data.gens {
            network.graph.add_node(Node::Gen(gen));
        }

        let endpoint = |bus: BusId| {
            index.get(&bus).copied().ok_or_else(|| {
                BddError::Network(format!("branch references unknown bus {}", bus.value()))
            })
        };
        for branch in data.branches {
            let from = endpoint(branch.from_bus)?;
            let to = endpoint(branch.to_bus)?;
            network.graph.add_edge(from, to, Edge::Branch(branch));
        }

        Ok(network)
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(b) => {
                    stats.num_buses += 1;
                    stats.num_terminals += b.terminal_count();
                    if b.is_reference() {
                        stats.num_reference_buses += 1;
                    }
                }
                Node::Gen(_) => stats.num_gens += 1,
                Node::Load(_) => stats.num_loads += 1,
            }
        }

        stats.num_branches = self.graph.edge_count();
        stats
    }

    /// Get all buses as a vector
    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Buses keyed by id
    pub fn bus_index(&self) -> HashMap<BusId, &Bus> {
        self.buses().into_iter().map(|b| (b.id, b)).collect()
    }

    /// Buses flagged as the angle reference
    pub fn reference_buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) if b.is_reference() => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Get all generators as a vector
    pub fn generators(&self) -> Vec<&Gen> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    /// Get all loads as a vector
    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }
}

/// Statistics about a network's size
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_terminals: usize,
    pub num_reference_buses: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub num_branches: usize,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses ({} terminals, {} reference), {} branches, {} gens, {} loads",
            self.num_buses,
            self.num_terminals,
            self.num_reference_buses,
            self.num_branches,
            self.num_gens,
            self.num_loads
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_data() -> NetworkData {
        NetworkData {
            buses: vec![
                Bus::new(BusId::new(1), "Bus 1", BusType::Reference).with_terminals(3),
                Bus::new(BusId::new(2), "Bus 2", BusType::Pq).with_terminals(3),
            ],
            loads: vec![Load::new(LoadId::new(1), "Load 1", BusId::new(2))],
            gens: vec![Gen::new(GenId::new(1), "Gen 1", BusId::new(1))],
            branches: vec![Branch::new(
                BranchId::new(1),
                "Line 1-2",
                BusId::new(1),
                BusId::new(2),
            )],
        }
    }

    #[test]
    fn test_network_creation() {
        let mut network = Network::new();
        let bus1 = network
            .graph
            .add_node(Node::Bus(Bus::new(BusId(0), "Bus 1", BusType::Reference)));
        let bus2 = network
            .graph
            .add_node(Node::Bus(Bus::new(BusId(1), "Bus 2", BusType::Pq)));
        network.graph.add_edge(
            bus1,
            bus2,
            Edge::Branch(Branch::new(BranchId(0), "Branch 1-2", BusId(0), BusId(1))),
        );

        assert_eq!(network.graph.node_count(), 2);
        assert_eq!(network.graph.edge_count(), 1);

        if let Node::Bus(b) = network.graph[bus1].clone() {
            assert_eq!(b.name, "Bus 1");
            assert_eq!(b.terminal_count(), 1);
        } else {
            panic!("Expected Bus node");
        }
    }

    #[test]
    fn test_from_data_and_stats() {
        let network = Network::from_data(two_bus_data()).unwrap();
        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_terminals, 6);
        assert_eq!(stats.num_reference_buses, 1);
        assert_eq!(stats.num_gens, 1);
        assert_eq!(stats.num_loads, 1);
        assert_eq!(stats.num_branches, 1);
        assert!(stats.to_string().contains("2 buses (6 terminals, 1 reference)"));
    }

    #[test]
    fn test_duplicate_bus_rejected() {
        let mut data = two_bus_data();
        data.buses.push(Bus::new(BusId::new(2), "Dup", BusType::Pq));
        let err = Network::from_data(data).unwrap_err();
        assert!(err.to_string().contains("duplicate bus id 2"));
    }

    #[test]
    fn test_dangling_branch_rejected() {
        let mut data = two_bus_data();
        data.branches
            .push(Branch::new(BranchId::new(2), "Stub", BusId::new(2), BusId::new(9)));
        let err = Network::from_data(data).unwrap_err();
        assert!(matches!(err, BddError::Network(_)));
        assert!(err.to_string().contains("unknown bus 9"));
    }

    #[test]
    fn test_accessors() {
        let network = Network::from_data(two_bus_data()).unwrap();
        assert_eq!(network.buses().len(), 2);
        assert_eq!(network.loads().len(), 1);
        assert_eq!(network.generators().len(), 1);
        assert_eq!(network.reference_buses()[0].id, BusId::new(1));
        let index = network.bus_index();
        assert_eq!(index[&BusId::new(2)].name, "Bus 2");
        assert!(!index.contains_key(&BusId::new(3)));
    }

    #[test]
    fn test_bus_type_aliases() {
        let bus: Bus = serde_json::from_str(r#"{ "id": 4, "bus_type": "slack" }"#).unwrap();
        assert!(bus.is_reference());
        assert_eq!(bus.terminals, vec![1]);
    }

    #[test]
    fn test_network_document_aliases() {
        let json = r#"{
            "bus": [ { "id": 1, "bus_type": "reference", "terminals": [1, 2, 3] } ],
            "gen": [ { "id": 1, "bus": 1 } ]
        }"#;
        let data: NetworkData = serde_json::from_str(json).unwrap();
        assert_eq!(data.buses[0].terminal_count(), 3);
        assert_eq!(data.gens.len(), 1);
        assert!(data.loads.is_empty());
    }
}
