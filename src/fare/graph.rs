use std::collections::{HashMap, HashSet};

use crate::odpt::{
    fare::{FareSegment, Fares},
    station::{StationId, StationRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Fare,
    /// Free change between lines at the same physical station.
    Transfer,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub fares: Fares,
    pub kind: EdgeKind,
}

/// Undirected fare multigraph, stored as paired directed edges.
#[derive(Debug, Default)]
pub struct FareGraph {
    ids: Vec<StationId>,
    index: HashMap<StationId, usize>,
    edges: Vec<Edge>,
    edges_out: Vec<Vec<usize>>,
}

impl FareGraph {
    pub fn build(segments: &[FareSegment], stations: &[StationRecord]) -> Self {
        let mut graph = Self::default();

        for station in stations {
            graph.add_node(&station.id);
        }

        for segment in segments {
            if segment.from == segment.to {
                continue;
            }
            let from = graph.add_node(&segment.from);
            let to = graph.add_node(&segment.to);
            graph.add_pair(from, to, segment.fares, EdgeKind::Fare);
        }

        let mut transfers = HashSet::new();
        for station in stations {
            let Some(from) = graph.node(&station.id) else {
                continue;
            };

            for connecting in &station.connecting_stations {
                let Some(to) = graph.node(connecting) else {
                    continue;
                };
                if from == to || !transfers.insert((from.min(to), from.max(to))) {
                    continue;
                }
                graph.add_pair(from, to, Fares::ZERO, EdgeKind::Transfer);
            }
        }

        graph
    }

    fn add_node(&mut self, id: &StationId) -> usize {
        if let Some(&node) = self.index.get(id) {
            return node;
        }

        let node = self.ids.len();
        self.ids.push(id.clone());
        self.index.insert(id.clone(), node);
        self.edges_out.push(vec![]);
        node
    }

    fn add_pair(&mut self, a: usize, b: usize, fares: Fares, kind: EdgeKind) {
        for (from, to) in [(a, b), (b, a)] {
            self.edges_out[from].push(self.edges.len());
            self.edges.push(Edge {
                from,
                to,
                fares,
                kind,
            });
        }
    }

    pub fn nodes(&self) -> usize {
        self.ids.len()
    }

    pub fn node(&self, id: &StationId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, node: usize) -> &StationId {
        &self.ids[node]
    }

    pub fn edge(&self, edge: usize) -> &Edge {
        &self.edges[edge]
    }

    /// Edge indices leaving `node`.
    pub fn edges_out(&self, node: usize) -> &[usize] {
        &self.edges_out[node]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
