use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::{
    fare::graph::FareGraph,
    odpt::{fare::Fares, station::StationId},
};

#[derive(Eq, PartialEq)]
struct Node {
    cost: u64,
    seq: usize,
    index: usize,
    path: Vec<usize>,
    legs: Vec<usize>,
}

// Min-heap on cost; equal costs pop in push order.
impl Ord for Node {
    fn cmp(&self, other: &Node) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Node) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest route by IC fare, priced under all four fares.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub stations: Vec<StationId>,
    /// Edge indices into the graph, one per hop.
    pub legs: Vec<usize>,
    pub fares: Fares,
}

impl RouteResult {
    pub fn primary_cost(&self) -> u32 {
        self.fares.ic
    }
}

/// Sums every fare type along `legs`.
pub fn reprice(graph: &FareGraph, legs: &[usize]) -> Fares {
    legs.iter()
        .fold(Fares::ZERO, |acc, &e| acc + graph.edge(e).fares)
}

fn dijkstra(graph: &FareGraph, source: usize, targets: &HashSet<usize>) -> Option<Node> {
    let mut closed = vec![false; graph.nodes()];
    let mut heap = BinaryHeap::new();
    let mut seq = 0;

    heap.push(Node {
        cost: 0,
        seq,
        index: source,
        path: vec![source],
        legs: vec![],
    });

    while let Some(node) = heap.pop() {
        if closed[node.index] {
            continue;
        }
        if targets.contains(&node.index) {
            return Some(node);
        }
        closed[node.index] = true;

        for &e in graph.edges_out(node.index) {
            let edge = graph.edge(e);
            if closed[edge.to] {
                continue;
            }

            seq += 1;
            let mut path = node.path.clone();
            path.push(edge.to);
            let mut legs = node.legs.clone();
            legs.push(e);

            heap.push(Node {
                cost: node.cost + u64::from(edge.fares.ic),
                seq,
                index: edge.to,
                path,
                legs,
            });
        }
    }

    None
}

/// Searches every (source, destination) pair and keeps the cheapest route.
///
/// The route is chosen on IC fare alone and the other fares are summed along
/// that same route, so a different route could be cheaper for paper tickets.
pub fn find_cheapest(
    graph: &FareGraph,
    sources: &[StationId],
    destinations: &[StationId],
) -> Option<RouteResult> {
    let targets: HashSet<usize> = destinations.iter().filter_map(|d| graph.node(d)).collect();
    if targets.is_empty() {
        return None;
    }

    let mut seen = HashSet::new();
    let mut best: Option<Node> = None;
    for source in sources.iter().filter_map(|s| graph.node(s)) {
        if !seen.insert(source) {
            continue;
        }

        if let Some(found) = dijkstra(graph, source, &targets) {
            if best.as_ref().map_or(true, |b| found.cost < b.cost) {
                best = Some(found);
            }
        }
    }

    best.map(|node| RouteResult {
        stations: node.path.iter().map(|&n| graph.id(n).clone()).collect(),
        fares: reprice(graph, &node.legs),
        legs: node.legs,
    })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::odpt::{fare::FareSegment, station::StationRecord};

    fn id(s: &str) -> StationId {
        StationId::new(s)
    }

    fn segment(from: &str, to: &str, fares: Fares) -> FareSegment {
        FareSegment::new(id(from), id(to), fares)
    }

    fn ic(amount: u32) -> Fares {
        Fares::new(amount, amount + 10, amount / 2, amount / 2 + 5)
    }

    #[test]
    fn takes_cheaper_two_hop_route() {
        let graph = FareGraph::build(
            &[
                segment("a", "c", ic(400)),
                segment("a", "b", ic(170)),
                segment("b", "c", ic(170)),
            ],
            &[],
        );

        let route = find_cheapest(&graph, &[id("a")], &[id("c")]).unwrap();
        assert_eq!(route.stations, vec![id("a"), id("b"), id("c")]);
        assert_eq!(route.primary_cost(), 340);
        assert_eq!(route.fares, ic(170) + ic(170));
    }

    #[test]
    fn searches_every_source_and_destination() {
        let graph = FareGraph::build(
            &[
                segment("a1", "x", ic(300)),
                segment("a2", "x", ic(100)),
                segment("x", "b1", ic(200)),
                segment("x", "b2", ic(50)),
            ],
            &[],
        );

        let route =
            find_cheapest(&graph, &[id("a1"), id("a2"), id("a2")], &[id("b1"), id("b2")]).unwrap();
        assert_eq!(route.stations, vec![id("a2"), id("x"), id("b2")]);
        assert_eq!(route.primary_cost(), 150);
    }

    #[test]
    fn other_fares_follow_the_ic_route() {
        let graph = FareGraph::build(
            &[
                segment("a", "c", Fares::new(300, 300, 150, 150)),
                segment("a", "b", Fares::new(100, 500, 50, 250)),
                segment("b", "c", Fares::new(100, 500, 50, 250)),
            ],
            &[],
        );

        let route = find_cheapest(&graph, &[id("a")], &[id("c")]).unwrap();
        assert_eq!(route.fares, Fares::new(200, 1000, 100, 500));
    }

    #[test]
    fn disconnected_is_none() {
        let graph = FareGraph::build(&[segment("a", "b", ic(170)), segment("c", "d", ic(170))], &[]);
        assert!(find_cheapest(&graph, &[id("a")], &[id("d")]).is_none());
        assert!(find_cheapest(&graph, &[id("a")], &[id("missing")]).is_none());
        assert!(find_cheapest(&graph, &[id("missing")], &[id("b")]).is_none());
    }

    #[test]
    fn transfer_is_free() {
        let mut x1 = StationRecord::new(id("x1"), "X", "line1");
        x1.connecting_stations = vec![id("x2")];
        let graph = FareGraph::build(
            &[segment("a", "x1", ic(170)), segment("x2", "b", ic(200))],
            &[x1],
        );

        let route = find_cheapest(&graph, &[id("a")], &[id("b")]).unwrap();
        assert_eq!(route.stations, vec![id("a"), id("x1"), id("x2"), id("b")]);
        assert_eq!(route.primary_cost(), 370);
        assert_eq!(route.legs.len(), 3);
    }

    #[test]
    fn large_fares_saturate() {
        let graph = FareGraph::build(
            &[
                segment("a", "b", ic(3_000_000_000)),
                segment("b", "c", ic(3_000_000_000)),
            ],
            &[],
        );

        let route = find_cheapest(&graph, &[id("a")], &[id("c")]).unwrap();
        assert_eq!(route.stations.len(), 3);
        assert_eq!(route.primary_cost(), u32::MAX);
    }

    #[test]
    fn same_station_is_free() {
        let graph = FareGraph::build(&[segment("a", "b", ic(170))], &[]);
        let route = find_cheapest(&graph, &[id("a")], &[id("a")]).unwrap();
        assert_eq!(route.stations, vec![id("a")]);
        assert_eq!(route.fares, Fares::ZERO);
    }

    fn brute_force(graph: &FareGraph, at: usize, target: usize, visited: &mut Vec<bool>) -> Option<u64> {
        if at == target {
            return Some(0);
        }

        visited[at] = true;
        let mut best: Option<u64> = None;
        for &e in graph.edges_out(at) {
            let edge = graph.edge(e);
            if visited[edge.to] {
                continue;
            }
            if let Some(cost) = brute_force(graph, edge.to, target, visited) {
                let cost = cost + u64::from(edge.fares.ic);
                best = Some(best.map_or(cost, |b| b.min(cost)));
            }
        }
        visited[at] = false;
        best
    }

    #[test]
    fn matches_exhaustive_search_on_small_graphs() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..300 {
            let n = rng.random_range(2..=8);
            let names: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();

            let mut segments = vec![];
            let mut stations: Vec<StationRecord> = names
                .iter()
                .map(|name| StationRecord::new(id(name), name, "line"))
                .collect();
            for a in 0..n {
                for b in 0..n {
                    if a == b || !rng.random_bool(0.3) {
                        continue;
                    }
                    if rng.random_bool(0.15) {
                        stations[a].connecting_stations.push(id(&names[b]));
                    } else {
                        let amount = rng.random_range(0..400);
                        segments.push(segment(&names[a], &names[b], ic(amount)));
                    }
                }
            }

            let graph = FareGraph::build(&segments, &stations);
            let source = rng.random_range(0..n);
            let target = rng.random_range(0..n);

            let expected = brute_force(&graph, source, target, &mut vec![false; graph.nodes()]);
            let route = find_cheapest(&graph, &[id(&names[source])], &[id(&names[target])]);

            assert_eq!(route.as_ref().map(|r| u64::from(r.primary_cost())), expected);

            if let Some(route) = route {
                assert_eq!(route.stations.first(), Some(&id(&names[source])));
                assert_eq!(route.stations.last(), Some(&id(&names[target])));
                for (hop, &e) in route.legs.iter().enumerate() {
                    let edge = graph.edge(e);
                    assert_eq!(graph.id(edge.from), &route.stations[hop]);
                    assert_eq!(graph.id(edge.to), &route.stations[hop + 1]);
                }
                assert_eq!(route.fares, reprice(&graph, &route.legs));
            }
        }
    }
}
