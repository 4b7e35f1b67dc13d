//! Path search over healthy links

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::config::PathConfig;
use crate::graph::TopologyGraph;
use crate::index::GraphIndex;
use crate::model::{LinkId, LinkStatus, NodeId, PathAlgorithm};
use crate::{Result, TopologyError};

/// A route through the topology
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
    pub hop_count: usize,
    /// Sum of link latencies in ms; links without a reading add nothing
    pub total_latency: f64,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct PathAnalysis {
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub algorithm: PathAlgorithm,
    pub paths: Vec<Path>,
    /// The path cap stopped enumeration early
    pub truncated: bool,
}

/// State for Dijkstra's algorithm
#[derive(Clone, Copy, PartialEq)]
struct DijkstraState {
    cost: f64,
    node: usize,
}

impl Eq for DijkstraState {}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct PathAnalyzer {
    config: PathConfig,
}

impl PathAnalyzer {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    fn traversable(&self, status: LinkStatus) -> bool {
        match status {
            LinkStatus::Up | LinkStatus::Degraded => true,
            LinkStatus::Unknown => self.config.traverse_unknown_links,
            LinkStatus::Down => false,
        }
    }

    pub fn analyze(
        &self,
        graph: &TopologyGraph,
        source: NodeId,
        target: NodeId,
        algorithm: PathAlgorithm,
    ) -> Result<PathAnalysis> {
        for node in [source, target] {
            if graph.get_node(node).is_none() {
                return Err(TopologyError::NodeNotFound {
                    topology: graph.topology_id,
                    node,
                });
            }
        }

        let index = GraphIndex::build(graph, |_| true, |l| self.traversable(l.status));
        let (Some(s), Some(t)) = (index.index_of(source), index.index_of(target)) else {
            return Err(TopologyError::Internal("path endpoints missing from index".to_string()));
        };
        let latency_of = |link: LinkId| graph.get_link(link).and_then(|l| l.latency).unwrap_or(0.0);

        let (paths, truncated) = match algorithm {
            PathAlgorithm::Shortest => (
                shortest(&index, s, t)
                    .map(|(nodes, links)| build_path(&index, nodes, links, &latency_of))
                    .into_iter()
                    .collect(),
                false,
            ),
            PathAlgorithm::All => {
                let (found, truncated) = all_simple(&index, s, t, self.config.max_paths, self.config.max_depth);
                let mut paths: Vec<Path> = found
                    .into_iter()
                    .map(|(nodes, links)| build_path(&index, nodes, links, &latency_of))
                    .collect();
                paths.sort_by(|a, b| {
                    a.hop_count
                        .cmp(&b.hop_count)
                        .then(a.total_latency.total_cmp(&b.total_latency))
                        .then_with(|| a.nodes.cmp(&b.nodes))
                        .then_with(|| a.links.cmp(&b.links))
                });
                (paths, truncated)
            }
        };

        if truncated {
            warn!(
                topology_id = %graph.topology_id,
                %source,
                %target,
                max_paths = self.config.max_paths,
                "Path enumeration hit its cap"
            );
        }
        debug!(
            topology_id = %graph.topology_id,
            %source,
            %target,
            %algorithm,
            found = paths.len(),
            "Analyzed paths"
        );

        Ok(PathAnalysis {
            source_node_id: source,
            target_node_id: target,
            algorithm,
            paths,
            truncated,
        })
    }
}

fn build_path(
    index: &GraphIndex,
    nodes: Vec<usize>,
    links: Vec<LinkId>,
    latency_of: &impl Fn(LinkId) -> f64,
) -> Path {
    Path {
        hop_count: links.len(),
        total_latency: links.iter().map(|l| latency_of(*l)).sum(),
        nodes: nodes.into_iter().map(|i| index.id(i)).collect(),
        links,
    }
}

/// Dijkstra over link weights; `None` when `to` is unreachable
fn shortest(index: &GraphIndex, from: usize, to: usize) -> Option<(Vec<usize>, Vec<LinkId>)> {
    if from == to {
        return Some((vec![from], Vec::new()));
    }

    let mut dist = vec![f64::INFINITY; index.len()];
    let mut prev: Vec<Option<(usize, LinkId)>> = vec![None; index.len()];
    let mut heap = BinaryHeap::new();
    dist[from] = 0.0;
    heap.push(DijkstraState { cost: 0.0, node: from });

    while let Some(DijkstraState { cost, node }) = heap.pop() {
        if node == to {
            let mut nodes = vec![to];
            let mut links = Vec::new();
            let mut current = to;
            while let Some((previous, link)) = prev[current] {
                links.push(link);
                nodes.push(previous);
                current = previous;
            }
            nodes.reverse();
            links.reverse();
            return Some((nodes, links));
        }
        if cost > dist[node] {
            continue;
        }
        for edge in index.neighbors(node) {
            let next_cost = cost + edge.weight;
            if next_cost < dist[edge.to] {
                dist[edge.to] = next_cost;
                prev[edge.to] = Some((node, edge.link));
                heap.push(DijkstraState {
                    cost: next_cost,
                    node: edge.to,
                });
            }
        }
    }
    None
}

/// Every simple path of at most `max_depth` hops, stopping at `max_paths`
fn all_simple(
    index: &GraphIndex,
    from: usize,
    to: usize,
    max_paths: usize,
    max_depth: usize,
) -> (Vec<(Vec<usize>, Vec<LinkId>)>, bool) {
    if from == to {
        return (vec![(vec![from], Vec::new())], false);
    }
    // hops still needed from each node; prunes branches that cannot arrive in time
    let remaining = index.hop_distances(&[to]);
    let mut search = Search {
        index,
        to,
        max_paths,
        max_depth,
        remaining,
        on_path: vec![false; index.len()],
        nodes: vec![from],
        links: Vec::new(),
        found: Vec::new(),
        truncated: false,
        stopped: false,
    };
    search.on_path[from] = true;
    search.descend(from);
    (search.found, search.truncated)
}

struct Search<'a> {
    index: &'a GraphIndex,
    to: usize,
    max_paths: usize,
    max_depth: usize,
    remaining: Vec<Option<usize>>,
    on_path: Vec<bool>,
    nodes: Vec<usize>,
    links: Vec<LinkId>,
    found: Vec<(Vec<usize>, Vec<LinkId>)>,
    /// Some path was skipped by either cap
    truncated: bool,
    stopped: bool,
}

impl Search<'_> {
    fn descend(&mut self, node: usize) {
        let index = self.index;
        for edge in index.neighbors(node) {
            if self.stopped {
                return;
            }
            if self.on_path[edge.to] {
                continue;
            }
            let hops = self.links.len() + 1;
            match self.remaining[edge.to] {
                Some(left) if hops + left <= self.max_depth => {}
                Some(_) => {
                    self.truncated = true;
                    continue;
                }
                None => continue,
            }

            if edge.to == self.to {
                // a path beyond the cap exists, so the answer is partial
                if self.found.len() >= self.max_paths {
                    self.truncated = true;
                    self.stopped = true;
                    return;
                }
                let mut nodes = self.nodes.clone();
                nodes.push(edge.to);
                let mut links = self.links.clone();
                links.push(edge.link);
                self.found.push((nodes, links));
                continue;
            }

            self.links.push(edge.link);
            self.nodes.push(edge.to);
            self.on_path[edge.to] = true;
            self.descend(edge.to);
            self.on_path[edge.to] = false;
            self.nodes.pop();
            self.links.pop();
        }
    }
}
