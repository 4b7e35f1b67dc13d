//! Dense index view of a topology graph
//!
//! Algorithms work on `usize` node indices assigned in ascending id order,
//! so every traversal is deterministic regardless of map iteration order.

use std::collections::{HashMap, VecDeque};

use crate::graph::TopologyGraph;
use crate::model::{LinkId, NodeId, TopologyLink, TopologyNode};

/// One direction of a link in the undirected adjacency
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub to: usize,
    pub link: LinkId,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    ids: Vec<NodeId>,
    slots: HashMap<NodeId, usize>,
    adjacency: Vec<Vec<Edge>>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl GraphIndex {
    /// Index every node and every link
    pub fn full(graph: &TopologyGraph) -> Self {
        Self::build(graph, |_| true, |_| true)
    }

    /// Index the nodes accepted by `keep_node` and the links accepted by
    /// `keep_link` whose endpoints were both kept
    pub fn build<N, L>(graph: &TopologyGraph, keep_node: N, keep_link: L) -> Self
    where
        N: Fn(&TopologyNode) -> bool,
        L: Fn(&TopologyLink) -> bool,
    {
        let mut ids: Vec<NodeId> = graph
            .nodes
            .values()
            .filter(|n| keep_node(n))
            .map(|n| n.id)
            .collect();
        ids.sort_unstable();

        let slots: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut adjacency = vec![Vec::new(); ids.len()];
        let mut outgoing = vec![Vec::new(); ids.len()];
        let mut incoming = vec![Vec::new(); ids.len()];

        let mut links: Vec<&TopologyLink> = graph.links.values().filter(|l| keep_link(l)).collect();
        links.sort_unstable_by_key(|l| l.id);

        for link in links {
            let (Some(&s), Some(&t)) = (
                slots.get(&link.source_node_id),
                slots.get(&link.target_node_id),
            ) else {
                continue;
            };
            if s == t {
                continue;
            }
            let weight = link.weight();
            adjacency[s].push(Edge {
                to: t,
                link: link.id,
                weight,
            });
            adjacency[t].push(Edge {
                to: s,
                link: link.id,
                weight,
            });
            outgoing[s].push(t);
            incoming[t].push(s);
        }

        Self {
            ids,
            slots,
            adjacency,
            outgoing,
            incoming,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn id(&self, index: usize) -> NodeId {
        self.ids[index]
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn neighbors(&self, index: usize) -> &[Edge] {
        &self.adjacency[index]
    }

    pub fn degree(&self, index: usize) -> usize {
        self.adjacency[index].len()
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.outgoing[index]
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.incoming[index]
    }

    /// Connected components of the undirected graph, each sorted, ordered by smallest member
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.len()];
        let mut components = Vec::new();
        for start in 0..self.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut members = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for edge in &self.adjacency[current] {
                    if !seen[edge.to] {
                        seen[edge.to] = true;
                        members.push(edge.to);
                        queue.push_back(edge.to);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Hop distance from the nearest of `sources` to every node
    pub fn hop_distances(&self, sources: &[usize]) -> Vec<Option<usize>> {
        let mut distances = vec![None; self.len()];
        let mut queue = VecDeque::new();
        for &source in sources {
            if distances[source].is_none() {
                distances[source] = Some(0);
                queue.push_back(source);
            }
        }
        while let Some(current) = queue.pop_front() {
            let next = distances[current].map(|d| d + 1);
            for edge in &self.adjacency[current] {
                if distances[edge.to].is_none() {
                    distances[edge.to] = next;
                    queue.push_back(edge.to);
                }
            }
        }
        distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::model::{LinkStatus, NodeKind};

    #[test]
    fn test_indices_follow_id_order() {
        let mut graph = chain(2);
        node(&mut graph, 0, NodeKind::Cloud);
        let index = GraphIndex::full(&graph);
        assert_eq!(index.ids(), &[NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(index.index_of(NodeId(2)), Some(2));
        assert_eq!(index.index_of(NodeId(7)), None);
    }

    #[test]
    fn test_link_filter_drops_edges() {
        let mut graph = chain(3);
        graph.get_link_mut(LinkId(2)).unwrap().status = LinkStatus::Down;
        let index = GraphIndex::build(&graph, |_| true, |l| l.status != LinkStatus::Down);
        assert_eq!(index.degree(1), 1);
        assert_eq!(index.components(), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_direction_is_tracked() {
        let graph = chain(3);
        let index = GraphIndex::full(&graph);
        assert_eq!(index.successors(0), &[1]);
        assert_eq!(index.predecessors(0), &[] as &[usize]);
        assert_eq!(index.predecessors(2), &[1]);
    }

    #[test]
    fn test_multi_source_hop_distances() {
        let mut graph = chain(5);
        node(&mut graph, 6, NodeKind::Device);
        let index = GraphIndex::full(&graph);
        let distances = index.hop_distances(&[0, 4]);
        assert_eq!(
            distances,
            vec![Some(0), Some(1), Some(2), Some(1), Some(0), None]
        );
    }
}
