//! In-memory graph of one topology

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::model::{
    GraphSnapshot, GroupId, LinkId, NodeId, TopologyGroup, TopologyId, TopologyLink, TopologyNode,
};

/// Nodes, links and groups of a single topology, kept in insertion order
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    pub topology_id: TopologyId,
    pub nodes: IndexMap<NodeId, TopologyNode>,
    pub links: IndexMap<LinkId, TopologyLink>,
    pub groups: IndexMap<GroupId, TopologyGroup>,
}

/// What a node deletion took with it
#[derive(Debug, Clone)]
pub struct NodeRemoval {
    pub node: TopologyNode,
    pub removed_links: Vec<TopologyLink>,
}

impl TopologyGraph {
    pub fn new(topology_id: TopologyId) -> Self {
        Self {
            topology_id,
            ..Default::default()
        }
    }

    /// Rebuild a graph from a snapshot, preserving its order
    pub fn from_snapshot(topology_id: TopologyId, snapshot: &GraphSnapshot) -> Self {
        Self {
            topology_id,
            nodes: snapshot.nodes.iter().map(|n| (n.id, n.clone())).collect(),
            links: snapshot.links.iter().map(|l| (l.id, l.clone())).collect(),
            groups: snapshot.groups.iter().map(|g| (g.id, g.clone())).collect(),
        }
    }

    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.values().cloned().collect(),
            groups: self.groups.values().cloned().collect(),
        }
    }

    pub fn add_node(&mut self, node: TopologyNode) {
        self.nodes.insert(node.id, node);
    }

    /// Remove a node together with every link that has it as an endpoint
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<NodeRemoval> {
        let node = self.nodes.shift_remove(&node_id)?;
        let incident: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.touches(node_id))
            .map(|l| l.id)
            .collect();
        let removed_links = incident
            .iter()
            .filter_map(|id| self.links.shift_remove(id))
            .collect();
        Some(NodeRemoval {
            node,
            removed_links,
        })
    }

    pub fn add_link(&mut self, link: TopologyLink) {
        self.links.insert(link.id, link);
    }

    pub fn remove_link(&mut self, link_id: LinkId) -> Option<TopologyLink> {
        self.links.shift_remove(&link_id)
    }

    pub fn add_group(&mut self, group: TopologyGroup) {
        self.groups.insert(group.id, group);
    }

    /// Remove a group, handing its child groups to its parent and releasing its member nodes
    pub fn remove_group(&mut self, group_id: GroupId) -> Option<TopologyGroup> {
        let group = self.groups.shift_remove(&group_id)?;
        for child in self.groups.values_mut() {
            if child.parent_id == Some(group_id) {
                child.parent_id = group.parent_id;
            }
        }
        for node in self.nodes.values_mut() {
            if node.group_id == Some(group_id) {
                node.group_id = None;
            }
        }
        Some(group)
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(&node_id)
    }

    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut TopologyNode> {
        self.nodes.get_mut(&node_id)
    }

    pub fn get_link(&self, link_id: LinkId) -> Option<&TopologyLink> {
        self.links.get(&link_id)
    }

    pub fn get_link_mut(&mut self, link_id: LinkId) -> Option<&mut TopologyLink> {
        self.links.get_mut(&link_id)
    }

    pub fn get_group(&self, group_id: GroupId) -> Option<&TopologyGroup> {
        self.groups.get(&group_id)
    }

    /// Links that have `node_id` as source or target
    pub fn incident_links(&self, node_id: NodeId) -> impl Iterator<Item = &TopologyLink> {
        self.links.values().filter(move |l| l.touches(node_id))
    }

    /// Check if a link exists with this ordered endpoint pair
    pub fn has_link(&self, source: NodeId, target: NodeId) -> bool {
        self.links
            .values()
            .any(|l| l.source_node_id == source && l.target_node_id == target)
    }

    /// Whether making `parent` the parent of `group` would close a cycle
    pub fn would_create_cycle(&self, group: GroupId, parent: GroupId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == group || !seen.insert(id) {
                return true;
            }
            current = self.groups.get(&id).and_then(|g| g.parent_id);
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn max_node_id(&self) -> u64 {
        self.nodes.keys().map(|id| id.0).max().unwrap_or(0)
    }

    pub fn max_link_id(&self) -> u64 {
        self.links.keys().map(|id| id.0).max().unwrap_or(0)
    }

    pub fn max_group_id(&self) -> u64 {
        self.groups.keys().map(|id| id.0).max().unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::TopologyGraph;
    use crate::model::*;

    pub fn node(graph: &mut TopologyGraph, id: u64, kind: NodeKind) -> NodeId {
        let now = Utc::now();
        let node = TopologyNode {
            id: NodeId(id),
            topology_id: graph.topology_id,
            device_id: (kind == NodeKind::Device).then(|| format!("dev-{id}")),
            node_type: kind,
            label: Some(format!("n{id}")),
            icon: None,
            position: Position::ORIGIN,
            layer: None,
            size: 40,
            shape: "circle".to_string(),
            color: None,
            group_id: None,
            properties: BTreeMap::new(),
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        graph.add_node(node);
        NodeId(id)
    }

    pub fn link(graph: &mut TopologyGraph, id: u64, source: u64, target: u64, status: LinkStatus) -> LinkId {
        let now = Utc::now();
        let link = TopologyLink {
            id: LinkId(id),
            topology_id: graph.topology_id,
            source_node_id: NodeId(source),
            target_node_id: NodeId(target),
            link_type: LinkKind::Physical,
            source_interface: None,
            target_interface: None,
            bandwidth: None,
            protocol: None,
            status,
            utilization: None,
            latency: None,
            packet_loss: None,
            line_style: LineStyle::Solid,
            line_width: 2.0,
            color: None,
            label: None,
            properties: BTreeMap::new(),
            discovered_by: DiscoverySource::Manual,
            discovered_at: None,
            created_at: now,
            updated_at: now,
        };
        graph.add_link(link);
        LinkId(id)
    }

    pub fn group(graph: &mut TopologyGraph, id: u64, parent: Option<u64>) -> GroupId {
        let now = Utc::now();
        let group = TopologyGroup {
            id: GroupId(id),
            topology_id: graph.topology_id,
            name: format!("g{id}"),
            description: None,
            parent_id: parent.map(GroupId),
            position: Position::ORIGIN,
            width: 0.0,
            height: 0.0,
            background_color: None,
            border_color: None,
            is_collapsed: false,
            created_at: now,
            updated_at: now,
        };
        graph.add_group(group);
        GroupId(id)
    }

    /// Nodes 1..=n joined as a chain by `up` links 1..n
    pub fn chain(n: u64) -> TopologyGraph {
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=n {
            node(&mut graph, id, NodeKind::Device);
        }
        for id in 1..n {
            link(&mut graph, id, id, id + 1, LinkStatus::Up);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::model::{LinkStatus, NodeKind};

    #[test]
    fn test_remove_node_cascades_links() {
        let mut graph = chain(3);
        link(&mut graph, 10, 3, 1, LinkStatus::Down);

        let removal = graph.remove_node(NodeId(1)).unwrap();
        assert_eq!(removal.removed_links.len(), 2);
        assert_eq!(graph.link_count(), 1);
        assert!(graph.links.values().all(|l| !l.touches(NodeId(1))));
    }

    #[test]
    fn test_remove_group_reparents_children_and_releases_nodes() {
        let mut graph = chain(2);
        let root = group(&mut graph, 1, None);
        let mid = group(&mut graph, 2, Some(1));
        let leaf = group(&mut graph, 3, Some(2));
        graph.get_node_mut(NodeId(1)).unwrap().group_id = Some(mid);

        graph.remove_group(mid).unwrap();
        assert_eq!(graph.get_group(leaf).unwrap().parent_id, Some(root));
        assert_eq!(graph.get_node(NodeId(1)).unwrap().group_id, None);
    }

    #[test]
    fn test_group_cycle_detection() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        let a = group(&mut graph, 1, None);
        let b = group(&mut graph, 2, Some(1));
        let c = group(&mut graph, 3, Some(2));

        assert!(graph.would_create_cycle(a, c));
        assert!(graph.would_create_cycle(a, a));
        assert!(!graph.would_create_cycle(c, a));
        assert!(!graph.would_create_cycle(b, a));
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order() {
        let mut graph = chain(4);
        node(&mut graph, 9, NodeKind::Cloud);
        graph.remove_node(NodeId(2));

        let rebuilt = TopologyGraph::from_snapshot(graph.topology_id, &graph.to_snapshot());
        assert_eq!(rebuilt.to_snapshot(), graph.to_snapshot());
        let order: Vec<u64> = rebuilt.nodes.keys().map(|id| id.0).collect();
        assert_eq!(order, vec![1, 3, 4, 9]);
        assert_eq!(rebuilt.max_node_id(), 9);
    }
}
