//! Failure and maintenance what-if analysis

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

use crate::config::ImpactConfig;
use crate::graph::TopologyGraph;
use crate::index::GraphIndex;
use crate::model::{
    ImpactLevel, ImpactLinkMode, ImpactRequest, ImpactTarget, LinkId, LinkStatus, NodeId, Scenario,
    TopologyId, TopologyLink,
};
use crate::{Result, TopologyError};

/// Reachability fallout of withdrawing one node or link
#[derive(Debug, Clone, Serialize, TS)]
pub struct ImpactReport {
    pub topology_id: TopologyId,
    pub target_node_id: Option<NodeId>,
    pub target_link_id: Option<LinkId>,
    pub scenario: Scenario,
    pub link_mode: ImpactLinkMode,
    /// Nodes that lost reachability or got farther away, target excluded
    pub affected_nodes: Vec<NodeId>,
    /// Affected nodes left without any link to a remaining node
    pub isolated_nodes: Vec<NodeId>,
    pub affected_links: Vec<LinkId>,
    pub impact_level: ImpactLevel,
    pub affected_ratio: f64,
    pub total_nodes: usize,
}

pub struct ImpactAnalyzer {
    config: ImpactConfig,
}

impl ImpactAnalyzer {
    pub fn new(config: ImpactConfig) -> Self {
        Self { config }
    }

    fn counts(&self, link: &TopologyLink) -> bool {
        !(self.config.respect_link_status && link.status == LinkStatus::Down)
    }

    pub fn analyze(&self, graph: &TopologyGraph, request: &ImpactRequest) -> Result<ImpactReport> {
        let target = request.target()?;
        let link_mode = request.link_mode.unwrap_or(self.config.link_mode);

        let (removed_node, removed_links): (Option<NodeId>, Vec<LinkId>) = match target {
            ImpactTarget::Node(node) => {
                if graph.get_node(node).is_none() {
                    return Err(TopologyError::NodeNotFound {
                        topology: graph.topology_id,
                        node,
                    });
                }
                (Some(node), graph.incident_links(node).map(|l| l.id).collect())
            }
            ImpactTarget::Link(link) => {
                if graph.get_link(link).is_none() {
                    return Err(TopologyError::LinkNotFound {
                        topology: graph.topology_id,
                        link,
                    });
                }
                (None, vec![link])
            }
        };

        let before = GraphIndex::build(graph, |_| true, |l| self.counts(l));
        let after = GraphIndex::build(
            graph,
            |n| Some(n.id) != removed_node,
            |l| self.counts(l) && !removed_links.contains(&l.id),
        );

        let gateways: Vec<NodeId> = graph
            .nodes
            .values()
            .filter(|n| n.node_type.is_gateway())
            .map(|n| n.id)
            .collect();
        let reach = if gateways.is_empty() {
            pairwise_fallout(&before, &after, removed_node, &removed_links, graph)
        } else {
            gateway_fallout(&before, &after, &gateways)
        };

        let affected: BTreeSet<NodeId> = reach.affected;
        let isolated: Vec<NodeId> = affected
            .iter()
            .copied()
            .filter(|id| after.index_of(*id).is_some_and(|i| after.degree(i) == 0))
            .collect();

        let mut affected_links: BTreeSet<LinkId> = removed_links.iter().copied().collect();
        if link_mode == ImpactLinkMode::Stranded {
            for link in graph.links.values() {
                if affected_links.contains(&link.id) {
                    continue;
                }
                let endpoints = [link.source_node_id, link.target_node_id];
                let cut_off = endpoints.iter().all(|n| reach.cut_off.contains(n));
                let was_connected = endpoints.iter().any(|n| reach.connected_before.contains(n));
                if cut_off && was_connected {
                    affected_links.insert(link.id);
                }
            }
        }

        let total_nodes = graph.node_count();
        let affected_ratio = if total_nodes == 0 {
            0.0
        } else {
            affected.len() as f64 / total_nodes as f64
        };
        let impact_level = if !isolated.is_empty() || affected_ratio >= self.config.high_threshold {
            ImpactLevel::High
        } else if !affected.is_empty() {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        };

        debug!(
            topology_id = %graph.topology_id,
            scenario = %request.scenario,
            affected = affected.len(),
            isolated = isolated.len(),
            level = %impact_level,
            "Analyzed impact"
        );

        Ok(ImpactReport {
            topology_id: graph.topology_id,
            target_node_id: removed_node,
            target_link_id: match target {
                ImpactTarget::Link(link) => Some(link),
                ImpactTarget::Node(_) => None,
            },
            scenario: request.scenario,
            link_mode,
            affected_nodes: affected.into_iter().collect(),
            isolated_nodes: isolated,
            affected_links: affected_links.into_iter().collect(),
            impact_level,
            affected_ratio,
            total_nodes,
        })
    }
}

struct Fallout {
    affected: BTreeSet<NodeId>,
    /// Nodes outside the surviving network after the removal
    cut_off: BTreeSet<NodeId>,
    /// Nodes inside the network the removal could reach into
    connected_before: BTreeSet<NodeId>,
}

/// Compare hop distance to the nearest gateway before and after
fn gateway_fallout(before: &GraphIndex, after: &GraphIndex, gateways: &[NodeId]) -> Fallout {
    let sources = |index: &GraphIndex| -> Vec<usize> {
        gateways.iter().filter_map(|g| index.index_of(*g)).collect()
    };
    let dist_before = before.hop_distances(&sources(before));
    let dist_after = after.hop_distances(&sources(after));

    let mut fallout = Fallout {
        affected: BTreeSet::new(),
        cut_off: BTreeSet::new(),
        connected_before: BTreeSet::new(),
    };
    for (i, id) in before.ids().iter().enumerate() {
        let Some(was) = dist_before[i] else {
            continue;
        };
        fallout.connected_before.insert(*id);
        let Some(j) = after.index_of(*id) else {
            continue;
        };
        match dist_after[j] {
            None => {
                fallout.affected.insert(*id);
                fallout.cut_off.insert(*id);
            }
            Some(now) if now > was => {
                fallout.affected.insert(*id);
            }
            Some(_) => {}
        }
    }
    fallout
}

/// Without gateways every remaining node is an anchor: a node is affected
/// when any other node became unreachable or farther from it
fn pairwise_fallout(
    before: &GraphIndex,
    after: &GraphIndex,
    removed_node: Option<NodeId>,
    removed_links: &[LinkId],
    graph: &TopologyGraph,
) -> Fallout {
    // only the component that held the target can change
    let seeds: Vec<usize> = match removed_node {
        Some(node) => before.index_of(node).into_iter().collect(),
        None => removed_links
            .iter()
            .filter_map(|l| graph.get_link(*l))
            .filter_map(|l| before.index_of(l.source_node_id))
            .collect(),
    };
    let region: Vec<usize> = before
        .hop_distances(&seeds)
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.map(|_| i))
        .collect();

    let mut fallout = Fallout {
        affected: BTreeSet::new(),
        cut_off: BTreeSet::new(),
        connected_before: region.iter().map(|&i| before.id(i)).collect(),
    };

    for &i in &region {
        let id = before.id(i);
        let Some(j) = after.index_of(id) else {
            continue;
        };
        let dist_before = before.hop_distances(&[i]);
        let dist_after = after.hop_distances(&[j]);
        let worse = region.iter().any(|&k| {
            let other = before.id(k);
            if other == id {
                return false;
            }
            let Some(m) = after.index_of(other) else {
                return false;
            };
            match (dist_before[k], dist_after[m]) {
                (Some(_), None) => true,
                (Some(was), Some(now)) => now > was,
                _ => false,
            }
        });
        if worse {
            fallout.affected.insert(id);
        }
    }

    let components = after.components();
    if let Some(main) = components.iter().max_by(|a, b| a.len().cmp(&b.len()).then(b[0].cmp(&a[0]))) {
        let main: BTreeSet<NodeId> = main.iter().map(|&i| after.id(i)).collect();
        fallout.cut_off = after
            .ids()
            .iter()
            .copied()
            .filter(|id| !main.contains(id))
            .collect();
    }
    fallout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::model::NodeKind;

    fn analyze(graph: &TopologyGraph, request: ImpactRequest) -> ImpactReport {
        ImpactAnalyzer::new(ImpactConfig::default()).analyze(graph, &request).unwrap()
    }

    fn node_failure(id: u64) -> ImpactRequest {
        ImpactRequest {
            node_id: Some(NodeId(id)),
            ..Default::default()
        }
    }

    #[test]
    fn test_middle_of_chain_without_gateways() {
        let graph = chain(3);
        let report = analyze(&graph, node_failure(2));
        assert_eq!(report.affected_nodes, vec![NodeId(1), NodeId(3)]);
        assert!(report.isolated_nodes.contains(&NodeId(3)));
        assert_eq!(report.affected_links, vec![LinkId(1), LinkId(2)]);
        assert_eq!(report.impact_level, ImpactLevel::High);
    }

    #[test]
    fn test_gateway_anchors_reachability() {
        let mut graph = chain(3);
        graph.get_node_mut(NodeId(1)).unwrap().node_type = NodeKind::Internet;
        let report = analyze(&graph, node_failure(2));
        assert_eq!(report.affected_nodes, vec![NodeId(3)]);
        assert_eq!(report.isolated_nodes, vec![NodeId(3)]);
        assert_eq!(report.impact_level, ImpactLevel::High);
    }

    #[test]
    fn test_redundant_leaf_has_low_impact() {
        // triangle 1-2-3 plus leaf 4 on 3; removing leaf 4 hurts nobody
        let mut graph = chain(3);
        link(&mut graph, 3, 3, 1, LinkStatus::Up);
        node(&mut graph, 4, NodeKind::Device);
        link(&mut graph, 4, 3, 4, LinkStatus::Up);
        let report = analyze(&graph, node_failure(4));
        assert!(report.affected_nodes.is_empty());
        assert_eq!(report.impact_level, ImpactLevel::Low);
    }

    #[test]
    fn test_longer_detour_is_medium() {
        // ring of 8 with a cloud at 1; cutting link 1-2 pushes 2 the long way round
        let mut graph = chain(8);
        link(&mut graph, 8, 8, 1, LinkStatus::Up);
        graph.get_node_mut(NodeId(1)).unwrap().node_type = NodeKind::Cloud;
        let report = analyze(
            &graph,
            ImpactRequest {
                link_id: Some(LinkId(1)),
                ..Default::default()
            },
        );
        assert_eq!(report.target_link_id, Some(LinkId(1)));
        assert_eq!(report.affected_nodes, vec![NodeId(2), NodeId(3), NodeId(4)]);
        assert!(report.isolated_nodes.is_empty());
        assert_eq!(report.affected_links, vec![LinkId(1)]);
        // 3 of 8 nodes is above the default 30% threshold
        assert_eq!(report.impact_level, ImpactLevel::High);

        let lenient = ImpactAnalyzer::new(ImpactConfig {
            high_threshold: 0.5,
            ..Default::default()
        });
        let request = ImpactRequest {
            link_id: Some(LinkId(1)),
            ..Default::default()
        };
        let report = lenient.analyze(&graph, &request).unwrap();
        assert_eq!(report.impact_level, ImpactLevel::Medium);
    }

    #[test]
    fn test_stranded_mode_reports_cut_off_links() {
        // cloud 1 - 2 - 3 - 4: failing 2 strands link 3-4
        let mut graph = chain(4);
        graph.get_node_mut(NodeId(1)).unwrap().node_type = NodeKind::Cloud;
        let incident = analyze(&graph, node_failure(2));
        assert_eq!(incident.affected_links, vec![LinkId(1), LinkId(2)]);

        let stranded = analyze(
            &graph,
            ImpactRequest {
                node_id: Some(NodeId(2)),
                link_mode: Some(ImpactLinkMode::Stranded),
                scenario: Scenario::Maintenance,
                ..Default::default()
            },
        );
        assert_eq!(stranded.affected_links, vec![LinkId(1), LinkId(2), LinkId(3)]);
        assert_eq!(stranded.scenario, Scenario::Maintenance);
    }

    #[test]
    fn test_down_links_count_unless_configured() {
        let mut graph = chain(3);
        graph.get_link_mut(LinkId(2)).unwrap().status = LinkStatus::Down;
        let structural = analyze(&graph, node_failure(2));
        assert_eq!(structural.affected_nodes, vec![NodeId(1), NodeId(3)]);

        let live = ImpactAnalyzer::new(ImpactConfig {
            respect_link_status: true,
            ..Default::default()
        });
        let report = live.analyze(&graph, &node_failure(2)).unwrap();
        // node 3 was already cut off over live links and node 1 only loses the target
        assert!(report.affected_nodes.is_empty());
        assert_eq!(report.impact_level, ImpactLevel::Low);
    }

    #[test]
    fn test_unknown_target_is_not_found() {
        let graph = chain(2);
        let analyzer = ImpactAnalyzer::new(ImpactConfig::default());
        assert!(analyzer.analyze(&graph, &node_failure(9)).unwrap_err().is_not_found());
        let by_link = ImpactRequest {
            link_id: Some(LinkId(9)),
            ..Default::default()
        };
        assert!(analyzer.analyze(&graph, &by_link).unwrap_err().is_not_found());
    }
}
