//! Structural invariants of a topology graph
//!
//! The store keeps these true between requests on its own; the checker
//! exists for data that did not pass through the store's mutation path,
//! such as a snapshot about to be restored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::graph::TopologyGraph;
use crate::model::{GraphSnapshot, GroupId, LinkId, NodeId, NodeKind, TopologyId};
use crate::{Result, TopologyError};

/// A violation of a topology invariant
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InvariantViolation {
    pub invariant_name: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub affected_nodes: Vec<NodeId>,
    pub affected_links: Vec<LinkId>,
    pub affected_groups: Vec<GroupId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Worth noting, breaks nothing
    Warning,
    /// The graph must not be accepted in this state
    Error,
}

impl InvariantViolation {
    fn error(name: &str, message: String) -> Self {
        Self {
            invariant_name: name.to_string(),
            severity: ViolationSeverity::Error,
            message,
            affected_nodes: Vec::new(),
            affected_links: Vec::new(),
            affected_groups: Vec::new(),
        }
    }

    fn warning(name: &str, message: String) -> Self {
        Self {
            severity: ViolationSeverity::Warning,
            ..Self::error(name, message)
        }
    }

    fn nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.affected_nodes = nodes;
        self
    }

    fn links(mut self, links: Vec<LinkId>) -> Self {
        self.affected_links = links;
        self
    }

    fn groups(mut self, groups: Vec<GroupId>) -> Self {
        self.affected_groups = groups;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvariantChecker {
    /// Treat warnings as errors
    strict_mode: bool,
}

impl InvariantChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Check all invariants against a graph
    pub fn check_all(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        violations.extend(self.check_ownership(graph));
        violations.extend(self.check_link_endpoints(graph));
        violations.extend(self.check_link_metrics(graph));
        violations.extend(self.check_node_attributes(graph));
        violations.extend(self.check_group_tree(graph));

        if self.strict_mode {
            for v in &mut violations {
                v.severity = ViolationSeverity::Error;
            }
        }
        violations
    }

    /// Check a snapshot as it would be restored into `topology_id`
    pub fn check_snapshot(
        &self,
        topology_id: TopologyId,
        snapshot: &GraphSnapshot,
    ) -> Vec<InvariantViolation> {
        let mut violations = self.check_unique_ids(snapshot);
        violations.extend(self.check_all(&TopologyGraph::from_snapshot(topology_id, snapshot)));
        violations
    }

    /// Fail with a validation error when a snapshot has any error-level violation
    pub fn validate_snapshot(&self, topology_id: TopologyId, snapshot: &GraphSnapshot) -> Result<()> {
        let errors: Vec<String> = self
            .check_snapshot(topology_id, snapshot)
            .into_iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| v.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TopologyError::Validation(format!(
                "snapshot failed integrity checks: {}",
                errors.join("; ")
            )))
        }
    }

    fn check_unique_ids(&self, snapshot: &GraphSnapshot) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let mut seen = HashSet::new();
        let dup_nodes: Vec<NodeId> = snapshot
            .nodes
            .iter()
            .filter(|n| !seen.insert(n.id))
            .map(|n| n.id)
            .collect();
        if !dup_nodes.is_empty() {
            violations.push(
                InvariantViolation::error("unique_node_ids", format!("duplicate node ids {dup_nodes:?}"))
                    .nodes(dup_nodes),
            );
        }

        let mut seen = HashSet::new();
        let dup_links: Vec<LinkId> = snapshot
            .links
            .iter()
            .filter(|l| !seen.insert(l.id))
            .map(|l| l.id)
            .collect();
        if !dup_links.is_empty() {
            violations.push(
                InvariantViolation::error("unique_link_ids", format!("duplicate link ids {dup_links:?}"))
                    .links(dup_links),
            );
        }

        let mut seen = HashSet::new();
        let dup_groups: Vec<GroupId> = snapshot
            .groups
            .iter()
            .filter(|g| !seen.insert(g.id))
            .map(|g| g.id)
            .collect();
        if !dup_groups.is_empty() {
            violations.push(
                InvariantViolation::error("unique_group_ids", format!("duplicate group ids {dup_groups:?}"))
                    .groups(dup_groups),
            );
        }

        violations
    }

    fn check_ownership(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let owner = graph.topology_id;
        let mut violations = Vec::new();

        let nodes: Vec<NodeId> = graph
            .nodes
            .values()
            .filter(|n| n.topology_id != owner)
            .map(|n| n.id)
            .collect();
        if !nodes.is_empty() {
            violations.push(
                InvariantViolation::error(
                    "same_topology",
                    format!("nodes {nodes:?} belong to another topology"),
                )
                .nodes(nodes),
            );
        }

        let links: Vec<LinkId> = graph
            .links
            .values()
            .filter(|l| l.topology_id != owner)
            .map(|l| l.id)
            .collect();
        if !links.is_empty() {
            violations.push(
                InvariantViolation::error(
                    "same_topology",
                    format!("links {links:?} belong to another topology"),
                )
                .links(links),
            );
        }

        let groups: Vec<GroupId> = graph
            .groups
            .values()
            .filter(|g| g.topology_id != owner)
            .map(|g| g.id)
            .collect();
        if !groups.is_empty() {
            violations.push(
                InvariantViolation::error(
                    "same_topology",
                    format!("groups {groups:?} belong to another topology"),
                )
                .groups(groups),
            );
        }

        violations
    }

    /// Every link must join two distinct existing nodes
    fn check_link_endpoints(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for link in graph.links.values() {
            let missing: Vec<NodeId> = [link.source_node_id, link.target_node_id]
                .into_iter()
                .filter(|id| !graph.nodes.contains_key(id))
                .collect();
            if !missing.is_empty() {
                violations.push(
                    InvariantViolation::error(
                        "no_orphan_links",
                        format!("link {} references non-existent nodes {:?}", link.id, missing),
                    )
                    .nodes(missing)
                    .links(vec![link.id]),
                );
            }
            if link.source_node_id == link.target_node_id {
                violations.push(
                    InvariantViolation::error(
                        "no_self_loops",
                        format!("link {} is a self-loop on node {}", link.id, link.source_node_id),
                    )
                    .nodes(vec![link.source_node_id])
                    .links(vec![link.id]),
                );
            }
        }

        violations
    }

    fn check_link_metrics(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let percent = |v: Option<f64>| v.map_or(true, |v| (0.0..=100.0).contains(&v));

        for link in graph.links.values() {
            let latency_ok = link.latency.map_or(true, |v| v.is_finite() && v >= 0.0);
            if !percent(link.utilization) || !percent(link.packet_loss) || !latency_ok {
                violations.push(
                    InvariantViolation::error(
                        "metric_ranges",
                        format!("link {} has out-of-range metrics", link.id),
                    )
                    .links(vec![link.id]),
                );
            }
        }

        violations
    }

    fn check_node_attributes(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for node in graph.nodes.values() {
            if !node.position.is_finite() {
                violations.push(
                    InvariantViolation::error(
                        "finite_positions",
                        format!("node {} has a non-finite position", node.id),
                    )
                    .nodes(vec![node.id]),
                );
            }
            if let Some(group) = node.group_id {
                if !graph.groups.contains_key(&group) {
                    violations.push(
                        InvariantViolation::error(
                            "node_group_exists",
                            format!("node {} references missing group {}", node.id, group),
                        )
                        .nodes(vec![node.id])
                        .groups(vec![group]),
                    );
                }
            }
            if node.node_type == NodeKind::Device && node.device_id.is_none() {
                violations.push(
                    InvariantViolation::warning(
                        "device_reference",
                        format!("device node {} has no device id", node.id),
                    )
                    .nodes(vec![node.id]),
                );
            }
        }

        violations
    }

    /// Group parents must exist and form a forest
    fn check_group_tree(&self, graph: &TopologyGraph) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for group in graph.groups.values() {
            if group.width < 0.0 || group.height < 0.0 {
                violations.push(
                    InvariantViolation::error(
                        "group_bounds",
                        format!("group {} has a negative size", group.id),
                    )
                    .groups(vec![group.id]),
                );
            }
            let Some(parent) = group.parent_id else {
                continue;
            };
            if !graph.groups.contains_key(&parent) {
                violations.push(
                    InvariantViolation::error(
                        "group_parent_exists",
                        format!("group {} references missing parent {}", group.id, parent),
                    )
                    .groups(vec![group.id, parent]),
                );
            } else if graph.would_create_cycle(group.id, parent) {
                violations.push(
                    InvariantViolation::error(
                        "acyclic_groups",
                        format!("group {} is part of a parent cycle", group.id),
                    )
                    .groups(vec![group.id]),
                );
            }
        }

        violations
    }
}
