//! Authoritative in-memory store of every topology
//!
//! Each topology lives behind its own `RwLock` inside a concurrent map, so
//! work on one topology never waits on another. The graph itself sits in an
//! `Arc` and is cloned on write: readers take the lock just long enough to
//! copy the handle and then compute lock-free against a stable graph.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::graph::{NodeRemoval, TopologyGraph};
use crate::model::*;
use crate::{Result, TopologyError};

const DEFAULT_NODE_SIZE: u32 = 40;
const DEFAULT_NODE_SHAPE: &str = "circle";
const DEFAULT_LINE_WIDTH: f64 = 2.0;

/// Mutable state of one topology, guarded by its lock
#[derive(Debug)]
pub(crate) struct TopologyState {
    pub(crate) topology: Topology,
    pub(crate) graph: Arc<TopologyGraph>,
    pub(crate) history: Vec<Arc<TopologyVersion>>,
    next_node_id: u64,
    next_link_id: u64,
    next_group_id: u64,
    deleted: bool,
}

impl TopologyState {
    fn new(topology: Topology) -> Self {
        Self {
            graph: Arc::new(TopologyGraph::new(topology.id)),
            topology,
            history: Vec::new(),
            next_node_id: 1,
            next_link_id: 1,
            next_group_id: 1,
            deleted: false,
        }
    }

    pub(crate) fn view(&self) -> GraphView {
        GraphView {
            topology: self.topology.clone(),
            graph: Arc::clone(&self.graph),
        }
    }

    fn graph_mut(&mut self) -> &mut TopologyGraph {
        Arc::make_mut(&mut self.graph)
    }

    pub(crate) fn check_version(&self, expected: Option<u64>) -> Result<()> {
        match expected {
            Some(expected) if expected != self.topology.version => Err(TopologyError::StaleVersion {
                expected,
                actual: self.topology.version,
            }),
            _ => Ok(()),
        }
    }

    /// Swap in a whole graph; id counters never move backwards
    pub(crate) fn replace_graph(&mut self, graph: TopologyGraph) {
        self.next_node_id = self.next_node_id.max(graph.max_node_id() + 1);
        self.next_link_id = self.next_link_id.max(graph.max_link_id() + 1);
        self.next_group_id = self.next_group_id.max(graph.max_group_id() + 1);
        self.graph = Arc::new(graph);
    }

    fn node_not_found(&self, node: NodeId) -> TopologyError {
        TopologyError::NodeNotFound {
            topology: self.topology.id,
            node,
        }
    }

    fn link_not_found(&self, link: LinkId) -> TopologyError {
        TopologyError::LinkNotFound {
            topology: self.topology.id,
            link,
        }
    }

    fn group_not_found(&self, group: GroupId) -> TopologyError {
        TopologyError::GroupNotFound {
            topology: self.topology.id,
            group,
        }
    }

    fn resolve_group(&self, group: GroupId) -> Result<()> {
        if self.graph.groups.contains_key(&group) {
            Ok(())
        } else {
            Err(TopologyError::InvalidReference(format!(
                "group {} does not exist in topology {}",
                group, self.topology.id
            )))
        }
    }
}

/// A consistent copy of one topology taken under its read lock
#[derive(Debug, Clone)]
pub struct GraphView {
    pub topology: Topology,
    pub graph: Arc<TopologyGraph>,
}

impl GraphView {
    pub fn detail(&self) -> TopologyDetail {
        let snapshot = self.graph.to_snapshot();
        TopologyDetail {
            topology: self.topology.clone(),
            node_count: snapshot.nodes.len(),
            link_count: snapshot.links.len(),
            group_count: snapshot.groups.len(),
            nodes: snapshot.nodes,
            links: snapshot.links,
            groups: snapshot.groups,
        }
    }

    pub fn node(&self, id: NodeId) -> Result<&TopologyNode> {
        self.graph.get_node(id).ok_or(TopologyError::NodeNotFound {
            topology: self.topology.id,
            node: id,
        })
    }

    pub fn link(&self, id: LinkId) -> Result<&TopologyLink> {
        self.graph.get_link(id).ok_or(TopologyError::LinkNotFound {
            topology: self.topology.id,
            link: id,
        })
    }
}

struct StoreInner {
    topologies: DashMap<TopologyId, Arc<RwLock<TopologyState>>>,
    next_topology_id: AtomicU64,
    config: StoreConfig,
}

/// Concurrent registry of topologies
#[derive(Clone)]
pub struct GraphStore {
    inner: Arc<StoreInner>,
}

impl GraphStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                topologies: DashMap::new(),
                next_topology_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn handle(&self, id: TopologyId) -> Result<Arc<RwLock<TopologyState>>> {
        self.inner
            .topologies
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TopologyError::TopologyNotFound(id))
    }

    pub(crate) async fn read(&self, id: TopologyId) -> Result<OwnedRwLockReadGuard<TopologyState>> {
        let state = self.handle(id)?.read_owned().await;
        if state.deleted {
            return Err(TopologyError::TopologyNotFound(id));
        }
        Ok(state)
    }

    pub(crate) async fn write(&self, id: TopologyId) -> Result<OwnedRwLockWriteGuard<TopologyState>> {
        let state = self.handle(id)?.write_owned().await;
        if state.deleted {
            return Err(TopologyError::TopologyNotFound(id));
        }
        Ok(state)
    }

    /// Copy-on-write view of one topology
    pub async fn view(&self, id: TopologyId) -> Result<GraphView> {
        Ok(self.read(id).await?.view())
    }

    pub async fn create_topology(&self, spec: CreateTopology, caller: Option<&str>) -> Result<Topology> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TopologyError::Validation("topology name must not be empty".to_string()));
        }
        validate_discovery(spec.is_auto_discovery, spec.discovery_interval)?;
        spec.layout_options.validate()?;

        let id = TopologyId(self.inner.next_topology_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let topology = Topology {
            id,
            name: name.to_string(),
            description: spec.description,
            kind: spec.kind,
            scope: spec.scope,
            layout_algorithm: spec.layout_algorithm,
            layout_options: spec.layout_options,
            view_config: spec.view_config,
            is_auto_discovery: spec.is_auto_discovery,
            discovery_interval: spec.discovery_interval,
            last_discovery_at: None,
            version: 1,
            revision: 1,
            created_by: caller.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .topologies
            .insert(id, Arc::new(RwLock::new(TopologyState::new(topology.clone()))));

        info!(topology_id = %id, name = %topology.name, kind = %topology.kind, "Created topology");
        Ok(topology)
    }

    pub async fn get_topology(&self, id: TopologyId) -> Result<TopologyDetail> {
        Ok(self.view(id).await?.detail())
    }

    /// Metadata and layout configuration only; bumps the revision
    pub async fn update_topology(&self, id: TopologyId, patch: UpdateTopology) -> Result<Topology> {
        let mut state = self.write(id).await?;
        let mut topology = state.topology.clone();

        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TopologyError::Validation("topology name must not be empty".to_string()));
            }
            topology.name = name.to_string();
        }
        if let Some(description) = patch.description {
            topology.description = description;
        }
        if let Some(kind) = patch.kind {
            topology.kind = kind;
        }
        if let Some(scope) = patch.scope {
            topology.scope = scope;
        }
        if let Some(algorithm) = patch.layout_algorithm {
            topology.layout_algorithm = algorithm;
        }
        if let Some(options) = patch.layout_options {
            options.validate()?;
            topology.layout_options = options;
        }
        if let Some(view_config) = patch.view_config {
            topology.view_config = view_config;
        }
        if let Some(auto) = patch.is_auto_discovery {
            topology.is_auto_discovery = auto;
        }
        if let Some(interval) = patch.discovery_interval {
            topology.discovery_interval = interval;
        }
        if let Some(at) = patch.last_discovery_at {
            topology.last_discovery_at = Some(at);
        }
        validate_discovery(topology.is_auto_discovery, topology.discovery_interval)?;

        topology.touch();
        state.topology = topology;
        debug!(topology_id = %id, revision = state.topology.revision, "Updated topology metadata");
        Ok(state.topology.clone())
    }

    /// Remove a topology with its nodes, links, groups and versions
    pub async fn delete_topology(&self, id: TopologyId) -> Result<()> {
        let mut state = self.write(id).await?;
        state.deleted = true;
        self.inner.topologies.remove(&id);
        info!(
            topology_id = %id,
            nodes = state.graph.node_count(),
            versions = state.history.len(),
            "Deleted topology"
        );
        Ok(())
    }

    pub async fn list_topologies(&self, filter: TopologyFilter) -> Result<TopologyPage> {
        let config = &self.inner.config;
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = match filter.page_size {
            None | Some(0) => config.default_page_size,
            Some(size) => size.min(config.max_page_size),
        };
        let keyword = filter
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let handles: Vec<Arc<RwLock<TopologyState>>> = self
            .inner
            .topologies
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut items = Vec::new();
        for handle in handles {
            let state = handle.read().await;
            if state.deleted {
                continue;
            }
            let topology = &state.topology;
            if filter.kind.is_some_and(|kind| kind != topology.kind) {
                continue;
            }
            if let Some(scope) = filter.scope.as_deref() {
                if topology.scope.as_deref() != Some(scope) {
                    continue;
                }
            }
            if let Some(keyword) = keyword.as_deref() {
                let in_name = topology.name.to_lowercase().contains(keyword);
                let in_description = topology
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(keyword));
                if !in_name && !in_description {
                    continue;
                }
            }
            items.push(TopologyListItem {
                topology: topology.clone(),
                node_count: state.graph.node_count(),
                link_count: state.graph.link_count(),
            });
        }

        items.sort_by(|a, b| {
            b.topology
                .created_at
                .cmp(&a.topology.created_at)
                .then(b.topology.id.cmp(&a.topology.id))
        });
        let total = items.len();
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Ok(TopologyPage {
            items,
            total,
            page,
            page_size,
        })
    }

    pub async fn add_node(
        &self,
        id: TopologyId,
        spec: NewNode,
        expected_version: Option<u64>,
    ) -> Result<TopologyNode> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;

        if spec.node_type == NodeKind::Device && is_blank(spec.device_id.as_deref()) {
            return Err(TopologyError::Validation(
                "device nodes require a device_id".to_string(),
            ));
        }
        let size = match spec.size {
            Some(size) => validate_size(size)?,
            None => DEFAULT_NODE_SIZE,
        };
        let position = spec.position.unwrap_or(Position::ORIGIN);
        if !position.is_finite() {
            return Err(TopologyError::Validation("node coordinates must be finite".to_string()));
        }
        if let Some(group) = spec.group_id {
            state.resolve_group(group)?;
        }

        let node_id = NodeId(state.next_node_id);
        state.next_node_id += 1;
        let now = Utc::now();
        let node = TopologyNode {
            id: node_id,
            topology_id: id,
            device_id: spec.device_id,
            node_type: spec.node_type,
            label: spec.label,
            icon: spec.icon,
            position,
            layer: spec.layer,
            size,
            shape: spec.shape.unwrap_or_else(|| DEFAULT_NODE_SHAPE.to_string()),
            color: spec.color,
            group_id: spec.group_id,
            properties: spec.properties,
            is_locked: spec.is_locked,
            created_at: now,
            updated_at: now,
        };
        state.graph_mut().add_node(node.clone());
        state.topology.bump_version();

        debug!(topology_id = %id, node_id = %node_id, kind = %node.node_type, "Added node");
        Ok(node)
    }

    /// Attribute changes; bumps the revision only
    pub async fn update_node(&self, id: TopologyId, node_id: NodeId, patch: UpdateNode) -> Result<TopologyNode> {
        let mut state = self.write(id).await?;
        let mut node = state
            .graph
            .get_node(node_id)
            .cloned()
            .ok_or_else(|| state.node_not_found(node_id))?;

        if let Some(device_id) = patch.device_id {
            node.device_id = device_id;
        }
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(icon) = patch.icon {
            node.icon = icon;
        }
        if let Some(layer) = patch.layer {
            node.layer = layer;
        }
        if let Some(size) = patch.size {
            node.size = validate_size(size)?;
        }
        if let Some(shape) = patch.shape {
            node.shape = shape;
        }
        if let Some(color) = patch.color {
            node.color = color;
        }
        if let Some(group) = patch.group_id {
            if let Some(group) = group {
                state.resolve_group(group)?;
            }
            node.group_id = group;
        }
        if let Some(properties) = patch.properties {
            node.properties = properties;
        }
        if let Some(locked) = patch.is_locked {
            node.is_locked = locked;
        }
        if node.node_type == NodeKind::Device && is_blank(node.device_id.as_deref()) {
            return Err(TopologyError::Validation(
                "device nodes require a device_id".to_string(),
            ));
        }
        node.updated_at = Utc::now();

        state.graph_mut().add_node(node.clone());
        state.topology.touch();
        debug!(topology_id = %id, node_id = %node_id, "Updated node");
        Ok(node)
    }

    pub async fn update_node_position(
        &self,
        id: TopologyId,
        node_id: NodeId,
        position: Position,
    ) -> Result<TopologyNode> {
        if !position.is_finite() {
            return Err(TopologyError::Validation("node coordinates must be finite".to_string()));
        }
        let mut state = self.write(id).await?;
        if !state.graph.nodes.contains_key(&node_id) {
            return Err(state.node_not_found(node_id));
        }

        let now = Utc::now();
        let node = state
            .graph_mut()
            .get_node_mut(node_id)
            .map(|node| {
                node.position = position;
                node.updated_at = now;
                node.clone()
            })
            .ok_or(TopologyError::NodeNotFound { topology: id, node: node_id })?;
        state.topology.touch();
        Ok(node)
    }

    /// Move many nodes at once; every entry is checked before any is written
    pub async fn batch_update_node_positions(
        &self,
        id: TopologyId,
        updates: &[NodePositionUpdate],
    ) -> Result<usize> {
        let mut state = self.write(id).await?;
        if updates.is_empty() {
            return Ok(0);
        }

        let mut seen = std::collections::HashSet::with_capacity(updates.len());
        for update in updates {
            if !state.graph.nodes.contains_key(&update.id) {
                return Err(state.node_not_found(update.id));
            }
            if !update.position().is_finite() {
                return Err(TopologyError::Validation(format!(
                    "coordinates for node {} must be finite",
                    update.id
                )));
            }
            if !seen.insert(update.id) {
                return Err(TopologyError::Validation(format!(
                    "node {} appears more than once in the batch",
                    update.id
                )));
            }
        }

        let now = Utc::now();
        let graph = state.graph_mut();
        for update in updates {
            if let Some(node) = graph.get_node_mut(update.id) {
                node.position = update.position();
                node.updated_at = now;
            }
        }
        state.topology.touch();
        debug!(topology_id = %id, count = updates.len(), "Batch-updated node positions");
        Ok(updates.len())
    }

    /// Delete a node and every link touching it as one unit
    pub async fn delete_node(
        &self,
        id: TopologyId,
        node_id: NodeId,
        expected_version: Option<u64>,
    ) -> Result<NodeRemoval> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;
        if !state.graph.nodes.contains_key(&node_id) {
            return Err(state.node_not_found(node_id));
        }

        let removal = state
            .graph_mut()
            .remove_node(node_id)
            .ok_or(TopologyError::NodeNotFound { topology: id, node: node_id })?;
        state.topology.bump_version();

        debug!(
            topology_id = %id,
            node_id = %node_id,
            cascaded_links = removal.removed_links.len(),
            "Deleted node"
        );
        Ok(removal)
    }

    pub async fn add_link(
        &self,
        id: TopologyId,
        spec: NewLink,
        expected_version: Option<u64>,
    ) -> Result<TopologyLink> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;

        for endpoint in [spec.source_node_id, spec.target_node_id] {
            if !state.graph.nodes.contains_key(&endpoint) {
                return Err(TopologyError::InvalidReference(format!(
                    "node {} does not exist in topology {}",
                    endpoint, id
                )));
            }
        }
        if spec.source_node_id == spec.target_node_id {
            return Err(TopologyError::Validation(format!(
                "link endpoints must differ, got {} twice",
                spec.source_node_id
            )));
        }
        let bandwidth = match spec.bandwidth {
            Some(bw) if bw < 0 => {
                return Err(TopologyError::Validation("bandwidth must not be negative".to_string()));
            }
            Some(bw) => Some(bw as u64),
            None => None,
        };
        validate_metrics(spec.utilization, spec.latency, spec.packet_loss)?;
        let line_width = spec.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
        if !line_width.is_finite() || line_width < 0.0 {
            return Err(TopologyError::Validation("line width must not be negative".to_string()));
        }
        if !self.inner.config.allow_parallel_links
            && state.graph.has_link(spec.source_node_id, spec.target_node_id)
        {
            warn!(
                topology_id = %id,
                source = %spec.source_node_id,
                target = %spec.target_node_id,
                "Rejected parallel link"
            );
            return Err(TopologyError::Conflict(format!(
                "a link from {} to {} already exists",
                spec.source_node_id, spec.target_node_id
            )));
        }

        let link_id = LinkId(state.next_link_id);
        state.next_link_id += 1;
        let now = Utc::now();
        let link = TopologyLink {
            id: link_id,
            topology_id: id,
            source_node_id: spec.source_node_id,
            target_node_id: spec.target_node_id,
            link_type: spec.link_type,
            source_interface: spec.source_interface,
            target_interface: spec.target_interface,
            bandwidth,
            protocol: spec.protocol,
            status: spec.status,
            utilization: spec.utilization,
            latency: spec.latency,
            packet_loss: spec.packet_loss,
            line_style: spec.line_style,
            line_width,
            color: spec.color,
            label: spec.label,
            properties: spec.properties,
            discovered_by: spec.discovered_by,
            discovered_at: spec.discovered_at,
            created_at: now,
            updated_at: now,
        };
        state.graph_mut().add_link(link.clone());
        state.topology.bump_version();

        debug!(topology_id = %id, link_id = %link_id, "Added link");
        Ok(link)
    }

    /// Health and metrics; bumps the revision only
    pub async fn update_link_status(
        &self,
        id: TopologyId,
        link_id: LinkId,
        update: LinkStatusUpdate,
    ) -> Result<TopologyLink> {
        validate_metrics(update.utilization, update.latency, update.packet_loss)?;
        let mut state = self.write(id).await?;
        if !state.graph.links.contains_key(&link_id) {
            return Err(state.link_not_found(link_id));
        }

        let now = Utc::now();
        let link = state
            .graph_mut()
            .get_link_mut(link_id)
            .map(|link| {
                if let Some(status) = update.status {
                    link.status = status;
                }
                if update.utilization.is_some() {
                    link.utilization = update.utilization;
                }
                if update.latency.is_some() {
                    link.latency = update.latency;
                }
                if update.packet_loss.is_some() {
                    link.packet_loss = update.packet_loss;
                }
                link.updated_at = now;
                link.clone()
            })
            .ok_or(TopologyError::LinkNotFound { topology: id, link: link_id })?;
        state.topology.touch();

        debug!(topology_id = %id, link_id = %link_id, status = %link.status, "Updated link status");
        Ok(link)
    }

    pub async fn delete_link(
        &self,
        id: TopologyId,
        link_id: LinkId,
        expected_version: Option<u64>,
    ) -> Result<TopologyLink> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;
        if !state.graph.links.contains_key(&link_id) {
            return Err(state.link_not_found(link_id));
        }

        let link = state
            .graph_mut()
            .remove_link(link_id)
            .ok_or(TopologyError::LinkNotFound { topology: id, link: link_id })?;
        state.topology.bump_version();
        debug!(topology_id = %id, link_id = %link_id, "Deleted link");
        Ok(link)
    }

    pub async fn add_group(
        &self,
        id: TopologyId,
        spec: NewGroup,
        expected_version: Option<u64>,
    ) -> Result<TopologyGroup> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;

        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TopologyError::Validation("group name must not be empty".to_string()));
        }
        let position = spec.position.unwrap_or(Position::ORIGIN);
        validate_bounds(position, spec.width, spec.height)?;
        if let Some(parent) = spec.parent_id {
            state.resolve_group(parent)?;
        }

        let group_id = GroupId(state.next_group_id);
        state.next_group_id += 1;
        let now = Utc::now();
        let group = TopologyGroup {
            id: group_id,
            topology_id: id,
            name: name.to_string(),
            description: spec.description,
            parent_id: spec.parent_id,
            position,
            width: spec.width,
            height: spec.height,
            background_color: spec.background_color,
            border_color: spec.border_color,
            is_collapsed: spec.is_collapsed,
            created_at: now,
            updated_at: now,
        };
        state.graph_mut().add_group(group.clone());
        state.topology.bump_version();

        debug!(topology_id = %id, group_id = %group_id, "Added group");
        Ok(group)
    }

    /// Re-parenting is structural; every other change bumps the revision only
    pub async fn update_group(
        &self,
        id: TopologyId,
        group_id: GroupId,
        patch: UpdateGroup,
        expected_version: Option<u64>,
    ) -> Result<TopologyGroup> {
        let mut state = self.write(id).await?;
        let mut group = state
            .graph
            .get_group(group_id)
            .cloned()
            .ok_or_else(|| state.group_not_found(group_id))?;

        let mut reparented = false;
        if let Some(parent) = patch.parent_id {
            if parent != group.parent_id {
                state.check_version(expected_version)?;
                if let Some(parent) = parent {
                    state.resolve_group(parent)?;
                    if state.graph.would_create_cycle(group_id, parent) {
                        return Err(TopologyError::InvalidReference(format!(
                            "making group {} the parent of group {} would create a cycle",
                            parent, group_id
                        )));
                    }
                }
                group.parent_id = parent;
                reparented = true;
            }
        }
        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TopologyError::Validation("group name must not be empty".to_string()));
            }
            group.name = name.to_string();
        }
        if let Some(description) = patch.description {
            group.description = description;
        }
        if let Some(position) = patch.position {
            group.position = position;
        }
        if let Some(width) = patch.width {
            group.width = width;
        }
        if let Some(height) = patch.height {
            group.height = height;
        }
        validate_bounds(group.position, group.width, group.height)?;
        if let Some(color) = patch.background_color {
            group.background_color = color;
        }
        if let Some(color) = patch.border_color {
            group.border_color = color;
        }
        if let Some(collapsed) = patch.is_collapsed {
            group.is_collapsed = collapsed;
        }
        group.updated_at = Utc::now();

        state.graph_mut().add_group(group.clone());
        if reparented {
            state.topology.bump_version();
        } else {
            state.topology.touch();
        }
        debug!(topology_id = %id, group_id = %group_id, reparented, "Updated group");
        Ok(group)
    }

    pub async fn delete_group(
        &self,
        id: TopologyId,
        group_id: GroupId,
        expected_version: Option<u64>,
    ) -> Result<TopologyGroup> {
        let mut state = self.write(id).await?;
        state.check_version(expected_version)?;
        if !state.graph.groups.contains_key(&group_id) {
            return Err(state.group_not_found(group_id));
        }

        let group = state
            .graph_mut()
            .remove_group(group_id)
            .ok_or(TopologyError::GroupNotFound { topology: id, group: group_id })?;
        state.topology.bump_version();
        debug!(topology_id = %id, group_id = %group_id, "Deleted group");
        Ok(group)
    }

    /// Write computed layout positions in one step
    ///
    /// Rejected with `Conflict` when the structural version moved since the
    /// layout read its input. Locked nodes and nodes that no longer exist are
    /// skipped.
    pub async fn commit_layout(
        &self,
        id: TopologyId,
        based_on_version: u64,
        algorithm: LayoutAlgorithm,
        options: LayoutOptions,
        positions: &[(NodeId, Position)],
    ) -> Result<GraphView> {
        let mut state = self.write(id).await?;
        if state.topology.version != based_on_version {
            warn!(
                topology_id = %id,
                based_on = based_on_version,
                current = state.topology.version,
                "Discarding layout computed against a stale graph"
            );
            return Err(TopologyError::Conflict(format!(
                "topology {} changed structurally while the layout was computed",
                id
            )));
        }
        if positions.iter().any(|(_, p)| !p.is_finite()) {
            return Err(TopologyError::Internal("layout produced non-finite coordinates".to_string()));
        }

        let now = Utc::now();
        let graph = state.graph_mut();
        let mut written = 0usize;
        for (node_id, position) in positions {
            if let Some(node) = graph.get_node_mut(*node_id) {
                if !node.is_locked {
                    node.position = *position;
                    node.updated_at = now;
                    written += 1;
                }
            }
        }
        state.topology.layout_algorithm = algorithm;
        state.topology.layout_options = options;
        state.topology.touch();

        debug!(topology_id = %id, %algorithm, written, "Committed layout positions");
        Ok(state.view())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn validate_discovery(auto: bool, interval: Option<u64>) -> Result<()> {
    match (auto, interval) {
        (_, Some(0)) | (true, None) => Err(TopologyError::Validation(
            "discovery interval must be positive when auto-discovery is enabled".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_size(size: i64) -> Result<u32> {
    u32::try_from(size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| TopologyError::Validation(format!("node size must be positive, got {size}")))
}

fn validate_metrics(utilization: Option<f64>, latency: Option<f64>, packet_loss: Option<f64>) -> Result<()> {
    let percent = |name: &str, value: Option<f64>| match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(TopologyError::Validation(format!(
            "{name} must be within 0-100, got {v}"
        ))),
        _ => Ok(()),
    };
    percent("utilization", utilization)?;
    percent("packet_loss", packet_loss)?;
    match latency {
        Some(v) if !v.is_finite() || v < 0.0 => Err(TopologyError::Validation(format!(
            "latency must be a non-negative number, got {v}"
        ))),
        _ => Ok(()),
    }
}

fn validate_bounds(position: Position, width: f64, height: f64) -> Result<()> {
    if !position.is_finite() || !width.is_finite() || !height.is_finite() {
        return Err(TopologyError::Validation("group bounds must be finite".to_string()));
    }
    if width < 0.0 || height < 0.0 {
        return Err(TopologyError::Validation("group width and height must not be negative".to_string()));
    }
    Ok(())
}
