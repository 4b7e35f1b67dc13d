//! Async facade over the store, the analyzers and the version history

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::graph::NodeRemoval;
use crate::impact::{ImpactAnalyzer, ImpactReport};
use crate::layout::{LayoutBudget, LayoutEngine, LayoutParams, LayoutResult, NodePosition};
use crate::model::*;
use crate::path::{PathAnalysis, PathAnalyzer};
use crate::store::GraphStore;
use crate::versions::{RestoreOutcome, VersionManager};
use crate::{Result, TopologyError};

/// Entry point for every topology operation
#[derive(Clone)]
pub struct TopologyService {
    store: GraphStore,
    versions: VersionManager,
    config: Arc<EngineConfig>,
}

impl TopologyService {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = GraphStore::new(config.store.clone());
        Ok(Self {
            versions: VersionManager::new(store.clone()),
            store,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    // Topologies

    pub async fn create_topology(&self, spec: CreateTopology, caller: Option<&str>) -> Result<Topology> {
        self.store.create_topology(spec, caller).await
    }

    pub async fn get_topology(&self, id: TopologyId) -> Result<TopologyDetail> {
        self.store.get_topology(id).await
    }

    pub async fn list_topologies(&self, filter: TopologyFilter) -> Result<TopologyPage> {
        self.store.list_topologies(filter).await
    }

    pub async fn update_topology(&self, id: TopologyId, patch: UpdateTopology) -> Result<Topology> {
        self.store.update_topology(id, patch).await
    }

    pub async fn delete_topology(&self, id: TopologyId) -> Result<()> {
        self.store.delete_topology(id).await
    }

    // Nodes

    pub async fn add_node(&self, id: TopologyId, spec: NewNode, expected_version: Option<u64>) -> Result<TopologyNode> {
        self.store.add_node(id, spec, expected_version).await
    }

    pub async fn update_node(&self, id: TopologyId, node_id: NodeId, patch: UpdateNode) -> Result<TopologyNode> {
        self.store.update_node(id, node_id, patch).await
    }

    pub async fn update_node_position(
        &self,
        id: TopologyId,
        node_id: NodeId,
        position: Position,
    ) -> Result<TopologyNode> {
        self.store.update_node_position(id, node_id, position).await
    }

    pub async fn batch_update_node_positions(
        &self,
        id: TopologyId,
        updates: &[NodePositionUpdate],
    ) -> Result<usize> {
        self.store.batch_update_node_positions(id, updates).await
    }

    pub async fn delete_node(
        &self,
        id: TopologyId,
        node_id: NodeId,
        expected_version: Option<u64>,
    ) -> Result<NodeRemoval> {
        self.store.delete_node(id, node_id, expected_version).await
    }

    // Links

    pub async fn add_link(&self, id: TopologyId, spec: NewLink, expected_version: Option<u64>) -> Result<TopologyLink> {
        self.store.add_link(id, spec, expected_version).await
    }

    pub async fn update_link_status(
        &self,
        id: TopologyId,
        link_id: LinkId,
        update: LinkStatusUpdate,
    ) -> Result<TopologyLink> {
        self.store.update_link_status(id, link_id, update).await
    }

    pub async fn delete_link(
        &self,
        id: TopologyId,
        link_id: LinkId,
        expected_version: Option<u64>,
    ) -> Result<TopologyLink> {
        self.store.delete_link(id, link_id, expected_version).await
    }

    // Groups

    pub async fn add_group(&self, id: TopologyId, spec: NewGroup, expected_version: Option<u64>) -> Result<TopologyGroup> {
        self.store.add_group(id, spec, expected_version).await
    }

    pub async fn update_group(
        &self,
        id: TopologyId,
        group_id: GroupId,
        patch: UpdateGroup,
        expected_version: Option<u64>,
    ) -> Result<TopologyGroup> {
        self.store.update_group(id, group_id, patch, expected_version).await
    }

    pub async fn delete_group(
        &self,
        id: TopologyId,
        group_id: GroupId,
        expected_version: Option<u64>,
    ) -> Result<TopologyGroup> {
        self.store.delete_group(id, group_id, expected_version).await
    }

    // Layout

    /// Compute a layout and write it back for every unlocked node
    ///
    /// The computation runs on the blocking pool against a copy of the
    /// graph. Dropping the returned future cancels it; nothing is committed
    /// for a cancelled run.
    pub async fn apply_layout(&self, id: TopologyId, request: LayoutRequest) -> Result<LayoutResult> {
        let view = self.store.view(id).await?;
        let algorithm = request.algorithm.unwrap_or(view.topology.layout_algorithm);
        let options = request
            .options
            .unwrap_or_else(|| view.topology.layout_options.clone());
        options.validate()?;

        let params = LayoutParams::resolve(&self.config.layout, &options);
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let budget = LayoutBudget::new(Duration::from_millis(self.config.layout.time_budget_ms), cancel);
        let graph = Arc::clone(&view.graph);

        let outcome = tokio::task::spawn_blocking(move || LayoutEngine::compute(&graph, algorithm, &params, &budget))
            .await
            .map_err(|e| {
                error!(topology_id = %id, error = %e, "Layout task failed");
                TopologyError::Internal(format!("layout task failed: {e}"))
            })?
            .inspect_err(|e| {
                if matches!(e, TopologyError::Cancelled) {
                    warn!(topology_id = %id, %algorithm, "Layout cancelled");
                }
            })?;

        let committed = self
            .store
            .commit_layout(id, view.topology.version, algorithm, options, &outcome.positions)
            .await?;

        let mut nodes: Vec<NodePosition> = committed
            .graph
            .nodes
            .values()
            .map(|node| NodePosition {
                id: node.id,
                position: node.position,
                is_locked: node.is_locked,
            })
            .collect();
        nodes.sort_by_key(|n| n.id);

        info!(
            topology_id = %id,
            %algorithm,
            nodes = nodes.len(),
            iterations = outcome.iterations,
            truncated = outcome.truncated,
            "Applied layout"
        );
        Ok(LayoutResult {
            topology_id: id,
            algorithm,
            nodes,
            iterations: outcome.iterations,
            truncated: outcome.truncated,
            revision: committed.topology.revision,
        })
    }

    // Analysis

    pub async fn analyze_path(&self, id: TopologyId, request: PathRequest) -> Result<PathAnalysis> {
        let view = self.store.view(id).await?;
        PathAnalyzer::new(self.config.paths.clone()).analyze(
            &view.graph,
            request.source_node_id,
            request.target_node_id,
            request.algorithm,
        )
    }

    pub async fn analyze_impact(&self, id: TopologyId, request: ImpactRequest) -> Result<ImpactReport> {
        let view = self.store.view(id).await?;
        ImpactAnalyzer::new(self.config.impact.clone()).analyze(&view.graph, &request)
    }

    // Versions

    pub async fn create_snapshot(
        &self,
        id: TopologyId,
        request: CreateSnapshot,
        caller: Option<&str>,
    ) -> Result<TopologyVersion> {
        self.versions.create_snapshot(id, request.description, caller).await
    }

    pub async fn list_versions(&self, id: TopologyId) -> Result<Vec<VersionSummary>> {
        self.versions.list_versions(id).await
    }

    pub async fn get_version(&self, id: TopologyId, version: u64) -> Result<TopologyVersion> {
        self.versions.get_version(id, version).await
    }

    pub async fn restore_version(
        &self,
        id: TopologyId,
        version: u64,
        expected_version: Option<u64>,
        caller: Option<&str>,
    ) -> Result<RestoreOutcome> {
        self.versions
            .restore_version(id, version, expected_version, caller)
            .await
    }
}
