//! Append-only version history with forward-moving restore

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use ts_rs::TS;

use crate::graph::TopologyGraph;
use crate::invariants::InvariantChecker;
use crate::model::{Topology, TopologyId, TopologyVersion, VersionSummary};
use crate::store::{GraphStore, TopologyState};
use crate::{Result, TopologyError};

/// Result of restoring a topology to an earlier version
#[derive(Debug, Clone, Serialize, TS)]
pub struct RestoreOutcome {
    pub topology: Topology,
    #[ts(type = "number")]
    pub restored_from: u64,
    /// Capture of the graph as it was just before the restore
    pub pre_restore_snapshot: Option<VersionSummary>,
}

#[derive(Clone)]
pub struct VersionManager {
    store: GraphStore,
}

impl VersionManager {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// Capture the live node, link and group set as the next version
    pub async fn create_snapshot(
        &self,
        id: TopologyId,
        description: Option<String>,
        caller: Option<&str>,
    ) -> Result<TopologyVersion> {
        let mut state = self.store.write(id).await?;
        let version = capture(&mut state, description, caller);
        info!(
            topology_id = %id,
            version = version.version,
            nodes = version.snapshot.nodes.len(),
            links = version.snapshot.links.len(),
            "Created topology snapshot"
        );
        Ok(version.as_ref().clone())
    }

    /// Version history in ascending order
    pub async fn list_versions(&self, id: TopologyId) -> Result<Vec<VersionSummary>> {
        let state = self.store.read(id).await?;
        Ok(state.history.iter().map(|v| VersionSummary::from(v.as_ref())).collect())
    }

    pub async fn get_version(&self, id: TopologyId, version: u64) -> Result<TopologyVersion> {
        let state = self.store.read(id).await?;
        lookup(&state, version).map(|v| v.as_ref().clone())
    }

    /// Replace the live graph with a stored version
    ///
    /// The structural version moves forward by one; it is never rewound to
    /// the captured value.
    pub async fn restore_version(
        &self,
        id: TopologyId,
        version: u64,
        expected_version: Option<u64>,
        caller: Option<&str>,
    ) -> Result<RestoreOutcome> {
        let mut state = self.store.write(id).await?;
        state.check_version(expected_version)?;
        let source = lookup(&state, version)?;
        InvariantChecker::new().validate_snapshot(id, &source.snapshot)?;

        let pre_restore_snapshot = if self.store.config().snapshot_before_restore {
            let description = format!("Automatic snapshot before restoring version {version}");
            let captured = capture(&mut state, Some(description), caller);
            Some(VersionSummary::from(captured.as_ref()))
        } else {
            None
        };

        state.replace_graph(TopologyGraph::from_snapshot(id, &source.snapshot));
        state.topology.bump_version();

        info!(
            topology_id = %id,
            restored_from = version,
            new_version = state.topology.version,
            "Restored topology"
        );
        Ok(RestoreOutcome {
            topology: state.topology.clone(),
            restored_from: version,
            pre_restore_snapshot,
        })
    }
}

fn capture(
    state: &mut TopologyState,
    description: Option<String>,
    caller: Option<&str>,
) -> Arc<TopologyVersion> {
    let version = Arc::new(TopologyVersion {
        topology_id: state.topology.id,
        version: state.history.len() as u64 + 1,
        topology_version: state.topology.version,
        snapshot: state.graph.to_snapshot(),
        description,
        changed_by: caller.map(str::to_string),
        created_at: Utc::now(),
    });
    state.history.push(Arc::clone(&version));
    version
}

fn lookup(state: &TopologyState, version: u64) -> Result<Arc<TopologyVersion>> {
    version
        .checked_sub(1)
        .and_then(|i| state.history.get(i as usize))
        .cloned()
        .ok_or(TopologyError::VersionNotFound {
            topology: state.topology.id,
            version,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::model::*;

    async fn seeded() -> (GraphStore, VersionManager, TopologyId) {
        let store = GraphStore::new(StoreConfig::default());
        let id = store.create_topology(CreateTopology::named("lab"), None).await.unwrap().id;
        let a = store.add_node(id, NewNode::device("a"), None).await.unwrap();
        let b = store.add_node(id, NewNode::device("b"), None).await.unwrap();
        store.add_link(id, NewLink::between(a.id, b.id), None).await.unwrap();
        (store.clone(), VersionManager::new(store), id)
    }

    #[tokio::test]
    async fn test_version_numbers_are_contiguous() {
        let (_, versions, id) = seeded().await;
        for _ in 0..3 {
            versions.create_snapshot(id, None, Some("alice")).await.unwrap();
        }
        let listed: Vec<u64> = versions.list_versions(id).await.unwrap().iter().map(|v| v.version).collect();
        assert_eq!(listed, vec![1, 2, 3]);
        assert_eq!(versions.get_version(id, 2).await.unwrap().changed_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_version_is_not_found() {
        let (_, versions, id) = seeded().await;
        assert!(versions.get_version(id, 0).await.unwrap_err().is_not_found());
        assert!(versions.get_version(id, 1).await.unwrap_err().is_not_found());
        let err = versions.restore_version(id, 4, None, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_restore_round_trips_and_moves_version_forward() {
        let (store, versions, id) = seeded().await;
        let captured = versions.create_snapshot(id, Some("baseline".into()), None).await.unwrap();
        let version_before = store.view(id).await.unwrap().topology.version;

        let c = store.add_node(id, NewNode::device("c"), None).await.unwrap();
        store.delete_node(id, NodeId(1), None).await.unwrap();
        assert_ne!(store.view(id).await.unwrap().graph.to_snapshot(), captured.snapshot);

        let outcome = versions.restore_version(id, captured.version, None, None).await.unwrap();
        let view = store.view(id).await.unwrap();
        assert_eq!(view.graph.to_snapshot(), captured.snapshot);
        assert_eq!(outcome.topology.version, version_before + 3);
        assert_eq!(outcome.pre_restore_snapshot.as_ref().map(|s| s.version), Some(2));

        // ids handed out after a restore never collide with restored ones
        let d = store.add_node(id, NewNode::device("d"), None).await.unwrap();
        assert!(d.id > c.id);
    }

    #[tokio::test]
    async fn test_restore_honours_expected_version() {
        let (_, versions, id) = seeded().await;
        versions.create_snapshot(id, None, None).await.unwrap();
        let err = versions.restore_version(id, 1, Some(1), None).await.unwrap_err();
        assert_eq!(err.code(), "Conflict");
        assert_eq!(versions.list_versions(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_without_auto_snapshot() {
        let store = GraphStore::new(StoreConfig {
            snapshot_before_restore: false,
            ..Default::default()
        });
        let id = store.create_topology(CreateTopology::named("lab"), None).await.unwrap().id;
        let versions = VersionManager::new(store.clone());
        versions.create_snapshot(id, None, None).await.unwrap();
        let outcome = versions.restore_version(id, 1, None, None).await.unwrap();
        assert!(outcome.pre_restore_snapshot.is_none());
        assert_eq!(versions.list_versions(id).await.unwrap().len(), 1);
    }
}
