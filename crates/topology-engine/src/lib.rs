//! # Topology Engine
//!
//! Stores a graph of infrastructure nodes and links per logical topology and
//! answers questions about it.
//!
//! ## Core Capabilities
//!
//! - **Graph Store**: per-topology nodes, links and groups with referential integrity
//! - **Version History**: append-only snapshots with forward-moving restore
//! - **Layout**: force-directed, hierarchical, circular and tree placement
//! - **Path Analysis**: shortest and all simple paths over healthy links
//! - **Impact Analysis**: reachability fallout of a node or link failure
//!
//! Every topology is its own unit of mutual exclusion. Readers clone a
//! copy-on-write handle of the graph and never hold a lock while computing.

pub mod config;
pub mod graph;
pub mod impact;
pub mod index;
pub mod invariants;
pub mod layout;
pub mod model;
pub mod path;
pub mod service;
pub mod store;
pub mod versions;

pub use config::{EngineConfig, ImpactConfig, LayoutConfig, PathConfig, StoreConfig};
pub use graph::{NodeRemoval, TopologyGraph};
pub use impact::{ImpactAnalyzer, ImpactReport};
pub use invariants::{InvariantChecker, InvariantViolation, ViolationSeverity};
pub use layout::{LayoutBudget, LayoutEngine, LayoutOutcome, LayoutParams, LayoutResult, NodePosition};
pub use model::*;
pub use path::{Path, PathAnalysis, PathAnalyzer};
pub use service::TopologyService;
pub use store::{GraphStore, GraphView};
pub use versions::{RestoreOutcome, VersionManager};

/// Main error type for topology engine operations
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Topology not found: {0}")]
    TopologyNotFound(TopologyId),

    #[error("Node {node} not found in topology {topology}")]
    NodeNotFound { topology: TopologyId, node: NodeId },

    #[error("Link {link} not found in topology {topology}")]
    LinkNotFound { topology: TopologyId, link: LinkId },

    #[error("Group {group} not found in topology {topology}")]
    GroupNotFound { topology: TopologyId, group: GroupId },

    #[error("Version {version} not found for topology {topology}")]
    VersionNotFound { topology: TopologyId, version: u64 },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Topology version is {actual}, expected {expected}")]
    StaleVersion { expected: u64, actual: u64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Layout computation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TopologyError {
    /// Stable, caller-visible error code
    pub fn code(&self) -> &'static str {
        match self {
            TopologyError::TopologyNotFound(_)
            | TopologyError::NodeNotFound { .. }
            | TopologyError::LinkNotFound { .. }
            | TopologyError::GroupNotFound { .. }
            | TopologyError::VersionNotFound { .. } => "NotFound",
            TopologyError::InvalidReference(_) => "InvalidReference",
            TopologyError::StaleVersion { .. } | TopologyError::Conflict(_) => "Conflict",
            TopologyError::Validation(_) => "ValidationError",
            TopologyError::Cancelled => "Cancelled",
            TopologyError::Internal(_) => "InternalError",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == "NotFound"
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;
