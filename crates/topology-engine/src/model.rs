//! Topology data model: entities, request payloads and read models

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        pub struct $name(#[ts(type = "number")] pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a topology, unique across the store
    TopologyId
);
id_type!(
    /// Identifier of a node, unique within its topology
    NodeId
);
id_type!(LinkId);
id_type!(GroupId);

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    #[default]
    Physical,
    Logical,
    Custom,
}

string_enum!(TopologyKind {
    Physical => "physical",
    Logical => "logical",
    Custom => "custom",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum LayoutAlgorithm {
    #[default]
    Force,
    Hierarchical,
    Circular,
    Tree,
}

string_enum!(LayoutAlgorithm {
    Force => "force",
    Hierarchical => "hierarchical",
    Circular => "circular",
    Tree => "tree",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Device,
    Group,
    Cloud,
    Internet,
}

string_enum!(NodeKind {
    Device => "device",
    Group => "group",
    Cloud => "cloud",
    Internet => "internet",
});

impl NodeKind {
    /// Cloud and internet nodes anchor reachability in impact analysis
    pub fn is_gateway(&self) -> bool {
        matches!(self, NodeKind::Cloud | NodeKind::Internet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    #[default]
    Physical,
    Logical,
    Virtual,
}

string_enum!(LinkKind {
    Physical => "physical",
    Logical => "logical",
    Virtual => "virtual",
});

/// Health of a link as last reported by monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Up,
    Down,
    Degraded,
    #[default]
    Unknown,
}

string_enum!(LinkStatus {
    Up => "up",
    Down => "down",
    Degraded => "degraded",
    Unknown => "unknown",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

string_enum!(LineStyle {
    Solid => "solid",
    Dashed => "dashed",
    Dotted => "dotted",
});

/// How a link entered the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Lldp,
    Cdp,
    #[default]
    Manual,
}

string_enum!(DiscoverySource {
    Lldp => "lldp",
    Cdp => "cdp",
    Manual => "manual",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum PathAlgorithm {
    #[default]
    Shortest,
    All,
}

string_enum!(PathAlgorithm {
    Shortest => "shortest",
    All => "all",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Failure,
    Maintenance,
}

string_enum!(Scenario {
    Failure => "failure",
    Maintenance => "maintenance",
});

/// Which links an impact report lists as affected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLinkMode {
    /// Links touching the removed element
    #[default]
    Incident,
    /// Incident links plus every link cut off from the surviving network
    Stranded,
}

string_enum!(ImpactLinkMode {
    Incident => "incident",
    Stranded => "stranded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

string_enum!(ImpactLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// 2D canvas coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct Position {
    #[serde(alias = "position_x")]
    pub x: f64,
    #[serde(alias = "position_y")]
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Per-topology layout overrides, persisted with the selected algorithm
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct LayoutOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "number")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub node_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub layer_spacing: Option<f64>,
    /// Fixed circle radius for the circular layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub radius: Option<f64>,
    /// Explicit node order for the circular layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub order: Option<Vec<NodeId>>,
}

impl LayoutOptions {
    pub fn validate(&self) -> crate::Result<()> {
        use crate::TopologyError;

        let positive = |name: &str, value: Option<f64>| match value {
            Some(v) if !v.is_finite() || v <= 0.0 => Err(TopologyError::Validation(format!(
                "layout option {name} must be a positive number"
            ))),
            _ => Ok(()),
        };
        positive("node_spacing", self.node_spacing)?;
        positive("layer_spacing", self.layer_spacing)?;
        positive("radius", self.radius)?;
        if let Some(epsilon) = self.epsilon {
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(TopologyError::Validation(
                    "layout option epsilon must be non-negative".to_string(),
                ));
            }
        }
        if self.iterations == Some(0) {
            return Err(TopologyError::Validation(
                "layout option iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named graph container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Topology {
    pub id: TopologyId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TopologyKind,
    pub scope: Option<String>,
    pub layout_algorithm: LayoutAlgorithm,
    pub layout_options: LayoutOptions,
    #[ts(type = "Record<string, unknown> | null")]
    pub view_config: Option<Value>,
    pub is_auto_discovery: bool,
    /// Seconds between discovery runs
    #[ts(type = "number | null")]
    pub discovery_interval: Option<u64>,
    #[ts(type = "Date | null")]
    pub last_discovery_at: Option<DateTime<Utc>>,
    /// Structural version, bumped by exactly one per structural change or restore
    #[ts(type = "number")]
    pub version: u64,
    /// Bumped by every committed write
    #[ts(type = "number")]
    pub revision: u64,
    pub created_by: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl Topology {
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
        self.touch();
    }
}

/// A vertex of the topology graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TopologyNode {
    pub id: NodeId,
    pub topology_id: TopologyId,
    /// External device identifier; required for `device` nodes
    pub device_id: Option<String>,
    pub node_type: NodeKind,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub position: Position,
    pub layer: Option<u32>,
    pub size: u32,
    pub shape: String,
    pub color: Option<String>,
    pub group_id: Option<GroupId>,
    #[ts(type = "Record<string, unknown>")]
    pub properties: BTreeMap<String, Value>,
    /// Locked nodes keep their position through layout runs
    pub is_locked: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// An edge between two nodes of the same topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TopologyLink {
    pub id: LinkId,
    pub topology_id: TopologyId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub link_type: LinkKind,
    pub source_interface: Option<String>,
    pub target_interface: Option<String>,
    /// Bits per second
    #[ts(type = "number | null")]
    pub bandwidth: Option<u64>,
    pub protocol: Option<String>,
    pub status: LinkStatus,
    /// Percent, 0-100
    pub utilization: Option<f64>,
    /// Milliseconds
    pub latency: Option<f64>,
    /// Percent, 0-100
    pub packet_loss: Option<f64>,
    pub line_style: LineStyle,
    pub line_width: f64,
    pub color: Option<String>,
    pub label: Option<String>,
    #[ts(type = "Record<string, unknown>")]
    pub properties: BTreeMap<String, Value>,
    pub discovered_by: DiscoverySource,
    #[ts(type = "Date | null")]
    pub discovered_at: Option<DateTime<Utc>>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl TopologyLink {
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_node_id == node || self.target_node_id == node
    }

    /// Weight used by path search
    pub fn weight(&self) -> f64 {
        self.latency.unwrap_or(1.0)
    }
}

/// A visual and logical cluster of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TopologyGroup {
    pub id: GroupId,
    pub topology_id: TopologyId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<GroupId>,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub is_collapsed: bool,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// By-value copy of a topology's node, link and group set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct GraphSnapshot {
    pub nodes: Vec<TopologyNode>,
    pub links: Vec<TopologyLink>,
    pub groups: Vec<TopologyGroup>,
}

/// Immutable capture of a topology's graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct TopologyVersion {
    pub topology_id: TopologyId,
    #[ts(type = "number")]
    pub version: u64,
    /// Structural version of the topology when the capture was taken
    #[ts(type = "number")]
    pub topology_version: u64,
    pub snapshot: GraphSnapshot,
    pub description: Option<String>,
    pub changed_by: Option<String>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

/// Version history entry without the snapshot body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct VersionSummary {
    pub topology_id: TopologyId,
    #[ts(type = "number")]
    pub version: u64,
    #[ts(type = "number")]
    pub topology_version: u64,
    pub description: Option<String>,
    pub changed_by: Option<String>,
    pub node_count: usize,
    pub link_count: usize,
    pub group_count: usize,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

impl From<&TopologyVersion> for VersionSummary {
    fn from(version: &TopologyVersion) -> Self {
        Self {
            topology_id: version.topology_id,
            version: version.version,
            topology_version: version.topology_version,
            description: version.description.clone(),
            changed_by: version.changed_by.clone(),
            node_count: version.snapshot.nodes.len(),
            link_count: version.snapshot.links.len(),
            group_count: version.snapshot.groups.len(),
            created_at: version.created_at,
        }
    }
}

/// Full graph of one topology
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TopologyDetail {
    #[serde(flatten)]
    pub topology: Topology,
    pub nodes: Vec<TopologyNode>,
    pub links: Vec<TopologyLink>,
    pub groups: Vec<TopologyGroup>,
    pub node_count: usize,
    pub link_count: usize,
    pub group_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TopologyListItem {
    #[serde(flatten)]
    pub topology: Topology,
    pub node_count: usize,
    pub link_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TopologyPage {
    pub items: Vec<TopologyListItem>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTopology {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TopologyKind,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub layout_algorithm: LayoutAlgorithm,
    #[serde(default)]
    pub layout_options: LayoutOptions,
    #[serde(default)]
    #[ts(type = "Record<string, unknown> | null")]
    pub view_config: Option<Value>,
    #[serde(default)]
    pub is_auto_discovery: bool,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub discovery_interval: Option<u64>,
}

impl CreateTopology {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: TopologyKind::default(),
            scope: None,
            layout_algorithm: LayoutAlgorithm::default(),
            layout_options: LayoutOptions::default(),
            view_config: None,
            is_auto_discovery: false,
            discovery_interval: None,
        }
    }
}

/// Metadata patch; absent fields stay, explicit `null` clears nullable ones
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateTopology {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type", default)]
    pub kind: Option<TopologyKind>,
    #[serde(default, deserialize_with = "double_option")]
    pub scope: Option<Option<String>>,
    #[serde(default)]
    pub layout_algorithm: Option<LayoutAlgorithm>,
    #[serde(default)]
    pub layout_options: Option<LayoutOptions>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "Record<string, unknown> | null")]
    pub view_config: Option<Option<Value>>,
    #[serde(default)]
    pub is_auto_discovery: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "number | null")]
    pub discovery_interval: Option<Option<u64>>,
    #[serde(default)]
    #[ts(type = "Date | null")]
    pub last_discovery_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct TopologyFilter {
    #[serde(rename = "type", default)]
    pub kind: Option<TopologyKind>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct NewNode {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub node_type: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub layer: Option<u32>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub size: Option<i64>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub is_locked: bool,
}

impl NewNode {
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }

    pub fn of_kind(node_type: NodeKind) -> Self {
        Self {
            node_type,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateNode {
    #[serde(default, deserialize_with = "double_option")]
    pub device_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub label: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub layer: Option<Option<u32>>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub size: Option<i64>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub group_id: Option<Option<GroupId>>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown> | null")]
    pub properties: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub is_locked: Option<bool>,
}

/// One entry of a batch position write
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, TS)]
pub struct NodePositionUpdate {
    #[serde(alias = "node_id")]
    pub id: NodeId,
    #[serde(alias = "position_x")]
    pub x: f64,
    #[serde(alias = "position_y")]
    pub y: f64,
}

impl NodePositionUpdate {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewLink {
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub link_type: LinkKind,
    #[serde(default)]
    pub source_interface: Option<String>,
    #[serde(default)]
    pub target_interface: Option<String>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub bandwidth: Option<i64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub packet_loss: Option<f64>,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub discovered_by: DiscoverySource,
    #[serde(default)]
    #[ts(type = "Date | null")]
    pub discovered_at: Option<DateTime<Utc>>,
}

impl NewLink {
    pub fn between(source: NodeId, target: NodeId) -> Self {
        Self {
            source_node_id: source,
            target_node_id: target,
            link_type: LinkKind::default(),
            source_interface: None,
            target_interface: None,
            bandwidth: None,
            protocol: None,
            status: LinkStatus::default(),
            utilization: None,
            latency: None,
            packet_loss: None,
            line_style: LineStyle::default(),
            line_width: None,
            color: None,
            label: None,
            properties: BTreeMap::new(),
            discovered_by: DiscoverySource::default(),
            discovered_at: None,
        }
    }

    pub fn with_status(mut self, status: LinkStatus) -> Self {
        self.status = status;
        self
    }
}

/// Health and metric report for one link
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct LinkStatusUpdate {
    #[serde(default)]
    pub status: Option<LinkStatus>,
    #[serde(default)]
    pub utilization: Option<f64>,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub packet_loss: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<GroupId>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub is_collapsed: bool,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent: GroupId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<GroupId>>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub background_color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub border_color: Option<Option<String>>,
    #[serde(default)]
    pub is_collapsed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct LayoutRequest {
    /// Defaults to the algorithm stored on the topology
    #[serde(default)]
    pub algorithm: Option<LayoutAlgorithm>,
    /// Replaces the stored options when present
    #[serde(default)]
    pub options: Option<LayoutOptions>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct PathRequest {
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub algorithm: PathAlgorithm,
}

/// Target of an impact query: exactly one of `node_id` or `link_id`
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct ImpactRequest {
    #[serde(default)]
    pub node_id: Option<NodeId>,
    #[serde(default)]
    pub link_id: Option<LinkId>,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub link_mode: Option<ImpactLinkMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactTarget {
    Node(NodeId),
    Link(LinkId),
}

impl ImpactRequest {
    pub fn target(&self) -> crate::Result<ImpactTarget> {
        match (self.node_id, self.link_id) {
            (Some(node), None) => Ok(ImpactTarget::Node(node)),
            (None, Some(link)) => Ok(ImpactTarget::Link(link)),
            _ => Err(crate::TopologyError::Validation(
                "exactly one of node_id or link_id is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateSnapshot {
    #[serde(default)]
    pub description: Option<String>,
}

/// Distinguishes an explicit `null` from an absent field
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_use_snake_case_wire_names() {
        assert_eq!(serde_json::to_string(&LinkStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(NodeKind::Internet.to_string(), "internet");
        let kind: TopologyKind = serde_json::from_str("\"logical\"").unwrap();
        assert_eq!(kind, TopologyKind::Logical);
        assert!(NodeKind::Cloud.is_gateway());
        assert!(!NodeKind::Device.is_gateway());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let patch: UpdateTopology =
            serde_json::from_str(r#"{"description": null, "name": "core"}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.scope, None);
        assert_eq!(patch.name.as_deref(), Some("core"));
    }

    #[test]
    fn test_position_update_accepts_legacy_field_names() {
        let update: NodePositionUpdate =
            serde_json::from_str(r#"{"node_id": 3, "position_x": 1.5, "position_y": -2}"#).unwrap();
        assert_eq!(update.id, NodeId(3));
        assert_eq!(update.position(), Position::new(1.5, -2.0));
    }

    #[test]
    fn test_topology_kind_serializes_as_type() {
        let request: CreateTopology =
            serde_json::from_str(r#"{"name": "dc1", "type": "custom"}"#).unwrap();
        assert_eq!(request.kind, TopologyKind::Custom);
        assert_eq!(request.layout_algorithm, LayoutAlgorithm::Force);
    }

    #[test]
    fn test_impact_target_requires_exactly_one() {
        let both = ImpactRequest {
            node_id: Some(NodeId(1)),
            link_id: Some(LinkId(1)),
            ..Default::default()
        };
        assert!(both.target().is_err());
        assert!(ImpactRequest::default().target().is_err());
        let node = ImpactRequest {
            node_id: Some(NodeId(1)),
            ..Default::default()
        };
        assert_eq!(node.target().unwrap(), ImpactTarget::Node(NodeId(1)));
    }

    #[test]
    fn test_layout_options_validation() {
        let options = LayoutOptions {
            node_spacing: Some(-1.0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
        assert!(LayoutOptions::default().validate().is_ok());
    }
}
