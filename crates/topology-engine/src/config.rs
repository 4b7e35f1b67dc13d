//! Configuration for the topology engine

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::model::ImpactLinkMode;

/// Graph store behaviour
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StoreConfig {
    /// Page size used when a list request does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Upper bound for requested page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Allow more than one link between the same ordered endpoint pair
    #[serde(default)]
    pub allow_parallel_links: bool,
    /// Capture the live graph as a version before every restore
    #[serde(default = "default_true")]
    pub snapshot_before_restore: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            allow_parallel_links: false,
            snapshot_before_restore: true,
        }
    }
}

/// Layout defaults; per-request options override them
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LayoutConfig {
    /// Iteration cap for the force simulation
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Total displacement below which the force simulation has settled
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Seed for initial placement of unplaced nodes
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_repulsion")]
    pub repulsion: f64,
    #[serde(default = "default_attraction")]
    pub attraction: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Largest distance a node may travel in one iteration
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    /// Horizontal distance between neighbouring nodes
    #[serde(default = "default_spacing")]
    pub node_spacing: f64,
    /// Vertical distance between layers
    #[serde(default = "default_spacing")]
    pub layer_spacing: f64,
    /// Gap between the bounding boxes of disconnected components
    #[serde(default = "default_component_gap")]
    pub component_gap: f64,
    /// Smallest circle radius used by the circular layout
    #[serde(default = "default_min_radius")]
    pub min_radius: f64,
    /// Down+up barycenter sweeps of the hierarchical layout
    #[serde(default = "default_barycenter_passes")]
    pub barycenter_passes: usize,
    /// Wall-clock budget for one layout computation
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            epsilon: default_epsilon(),
            seed: default_seed(),
            repulsion: default_repulsion(),
            attraction: default_attraction(),
            damping: default_damping(),
            max_step: default_max_step(),
            node_spacing: default_spacing(),
            layer_spacing: default_spacing(),
            component_gap: default_component_gap(),
            min_radius: default_min_radius(),
            barycenter_passes: default_barycenter_passes(),
            time_budget_ms: default_time_budget_ms(),
        }
    }
}

/// Path enumeration limits
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PathConfig {
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    /// Longest simple path, in hops, considered by the `all` algorithm
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Treat links in `unknown` health as traversable
    #[serde(default)]
    pub traverse_unknown_links: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
            max_depth: default_max_depth(),
            traverse_unknown_links: false,
        }
    }
}

/// Impact classification
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ImpactConfig {
    /// Affected fraction of all nodes at or above which impact is `high`
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
    #[serde(default)]
    pub link_mode: ImpactLinkMode,
    /// Ignore `down` links when computing reachability
    #[serde(default)]
    pub respect_link_status: bool,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            link_mode: ImpactLinkMode::default(),
            respect_link_status: false,
        }
    }
}

/// Core configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub paths: PathConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

fn default_max_iterations() -> usize {
    200
}

fn default_epsilon() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    42
}

// Equilibrium length of a single link is cbrt(repulsion / attraction) = 100.
fn default_repulsion() -> f64 {
    20_000.0
}

fn default_attraction() -> f64 {
    0.02
}

fn default_damping() -> f64 {
    0.85
}

fn default_max_step() -> f64 {
    50.0
}

fn default_spacing() -> f64 {
    120.0
}

fn default_component_gap() -> f64 {
    160.0
}

fn default_min_radius() -> f64 {
    100.0
}

fn default_barycenter_passes() -> usize {
    4
}

fn default_time_budget_ms() -> u64 {
    5_000
}

fn default_max_paths() -> usize {
    100
}

fn default_max_depth() -> usize {
    16
}

fn default_high_threshold() -> f64 {
    0.30
}

impl EngineConfig {
    /// Check that the configured values make sense together
    pub fn validate(&self) -> crate::Result<()> {
        use crate::TopologyError;

        if self.store.default_page_size == 0 || self.store.max_page_size == 0 {
            return Err(TopologyError::Validation(
                "page sizes must be positive".to_string(),
            ));
        }
        if self.store.default_page_size > self.store.max_page_size {
            return Err(TopologyError::Validation(format!(
                "default page size {} exceeds max page size {}",
                self.store.default_page_size, self.store.max_page_size
            )));
        }
        if !(0.0..=1.0).contains(&self.impact.high_threshold) {
            return Err(TopologyError::Validation(format!(
                "impact threshold must be within 0..=1, got {}",
                self.impact.high_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.layout.damping) {
            return Err(TopologyError::Validation(format!(
                "layout damping must be within 0..1, got {}",
                self.layout.damping
            )));
        }
        if self.layout.epsilon < 0.0 || self.layout.node_spacing <= 0.0 || self.layout.layer_spacing <= 0.0 {
            return Err(TopologyError::Validation(
                "layout epsilon must be non-negative and spacings positive".to_string(),
            ));
        }
        Ok(())
    }
}
