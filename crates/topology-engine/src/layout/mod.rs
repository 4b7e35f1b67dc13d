//! 2D layout computation
//!
//! Algorithms run against an immutable graph copy and return positions for
//! every node; locked nodes come back exactly where they were. Disconnected
//! components are laid out independently and packed left-to-right.

mod circular;
mod force;
mod hierarchical;
mod tree;

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::config::LayoutConfig;
use crate::graph::TopologyGraph;
use crate::index::GraphIndex;
use crate::model::{LayoutAlgorithm, LayoutOptions, NodeId, Position, TopologyId, TopologyNode};
use crate::{Result, TopologyError};

/// Effective parameters: configuration defaults overlaid with per-topology options
#[derive(Debug, Clone)]
pub struct LayoutParams {
    pub iterations: usize,
    pub epsilon: f64,
    pub seed: u64,
    pub repulsion: f64,
    pub attraction: f64,
    pub damping: f64,
    pub max_step: f64,
    pub node_spacing: f64,
    pub layer_spacing: f64,
    pub component_gap: f64,
    pub min_radius: f64,
    pub radius: Option<f64>,
    pub order: Vec<NodeId>,
    pub barycenter_passes: usize,
}

impl LayoutParams {
    pub fn resolve(config: &LayoutConfig, options: &LayoutOptions) -> Self {
        Self {
            iterations: options.iterations.unwrap_or(config.max_iterations),
            epsilon: options.epsilon.unwrap_or(config.epsilon),
            seed: options.seed.unwrap_or(config.seed),
            repulsion: config.repulsion,
            attraction: config.attraction,
            damping: config.damping,
            max_step: config.max_step,
            node_spacing: options.node_spacing.unwrap_or(config.node_spacing),
            layer_spacing: options.layer_spacing.unwrap_or(config.layer_spacing),
            component_gap: config.component_gap,
            min_radius: config.min_radius,
            radius: options.radius,
            order: options.order.clone().unwrap_or_default(),
            barycenter_passes: config.barycenter_passes,
        }
    }
}

/// Wall-clock and cancellation limits for one computation
#[derive(Debug, Clone)]
pub struct LayoutBudget {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl LayoutBudget {
    pub fn new(time_budget: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now().checked_add(time_budget),
            cancel,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TopologyError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Positions for every node, ordered by node id
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    pub positions: Vec<(NodeId, Position)>,
    pub iterations: usize,
    /// An iteration cap or the time budget cut the computation short
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct NodePosition {
    pub id: NodeId,
    pub position: Position,
    pub is_locked: bool,
}

/// Response of an applied layout
#[derive(Debug, Clone, Serialize, TS)]
pub struct LayoutResult {
    pub topology_id: TopologyId,
    pub algorithm: LayoutAlgorithm,
    pub nodes: Vec<NodePosition>,
    pub iterations: usize,
    pub truncated: bool,
    #[ts(type = "number")]
    pub revision: u64,
}

/// Graph index plus the node records it was built from
pub(crate) struct LayoutInput<'a> {
    pub index: GraphIndex,
    pub nodes: Vec<&'a TopologyNode>,
}

impl<'a> LayoutInput<'a> {
    fn new(graph: &'a TopologyGraph) -> Self {
        let index = GraphIndex::full(graph);
        let nodes = index
            .ids()
            .iter()
            .filter_map(|id| graph.get_node(*id))
            .collect();
        Self { index, nodes }
    }

    fn is_locked(&self, i: usize) -> bool {
        self.nodes[i].is_locked
    }

    fn position(&self, i: usize) -> Position {
        self.nodes[i].position
    }
}

pub struct LayoutEngine;

impl LayoutEngine {
    /// Compute positions for every node of `graph`
    pub fn compute(
        graph: &TopologyGraph,
        algorithm: LayoutAlgorithm,
        params: &LayoutParams,
        budget: &LayoutBudget,
    ) -> Result<LayoutOutcome> {
        budget.check_cancelled()?;
        let input = LayoutInput::new(graph);
        let n = input.index.len();
        if n == 0 {
            return Ok(LayoutOutcome {
                positions: Vec::new(),
                iterations: 0,
                truncated: false,
            });
        }

        let mut positions: Vec<Position> = (0..n).map(|i| input.position(i)).collect();
        let mut iterations = 0;
        let mut truncated = false;

        if algorithm == LayoutAlgorithm::Circular {
            for (i, position) in circular::arrange(&input, params) {
                positions[i] = position;
            }
            iterations = 1;
        } else {
            let mut anchored = Vec::new();
            let mut free = Vec::new();
            for members in input.index.components() {
                budget.check_cancelled()?;
                let local = match algorithm {
                    LayoutAlgorithm::Force => {
                        let run = force::simulate(&input, &members, params, budget)?;
                        iterations = iterations.max(run.iterations);
                        truncated |= !run.converged;
                        if members.iter().any(|&i| input.is_locked(i)) {
                            // locked nodes pin the component in place
                            anchored.push((members, run.positions));
                            continue;
                        }
                        run.positions
                    }
                    LayoutAlgorithm::Hierarchical => {
                        let (local, cut_short) = hierarchical::arrange(&input, &members, params, budget)?;
                        iterations = iterations.max(params.barycenter_passes);
                        truncated |= cut_short;
                        local
                    }
                    LayoutAlgorithm::Tree => {
                        iterations = 1;
                        tree::arrange(&input, &members, params)
                    }
                    LayoutAlgorithm::Circular => unreachable!("handled above"),
                };
                free.push((members, local));
            }

            separate_anchored(&input, &mut anchored, params.component_gap);
            for (members, local) in &anchored {
                for (&i, position) in members.iter().zip(local) {
                    positions[i] = *position;
                }
            }
            let anchor_box = bounding_box(anchored.iter().flat_map(|(_, local)| local.iter().copied()));
            for (members, local) in pack(free, params.component_gap, anchor_box) {
                for (i, position) in members.into_iter().zip(local) {
                    positions[i] = position;
                }
            }
        }

        // locked nodes never move, whatever the algorithm produced
        for (i, position) in positions.iter_mut().enumerate() {
            if input.is_locked(i) {
                *position = input.position(i);
            }
        }
        if budget.is_expired() {
            truncated = true;
        }
        if truncated {
            warn!(%algorithm, nodes = n, iterations, "Layout returned a best-effort result");
        } else {
            debug!(%algorithm, nodes = n, iterations, "Layout computed");
        }

        Ok(LayoutOutcome {
            positions: input.index.ids().iter().copied().zip(positions).collect(),
            iterations,
            truncated,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl BoundingBox {
    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    /// Touching boxes count as overlapping
    fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

fn bounding_box(points: impl IntoIterator<Item = Position>) -> Option<BoundingBox> {
    points.into_iter().fold(None, |acc, p| {
        Some(match acc {
            None => BoundingBox {
                min_x: p.x,
                max_x: p.x,
                min_y: p.y,
                max_y: p.y,
            },
            Some(b) => BoundingBox {
                min_x: b.min_x.min(p.x),
                max_x: b.max_x.max(p.x),
                min_y: b.min_y.min(p.y),
                max_y: b.max_y.max(p.y),
            },
        })
    })
}

/// Keep the unlocked nodes of pinned components clear of every other pinned
/// component. Locked nodes stay where they are, so only the unlocked part of
/// a component is shifted right past whatever it collides with.
fn separate_anchored(input: &LayoutInput<'_>, anchored: &mut [(Vec<usize>, Vec<Position>)], gap: f64) {
    let mut occupied: Vec<(usize, BoundingBox)> = anchored
        .iter()
        .enumerate()
        .filter_map(|(c, (members, _))| {
            let locked = members.iter().filter(|&&i| input.is_locked(i)).map(|&i| input.position(i));
            bounding_box(locked).map(|b| (c, b))
        })
        .collect();

    for (c, (members, local)) in anchored.iter_mut().enumerate() {
        let free: Vec<usize> = (0..members.len()).filter(|&k| !input.is_locked(members[k])).collect();
        let Some(free_box) = bounding_box(free.iter().map(|&k| local[k])) else {
            continue;
        };
        let others = || occupied.iter().filter(move |(owner, _)| *owner != c).map(|(_, b)| b);
        let placed = if others().any(|b| b.overlaps(&free_box)) {
            let frontier = others().fold(f64::NEG_INFINITY, |x, b| x.max(b.max_x));
            let dx = frontier + gap - free_box.min_x;
            for &k in &free {
                local[k].x += dx;
            }
            BoundingBox {
                min_x: free_box.min_x + dx,
                max_x: free_box.max_x + dx,
                ..free_box
            }
        } else {
            free_box
        };
        occupied.push((c, placed));
    }
}

/// Place components side by side with `gap` between bounding boxes
///
/// Without an anchor the packed row is centred on the origin; with one it
/// starts to the right of the anchor box, level with its centre.
fn pack(
    components: Vec<(Vec<usize>, Vec<Position>)>,
    gap: f64,
    anchor: Option<BoundingBox>,
) -> Vec<(Vec<usize>, Vec<Position>)> {
    let mut cursor = anchor.map_or(0.0, |a| a.max_x + gap);
    let center_y = anchor.map_or(0.0, |a| a.center_y());
    let mut packed = Vec::with_capacity(components.len());

    for (members, local) in components {
        let Some(bbox) = bounding_box(local.iter().copied()) else {
            continue;
        };
        let dx = cursor - bbox.min_x;
        let dy = center_y - bbox.center_y();
        let shifted: Vec<Position> = local
            .into_iter()
            .map(|p| Position::new(p.x + dx, p.y + dy))
            .collect();
        cursor += bbox.width() + gap;
        packed.push((members, shifted));
    }

    if anchor.is_none() && !packed.is_empty() {
        let row_width = cursor - gap;
        let shift = row_width / 2.0;
        for (_, local) in &mut packed {
            for p in local.iter_mut() {
                p.x -= shift;
            }
        }
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::model::{LinkStatus, NodeKind};

    fn params() -> LayoutParams {
        LayoutParams::resolve(&LayoutConfig::default(), &LayoutOptions::default())
    }

    fn run(graph: &TopologyGraph, algorithm: LayoutAlgorithm) -> LayoutOutcome {
        LayoutEngine::compute(graph, algorithm, &params(), &LayoutBudget::unlimited()).unwrap()
    }

    fn boxes_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
        a.overlaps(b)
    }

    const ALL: [LayoutAlgorithm; 4] = [
        LayoutAlgorithm::Force,
        LayoutAlgorithm::Hierarchical,
        LayoutAlgorithm::Circular,
        LayoutAlgorithm::Tree,
    ];

    #[test]
    fn test_empty_graph_is_a_no_op() {
        let graph = TopologyGraph::new(TopologyId(1));
        for algorithm in ALL {
            let outcome = run(&graph, algorithm);
            assert!(outcome.positions.is_empty());
            assert!(!outcome.truncated);
        }
    }

    #[test]
    fn test_single_node_is_centred() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        node(&mut graph, 1, NodeKind::Device);
        graph.get_node_mut(NodeId(1)).unwrap().position = Position::new(300.0, -40.0);
        for algorithm in ALL {
            let outcome = run(&graph, algorithm);
            assert_eq!(outcome.positions, vec![(NodeId(1), Position::ORIGIN)], "{algorithm}");
        }
    }

    #[test]
    fn test_locked_nodes_keep_their_positions() {
        let mut graph = chain(4);
        let pinned = Position::new(500.0, 500.0);
        let node = graph.get_node_mut(NodeId(2)).unwrap();
        node.is_locked = true;
        node.position = pinned;
        for algorithm in ALL {
            let outcome = run(&graph, algorithm);
            let (_, position) = outcome.positions.iter().find(|(id, _)| *id == NodeId(2)).unwrap();
            assert_eq!(*position, pinned, "{algorithm}");
            assert_eq!(outcome.positions.len(), 4);
        }
    }

    #[test]
    fn test_disconnected_components_do_not_overlap() {
        let mut graph = chain(3);
        node(&mut graph, 4, NodeKind::Device);
        node(&mut graph, 5, NodeKind::Device);
        link(&mut graph, 9, 4, 5, LinkStatus::Up);
        node(&mut graph, 6, NodeKind::Cloud);

        for algorithm in [LayoutAlgorithm::Force, LayoutAlgorithm::Hierarchical, LayoutAlgorithm::Tree] {
            let outcome = run(&graph, algorithm);
            let lookup = |ids: &[u64]| {
                bounding_box(
                    outcome
                        .positions
                        .iter()
                        .filter(|(id, _)| ids.contains(&id.0))
                        .map(|(_, p)| *p),
                )
                .unwrap()
            };
            let a = lookup(&[1, 2, 3]);
            let b = lookup(&[4, 5]);
            let c = lookup(&[6]);
            assert!(!boxes_overlap(&a, &b), "{algorithm}");
            assert!(!boxes_overlap(&b, &c), "{algorithm}");
            assert!(!boxes_overlap(&a, &c), "{algorithm}");
            assert!(outcome.positions.iter().all(|(_, p)| p.is_finite()));
        }
    }

    #[test]
    fn test_pinned_components_keep_their_free_nodes_apart() {
        // two stars, each hub locked right next to the other hub
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=8 {
            node(&mut graph, id, NodeKind::Device);
        }
        for (link_id, (hub, leaf)) in [(1, 2), (1, 3), (1, 4), (5, 6), (5, 7), (5, 8)].into_iter().enumerate() {
            link(&mut graph, link_id as u64 + 1, hub, leaf, LinkStatus::Up);
        }
        for (id, x) in [(1, 0.0), (5, 10.0)] {
            let hub = graph.get_node_mut(NodeId(id)).unwrap();
            hub.is_locked = true;
            hub.position = Position::new(x, 0.0);
        }

        let outcome = run(&graph, LayoutAlgorithm::Force);
        let lookup = |ids: &[u64]| {
            bounding_box(
                outcome
                    .positions
                    .iter()
                    .filter(|(id, _)| ids.contains(&id.0))
                    .map(|(_, p)| *p),
            )
            .unwrap()
        };
        assert_eq!(lookup(&[1]).min_x, 0.0);
        assert_eq!(lookup(&[5]).min_x, 10.0);
        let first_leaves = lookup(&[2, 3, 4]);
        let second_leaves = lookup(&[6, 7, 8]);
        assert!(!boxes_overlap(&first_leaves, &lookup(&[5])));
        assert!(!boxes_overlap(&second_leaves, &lookup(&[1])));
        assert!(!boxes_overlap(&first_leaves, &second_leaves));
        assert!(outcome.positions.iter().all(|(_, p)| p.is_finite()));
    }

    #[test]
    fn test_cancelled_budget_reports_cancelled() {
        let graph = chain(3);
        let token = CancellationToken::new();
        token.cancel();
        let budget = LayoutBudget::new(Duration::from_secs(5), token);
        let err = LayoutEngine::compute(&graph, LayoutAlgorithm::Force, &params(), &budget).unwrap_err();
        assert!(matches!(err, TopologyError::Cancelled));
    }

    #[test]
    fn test_expired_budget_truncates() {
        let graph = chain(6);
        let budget = LayoutBudget::new(Duration::ZERO, CancellationToken::new());
        let outcome = LayoutEngine::compute(&graph, LayoutAlgorithm::Force, &params(), &budget).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.positions.len(), 6);
    }

    #[test]
    fn test_options_override_config() {
        let options = LayoutOptions {
            node_spacing: Some(80.0),
            iterations: Some(10),
            ..Default::default()
        };
        let params = LayoutParams::resolve(&LayoutConfig::default(), &options);
        assert_eq!(params.node_spacing, 80.0);
        assert_eq!(params.iterations, 10);
        assert_eq!(params.layer_spacing, 120.0);
    }
}
