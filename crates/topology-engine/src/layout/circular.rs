//! Single-circle placement

use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, TAU};

use super::{LayoutInput, LayoutParams};
use crate::model::Position;

/// Every unlocked node on one circle around the origin, in the explicit
/// order first and the remaining nodes by id after it
pub(super) fn arrange(input: &LayoutInput<'_>, params: &LayoutParams) -> Vec<(usize, Position)> {
    let movable = |i: &usize| !input.is_locked(*i);

    let mut placed = HashSet::new();
    let mut ring: Vec<usize> = params
        .order
        .iter()
        .filter_map(|id| input.index.index_of(*id))
        .filter(movable)
        .filter(|i| placed.insert(*i))
        .collect();
    ring.extend((0..input.index.len()).filter(movable).filter(|i| !placed.contains(i)));

    let count = ring.len();
    if count == 1 {
        return vec![(ring[0], Position::ORIGIN)];
    }
    let radius = params
        .radius
        .unwrap_or_else(|| (count as f64 * params.node_spacing / TAU).max(params.min_radius));

    ring.into_iter()
        .enumerate()
        .map(|(k, i)| {
            let angle = -FRAC_PI_2 + TAU * k as f64 / count as f64;
            (i, Position::new(radius * angle.cos(), radius * angle.sin()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{LayoutBudget, LayoutEngine, LayoutParams};
    use crate::config::LayoutConfig;
    use crate::graph::fixtures::*;
    use crate::graph::TopologyGraph;
    use crate::model::*;

    fn layout(graph: &TopologyGraph, options: LayoutOptions) -> Vec<(NodeId, Position)> {
        let params = LayoutParams::resolve(&LayoutConfig::default(), &options);
        LayoutEngine::compute(graph, LayoutAlgorithm::Circular, &params, &LayoutBudget::unlimited())
            .unwrap()
            .positions
    }

    #[test]
    fn test_four_nodes_equally_spaced() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=4 {
            node(&mut graph, id, NodeKind::Device);
        }
        let positions = layout(&graph, LayoutOptions::default());

        let radii: Vec<f64> = positions.iter().map(|(_, p)| p.distance(&Position::ORIGIN)).collect();
        assert!(radii.iter().all(|r| (r - 100.0).abs() < 1e-9));
        for k in 0..4 {
            let a = positions[k].1;
            let b = positions[(k + 1) % 4].1;
            assert!((a.distance(&b) - 100.0 * 2f64.sqrt()).abs() < 1e-9);
        }
        // first node at the top
        assert!((positions[0].1.y + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_order_then_remaining_by_id() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=4 {
            node(&mut graph, id, NodeKind::Device);
        }
        let options = LayoutOptions {
            order: Some(vec![NodeId(3), NodeId(99), NodeId(3)]),
            ..Default::default()
        };
        let positions = layout(&graph, options);
        let top = positions.iter().find(|(id, _)| *id == NodeId(3)).unwrap().1;
        assert!((top.y + 100.0).abs() < 1e-9 && top.x.abs() < 1e-9);
    }

    #[test]
    fn test_radius_grows_with_node_count() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=20 {
            node(&mut graph, id, NodeKind::Device);
        }
        let positions = layout(&graph, LayoutOptions::default());
        let expected = 20.0 * 120.0 / std::f64::consts::TAU;
        assert!((positions[0].1.distance(&Position::ORIGIN) - expected).abs() < 1e-9);
    }
}
