//! Layered placement with barycenter ordering

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::{LayoutBudget, LayoutInput, LayoutParams};
use crate::model::Position;
use crate::Result;

/// Returns component-local positions and whether the time budget cut the
/// barycenter sweeps short
pub(super) fn arrange(
    input: &LayoutInput<'_>,
    members: &[usize],
    params: &LayoutParams,
    budget: &LayoutBudget,
) -> Result<(Vec<Position>, bool)> {
    let local: HashMap<usize, usize> = members.iter().enumerate().map(|(k, &i)| (i, k)).collect();
    let n = members.len();

    let successors: Vec<Vec<usize>> = members
        .iter()
        .map(|&i| {
            input
                .index
                .successors(i)
                .iter()
                .filter_map(|t| local.get(t).copied())
                .collect()
        })
        .collect();
    let dag = drop_back_edges(&successors);
    let layers = assign_layers(input, members, &dag);

    let mut rows: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for k in 0..n {
        rows.entry(layers[k]).or_default().push(k);
    }

    // undirected neighbour slots, for barycenters in both sweep directions
    let neighbours: Vec<Vec<usize>> = members
        .iter()
        .map(|&i| {
            input
                .index
                .neighbors(i)
                .iter()
                .filter_map(|e| local.get(&e.to).copied())
                .collect()
        })
        .collect();

    let keys: Vec<u32> = rows.keys().copied().collect();
    let mut cut_short = false;
    for _ in 0..params.barycenter_passes {
        budget.check_cancelled()?;
        if budget.is_expired() {
            cut_short = true;
            break;
        }
        for pair in keys.windows(2) {
            sweep(&mut rows, &layers, &neighbours, pair[1], |l| l < pair[1]);
        }
        for pair in keys.windows(2).rev() {
            sweep(&mut rows, &layers, &neighbours, pair[0], |l| l > pair[0]);
        }
    }

    let mut positions = vec![Position::ORIGIN; n];
    for (&layer, row) in &rows {
        let centre = (row.len() as f64 - 1.0) / 2.0;
        for (slot, &k) in row.iter().enumerate() {
            positions[k] = Position::new(
                (slot as f64 - centre) * params.node_spacing,
                layer as f64 * params.layer_spacing,
            );
        }
    }
    Ok((positions, cut_short))
}

/// Remove edges that close a cycle, found by depth-first search from the
/// sources (nodes with no incoming edge) in slot order
fn drop_back_edges(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = successors.len();
    let mut has_incoming = vec![false; n];
    for targets in successors {
        for &t in targets {
            has_incoming[t] = true;
        }
    }
    let starts: Vec<usize> = (0..n)
        .filter(|&k| !has_incoming[k])
        .chain((0..n).filter(|&k| has_incoming[k]))
        .collect();

    // 0 = unvisited, 1 = on the stack, 2 = finished
    let mut state = vec![0u8; n];
    let mut back_edges: HashSet<(usize, usize)> = HashSet::new();
    for start in starts {
        if state[start] != 0 {
            continue;
        }
        state[start] = 1;
        let mut stack = vec![(start, 0usize)];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&target) = successors[node].get(top.1) {
                top.1 += 1;
                match state[target] {
                    0 => {
                        state[target] = 1;
                        stack.push((target, 0));
                    }
                    1 => {
                        back_edges.insert((node, target));
                    }
                    _ => {}
                }
            } else {
                state[node] = 2;
                stack.pop();
            }
        }
    }

    successors
        .iter()
        .enumerate()
        .map(|(s, targets)| {
            targets
                .iter()
                .copied()
                .filter(|&t| !back_edges.contains(&(s, t)))
                .collect()
        })
        .collect()
}

/// Explicit node layers win; the rest get the longest path from a source
fn assign_layers(input: &LayoutInput<'_>, members: &[usize], dag: &[Vec<usize>]) -> Vec<u32> {
    let n = members.len();
    let mut indegree = vec![0usize; n];
    for targets in dag {
        for &t in targets {
            indegree[t] += 1;
        }
    }

    let explicit: Vec<Option<u32>> = members.iter().map(|&i| input.nodes[i].layer).collect();
    let mut layers: Vec<u32> = explicit.iter().map(|l| l.unwrap_or(0)).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&k| indegree[k] == 0).collect();
    while let Some(k) = queue.pop_front() {
        for &t in &dag[k] {
            if explicit[t].is_none() {
                layers[t] = layers[t].max(layers[k].saturating_add(1));
            }
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }
    layers
}

/// Reorder one row by the mean slot of its neighbours in the rows selected by `towards`
fn sweep(
    rows: &mut BTreeMap<u32, Vec<usize>>,
    layers: &[u32],
    neighbours: &[Vec<usize>],
    row_key: u32,
    towards: impl Fn(u32) -> bool,
) {
    let mut slot_of: HashMap<usize, f64> = HashMap::new();
    for (&layer, row) in rows.iter() {
        if towards(layer) {
            for (slot, &k) in row.iter().enumerate() {
                slot_of.insert(k, slot as f64);
            }
        }
    }

    let Some(row) = rows.get_mut(&row_key) else {
        return;
    };
    let mut keyed: Vec<(f64, usize, usize)> = row
        .iter()
        .enumerate()
        .map(|(current, &k)| {
            let slots: Vec<f64> = neighbours[k]
                .iter()
                .filter(|&&m| towards(layers[m]))
                .filter_map(|m| slot_of.get(m).copied())
                .collect();
            let barycenter = if slots.is_empty() {
                current as f64
            } else {
                slots.iter().sum::<f64>() / slots.len() as f64
            };
            (barycenter, current, k)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    *row = keyed.into_iter().map(|(_, _, k)| k).collect();
}

#[cfg(test)]
mod tests {
    use super::super::{LayoutBudget, LayoutEngine, LayoutParams};
    use crate::config::LayoutConfig;
    use crate::graph::fixtures::*;
    use crate::graph::TopologyGraph;
    use crate::model::*;

    fn layout(graph: &TopologyGraph) -> Vec<(NodeId, Position)> {
        let params = LayoutParams::resolve(&LayoutConfig::default(), &LayoutOptions::default());
        LayoutEngine::compute(graph, LayoutAlgorithm::Hierarchical, &params, &LayoutBudget::unlimited())
            .unwrap()
            .positions
    }

    fn y_of(positions: &[(NodeId, Position)], id: u64) -> f64 {
        positions.iter().find(|(n, _)| n.0 == id).map(|(_, p)| p.y).unwrap()
    }

    #[test]
    fn test_longest_path_layers() {
        // 1 -> 2 -> 3 and a shortcut 1 -> 3: node 3 still sits two layers down
        let mut graph = chain(3);
        link(&mut graph, 9, 1, 3, LinkStatus::Up);
        let positions = layout(&graph);
        assert_eq!(y_of(&positions, 2) - y_of(&positions, 1), 120.0);
        assert_eq!(y_of(&positions, 3) - y_of(&positions, 1), 240.0);
    }

    #[test]
    fn test_cycles_are_broken() {
        let mut graph = chain(3);
        link(&mut graph, 9, 3, 1, LinkStatus::Up);
        let positions = layout(&graph);
        let mut ys: Vec<f64> = positions.iter().map(|(_, p)| p.y).collect();
        ys.dedup();
        assert_eq!(ys.len(), 3);
    }

    #[test]
    fn test_explicit_layers_are_kept() {
        let mut graph = chain(2);
        graph.get_node_mut(NodeId(2)).unwrap().layer = Some(4);
        let positions = layout(&graph);
        assert_eq!(y_of(&positions, 2) - y_of(&positions, 1), 480.0);
    }

    #[test]
    fn test_top_explicit_layer_does_not_overflow() {
        let mut graph = chain(2);
        graph.get_node_mut(NodeId(1)).unwrap().layer = Some(u32::MAX);
        let positions = layout(&graph);
        assert_eq!(positions.len(), 2);
        assert!(positions.iter().all(|(_, p)| p.x.is_finite() && p.y.is_finite()));
        // the child cannot go deeper, so it joins its parent's row
        assert_eq!(y_of(&positions, 2), y_of(&positions, 1));
    }

    #[test]
    fn test_siblings_share_a_row_without_overlap() {
        let mut graph = TopologyGraph::new(TopologyId(1));
        for id in 1..=4 {
            node(&mut graph, id, NodeKind::Device);
        }
        link(&mut graph, 1, 1, 2, LinkStatus::Up);
        link(&mut graph, 2, 1, 3, LinkStatus::Up);
        link(&mut graph, 3, 1, 4, LinkStatus::Up);
        let positions = layout(&graph);
        let row: Vec<f64> = positions.iter().filter(|(id, _)| id.0 > 1).map(|(_, p)| p.x).collect();
        assert_eq!(row.len(), 3);
        let mut sorted = row.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(sorted[1] - sorted[0], 120.0);
        assert_eq!(sorted[2] - sorted[1], 120.0);
    }
}
