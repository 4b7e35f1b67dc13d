//! Breadth-first tree placement

use std::collections::{HashMap, VecDeque};

use super::{LayoutInput, LayoutParams};
use crate::model::Position;

/// Component-local positions: depth sets the row, leaf counts set the width
/// each subtree claims, parents sit centred over their children
pub(super) fn arrange(input: &LayoutInput<'_>, members: &[usize], params: &LayoutParams) -> Vec<Position> {
    let n = members.len();
    let local: HashMap<usize, usize> = members.iter().enumerate().map(|(k, &i)| (i, k)).collect();

    let mut roots: Vec<usize> = (0..n)
        .filter(|&k| {
            input
                .index
                .predecessors(members[k])
                .iter()
                .all(|p| !local.contains_key(p))
        })
        .collect();
    if roots.is_empty() {
        let fallback = (0..n).min_by_key(|&k| {
            let node = input.nodes[members[k]];
            (node.layer.unwrap_or(0), node.id)
        });
        roots.extend(fallback);
    }

    let mut depth = vec![usize::MAX; n];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    for &root in &roots {
        depth[root] = 0;
        queue.push_back(root);
    }
    while let Some(k) = queue.pop_front() {
        order.push(k);
        let mut next: Vec<usize> = input
            .index
            .neighbors(members[k])
            .iter()
            .filter_map(|e| local.get(&e.to).copied())
            .collect();
        next.sort_unstable();
        next.dedup();
        for m in next {
            if depth[m] == usize::MAX {
                depth[m] = depth[k] + 1;
                children[k].push(m);
                queue.push_back(m);
            }
        }
    }

    // leaf counts, children before parents
    let mut width = vec![1usize; n];
    for &k in order.iter().rev() {
        if !children[k].is_empty() {
            width[k] = children[k].iter().map(|&c| width[c]).sum();
        }
    }

    let spacing = params.node_spacing;
    let mut left = vec![0.0f64; n];
    let mut cursor = 0.0;
    for &root in &roots {
        left[root] = cursor;
        cursor += width[root] as f64 * spacing;
    }

    let mut positions = vec![Position::ORIGIN; n];
    for &k in &order {
        positions[k] = Position::new(
            left[k] + width[k] as f64 * spacing / 2.0,
            depth[k] as f64 * params.layer_spacing,
        );
        let mut child_left = left[k];
        for &c in &children[k] {
            left[c] = child_left;
            child_left += width[c] as f64 * spacing;
        }
    }
    positions
}
