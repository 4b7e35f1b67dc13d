//! Spring-electrical simulation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{LayoutBudget, LayoutInput, LayoutParams};
use crate::model::Position;
use crate::Result;

const MIN_DISTANCE: f64 = 0.01;

pub(super) struct ForceRun {
    pub positions: Vec<Position>,
    pub iterations: usize,
    pub converged: bool,
}

/// Settle one connected component
///
/// Unlocked nodes still sitting at the origin get a seeded random start,
/// so the same graph and seed always produce the same result.
pub(super) fn simulate(
    input: &LayoutInput<'_>,
    members: &[usize],
    params: &LayoutParams,
    budget: &LayoutBudget,
) -> Result<ForceRun> {
    let n = members.len();
    let locked: Vec<bool> = members.iter().map(|&i| input.is_locked(i)).collect();
    let mut positions: Vec<Position> = members.iter().map(|&i| input.position(i)).collect();

    let component_seed = members
        .iter()
        .map(|&i| input.index.id(i).get())
        .min()
        .unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(params.seed ^ component_seed);
    let spread = params.node_spacing * (n as f64).sqrt();
    for (p, &is_locked) in positions.iter_mut().zip(&locked) {
        if !is_locked && *p == Position::ORIGIN {
            *p = Position::new(rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread));
        }
    }

    // component-local edge list, each undirected link once
    let local: std::collections::HashMap<usize, usize> =
        members.iter().enumerate().map(|(k, &i)| (i, k)).collect();
    let mut springs = Vec::new();
    for (k, &i) in members.iter().enumerate() {
        for edge in input.index.neighbors(i) {
            if let Some(&other) = local.get(&edge.to) {
                if other > k {
                    springs.push((k, other));
                }
            }
        }
    }

    let mut velocity = vec![(0.0f64, 0.0f64); n];
    let mut iterations = 0;
    let mut converged = n < 2;

    while !converged && iterations < params.iterations {
        budget.check_cancelled()?;
        if budget.is_expired() {
            break;
        }
        iterations += 1;

        let mut force = vec![(0.0f64, 0.0f64); n];
        for a in 0..n {
            for b in (a + 1)..n {
                let (ux, uy, d) = direction(positions[a], positions[b], a, b);
                let f = params.repulsion / (d * d);
                force[a].0 += ux * f;
                force[a].1 += uy * f;
                force[b].0 -= ux * f;
                force[b].1 -= uy * f;
            }
        }
        for &(a, b) in &springs {
            let (ux, uy, d) = direction(positions[a], positions[b], a, b);
            let f = params.attraction * d;
            force[a].0 -= ux * f;
            force[a].1 -= uy * f;
            force[b].0 += ux * f;
            force[b].1 += uy * f;
        }

        let mut displacement = 0.0;
        for k in 0..n {
            if locked[k] {
                continue;
            }
            let mut vx = (velocity[k].0 + force[k].0) * params.damping;
            let mut vy = (velocity[k].1 + force[k].1) * params.damping;
            let speed = (vx * vx + vy * vy).sqrt();
            if speed > params.max_step {
                vx *= params.max_step / speed;
                vy *= params.max_step / speed;
            }
            velocity[k] = (vx, vy);
            positions[k].x += vx;
            positions[k].y += vy;
            displacement += vx.hypot(vy);
        }

        if displacement < params.epsilon {
            converged = true;
        }
    }

    Ok(ForceRun {
        positions,
        iterations,
        converged,
    })
}

/// Unit vector from `b` towards `a` plus their distance
///
/// Coincident nodes are separated along an angle derived from their slots.
fn direction(a: Position, b: Position, ka: usize, kb: usize) -> (f64, f64, f64) {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let d = dx.hypot(dy);
    if d < MIN_DISTANCE {
        let angle = (ka * 31 + kb * 17) as f64 * 0.618_033_988_75 * std::f64::consts::TAU;
        return (angle.cos(), angle.sin(), MIN_DISTANCE);
    }
    (dx / d, dy / d, d)
}
