//! Tearable cloth grids.

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::composite::Composite;
use crate::config::ClothConfig;
use crate::constraints::{ConstraintId, ConstraintKind, DistanceConstraint};
use crate::error::BuildError;
use crate::particle::{ParticleId, ParticleSet};
use crate::solver::Solver;

pub const STRUCTURAL_STIFFNESS: f32 = 1.0;
pub const SHEAR_STIFFNESS: f32 = 0.5;
pub const BEND_STIFFNESS: f32 = 0.2;

/// Which nodes of the top row start pinned.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum PinPolicy {
    None,
    #[default]
    TopRow,
    TopCorners,
    /// Every n-th column of the top row, always including both corners.
    TopEvery(usize),
    TopColumns(Vec<usize>),
}

impl PinPolicy {
    fn pins(&self, col: usize, row: usize, cols: usize) -> bool {
        if row != 0 {
            return false;
        }
        match self {
            PinPolicy::None => false,
            PinPolicy::TopRow => true,
            PinPolicy::TopCorners => col == 0 || col + 1 == cols,
            PinPolicy::TopEvery(n) => col % (*n).max(1) == 0 || col + 1 == cols,
            PinPolicy::TopColumns(columns) => columns.contains(&col),
        }
    }
}

pub struct Cloth {
    pub origin: Vec2,
    /// Grid nodes per row (segments_x + 1).
    pub cols: usize,
    /// Grid nodes per column (segments_y + 1).
    pub rows: usize,
    pub spacing: Vec2,
    /// Row-major: node (col, row) is at `row * cols + col`.
    particles: Vec<ParticleId>,
    pub constraints: Vec<ConstraintId>,
    /// Initial y of each node, sets its wind phase.
    rest_y: Vec<f32>,
    pub tear_factor: f32,
    pub wind_strength: f32,
    pub wind_frequency: f32,
    pub turbulence: f32,
    pub tear_debris: bool,
    pub self_collision: bool,
    /// Minimum node separation as a fraction of the smaller spacing.
    pub self_collision_distance: f32,
    /// Constraints torn so far.
    pub torn: usize,
}

impl Composite for Cloth {
    fn particle_ids(&self) -> &[ParticleId] {
        &self.particles
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_cloth(
    solver: &mut Solver,
    origin: Vec2,
    width: f32,
    height: f32,
    segments_x: usize,
    segments_y: usize,
    pin: &PinPolicy,
    config: &ClothConfig,
) -> Result<Cloth, BuildError> {
    if segments_x == 0 || segments_y == 0 {
        return Err(BuildError::GridTooSmall { segments_x, segments_y });
    }
    for (name, value) in [("width", width), ("height", height)] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(BuildError::NonPositiveSize { name, value });
        }
    }

    let cols = segments_x + 1;
    let rows = segments_y + 1;
    let spacing = Vec2::new(width / segments_x as f32, height / segments_y as f32);

    let mut particles = Vec::with_capacity(cols * rows);
    let mut rest_y = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let p = origin + Vec2::new(col as f32, row as f32) * spacing;
            let pinned = pin.pins(col, row, cols);
            particles.push(solver.create_particle(p, config.particle_mass, pinned));
            rest_y.push(p.y);
        }
    }

    let at = |col: usize, row: usize| particles[row * cols + col];
    let mut links: Vec<(ParticleId, ParticleId, f32, ConstraintKind)> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                links.push((at(col, row), at(col + 1, row), STRUCTURAL_STIFFNESS, ConstraintKind::Structural));
            }
            if row + 1 < rows {
                links.push((at(col, row), at(col, row + 1), STRUCTURAL_STIFFNESS, ConstraintKind::Structural));
            }
            if col + 1 < cols && row + 1 < rows {
                links.push((at(col, row), at(col + 1, row + 1), SHEAR_STIFFNESS, ConstraintKind::Shear));
                links.push((at(col + 1, row), at(col, row + 1), SHEAR_STIFFNESS, ConstraintKind::Shear));
            }
            if col + 2 < cols {
                links.push((at(col, row), at(col + 2, row), BEND_STIFFNESS, ConstraintKind::Bend));
            }
            if row + 2 < rows {
                links.push((at(col, row), at(col, row + 2), BEND_STIFFNESS, ConstraintKind::Bend));
            }
        }
    }

    let constraints = links
        .into_iter()
        .map(|(a, b, stiffness, kind)| {
            let rest = solver.particles.position[a.index()].distance(solver.particles.position[b.index()]);
            solver.push_constraint(DistanceConstraint::new(a, b, rest, stiffness).with_kind(kind))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Cloth {
        origin,
        cols,
        rows,
        spacing,
        particles,
        constraints,
        rest_y,
        tear_factor: config.tear_factor,
        wind_strength: config.wind_strength,
        wind_frequency: config.wind_frequency,
        turbulence: config.turbulence,
        tear_debris: config.tear_debris,
        self_collision: config.self_collision,
        self_collision_distance: config.self_collision_distance,
        torn: 0,
    })
}

impl Cloth {
    pub fn node(&self, col: usize, row: usize) -> Option<ParticleId> {
        if col < self.cols && row < self.rows {
            self.particles.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Sinusoidal wind on unpinned nodes. `time` is simulation time, so runs
    /// with the same seed blow the same way.
    pub fn apply_wind(&self, particles: &mut ParticleSet, time: f32, rng: &mut ChaCha8Rng) {
        if self.wind_strength == 0.0 && self.turbulence == 0.0 {
            return;
        }
        let t = time * self.wind_frequency;
        for (id, &y0) in self.particles.iter().zip(&self.rest_y) {
            let i = id.index();
            if !particles.active[i] || particles.pinned[i] {
                continue;
            }
            let mut wind = Vec2::new(
                (t + y0 * 0.1).sin() * self.wind_strength,
                (t * 0.5).cos() * self.wind_strength * 0.5,
            );
            if self.turbulence > 0.0 {
                wind += Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * self.turbulence;
            }
            particles.apply_force(*id, wind);
        }
    }

    /// Break every intact constraint stretched past `rest_length * tear_factor`.
    /// Returns the midpoints of the torn constraints.
    pub fn tear(&mut self, solver: &mut Solver) -> Vec<Vec2> {
        let mut torn = Vec::new();
        for &id in &self.constraints {
            let Some(c) = solver.constraint(id) else { continue };
            if !solver.is_solvable(c) {
                continue;
            }
            let limit = c.rest_length * self.tear_factor;
            let a = solver.particles.position[c.a.index()];
            let b = solver.particles.position[c.b.index()];
            if a.distance_squared(b) > limit * limit && solver.break_constraint(id) {
                torn.push((a + b) * 0.5);
            }
        }
        self.torn += torn.len();
        torn
    }

    /// Cut every constraint touching node (col, row). Returns the midpoints
    /// of the links that broke.
    pub fn tear_at(&mut self, solver: &mut Solver, col: usize, row: usize) -> Vec<Vec2> {
        let mut torn = Vec::new();
        let Some(node) = self.node(col, row) else {
            return torn;
        };
        for &id in &self.constraints {
            let Some((a, b)) = solver
                .constraint(id)
                .filter(|c| c.a == node || c.b == node)
                .map(|c| (c.a, c.b))
            else {
                continue;
            };
            if solver.break_constraint(id) {
                let (pa, pb) = (solver.particles.position[a.index()], solver.particles.position[b.index()]);
                torn.push((pa + pb) * 0.5);
            }
        }
        self.torn += torn.len();
        torn
    }

    /// Push apart nodes closer than the minimum distance, checking each node
    /// only against the next row's worth of nodes in grid order.
    pub fn resolve_self_collision(&self, particles: &mut ParticleSet) {
        if !self.self_collision {
            return;
        }
        let min_dist = self.spacing.min_element() * self.self_collision_distance;
        let min_sq = min_dist * min_dist;
        let window = self.cols;
        let n = self.particles.len();
        for i in 0..n {
            let a = self.particles[i].index();
            if !particles.active[a] {
                continue;
            }
            for j in (i + 1)..(i + 1 + window).min(n) {
                let b = self.particles[j].index();
                if !particles.active[b] {
                    continue;
                }
                let delta = particles.position[b] - particles.position[a];
                let d2 = delta.length_squared();
                if d2 >= min_sq || d2 < 1e-12 {
                    continue;
                }
                let w_a = particles.inv_mass[a];
                let w_b = particles.inv_mass[b];
                let w_sum = w_a + w_b;
                if w_sum < 1e-10 {
                    continue;
                }
                let dist = d2.sqrt();
                let push = delta / dist * (min_dist - dist);
                particles.position[a] -= push * (w_a / w_sum);
                particles.position[b] += push * (w_b / w_sum);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverParams;

    fn cloth(s: &mut Solver, sx: usize, sy: usize, pin: PinPolicy) -> Cloth {
        build_cloth(s, Vec2::new(100.0, 100.0), 100.0, 100.0, sx, sy, &pin, &ClothConfig::default()).unwrap()
    }

    #[test]
    fn test_constraint_families() {
        let mut s = Solver::new(SolverParams::default());
        let c = cloth(&mut s, 3, 3, PinPolicy::None);
        let count = |kind| {
            c.constraints
                .iter()
                .filter(|id| s.constraints[id.index()].kind == kind)
                .count()
        };
        // 4x4 nodes: 2 * 4 * 3 structural, 2 * 3 * 3 shear, 2 * 4 * 2 bend
        assert_eq!(count(ConstraintKind::Structural), 24);
        assert_eq!(count(ConstraintKind::Shear), 18);
        assert_eq!(count(ConstraintKind::Bend), 16);
    }

    #[test]
    fn test_pin_policies() {
        let mut s = Solver::new(SolverParams::default());
        let pinned = |s: &Solver, c: &Cloth| {
            (0..c.cols)
                .filter(|&col| c.node(col, 0).is_some_and(|id| s.particles.pinned[id.index()]))
                .collect::<Vec<_>>()
        };

        let c = cloth(&mut s, 4, 2, PinPolicy::TopCorners);
        assert_eq!(pinned(&s, &c), vec![0, 4]);
        let c = cloth(&mut s, 4, 2, PinPolicy::TopEvery(3));
        assert_eq!(pinned(&s, &c), vec![0, 3, 4]);
        let c = cloth(&mut s, 4, 2, PinPolicy::TopColumns(vec![1, 2]));
        assert_eq!(pinned(&s, &c), vec![1, 2]);
        let c = cloth(&mut s, 4, 2, PinPolicy::TopRow);
        assert_eq!(pinned(&s, &c).len(), 5);
        assert!(c.node(0, 1).is_some_and(|id| !s.particles.pinned[id.index()]));
    }

    #[test]
    fn test_tear_at_cuts_node_free() {
        let mut s = Solver::new(SolverParams::default());
        let mut c = cloth(&mut s, 4, 4, PinPolicy::TopRow);
        let before = c.intact_constraints(&s);
        // interior node: 4 structural, 4 shear, 4 bend
        let node = s.particles.position[c.node(2, 2).unwrap().index()];
        let torn = c.tear_at(&mut s, 2, 2);
        assert_eq!(torn.len(), 12);
        assert!(torn.iter().all(|m| m.distance(node) < c.spacing.max_element() * 1.5));
        assert_eq!(c.intact_constraints(&s), before - 12);
        assert!(c.tear_at(&mut s, 2, 2).is_empty(), "already torn");
        assert!(c.tear_at(&mut s, 9, 9).is_empty(), "out of range is a no-op");
    }

    #[test]
    fn test_self_collision_separates_folded_nodes() {
        let mut s = Solver::new(SolverParams::default());
        let c = cloth(&mut s, 2, 2, PinPolicy::None);
        let a = c.node(0, 1).unwrap();
        let b = c.node(1, 1).unwrap();
        s.particles.set_position(b, s.particles.position[a.index()] + Vec2::new(1.0, 0.0));
        c.resolve_self_collision(&mut s.particles);
        let d = s.particles.position[a.index()].distance(s.particles.position[b.index()]);
        assert!(d >= 25.0 - 1e-3, "nodes should be pushed to half spacing, got {}", d);
    }
}
