//! Health-weighted breakable grids.
//!
//! Every node and every link carries a share of the structure's health.
//! Damage falls off linearly from the impact point. Anything that reaches zero
//! health breaks once, for good, and leaves a debris spawn point behind. Once
//! too few links survive the whole structure is destroyed.

use glam::Vec2;

use crate::composite::Composite;
use crate::config::DestructibleConfig;
use crate::constraints::{ConstraintId, ConstraintKind, DistanceConstraint};
use crate::error::BuildError;
use crate::materials::DestructibleMaterial;
use crate::particle::ParticleId;
use crate::solver::Solver;

/// Outcome of one damage call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageReport {
    pub particles_broken: usize,
    pub constraints_broken: usize,
    /// True only on the call that destroyed the structure.
    pub destroyed: bool,
}

impl DamageReport {
    fn merge(&mut self, other: DamageReport) {
        self.particles_broken += other.particles_broken;
        self.constraints_broken += other.constraints_broken;
        self.destroyed |= other.destroyed;
    }
}

pub struct Destructible {
    pub origin: Vec2,
    pub cols: usize,
    pub rows: usize,
    pub material: DestructibleMaterial,
    particles: Vec<ParticleId>,
    pub constraints: Vec<ConstraintId>,
    /// Total health the structure was built with.
    pub health: f32,
    pub destroyed: bool,
    pub destroy_threshold: f32,
    pub stress_threshold: f32,
    pub stress_damage_rate: f32,
}

impl Composite for Destructible {
    fn particle_ids(&self) -> &[ParticleId] {
        &self.particles
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }
}

/// Grid of nodes linked along every cell edge and both cell diagonals.
/// Health is split evenly over the nodes, and separately over the links.
#[allow(clippy::too_many_arguments)]
pub fn build_destructible(
    solver: &mut Solver,
    origin: Vec2,
    width: f32,
    height: f32,
    segments_x: usize,
    segments_y: usize,
    health: f32,
    material: DestructibleMaterial,
    config: &DestructibleConfig,
) -> Result<Destructible, BuildError> {
    if segments_x == 0 || segments_y == 0 {
        return Err(BuildError::GridTooSmall { segments_x, segments_y });
    }
    for (name, value) in [("width", width), ("height", height), ("health", health)] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(BuildError::NonPositiveSize { name, value });
        }
    }

    let cols = segments_x + 1;
    let rows = segments_y + 1;
    let spacing = Vec2::new(width / segments_x as f32, height / segments_y as f32);
    let node_health = health / (cols * rows) as f32;

    let mut particles = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let p = origin + Vec2::new(col as f32, row as f32) * spacing;
            let id = solver.create_particle(p, config.particle_mass, false);
            solver.particles.health[id.index()] = Some(node_health);
            particles.push(id);
        }
    }

    let at = |col: usize, row: usize| particles[row * cols + col];
    let mut links = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                links.push((at(col, row), at(col + 1, row), ConstraintKind::Structural));
            }
            if row + 1 < rows {
                links.push((at(col, row), at(col, row + 1), ConstraintKind::Structural));
            }
            if col + 1 < cols && row + 1 < rows {
                links.push((at(col, row), at(col + 1, row + 1), ConstraintKind::Shear));
                links.push((at(col + 1, row), at(col, row + 1), ConstraintKind::Shear));
            }
        }
    }
    let link_health = health / links.len() as f32;
    let constraints = links
        .into_iter()
        .map(|(a, b, kind)| {
            let rest = solver.particles.position[a.index()].distance(solver.particles.position[b.index()]);
            solver.push_constraint(
                DistanceConstraint::new(a, b, rest, 1.0)
                    .with_kind(kind)
                    .with_health(link_health),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Destructible {
        origin,
        cols,
        rows,
        material,
        particles,
        constraints,
        health,
        destroyed: false,
        destroy_threshold: config.destroy_threshold,
        stress_threshold: config.stress_threshold,
        stress_damage_rate: config.stress_damage_rate,
    })
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

impl Destructible {
    /// Fraction of links still intact.
    pub fn intact_fraction(&self, solver: &Solver) -> f32 {
        if self.constraints.is_empty() {
            return 0.0;
        }
        self.intact_constraints(solver) as f32 / self.constraints.len() as f32
    }

    /// Damage nodes and links within `radius` of `point` by
    /// `amount * (1 - d / radius)`. Broken pieces push their position onto
    /// `spawns`. Checks the destroy threshold afterwards.
    pub fn apply_damage(
        &mut self,
        solver: &mut Solver,
        point: Vec2,
        amount: f32,
        radius: f32,
        spawns: &mut Vec<Vec2>,
    ) -> DamageReport {
        let mut report = DamageReport::default();
        if self.destroyed || radius <= 0.0 || amount <= 0.0 {
            return report;
        }

        // 1. Links, weighted by distance to the segment
        for &id in &self.constraints {
            let Some(c) = solver.constraint(id) else { continue };
            if !solver.is_solvable(c) {
                continue;
            }
            let a = solver.particles.position[c.a.index()];
            let b = solver.particles.position[c.b.index()];
            let d = segment_distance(point, a, b);
            if d >= radius {
                continue;
            }
            let hit = amount * (1.0 - d / radius);
            if solver.constraint_mut(id).is_some_and(|c| c.damage(hit)) {
                report.constraints_broken += 1;
                spawns.push((a + b) * 0.5);
            }
        }

        // 2. Nodes
        for &id in &self.particles {
            let i = id.index();
            if !solver.particles.active[i] {
                continue;
            }
            let d = solver.particles.position[i].distance(point);
            if d >= radius {
                continue;
            }
            let hit = amount * (1.0 - d / radius);
            if self.damage_node(solver, id, hit) {
                report.particles_broken += 1;
                report.constraints_broken += self.break_links_of(solver, id);
                spawns.push(solver.particles.position[i]);
                solver.particles.deactivate(id);
            }
        }

        report.merge(self.check_destroyed(solver, spawns));
        report
    }

    fn damage_node(&self, solver: &mut Solver, id: ParticleId, amount: f32) -> bool {
        let Some(health) = solver.particles.health[id.index()].as_mut() else {
            return false;
        };
        if *health <= 0.0 {
            return false;
        }
        *health = (*health - amount).max(0.0);
        *health <= 0.0
    }

    fn break_links_of(&self, solver: &mut Solver, node: ParticleId) -> usize {
        let mut count = 0;
        for &id in &self.constraints {
            let touches = solver.constraint(id).is_some_and(|c| c.a == node || c.b == node);
            if touches && solver.break_constraint(id) {
                count += 1;
            }
        }
        count
    }

    /// Strain damage: links stretched past `stress_threshold * rest` lose
    /// `(ratio - threshold) * rate * dt` health.
    pub fn apply_strain(&mut self, solver: &mut Solver, dt: f32, spawns: &mut Vec<Vec2>) -> DamageReport {
        let mut report = DamageReport::default();
        if self.destroyed {
            return report;
        }
        for &id in &self.constraints {
            let Some(c) = solver.constraint(id) else { continue };
            if !solver.is_solvable(c) {
                continue;
            }
            let ratio = c.stretch(&solver.particles);
            if ratio <= self.stress_threshold {
                continue;
            }
            let hit = (ratio - self.stress_threshold) * self.stress_damage_rate * dt;
            let mid = (solver.particles.position[c.a.index()] + solver.particles.position[c.b.index()]) * 0.5;
            if solver.constraint_mut(id).is_some_and(|c| c.damage(hit)) {
                report.constraints_broken += 1;
                spawns.push(mid);
            }
        }
        report.merge(self.check_destroyed(solver, spawns));
        report
    }

    /// Destroy the structure if fewer than `destroy_threshold` of its links
    /// survive. Every remaining node becomes a spawn point and is deactivated.
    pub fn check_destroyed(&mut self, solver: &mut Solver, spawns: &mut Vec<Vec2>) -> DamageReport {
        let mut report = DamageReport::default();
        if self.destroyed || self.intact_fraction(solver) >= self.destroy_threshold {
            return report;
        }
        self.destroyed = true;
        report.destroyed = true;
        for &id in &self.constraints {
            solver.break_constraint(id);
        }
        for &id in &self.particles {
            if let Some(p) = solver.particles.get(id) {
                spawns.push(p);
                solver.particles.deactivate(id);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverParams;

    fn grid(s: &mut Solver) -> Destructible {
        build_destructible(
            s,
            Vec2::new(100.0, 100.0),
            20.0,
            20.0,
            2,
            2,
            100.0,
            DestructibleMaterial::Concrete,
            &DestructibleConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_two_by_two_has_twenty_links() {
        let mut s = Solver::new(SolverParams::default());
        let d = grid(&mut s);
        assert_eq!(d.particle_ids().len(), 9);
        assert_eq!(d.constraints.len(), 20);
        assert_eq!(s.constraints[d.constraints[0].index()].health, Some(5.0));
    }

    #[test]
    fn test_damage_falls_off_with_distance() {
        let mut s = Solver::new(SolverParams::default());
        let mut d = grid(&mut s);
        let mut spawns = Vec::new();
        // Halfway along the radius from the top-left node
        d.apply_damage(&mut s, Vec2::new(96.0, 100.0), 2.0, 8.0, &mut spawns);
        let node = d.particle_ids()[0];
        let health = s.particles.health[node.index()].unwrap();
        let full = 100.0 / 9.0;
        assert!((health - (full - 1.0)).abs() < 1e-4, "expected half damage, got {}", full - health);
        assert!(spawns.is_empty());
    }

    #[test]
    fn test_broken_node_takes_its_links() {
        let mut s = Solver::new(SolverParams::default());
        let mut d = grid(&mut s);
        let mut spawns = Vec::new();
        // Centre node, tiny radius so only it is hit
        let report = d.apply_damage(&mut s, Vec2::new(110.0, 110.0), 1000.0, 0.5, &mut spawns);
        assert_eq!(report.particles_broken, 1);
        // 4 structural + 4 diagonal links meet at the centre
        assert_eq!(report.constraints_broken, 8);
        assert!(!report.destroyed);
        assert_eq!(d.intact_constraints(&s), 12);
    }

    #[test]
    fn test_strain_damages_overstretched_links() {
        let mut s = Solver::new(SolverParams::default());
        let mut d = grid(&mut s);
        let mut spawns = Vec::new();
        let corner = d.particle_ids()[8];
        s.particles.set_position(corner, Vec2::new(140.0, 140.0));
        let report = d.apply_strain(&mut s, 1.0, &mut spawns);
        assert!(report.constraints_broken > 0);
        assert_eq!(spawns.len(), report.constraints_broken);
    }
}
