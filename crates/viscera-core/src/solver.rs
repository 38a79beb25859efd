use glam::Vec2;
use tracing::warn;

use crate::bounds::Bounds;
use crate::config::EngineConfig;
use crate::constraints::{relax_constraints, ConstraintId, DistanceConstraint};
use crate::error::BuildError;
use crate::grid::SpatialHashGrid;
use crate::particle::{ParticleId, ParticleSet};

/// The subset of [`EngineConfig`] the Verlet core reads.
#[derive(Clone, Debug)]
pub struct SolverParams {
    pub gravity: Vec2,
    pub damping: f32,
    pub bounce: f32,
    pub bounds: Bounds,
    pub relaxation_passes: u32,
    pub cell_size: f32,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SolverParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            gravity: config.gravity,
            damping: config.damping,
            bounce: config.bounce,
            bounds: config.bounds,
            relaxation_passes: config.relaxation_passes,
            cell_size: config.cell_size,
        }
    }
}

/// Verlet particle/constraint core.
///
/// Owns the canonical particle and constraint arenas. Composites hold ids
/// into them.
pub struct Solver {
    pub particles: ParticleSet,
    pub constraints: Vec<DistanceConstraint>,
    pub params: SolverParams,
    grid: SpatialHashGrid,
}

impl Solver {
    pub fn new(params: SolverParams) -> Self {
        let grid = SpatialHashGrid::new(params.cell_size);
        Self {
            particles: ParticleSet::new(),
            constraints: Vec::new(),
            params,
            grid,
        }
    }

    pub fn create_particle(&mut self, pos: Vec2, mass: f32, pinned: bool) -> ParticleId {
        self.particles.push(pos, mass, pinned)
    }

    /// Connect two particles. `rest_length` defaults to their current distance.
    /// Fails without touching the arena if either id was never issued.
    pub fn create_constraint(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        rest_length: Option<f32>,
        stiffness: f32,
    ) -> Result<ConstraintId, BuildError> {
        self.check_endpoints(a, b)?;
        let rest = rest_length.unwrap_or_else(|| {
            self.particles.position[a.index()].distance(self.particles.position[b.index()])
        });
        self.push_constraint(DistanceConstraint::new(a, b, rest, stiffness))
    }

    pub fn push_constraint(&mut self, constraint: DistanceConstraint) -> Result<ConstraintId, BuildError> {
        self.check_endpoints(constraint.a, constraint.b)?;
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(constraint);
        Ok(id)
    }

    fn check_endpoints(&self, a: ParticleId, b: ParticleId) -> Result<(), BuildError> {
        let len = self.particles.len();
        for id in [a, b] {
            if id.index() >= len {
                warn!(index = id.0, len, "constraint endpoint was never created");
                return Err(BuildError::UnknownParticle { index: id.0 });
            }
        }
        Ok(())
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&DistanceConstraint> {
        debug_assert!(id.index() < self.constraints.len(), "constraint id {} out of range", id.0);
        self.constraints.get(id.index())
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut DistanceConstraint> {
        debug_assert!(id.index() < self.constraints.len(), "constraint id {} out of range", id.0);
        self.constraints.get_mut(id.index())
    }

    pub fn is_broken(&self, id: ConstraintId) -> bool {
        self.constraint(id).map_or(true, |c| c.broken)
    }

    /// Permanently remove a constraint from the solve. Returns true the first time.
    pub fn break_constraint(&mut self, id: ConstraintId) -> bool {
        match self.constraint_mut(id) {
            Some(c) if !c.broken => {
                c.broken = true;
                true
            }
            _ => false,
        }
    }

    /// Midpoint of a constraint's endpoints.
    pub fn constraint_midpoint(&self, id: ConstraintId) -> Option<Vec2> {
        let c = self.constraint(id)?;
        let a = self.particles.position.get(c.a.index())?;
        let b = self.particles.position.get(c.b.index())?;
        Some((*a + *b) * 0.5)
    }

    /// One full core step: integrate, relax, collide, rebuild the hash.
    pub fn step(&mut self, dt: f32) {
        self.integrate(dt);
        self.relax(self.params.relaxation_passes);
        self.collide_bounds();
        self.rebuild_grid();
    }

    /// Verlet position update for every live unpinned particle.
    ///
    /// `x' = x + (x - x_prev) * damping * drag + a * dt²`, where `a` is gravity
    /// plus accumulated force over mass. Forces are cleared afterwards.
    pub fn integrate(&mut self, dt: f32) {
        let dt2 = dt * dt;
        let gravity = self.params.gravity;
        let damping = self.params.damping;
        let p = &mut self.particles;
        for i in 0..p.len() {
            if !p.active[i] || p.pinned[i] {
                p.force[i] = Vec2::ZERO;
                continue;
            }
            let velocity = (p.position[i] - p.previous[i]) * damping * p.drag[i];
            let accel = gravity + p.force[i] * p.inv_mass[i];
            p.previous[i] = p.position[i];
            p.position[i] += velocity + accel * dt2;
            p.force[i] = Vec2::ZERO;
        }
    }

    /// Run `passes` relaxation sweeps in list order.
    pub fn relax(&mut self, passes: u32) {
        for _ in 0..passes {
            relax_constraints(&self.constraints, &mut self.particles);
        }
    }

    pub fn collide_bounds(&mut self) {
        let bounds = self.params.bounds;
        let bounce = self.params.bounce;
        let p = &mut self.particles;
        for i in 0..p.len() {
            if !p.active[i] || p.pinned[i] {
                continue;
            }
            bounds.collide_verlet(&mut p.position[i], &mut p.previous[i], bounce);
        }
    }

    pub fn rebuild_grid(&mut self) {
        let active = &self.particles.active;
        self.grid
            .rebuild_where(&self.particles.position, self.params.cell_size, |i| active[i]);
    }

    pub fn apply_force(&mut self, id: ParticleId, force: Vec2) {
        self.particles.apply_force(id, force);
    }

    /// Radial push away from `center`, falling off linearly to zero at `radius`.
    pub fn apply_explosion(&mut self, center: Vec2, force: f32, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        let p = &mut self.particles;
        for i in 0..p.len() {
            if !p.active[i] || p.pinned[i] {
                continue;
            }
            let delta = p.position[i] - center;
            let dist = delta.length();
            if dist > 0.0 && dist < radius {
                p.force[i] += delta / dist * force * (1.0 - dist / radius);
            }
        }
    }

    pub fn set_position(&mut self, id: ParticleId, pos: Vec2) {
        self.particles.set_position(id, pos);
    }

    pub fn set_pinned(&mut self, id: ParticleId, pinned: bool) {
        self.particles.set_pinned(id, pinned);
    }

    pub fn position(&self, id: ParticleId) -> Option<Vec2> {
        self.particles.get(id)
    }

    /// Live particles within `radius` of `pos`, as of the last hash rebuild.
    pub fn nearby(&self, pos: Vec2, radius: f32) -> Vec<ParticleId> {
        self.grid
            .query(pos, radius)
            .into_iter()
            .filter(|&i| self.particles.active.get(i as usize).copied().unwrap_or(false))
            .map(ParticleId)
            .collect()
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn active_particle_count(&self) -> usize {
        self.particles.active_count()
    }

    /// Constraints that are unbroken and whose endpoints are both live.
    pub fn active_constraint_count(&self) -> usize {
        self.constraints.iter().filter(|c| self.is_solvable(c)).count()
    }

    pub fn is_solvable(&self, c: &DistanceConstraint) -> bool {
        !c.broken && self.particles.active[c.a.index()] && self.particles.active[c.b.index()]
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.constraints.clear();
        self.grid.rebuild(&[], self.params.cell_size);
    }
}
