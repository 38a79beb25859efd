use glam::Vec2;

use crate::constraints::ConstraintId;
use crate::particle::{ParticleId, ParticleSet};
use crate::solver::Solver;

/// Anything built out of core particles and constraints.
///
/// Soft bodies, cloths, destructibles and free bodies all own id lists into
/// the core arenas. The engine walks them through this trait.
pub trait Composite {
    fn particle_ids(&self) -> &[ParticleId];
    fn constraint_ids(&self) -> &[ConstraintId];

    /// Constraints of this composite that still solve.
    fn intact_constraints(&self, solver: &Solver) -> usize {
        self.constraint_ids()
            .iter()
            .filter(|id| {
                solver
                    .constraint(**id)
                    .is_some_and(|c| solver.is_solvable(c))
            })
            .count()
    }

    fn live_particles(&self, particles: &ParticleSet) -> usize {
        self.particle_ids()
            .iter()
            .filter(|id| particles.active.get(id.index()).copied().unwrap_or(false))
            .count()
    }

    /// Bounding box of the live particles, `None` if there are none.
    fn aabb(&self, particles: &ParticleSet) -> Option<(Vec2, Vec2)> {
        let mut live = self
            .particle_ids()
            .iter()
            .filter(|id| particles.active.get(id.index()).copied().unwrap_or(false))
            .map(|id| particles.position[id.index()]);
        let first = live.next()?;
        Some(live.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Shift every live particle without adding velocity.
    fn translate(&self, particles: &mut ParticleSet, offset: Vec2) {
        for id in self.particle_ids() {
            particles.translate(*id, offset);
        }
    }
}
