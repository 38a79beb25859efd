use glam::Vec2;

/// Index of a particle in the core [`ParticleSet`].
///
/// Slots are never reused until the whole set is cleared, so a stale id can
/// only ever point at a deactivated particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u32);

impl ParticleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// SoA storage for Verlet point masses.
#[derive(Default)]
pub struct ParticleSet {
    pub position: Vec<Vec2>,
    /// Position at the previous substep; `position - previous` is the implicit velocity.
    pub previous: Vec<Vec2>,
    /// Force accumulated since the last integration.
    pub force: Vec<Vec2>,
    pub mass: Vec<f32>,
    /// 0.0 for pinned particles.
    pub inv_mass: Vec<f32>,
    pub pinned: Vec<bool>,
    /// Extra velocity retention multiplied into the global damping (1.0 = none).
    pub drag: Vec<f32>,
    /// Remaining structural health, only set for destructible nodes.
    pub health: Vec<Option<f32>>,
    /// Deactivated particles are skipped by every pass.
    pub active: Vec<bool>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    pub fn push(&mut self, pos: Vec2, mass: f32, pinned: bool) -> ParticleId {
        let id = ParticleId(self.position.len() as u32);
        let inv_mass = if pinned || mass <= 1e-10 { 0.0 } else { 1.0 / mass };
        self.position.push(pos);
        self.previous.push(pos);
        self.force.push(Vec2::ZERO);
        self.mass.push(mass);
        self.inv_mass.push(inv_mass);
        self.pinned.push(pinned);
        self.drag.push(1.0);
        self.health.push(None);
        self.active.push(true);
        id
    }

    /// True if `id` refers to a live particle.
    ///
    /// Debug builds trap on ids that were never issued by this set.
    #[inline]
    pub fn is_live(&self, id: ParticleId) -> bool {
        debug_assert!(
            id.index() < self.len(),
            "particle id {} out of range (len {})",
            id.0,
            self.len()
        );
        self.active.get(id.index()).copied().unwrap_or(false)
    }

    pub fn get(&self, id: ParticleId) -> Option<Vec2> {
        if self.is_live(id) {
            Some(self.position[id.index()])
        } else {
            None
        }
    }

    /// Teleport a particle without giving it velocity.
    pub fn set_position(&mut self, id: ParticleId, pos: Vec2) {
        if self.is_live(id) {
            self.position[id.index()] = pos;
            self.previous[id.index()] = pos;
        }
    }

    /// Move a particle and keep its current implicit velocity.
    pub fn translate(&mut self, id: ParticleId, offset: Vec2) {
        if self.is_live(id) {
            self.position[id.index()] += offset;
            self.previous[id.index()] += offset;
        }
    }

    pub fn set_pinned(&mut self, id: ParticleId, pinned: bool) {
        if !self.is_live(id) {
            return;
        }
        let i = id.index();
        self.pinned[i] = pinned;
        if pinned {
            self.inv_mass[i] = 0.0;
            self.previous[i] = self.position[i];
            self.force[i] = Vec2::ZERO;
        } else {
            self.inv_mass[i] = if self.mass[i] <= 1e-10 { 0.0 } else { 1.0 / self.mass[i] };
        }
    }

    /// Implicit per-substep displacement.
    pub fn displacement(&self, id: ParticleId) -> Vec2 {
        if self.is_live(id) {
            self.position[id.index()] - self.previous[id.index()]
        } else {
            Vec2::ZERO
        }
    }

    pub fn apply_force(&mut self, id: ParticleId, force: Vec2) {
        if self.is_live(id) && !self.pinned[id.index()] {
            self.force[id.index()] += force;
        }
    }

    pub fn deactivate(&mut self, id: ParticleId) {
        if self.is_live(id) {
            let i = id.index();
            self.active[i] = false;
            self.force[i] = Vec2::ZERO;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_initializes_at_rest() {
        let mut set = ParticleSet::new();
        let id = set.push(Vec2::new(3.0, 4.0), 2.0, false);
        assert_eq!(id, ParticleId(0));
        assert_eq!(set.position[0], set.previous[0]);
        assert_eq!(set.inv_mass[0], 0.5);
        assert_eq!(set.drag[0], 1.0);
        assert!(set.active[0]);
        assert_eq!(set.health[0], None);
    }

    #[test]
    fn test_pinned_particle_has_infinite_mass() {
        let mut set = ParticleSet::new();
        let id = set.push(Vec2::ZERO, 1.0, true);
        assert_eq!(set.inv_mass[id.index()], 0.0);
        set.apply_force(id, Vec2::new(100.0, 0.0));
        assert_eq!(set.force[id.index()], Vec2::ZERO, "pinned particles ignore forces");
    }

    #[test]
    fn test_unpin_restores_inverse_mass() {
        let mut set = ParticleSet::new();
        let id = set.push(Vec2::ZERO, 4.0, true);
        set.set_pinned(id, false);
        assert_eq!(set.inv_mass[id.index()], 0.25);
    }

    #[test]
    fn test_deactivated_particle_is_not_live() {
        let mut set = ParticleSet::new();
        let id = set.push(Vec2::ZERO, 1.0, false);
        set.deactivate(id);
        assert!(!set.is_live(id));
        assert_eq!(set.get(id), None);
        assert_eq!(set.active_count(), 0);
    }
}
