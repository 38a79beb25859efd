use crate::particle::{ParticleId, ParticleSet};

/// Index of a constraint in the core constraint list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

impl ConstraintId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which family a constraint belongs to. Only cloth distinguishes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Generic,
    Structural,
    Shear,
    Bend,
}

/// Verlet distance constraint between two particles.
///
/// Each solve moves both endpoints toward `rest_length` by `stiffness` of the
/// error, split by inverse mass so pinned endpoints never move.
#[derive(Clone, Debug)]
pub struct DistanceConstraint {
    pub a: ParticleId,
    pub b: ParticleId,
    pub rest_length: f32,
    /// Fraction of the length error corrected per solve, in [0, 1].
    pub stiffness: f32,
    pub kind: ConstraintKind,
    /// Remaining health. `None` means unbreakable by damage.
    pub health: Option<f32>,
    pub max_health: f32,
    /// Broken constraints never resolve again.
    pub broken: bool,
}

impl DistanceConstraint {
    pub fn new(a: ParticleId, b: ParticleId, rest_length: f32, stiffness: f32) -> Self {
        Self {
            a,
            b,
            rest_length,
            stiffness: stiffness.clamp(0.0, 1.0),
            kind: ConstraintKind::Generic,
            health: None,
            max_health: 0.0,
            broken: false,
        }
    }

    pub fn with_kind(mut self, kind: ConstraintKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self.max_health = health;
        self
    }

    /// Current length divided by rest length. Zero-length rests report 1.0.
    pub fn stretch(&self, particles: &ParticleSet) -> f32 {
        if self.rest_length < 1e-10 {
            return 1.0;
        }
        let d = particles.position[self.b.index()] - particles.position[self.a.index()];
        d.length() / self.rest_length
    }

    /// Take `amount` of health. Returns true only on the call that breaks it.
    pub fn damage(&mut self, amount: f32) -> bool {
        if self.broken {
            return false;
        }
        let Some(health) = self.health.as_mut() else {
            return false;
        };
        *health = (*health - amount.max(0.0)).max(0.0);
        if *health <= 0.0 {
            self.broken = true;
            return true;
        }
        false
    }
}

/// Relax one constraint. Returns false if it was skipped.
///
/// 1. Skip broken constraints and constraints touching inactive particles
/// 2. Skip coincident endpoints (no direction to push along)
/// 3. Move each endpoint by its inverse-mass share of the stiffness-scaled error
#[inline]
pub fn solve_distance(c: &DistanceConstraint, particles: &mut ParticleSet) -> bool {
    let a = c.a.index();
    let b = c.b.index();
    if c.broken || !particles.active[a] || !particles.active[b] {
        return false;
    }

    let w_a = particles.inv_mass[a];
    let w_b = particles.inv_mass[b];
    let w_sum = w_a + w_b;
    if w_sum < 1e-10 {
        return false;
    }

    let diff = particles.position[b] - particles.position[a];
    let dist = diff.length();
    if dist < 1e-10 {
        return false;
    }

    let correction = diff * ((dist - c.rest_length) / dist * c.stiffness);
    particles.position[a] += correction * (w_a / w_sum);
    particles.position[b] -= correction * (w_b / w_sum);
    true
}

/// One Gauss-Seidel pass over all constraints in list order.
pub fn relax_constraints(constraints: &[DistanceConstraint], particles: &mut ParticleSet) {
    for c in constraints {
        solve_distance(c, particles);
    }
}
