//! Free rigid-ish composites built straight on the core: ropes, boxes and ragdolls.

use glam::Vec2;

use crate::composite::Composite;
use crate::constraints::ConstraintId;
use crate::error::BuildError;
use crate::particle::ParticleId;
use crate::solver::Solver;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyKind {
    Rope,
    Rectangle { width: f32, height: f32 },
    Ragdoll,
}

pub struct Body {
    pub kind: BodyKind,
    pub particles: Vec<ParticleId>,
    pub constraints: Vec<ConstraintId>,
}

impl Composite for Body {
    fn particle_ids(&self) -> &[ParticleId] {
        &self.particles
    }

    fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }
}

fn check_size(name: &'static str, value: f32) -> Result<(), BuildError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(BuildError::NonPositiveSize { name, value })
    }
}

/// A chain of `segments` links hanging down from a pinned first particle.
pub fn build_rope(
    solver: &mut Solver,
    origin: Vec2,
    segments: usize,
    length: f32,
    mass: f32,
) -> Result<Body, BuildError> {
    if segments < 1 {
        return Err(BuildError::TooFewSegments { got: segments, min: 1 });
    }
    check_size("rope length", length)?;
    check_size("rope mass", mass)?;

    let link = length / segments as f32;
    let particles: Vec<ParticleId> = (0..=segments)
        .map(|i| solver.create_particle(origin + Vec2::new(0.0, link * i as f32), mass, i == 0))
        .collect();
    let constraints = particles
        .windows(2)
        .map(|w| solver.create_constraint(w[0], w[1], Some(link), 1.0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Body { kind: BodyKind::Rope, particles, constraints })
}

/// Four corners, four edges and both diagonals.
pub fn build_rectangle(
    solver: &mut Solver,
    origin: Vec2,
    width: f32,
    height: f32,
    mass: f32,
    pinned: bool,
) -> Result<Body, BuildError> {
    check_size("width", width)?;
    check_size("height", height)?;

    let corners = [
        origin,
        origin + Vec2::new(width, 0.0),
        origin + Vec2::new(width, height),
        origin + Vec2::new(0.0, height),
    ];
    let particles: Vec<ParticleId> = corners
        .iter()
        .map(|&p| solver.create_particle(p, mass, pinned))
        .collect();

    let mut constraints = Vec::with_capacity(6);
    for i in 0..4 {
        constraints.push(solver.create_constraint(particles[i], particles[(i + 1) % 4], None, 1.0)?);
    }
    constraints.push(solver.create_constraint(particles[0], particles[2], None, 1.0)?);
    constraints.push(solver.create_constraint(particles[1], particles[3], None, 1.0)?);

    Ok(Body { kind: BodyKind::Rectangle { width, height }, particles, constraints })
}

/// Joint layout: (x, y) offset in units of `scale`, and mass.
const RAGDOLL_JOINTS: [(f32, f32, f32); 16] = [
    (0.0, 0.0, 1.0),     // head
    (0.0, 20.0, 1.0),    // neck
    (0.0, 40.0, 1.0),    // spine
    (0.0, 60.0, 1.0),    // pelvis
    (-15.0, 20.0, 0.5),  // left shoulder
    (-15.0, 35.0, 0.5),  // left elbow
    (-15.0, 50.0, 0.3),  // left hand
    (15.0, 20.0, 0.5),   // right shoulder
    (15.0, 35.0, 0.5),   // right elbow
    (15.0, 50.0, 0.3),   // right hand
    (-10.0, 60.0, 0.8),  // left hip
    (-10.0, 80.0, 0.6),  // left knee
    (-10.0, 100.0, 0.4), // left foot
    (10.0, 60.0, 0.8),   // right hip
    (10.0, 80.0, 0.6),   // right knee
    (10.0, 100.0, 0.4),  // right foot
];

const RAGDOLL_BONES: [(usize, usize); 17] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (1, 4),
    (4, 5),
    (5, 6),
    (1, 7),
    (7, 8),
    (8, 9),
    (3, 10),
    (10, 11),
    (11, 12),
    (3, 13),
    (13, 14),
    (14, 15),
    // shoulder and hip braces
    (4, 7),
    (10, 13),
];

/// Stick-figure ragdoll, head at `origin`, 100 * `scale` px tall.
pub fn build_ragdoll(solver: &mut Solver, origin: Vec2, scale: f32) -> Result<Body, BuildError> {
    check_size("ragdoll scale", scale)?;

    let particles: Vec<ParticleId> = RAGDOLL_JOINTS
        .iter()
        .map(|&(x, y, m)| solver.create_particle(origin + Vec2::new(x, y) * scale, m, false))
        .collect();
    let constraints = RAGDOLL_BONES
        .iter()
        .map(|&(a, b)| solver.create_constraint(particles[a], particles[b], None, 1.0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Body { kind: BodyKind::Ragdoll, particles, constraints })
}
