//! Pressure-based 2D soft bodies.
//!
//! A soft body is a closed ring of core particles. Circles add a centre
//! particle with spokes and hold their area with a radial pressure force.
//! Rectangles have no centre and are rescaled about their centroid instead.

use glam::Vec2;

use crate::composite::Composite;
use crate::constraints::ConstraintId;
use crate::error::BuildError;
use crate::materials::SoftMaterial;
use crate::math::{centroid, point_in_polygon, signed_area};
use crate::particle::{ParticleId, ParticleSet};
use crate::solver::Solver;

/// Areas below this are treated as collapsed and skip correction.
const MIN_AREA: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SoftShape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}

pub struct SoftBody {
    pub shape: SoftShape,
    pub center: Option<ParticleId>,
    /// Ring particles in winding order.
    pub rim: Vec<ParticleId>,
    /// Rim plus centre, for [`Composite`].
    particles: Vec<ParticleId>,
    pub constraints: Vec<ConstraintId>,
    /// Area the body tries to keep.
    pub rest_area: f32,
    pub pressure: f32,
    pub material: SoftMaterial,
}

impl Composite for SoftBody {
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

/// Ring with a centre particle, spokes, rim edges and cross braces (i to i + n/2).
#[allow(clippy::too_many_arguments)]
pub fn build_circle(
    solver: &mut Solver,
    center: Vec2,
    radius: f32,
    segments: usize,
    mass: f32,
    pressure: f32,
    spoke_stiffness: f32,
    material: SoftMaterial,
) -> Result<SoftBody, BuildError> {
    if segments < 3 {
        return Err(BuildError::TooFewSegments { got: segments, min: 3 });
    }
    check_size("radius", radius)?;
    check_size("mass", mass)?;

    let hub = solver.create_particle(center, mass, false);
    let rim: Vec<ParticleId> = (0..segments)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / segments as f32;
            let p = center + Vec2::new(angle.cos(), angle.sin()) * radius;
            solver.create_particle(p, mass, false)
        })
        .collect();

    let drag = material.viscosity;
    solver.particles.drag[hub.index()] = drag;
    for id in &rim {
        solver.particles.drag[id.index()] = drag;
    }

    let mut constraints = Vec::with_capacity(segments * 2 + segments / 2);
    for &id in &rim {
        constraints.push(solver.create_constraint(hub, id, None, spoke_stiffness)?);
    }
    for i in 0..segments {
        constraints.push(solver.create_constraint(rim[i], rim[(i + 1) % segments], None, 1.0)?);
    }
    if segments >= 4 {
        let half = segments / 2;
        for i in 0..half {
            constraints.push(solver.create_constraint(rim[i], rim[i + half], None, spoke_stiffness * 0.5)?);
        }
    }

    let mut particles = Vec::with_capacity(segments + 1);
    particles.push(hub);
    particles.extend_from_slice(&rim);

    let rest_area = ring_area(&rim, &solver.particles);
    Ok(SoftBody {
        shape: SoftShape::Circle { radius },
        center: Some(hub),
        rim,
        particles,
        constraints,
        rest_area,
        pressure,
        material,
    })
}

/// Perimeter ring walked corner to corner, `segments_per_side` points per side.
pub fn build_rectangle(
    solver: &mut Solver,
    center: Vec2,
    width: f32,
    height: f32,
    segments_per_side: usize,
    mass: f32,
    stiffness: f32,
) -> Result<SoftBody, BuildError> {
    check_size("width", width)?;
    check_size("height", height)?;
    check_size("mass", mass)?;
    let segs = segments_per_side.max(2);
    let half = Vec2::new(width, height) * 0.5;

    let corners = [
        center + Vec2::new(-half.x, -half.y),
        center + Vec2::new(half.x, -half.y),
        center + Vec2::new(half.x, half.y),
        center + Vec2::new(-half.x, half.y),
    ];
    let mut rim = Vec::with_capacity(segs * 4);
    for side in 0..4 {
        let a = corners[side];
        let b = corners[(side + 1) % 4];
        for i in 0..segs {
            let t = i as f32 / segs as f32;
            rim.push(solver.create_particle(a.lerp(b, t), mass, false));
        }
    }

    let n = rim.len();
    let mut constraints = Vec::with_capacity(n + n / 2);
    for i in 0..n {
        constraints.push(solver.create_constraint(rim[i], rim[(i + 1) % n], None, stiffness)?);
    }
    for i in 0..n / 2 {
        constraints.push(solver.create_constraint(rim[i], rim[i + n / 2], None, stiffness * 0.5)?);
    }

    Ok(SoftBody {
        shape: SoftShape::Rectangle { width, height },
        center: None,
        particles: rim.clone(),
        rim,
        constraints,
        rest_area: width * height,
        pressure: 1.0,
        material: SoftMaterial::FLESH,
    })
}

fn ring_area(rim: &[ParticleId], particles: &ParticleSet) -> f32 {
    let pts: Vec<Vec2> = rim.iter().map(|id| particles.position[id.index()]).collect();
    signed_area(&pts).abs()
}

impl SoftBody {
    /// Current outline, in ring order.
    pub fn outline(&self, particles: &ParticleSet) -> Vec<Vec2> {
        self.rim.iter().map(|id| particles.position[id.index()]).collect()
    }

    /// Unsigned area of the rim polygon.
    pub fn area(&self, particles: &ParticleSet) -> f32 {
        ring_area(&self.rim, particles)
    }

    pub fn centroid(&self, particles: &ParticleSet) -> Vec2 {
        centroid(&self.outline(particles))
    }

    pub fn contains(&self, particles: &ParticleSet, point: Vec2) -> bool {
        point_in_polygon(point, &self.outline(particles))
    }

    /// Push rim particles along their centroid offsets to restore the rest area.
    ///
    /// The force is `(rest / current - 1) * pressure * scale` per particle.
    /// Returns that factor, or `None` when the body has collapsed.
    pub fn apply_pressure(&self, particles: &mut ParticleSet, scale: f32) -> Option<f32> {
        let current = self.area(particles);
        if current < MIN_AREA {
            return None;
        }
        let factor = (self.rest_area / current - 1.0) * self.pressure * scale;
        let c = self.centroid(particles);
        for id in &self.rim {
            let dir = (particles.position[id.index()] - c).normalize_or_zero();
            particles.apply_force(*id, dir * factor);
        }
        Some(factor)
    }

    /// Scale unpinned rim particles about the centroid so the area matches
    /// `width * height`. Previous positions move too, so no velocity is added.
    /// Returns the applied scale.
    pub fn rescale_to_rest(&self, particles: &mut ParticleSet) -> Option<f32> {
        let current = self.area(particles);
        if current < MIN_AREA {
            return None;
        }
        let scale = (self.rest_area / current).sqrt();
        let c = self.centroid(particles);
        for id in &self.rim {
            let i = id.index();
            if !particles.active[i] || particles.pinned[i] {
                continue;
            }
            let target = c + (particles.position[i] - c) * scale;
            let delta = target - particles.position[i];
            particles.position[i] = target;
            particles.previous[i] += delta;
        }
        Some(scale)
    }

    /// Per-substep shape keeping, by shape.
    pub fn maintain(&self, particles: &mut ParticleSet, pressure_scale: f32) {
        match self.shape {
            SoftShape::Circle { .. } => {
                self.apply_pressure(particles, pressure_scale);
            }
            SoftShape::Rectangle { .. } => {
                self.rescale_to_rest(particles);
            }
        }
    }
}
