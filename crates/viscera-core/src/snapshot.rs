//! Read-only render snapshots.
//!
//! The flat structs are `#[repr(C)]` and `Pod`, so a host can upload a slice of
//! them straight into a vertex buffer via `bytemuck::cast_slice`.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::debris::DebrisField;
use crate::fluids::FluidSolver;
use crate::math::smoothstep;
use crate::solver::Solver;

/// Live core particle: 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 2],
    /// 1 if pinned.
    pub pinned: u32,
    pub _pad: u32,
}

/// Active constraint: 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LineSegment {
    pub a: [f32; 2],
    pub b: [f32; 2],
    /// Current length over rest length.
    pub stretch: f32,
    /// `ConstraintKind` as 0 generic, 1 structural, 2 shear, 3 bend.
    pub kind: u32,
}

/// Fluid particle: 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FluidVertex {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub density: f32,
    /// `FluidKind` discriminant.
    pub kind: u32,
}

/// Debris piece: 24 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FragmentInstance {
    pub position: [f32; 2],
    pub rotation: f32,
    pub size: f32,
    /// Fades out over the last half second of life.
    pub alpha: f32,
    /// Packed RGBA, red in the low byte.
    pub color: u32,
}

/// Soft-body outline in ring order.
#[derive(Clone, Debug, PartialEq)]
pub struct SoftOutline {
    pub points: Vec<Vec2>,
    pub color: [u8; 4],
    pub glow: bool,
}

pub fn pack_rgba(c: [u8; 4]) -> u32 {
    u32::from_le_bytes(c)
}

pub fn particle_vertices(solver: &Solver) -> Vec<ParticleVertex> {
    let p = &solver.particles;
    (0..p.len())
        .filter(|&i| p.active[i])
        .map(|i| ParticleVertex {
            position: p.position[i].to_array(),
            pinned: p.pinned[i] as u32,
            _pad: 0,
        })
        .collect()
}

pub fn line_segments(solver: &Solver) -> Vec<LineSegment> {
    use crate::constraints::ConstraintKind;

    solver
        .constraints
        .iter()
        .filter(|c| solver.is_solvable(c))
        .map(|c| LineSegment {
            a: solver.particles.position[c.a.index()].to_array(),
            b: solver.particles.position[c.b.index()].to_array(),
            stretch: c.stretch(&solver.particles),
            kind: match c.kind {
                ConstraintKind::Generic => 0,
                ConstraintKind::Structural => 1,
                ConstraintKind::Shear => 2,
                ConstraintKind::Bend => 3,
            },
        })
        .collect()
}

pub fn fluid_vertices(fluid: &FluidSolver) -> Vec<FluidVertex> {
    let p = &fluid.particles;
    (0..p.len())
        .map(|i| FluidVertex {
            position: p.position[i].to_array(),
            velocity: p.velocity[i].to_array(),
            density: p.density[i],
            kind: p.kind[i] as u32,
        })
        .collect()
}

pub fn fragment_instances(debris: &DebrisField) -> Vec<FragmentInstance> {
    debris
        .pieces
        .iter()
        .map(|d| FragmentInstance {
            position: d.position.to_array(),
            rotation: d.rotation,
            size: d.size,
            alpha: smoothstep(0.0, 0.5, d.lifetime),
            color: pack_rgba(d.color),
        })
        .collect()
}
