use glam::Vec2;

use crate::materials::FluidKind;

/// Stable reference to a fluid particle.
///
/// Slots are recycled when the buffer is full, so the handle also carries the
/// serial of the particle it was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FluidHandle {
    pub slot: u32,
    pub serial: u32,
}

/// SoA storage for SPH particles. Explicit velocity, unlike the Verlet core.
#[derive(Default)]
pub struct FluidParticles {
    pub position: Vec<Vec2>,
    pub velocity: Vec<Vec2>,
    /// Force density from the last force pass.
    pub force: Vec<Vec2>,
    pub density: Vec<f32>,
    pub pressure: Vec<f32>,
    pub kind: Vec<FluidKind>,
    pub serial: Vec<u32>,
}

impl FluidParticles {
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub(crate) fn push(&mut self, pos: Vec2, vel: Vec2, kind: FluidKind, serial: u32) {
        self.position.push(pos);
        self.velocity.push(vel);
        self.force.push(Vec2::ZERO);
        self.density.push(0.0);
        self.pressure.push(0.0);
        self.kind.push(kind);
        self.serial.push(serial);
    }

    pub(crate) fn overwrite(&mut self, slot: usize, pos: Vec2, vel: Vec2, kind: FluidKind, serial: u32) {
        self.position[slot] = pos;
        self.velocity[slot] = vel;
        self.force[slot] = Vec2::ZERO;
        self.density[slot] = 0.0;
        self.pressure[slot] = 0.0;
        self.kind[slot] = kind;
        self.serial[slot] = serial;
    }

    /// Slot index if `handle` still refers to the particle it was issued for.
    pub fn resolve(&self, handle: FluidHandle) -> Option<usize> {
        let slot = handle.slot as usize;
        match self.serial.get(slot) {
            Some(&s) if s == handle.serial => Some(slot),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
