use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::fluids::solver::FluidSolver;
use crate::materials::FluidKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FluidSourceId(pub u32);

/// A point that sprays fluid, continuously while active or in one-shot bursts.
#[derive(Clone, Debug)]
pub struct FluidSource {
    pub position: Vec2,
    pub kind: FluidKind,
    /// Particles per second while active.
    pub emission_rate: f32,
    /// Peak spray speed in px/s.
    pub speed: f32,
    /// Half-width of the square particles are scattered in.
    pub jitter: f32,
    pub active: bool,
    /// Fractional particle owed from the previous frame.
    carry: f32,
}

impl FluidSource {
    pub fn new(position: Vec2, kind: FluidKind) -> Self {
        Self {
            position,
            kind,
            emission_rate: kind.material().emission_rate,
            speed: 50.0,
            jitter: 5.0,
            active: true,
            carry: 0.0,
        }
    }

    /// How many particles to emit for a frame of length `dt`. The fractional
    /// remainder carries over so low rates still emit over time.
    pub fn due(&mut self, dt: f32) -> usize {
        if !self.active || self.emission_rate <= 0.0 || dt <= 0.0 {
            return 0;
        }
        self.carry += self.emission_rate * dt;
        let whole = self.carry.floor();
        self.carry -= whole;
        whole as usize
    }

    /// Spray `count` particles from this source.
    pub fn emit(&self, fluid: &mut FluidSolver, rng: &mut ChaCha8Rng, count: usize) {
        spray(fluid, rng, self.position, self.kind, count, self.speed, self.jitter);
    }
}

/// Scatter `count` particles around `pos` with random directions and speeds
/// up to `speed`.
pub fn spray(
    fluid: &mut FluidSolver,
    rng: &mut ChaCha8Rng,
    pos: Vec2,
    kind: FluidKind,
    count: usize,
    speed: f32,
    jitter: f32,
) {
    for _ in 0..count {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let v = rng.gen_range(0.0..=speed.max(0.0));
        let offset = if jitter > 0.0 {
            Vec2::new(rng.gen_range(-jitter..jitter), rng.gen_range(-jitter..jitter))
        } else {
            Vec2::ZERO
        };
        fluid.add_particle(pos + offset, Vec2::new(angle.cos(), angle.sin()) * v, kind);
    }
}
