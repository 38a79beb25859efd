use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::bounds::Bounds;
use crate::config::DebrisConfig;

/// A short-lived unconstrained fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct Debris {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub size: f32,
    /// Seconds left before the piece is pruned.
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub color: [u8; 4],
}

/// All live debris, oldest first. Pieces integrate with explicit velocity
/// and no constraints.
pub struct DebrisField {
    pub pieces: VecDeque<Debris>,
    pub config: DebrisConfig,
}

impl DebrisField {
    pub fn new(config: DebrisConfig) -> Self {
        Self { pieces: VecDeque::new(), config }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Spawn a piece flying away from `origin` with a random speed up to the
    /// configured explosion speed, plus `inherited` velocity.
    ///
    /// When the field is full the oldest piece makes room.
    pub fn spawn(
        &mut self,
        rng: &mut ChaCha8Rng,
        position: Vec2,
        origin: Vec2,
        inherited: Vec2,
        color: [u8; 4],
    ) {
        let c = &self.config;
        let away = position - origin;
        let dir = if away.length_squared() > 1e-8 {
            away.normalize()
        } else {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            Vec2::new(angle.cos(), angle.sin())
        };
        let speed = rng.gen_range(0.0..=c.explosion_speed.max(0.0));
        let size = if c.max_size > c.min_size {
            rng.gen_range(c.min_size..c.max_size)
        } else {
            c.min_size
        };
        let piece = Debris {
            position,
            velocity: dir * speed + inherited,
            rotation: rng.gen_range(0.0..std::f32::consts::TAU),
            angular_velocity: rng.gen_range(-1.0..1.0) * 6.0,
            size,
            lifetime: c.lifetime,
            max_lifetime: c.lifetime,
            color,
        };
        if self.pieces.len() >= c.max_pieces {
            self.pieces.pop_front();
        }
        self.pieces.push_back(piece);
    }

    /// Integrate, collide with the bounds, age and prune.
    pub fn step(&mut self, dt: f32, gravity: Vec2, bounds: &Bounds) {
        let drag = self.config.air_drag;
        for d in &mut self.pieces {
            d.velocity += gravity * dt;
            d.position += d.velocity * dt;
            d.rotation += d.angular_velocity * dt;
            d.velocity *= drag;
            d.angular_velocity *= 0.98;

            if bounds.collide_velocity(&mut d.position, &mut d.velocity, 0.5) {
                d.velocity.x *= 0.95;
                d.angular_velocity *= 0.9;
            }
            d.lifetime -= dt;
        }
        self.pieces.retain(|d| d.lifetime > 0.0);
    }

    /// Radial velocity kick, falling off linearly to zero at `radius`.
    pub fn apply_impulse(&mut self, center: Vec2, speed: f32, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        for d in &mut self.pieces {
            let delta = d.position - center;
            let dist = delta.length();
            if dist > 0.0 && dist < radius {
                d.velocity += delta / dist * speed * (1.0 - dist / radius);
            }
        }
    }

    pub fn clear(&mut self) {
        self.pieces.clear();
    }
}
