use glam::Vec2;
use tracing::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bounds::Bounds;
use crate::config::FluidConfig;
use crate::fluids::particle::{FluidHandle, FluidParticles};
use crate::fluids::viscosity::viscosity_force;
use crate::fluids::{poly6_kernel, spiky_gradient};
use crate::grid::SpatialHashGrid;
use crate::materials::FluidKind;

/// SPH fluid solver.
///
/// Holds at most `max_particles`. Once full, each new particle overwrites the
/// oldest one, so the buffer behaves as a ring.
pub struct FluidSolver {
    pub particles: FluidParticles,
    pub config: FluidConfig,
    grid: SpatialHashGrid,
    /// Slot the next particle overwrites once the buffer is full.
    cursor: usize,
    next_serial: u32,
    capacity_warned: bool,
}

impl FluidSolver {
    pub fn new(config: FluidConfig) -> Self {
        let grid = SpatialHashGrid::new(config.smoothing_radius);
        Self {
            particles: FluidParticles::default(),
            config,
            grid,
            cursor: 0,
            next_serial: 0,
            capacity_warned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Add a particle, evicting the oldest one if the buffer is full.
    pub fn add_particle(&mut self, pos: Vec2, vel: Vec2, kind: FluidKind) -> FluidHandle {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);

        let cap = self.config.max_particles.max(1);
        let slot = if self.particles.len() < cap {
            self.particles.push(pos, vel, kind, serial);
            self.particles.len() - 1
        } else {
            if !self.capacity_warned {
                warn!(cap, "fluid particle capacity reached, evicting oldest particles");
                self.capacity_warned = true;
            }
            let slot = self.cursor;
            self.particles.overwrite(slot, pos, vel, kind, serial);
            self.cursor = (self.cursor + 1) % cap;
            slot
        };
        FluidHandle { slot: slot as u32, serial }
    }

    pub fn position(&self, handle: FluidHandle) -> Option<Vec2> {
        self.particles.resolve(handle).map(|i| self.particles.position[i])
    }

    pub fn velocity(&self, handle: FluidHandle) -> Option<Vec2> {
        self.particles.resolve(handle).map(|i| self.particles.velocity[i])
    }

    /// Add `impulse` to a particle's velocity. Stale handles are ignored.
    pub fn push_particle(&mut self, handle: FluidHandle, impulse: Vec2) {
        if let Some(i) = self.particles.resolve(handle) {
            self.particles.velocity[i] += impulse;
        }
    }

    /// Radial velocity kick, falling off linearly to zero at `radius`.
    pub fn apply_impulse(&mut self, center: Vec2, speed: f32, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        let p = &mut self.particles;
        for i in 0..p.len() {
            let delta = p.position[i] - center;
            let dist = delta.length();
            if dist > 0.0 && dist < radius {
                p.velocity[i] += delta / dist * speed * (1.0 - dist / radius);
            }
        }
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    /// Full SPH step: densities, forces, then integration and bounds.
    pub fn step(&mut self, dt: f32, gravity: Vec2, bounds: &Bounds) {
        if self.particles.is_empty() {
            return;
        }
        self.update_densities();
        self.compute_forces();
        self.integrate(dt, gravity, bounds);
    }

    /// Rebuild the neighbour hash, then evaluate density and pressure.
    ///
    /// `rho_i = sum_j m * poly6(|x_i - x_j|)`, self included.
    /// `p_i = k * (rho_i - rho_0)`.
    pub fn update_densities(&mut self) {
        let h = self.config.smoothing_radius;
        self.grid.rebuild(&self.particles.position, h);

        let n = self.particles.len();
        #[cfg(feature = "parallel")]
        let densities: Vec<f32> = (0..n).into_par_iter().map(|i| self.density_at(i)).collect();
        #[cfg(not(feature = "parallel"))]
        let densities: Vec<f32> = (0..n).map(|i| self.density_at(i)).collect();

        let k = self.config.gas_constant;
        let rho0 = self.config.rest_density;
        for (i, rho) in densities.into_iter().enumerate() {
            self.particles.density[i] = rho;
            self.particles.pressure[i] = k * (rho - rho0);
        }
    }

    fn density_at(&self, i: usize) -> f32 {
        let h = self.config.smoothing_radius;
        let m = self.config.particle_mass;
        let pos = self.particles.position[i];
        let mut rho = 0.0;
        self.grid.for_each_candidate(pos, h, |j| {
            let r2 = pos.distance_squared(self.particles.position[j as usize]);
            rho += m * poly6_kernel(r2, h);
        });
        rho
    }

    /// Pressure and viscosity force densities from the current densities.
    pub fn compute_forces(&mut self) {
        let n = self.particles.len();
        #[cfg(feature = "parallel")]
        let forces: Vec<Vec2> = (0..n).into_par_iter().map(|i| self.force_at(i)).collect();
        #[cfg(not(feature = "parallel"))]
        let forces: Vec<Vec2> = (0..n).map(|i| self.force_at(i)).collect();

        self.particles.force = forces;
    }

    fn force_at(&self, i: usize) -> Vec2 {
        let c = &self.config;
        let h = c.smoothing_radius;
        let m = c.particle_mass;
        let p = &self.particles;
        let pos_i = p.position[i];
        let vel_i = p.velocity[i];
        let rho_i = p.density[i];
        let pressure_i = p.pressure[i];
        let mu = c.viscosity * p.kind[i].material().viscosity_scale;
        let cap = c.max_pressure_force;

        let mut force = Vec2::ZERO;
        self.grid.for_each_candidate(pos_i, h, |j| {
            let j = j as usize;
            if j == i {
                return;
            }
            let r = pos_i - p.position[j];
            let r_len = r.length();
            if r_len >= h || r_len <= 1e-6 {
                return;
            }

            // Symmetric pressure term, guarded against empty neighbourhoods
            let rho_max = rho_i.max(p.density[j]);
            if rho_max > 1e-6 {
                let f = -spiky_gradient(r, r_len, h) * (m * (pressure_i + p.pressure[j]) / (2.0 * rho_max));
                force += f.clamp_length_max(cap);
            }

            force += viscosity_force(mu, m, vel_i, p.velocity[j], p.density[j], r_len, h);
        });
        force
    }

    /// Semi-implicit Euler, then damping, then the bounds.
    ///
    /// Kind damping is a per-1/60 s retention, scaled to `dt` so it does not
    /// depend on the substep count.
    pub fn integrate(&mut self, dt: f32, gravity: Vec2, bounds: &Bounds) {
        let damping = self.config.damping;
        let bounce = self.config.bounce;
        let p = &mut self.particles;
        for i in 0..p.len() {
            let rho = p.density[i];
            let mut accel = gravity;
            if rho > 1e-6 {
                accel += p.force[i] / rho;
            }
            let kind_damping = p.kind[i].material().damping.powf(dt * 60.0);
            p.velocity[i] = (p.velocity[i] + accel * dt) * damping * kind_damping;
            p.position[i] += p.velocity[i] * dt;
            bounds.collide_velocity(&mut p.position[i], &mut p.velocity[i], bounce);
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.grid.rebuild(&[], self.config.smoothing_radius);
        self.cursor = 0;
        self.capacity_warned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_go_stale_on_eviction() {
        let mut fluid = FluidSolver::new(FluidConfig { max_particles: 2, ..Default::default() });
        let a = fluid.add_particle(Vec2::new(100.0, 100.0), Vec2::ZERO, FluidKind::Blood);
        let b = fluid.add_particle(Vec2::new(110.0, 100.0), Vec2::ZERO, FluidKind::Blood);
        let c = fluid.add_particle(Vec2::new(120.0, 100.0), Vec2::ZERO, FluidKind::Water);

        assert_eq!(fluid.len(), 2);
        assert_eq!(fluid.position(a), None, "oldest particle was evicted");
        assert_eq!(fluid.position(b), Some(Vec2::new(110.0, 100.0)));
        assert_eq!(fluid.position(c), Some(Vec2::new(120.0, 100.0)));
        assert_eq!(c.slot, a.slot);
    }

    #[test]
    fn test_lone_particle_density_is_self_contribution() {
        let mut fluid = FluidSolver::new(FluidConfig::default());
        fluid.add_particle(Vec2::new(300.0, 300.0), Vec2::ZERO, FluidKind::Water);
        fluid.update_densities();
        let c = &fluid.config;
        let expected = c.particle_mass * poly6_kernel(0.0, c.smoothing_radius);
        assert!((fluid.particles.density[0] - expected).abs() < 1e-6);
        assert!(fluid.particles.pressure[0] < 0.0, "isolated particle is under rest density");
    }

    #[test]
    fn test_overlapping_pair_is_pushed_apart() {
        let mut fluid = FluidSolver::new(FluidConfig::default());
        fluid.add_particle(Vec2::new(300.0, 300.0), Vec2::ZERO, FluidKind::Water);
        fluid.add_particle(Vec2::new(301.0, 300.0), Vec2::ZERO, FluidKind::Water);
        // Pack a few more on top so the pair is over rest density
        for k in 0..6 {
            fluid.add_particle(Vec2::new(300.5, 299.0 + k as f32 * 0.4), Vec2::ZERO, FluidKind::Water);
        }
        fluid.update_densities();
        fluid.compute_forces();
        assert!(fluid.particles.pressure[0] > 0.0);
        assert!(fluid.particles.force[0].x < 0.0, "left particle pushed left");
        assert!(fluid.particles.force[1].x > 0.0, "right particle pushed right");
    }
}
