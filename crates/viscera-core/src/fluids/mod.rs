pub mod particle;
pub mod solver;
pub mod source;
pub mod viscosity;

pub use particle::{FluidHandle, FluidParticles};
pub use solver::FluidSolver;
pub use source::{FluidSource, FluidSourceId};

use glam::Vec2;
use std::f32::consts::PI;

/// 2D poly6 smoothing kernel for density estimation.
///
/// Returns `W(r, h) = 4 / (PI * h^8) * (h^2 - r^2)^3` when `r < h`,
/// and `0.0` otherwise. Takes `r²` so callers can skip the square root.
#[inline]
pub fn poly6_kernel(r2: f32, h: f32) -> f32 {
    let h2 = h * h;
    if r2 >= h2 {
        return 0.0;
    }
    let diff = h2 - r2;
    let h8 = h2 * h2 * h2 * h2;
    4.0 / (PI * h8) * diff * diff * diff
}

/// 2D spiky kernel gradient for pressure forces.
///
/// Returns `(r / r_len) * (-30 / (PI * h^5)) * (h - r_len)^2` when
/// `1e-6 < r_len < h`, and `Vec2::ZERO` otherwise. `r` points from the
/// neighbour to the particle, so the gradient points toward the neighbour.
#[inline]
pub fn spiky_gradient(r: Vec2, r_len: f32, h: f32) -> Vec2 {
    if r_len >= h || r_len <= 1e-6 {
        return Vec2::ZERO;
    }
    let h5 = h * h * h * h * h;
    let diff = h - r_len;
    (r / r_len) * (-30.0 / (PI * h5)) * diff * diff
}

/// 2D viscosity kernel Laplacian: `40 / (PI * h^5) * (h - r)` for `r < h`.
#[inline]
pub fn viscosity_laplacian(r_len: f32, h: f32) -> f32 {
    if r_len >= h {
        return 0.0;
    }
    let h5 = h * h * h * h * h;
    40.0 / (PI * h5) * (h - r_len)
}

/// Density of an infinite square lattice with the given spacing, as seen by
/// any one of its particles. Useful for picking a rest density.
pub fn lattice_density(spacing: f32, h: f32, mass: f32) -> f32 {
    let reach = (h / spacing).ceil() as i32;
    let mut rho = 0.0;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let r2 = (dx * dx + dy * dy) as f32 * spacing * spacing;
            rho += mass * poly6_kernel(r2, h);
        }
    }
    rho
}
