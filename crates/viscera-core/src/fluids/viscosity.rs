use glam::Vec2;

use crate::fluids::viscosity_laplacian;

/// Viscosity force density on particle i from neighbour j.
///
/// `mu * m * (v_j - v_i) / rho_j * lap(W)`. Pulls velocities together, so a
/// pair moving in lockstep feels nothing. Skipped when `rho_j` is ~0.
#[inline]
pub fn viscosity_force(
    mu: f32,
    mass: f32,
    vel_i: Vec2,
    vel_j: Vec2,
    rho_j: f32,
    r_len: f32,
    h: f32,
) -> Vec2 {
    if rho_j <= 1e-6 {
        return Vec2::ZERO;
    }
    (vel_j - vel_i) * (mu * mass / rho_j * viscosity_laplacian(r_len, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_velocities_feel_nothing() {
        let v = Vec2::new(30.0, -4.0);
        assert_eq!(viscosity_force(200.0, 64.0, v, v, 1.0, 4.0, 16.0), Vec2::ZERO);
    }

    #[test]
    fn test_drags_toward_neighbour_velocity() {
        let f = viscosity_force(200.0, 64.0, Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0, 4.0, 16.0);
        assert!(f.x > 0.0 && f.y == 0.0);
    }

    #[test]
    fn test_zero_density_neighbour_skipped() {
        let f = viscosity_force(200.0, 64.0, Vec2::ZERO, Vec2::X, 0.0, 4.0, 16.0);
        assert_eq!(f, Vec2::ZERO);
    }
}
