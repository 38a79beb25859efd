use glam::Vec2;

use crate::bounds::Bounds;
use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Substeps per `update` call.
    pub substeps: u32,
    /// Constraint relaxation passes per substep.
    pub relaxation_passes: u32,
    /// Gravity in px/s² (+y is down).
    pub gravity: Vec2,
    /// Verlet velocity retention per substep.
    pub damping: f32,
    /// Fraction of normal velocity kept when a particle hits the bounds.
    pub bounce: f32,
    pub bounds: Bounds,
    /// Cell size of the core particle hash.
    pub cell_size: f32,
    /// Cap on composites (soft bodies, cloths, destructibles, bodies, sources).
    pub max_objects: usize,
    /// Undrained events kept before the oldest are dropped.
    pub max_events: usize,
    /// Seed for wind turbulence, debris spray and fracture jitter.
    pub seed: u64,
    /// Collision radius of soft-body rim particles.
    pub particle_radius: f32,
    /// Converts soft-body pressure into force.
    pub pressure_scale: f32,
    /// Use a spatial hash for fluid/soft-body coupling instead of the full double loop.
    pub cross_collision_broadphase: bool,
    pub fluid: FluidConfig,
    pub cloth: ClothConfig,
    pub destructible: DestructibleConfig,
    pub debris: DebrisConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            substeps: 4,
            relaxation_passes: 8,
            gravity: Vec2::new(0.0, 980.0),
            damping: 0.99,
            bounce: 0.8,
            bounds: Bounds::default(),
            cell_size: 50.0,
            max_objects: 10_000,
            max_events: 4096,
            seed: 0x5EED,
            particle_radius: 5.0,
            pressure_scale: 5000.0,
            cross_collision_broadphase: true,
            fluid: FluidConfig::default(),
            cloth: ClothConfig::default(),
            destructible: DestructibleConfig::default(),
            debris: DebrisConfig::default(),
        }
    }
}

/// SPH solver parameters.
///
/// Densities are unitless: a particle's mass is the area it occupies in px²,
/// so a lattice with 8 px spacing and a 16 px kernel sits at density ~1.
#[derive(Clone, Debug)]
pub struct FluidConfig {
    pub max_particles: usize,
    /// Kernel support radius `h`.
    pub smoothing_radius: f32,
    pub rest_density: f32,
    /// Stiffness of the equation of state.
    pub gas_constant: f32,
    pub particle_mass: f32,
    pub viscosity: f32,
    /// Mass a fluid particle presents to soft bodies when they collide.
    pub coupling_mass: f32,
    /// Velocity retention per step, multiplied by the fluid kind's own damping.
    pub damping: f32,
    pub bounce: f32,
    /// Upper bound on the magnitude of a single pairwise pressure force.
    pub max_pressure_force: f32,
    /// Collision radius used against soft bodies.
    pub particle_radius: f32,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            max_particles: 5000,
            smoothing_radius: 16.0,
            rest_density: 1.0,
            gas_constant: 5.0e5,
            particle_mass: 64.0,
            viscosity: 200.0,
            coupling_mass: 0.25,
            damping: 0.999,
            bounce: 0.5,
            max_pressure_force: 1.0e5,
            particle_radius: 4.0,
        }
    }
}

/// Defaults applied to every new cloth. Each cloth can be tuned afterwards.
#[derive(Clone, Debug)]
pub struct ClothConfig {
    pub particle_mass: f32,
    /// A constraint tears once its length exceeds `rest_length * tear_factor`.
    pub tear_factor: f32,
    pub wind_strength: f32,
    pub wind_frequency: f32,
    /// Random gust amplitude added to the wind, 0 disables it.
    pub turbulence: f32,
    pub tear_debris: bool,
    pub self_collision: bool,
    /// Minimum separation between non-adjacent cloth nodes, as a fraction of spacing.
    pub self_collision_distance: f32,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            particle_mass: 0.5,
            tear_factor: 1.5,
            wind_strength: 30.0,
            wind_frequency: 1.0,
            turbulence: 0.0,
            tear_debris: true,
            self_collision: true,
            self_collision_distance: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DestructibleConfig {
    /// The structure is destroyed once fewer than this fraction of its constraints survive.
    pub destroy_threshold: f32,
    /// Stretch ratio above which constraints start taking strain damage.
    pub stress_threshold: f32,
    /// Health lost per second per unit of strain past the threshold.
    pub stress_damage_rate: f32,
    pub particle_mass: f32,
}

impl Default for DestructibleConfig {
    fn default() -> Self {
        Self {
            destroy_threshold: 0.2,
            stress_threshold: 1.3,
            stress_damage_rate: 50.0,
            particle_mass: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DebrisConfig {
    /// Seconds a piece lives before it is pruned.
    pub lifetime: f32,
    pub max_pieces: usize,
    pub air_drag: f32,
    /// Peak outward speed of a freshly spawned piece.
    pub explosion_speed: f32,
    pub min_size: f32,
    pub max_size: f32,
}

impl Default for DebrisConfig {
    fn default() -> Self {
        Self {
            lifetime: 2.0,
            max_pieces: 2000,
            air_drag: 0.99,
            explosion_speed: 200.0,
            min_size: 2.0,
            max_size: 8.0,
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

fn capacity(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroCapacity { name })
    } else {
        Ok(())
    }
}

impl EngineConfig {
    /// Check every parameter the solvers divide by or clamp against.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.substeps == 0 {
            return Err(ConfigError::ZeroSubsteps);
        }
        if self.relaxation_passes == 0 {
            return Err(ConfigError::ZeroRelaxationPasses);
        }
        unit("damping", self.damping)?;
        unit("bounce", self.bounce)?;
        let b = self.bounds;
        if !(b.min.x < b.max.x && b.min.y < b.max.y) {
            return Err(ConfigError::InvertedBounds {
                min_x: b.min.x,
                min_y: b.min.y,
                max_x: b.max.x,
                max_y: b.max.y,
            });
        }
        positive("cell_size", self.cell_size)?;
        positive("particle_radius", self.particle_radius)?;
        capacity("object", self.max_objects)?;
        capacity("event", self.max_events)?;

        let f = &self.fluid;
        capacity("fluid particle", f.max_particles)?;
        positive("smoothing_radius", f.smoothing_radius)?;
        positive("rest_density", f.rest_density)?;
        positive("particle_mass", f.particle_mass)?;
        positive("gas_constant", f.gas_constant)?;
        positive("coupling_mass", f.coupling_mass)?;
        positive("max_pressure_force", f.max_pressure_force)?;
        positive("fluid particle_radius", f.particle_radius)?;
        unit("fluid damping", f.damping)?;
        unit("fluid bounce", f.bounce)?;

        positive("cloth particle_mass", self.cloth.particle_mass)?;
        if self.cloth.tear_factor <= 1.0 || !self.cloth.tear_factor.is_finite() {
            return Err(ConfigError::TearFactor(self.cloth.tear_factor));
        }

        unit("destroy_threshold", self.destructible.destroy_threshold)?;
        positive("stress_threshold", self.destructible.stress_threshold)?;
        positive("destructible particle_mass", self.destructible.particle_mass)?;

        positive("debris lifetime", self.debris.lifetime)?;
        capacity("debris", self.debris.max_pieces)?;
        unit("air_drag", self.debris.air_drag)?;
        Ok(())
    }
}
