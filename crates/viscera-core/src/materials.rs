/// Soft-body material preset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftMaterial {
    pub name: &'static str,
    /// Rim particle count.
    pub segments: usize,
    pub radius: f32,
    pub particle_mass: f32,
    pub pressure: f32,
    /// Per-particle velocity retention, fed into the particle drag.
    pub viscosity: f32,
    /// Stiffness of the centre-to-rim spokes.
    pub spoke_stiffness: f32,
    pub color: [u8; 4],
    pub glow: bool,
}

impl SoftMaterial {
    /// Flesh: firm, high pressure.
    pub const FLESH: Self = Self {
        name: "flesh",
        segments: 24,
        radius: 30.0,
        particle_mass: 0.3,
        pressure: 1.5,
        viscosity: 0.92,
        spoke_stiffness: 0.8,
        color: [0xff, 0x6b, 0x6b, 0xff],
        glow: false,
    };

    /// Slime: wobbly spokes, keeps its volume.
    pub const SLIME: Self = Self {
        name: "slime",
        segments: 20,
        radius: 30.0,
        particle_mass: 0.2,
        pressure: 1.2,
        viscosity: 0.95,
        spoke_stiffness: 0.3,
        color: [0x00, 0xff, 0x88, 0xff],
        glow: false,
    };

    /// Blood clot: light and low pressure.
    pub const BLOOD: Self = Self {
        name: "blood",
        segments: 16,
        radius: 30.0,
        particle_mass: 0.1,
        pressure: 0.8,
        viscosity: 0.98,
        spoke_stiffness: 0.5,
        color: [0xcc, 0x00, 0x00, 0xff],
        glow: false,
    };

    pub const ECTOPLASM: Self = Self {
        name: "ectoplasm",
        segments: 28,
        radius: 30.0,
        particle_mass: 0.25,
        pressure: 1.0,
        viscosity: 0.90,
        spoke_stiffness: 0.4,
        color: [0x88, 0xff, 0x00, 0xff],
        glow: true,
    };

    pub const ALL: [Self; 4] = [Self::FLESH, Self::SLIME, Self::BLOOD, Self::ECTOPLASM];

    /// Look a preset up by name, falling back to flesh.
    pub fn by_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .unwrap_or(Self::FLESH)
    }
}

impl Default for SoftMaterial {
    fn default() -> Self {
        Self::FLESH
    }
}

/// Fluid type tag carried by every fluid particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum FluidKind {
    #[default]
    Blood = 0,
    Water = 1,
    Ectoplasm = 2,
    Acid = 3,
}

impl FluidKind {
    pub const ALL: [Self; 4] = [Self::Blood, Self::Water, Self::Ectoplasm, Self::Acid];

    pub fn material(self) -> &'static FluidMaterial {
        match self {
            FluidKind::Blood => &FluidMaterial::BLOOD,
            FluidKind::Water => &FluidMaterial::WATER,
            FluidKind::Ectoplasm => &FluidMaterial::ECTOPLASM,
            FluidKind::Acid => &FluidMaterial::ACID,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

/// Per-kind fluid behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidMaterial {
    pub color: [u8; 4],
    /// Multiplier on the solver viscosity.
    pub viscosity_scale: f32,
    /// Velocity retention per 1/60 s, applied on top of the solver damping.
    pub damping: f32,
    /// Particles per second for continuous sources.
    pub emission_rate: f32,
    pub glow: bool,
}

impl FluidMaterial {
    pub const BLOOD: Self = Self {
        color: [0xcc, 0x00, 0x00, 0xff],
        viscosity_scale: 1.5,
        damping: 0.98,
        emission_rate: 100.0,
        glow: false,
    };

    pub const WATER: Self = Self {
        color: [0x44, 0x88, 0xff, 0xff],
        viscosity_scale: 1.0,
        damping: 0.99,
        emission_rate: 150.0,
        glow: false,
    };

    pub const ECTOPLASM: Self = Self {
        color: [0x00, 0xff, 0x88, 0xff],
        viscosity_scale: 2.5,
        damping: 0.95,
        emission_rate: 80.0,
        glow: true,
    };

    pub const ACID: Self = Self {
        color: [0x88, 0xff, 0x00, 0xff],
        viscosity_scale: 0.8,
        damping: 0.97,
        emission_rate: 60.0,
        glow: false,
    };
}

/// What a destructible is made of. Sets its colour and default health.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum DestructibleMaterial {
    #[default]
    Concrete = 0,
    Wood = 1,
    Glass = 2,
    Metal = 3,
    Flesh = 4,
}

impl DestructibleMaterial {
    pub fn color(self) -> [u8; 4] {
        match self {
            DestructibleMaterial::Concrete => [0x88, 0x88, 0x88, 0xff],
            DestructibleMaterial::Wood => [0x8b, 0x45, 0x13, 0xff],
            DestructibleMaterial::Glass => [200, 230, 255, 77],
            DestructibleMaterial::Metal => [0x4a, 0x4a, 0x4a, 0xff],
            DestructibleMaterial::Flesh => [0xcc, 0x66, 0x66, 0xff],
        }
    }

    pub fn default_health(self) -> f32 {
        match self {
            DestructibleMaterial::Concrete => 100.0,
            DestructibleMaterial::Wood => 60.0,
            DestructibleMaterial::Glass => 20.0,
            DestructibleMaterial::Metal => 200.0,
            DestructibleMaterial::Flesh => 40.0,
        }
    }
}
