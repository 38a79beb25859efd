//! Real-time 2D particle and constraint physics.
//!
//! A Verlet core with distance-constraint relaxation carries soft bodies,
//! tearable cloth, destructible grids and free ropes and ragdolls. An SPH
//! solver runs alongside it, and [`engine::Engine`] steps everything in a
//! fixed order and couples fluid to soft bodies.
//!
//! Screen space: +y is down, lengths are pixels, time is seconds.

pub mod bodies;
pub mod bounds;
pub mod cloth;
pub mod composite;
pub mod config;
pub mod constraints;
pub mod debris;
pub mod destructible;
pub mod engine;
pub mod error;
pub mod fluids;
pub mod fracture;
pub mod grid;
pub mod materials;
pub mod math;
pub mod particle;
pub mod quality;
pub mod snapshot;
pub mod softbody;
pub mod solver;

pub use config::EngineConfig;
pub use engine::{BodyId, ClothId, DestructibleId, Engine, EngineEvent, SoftBodyId, Stats};
pub use error::{BuildError, ConfigError};
pub use particle::ParticleId;
