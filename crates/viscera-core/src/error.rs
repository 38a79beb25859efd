//! Error types for configuration and factory calls.
//!
//! Stepping never fails. Numerical degeneracies are skipped in place, and
//! fluid capacity overflow evicts the oldest particle, so the only fallible
//! surfaces are building an engine and building composites.

use thiserror::Error;

/// A configuration value that would make the simulation meaningless or unstable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// At least one substep is required per frame.
    #[error("substeps must be at least 1")]
    ZeroSubsteps,

    /// At least one relaxation pass is required per substep.
    #[error("relaxation passes must be at least 1")]
    ZeroRelaxationPasses,

    /// A length-like parameter was zero, negative or not finite.
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// A coefficient that must lie in [0, 1] did not.
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// The simulation bounds are empty or inverted.
    #[error("bounds are inverted: min ({min_x}, {min_y}) max ({max_x}, {max_y})")]
    InvertedBounds {
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    },

    /// Cloth would tear at or below its rest length.
    #[error("tear factor must exceed 1.0, got {0}")]
    TearFactor(f32),

    /// A capacity was configured as zero.
    #[error("{name} capacity must be at least 1")]
    ZeroCapacity {
        /// Capacity name
        name: &'static str,
    },
}

/// A factory call that could not build the requested composite.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Ring-shaped bodies need at least `min` segments.
    #[error("need at least {min} segments, got {got}")]
    TooFewSegments {
        /// Requested segment count
        got: usize,
        /// Minimum segment count
        min: usize,
    },

    /// Grids need at least one cell in each direction.
    #[error("grid must have at least 1x1 segments, got {segments_x}x{segments_y}")]
    GridTooSmall {
        segments_x: usize,
        segments_y: usize,
    },

    /// Width, height, radius or length was not positive.
    #[error("{name} must be positive and finite, got {value}")]
    NonPositiveSize {
        /// Dimension name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// A constraint endpoint refers to a particle this solver never created.
    #[error("particle {index} does not exist")]
    UnknownParticle {
        /// Offending particle index
        index: u32,
    },

    /// The engine already holds the configured maximum number of objects.
    #[error("object capacity of {limit} reached")]
    CapacityExceeded {
        /// Configured object cap
        limit: usize,
    },
}
