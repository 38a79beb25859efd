pub mod distance;

pub use distance::{
    relax_constraints, solve_distance, ConstraintId, ConstraintKind, DistanceConstraint,
};
