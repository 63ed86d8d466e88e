//! Soft-body particle physics with position-based dynamics.
//!
//! `squishy` simulates deformable bodies made of Verlet particles held
//! together by distance springs and shape-matching clusters, colliding with
//! each other and with a ground plane inside one fixed-timestep world.
//!
//! # Features
//!
//! - **Verlet integration**: implicit velocity, one-shot forces, damping
//! - **Constraints**: mass-weighted distance springs and shape matching with
//!   polar decomposition
//! - **Averaged corrections**: accumulate-then-average or immediate updates
//! - **Broad phase**: unbounded spatial hash grid
//! - **World**: generational body arena, fixed-step `advance`, ray picking
//! - **Generators**: ropes, cubes, lattices, sphere shells and blobs
//! - **Observable**: monitor physics steps via the `StepObserver` trait
//! - **`no_std` compatible**: `std` and `parallel` (rayon) are opt-in
//!
//! ```
//! use squishy::{Body, CubeConfig, NoOpStepObserver, SimulationWorld, Vec3, WorldConfig};
//!
//! let mut world = SimulationWorld::<f32>::new(WorldConfig::new()).unwrap();
//! let cube = Body::cube(Vec3::new(0.0, 2.0, 0.0), &CubeConfig::default()).unwrap();
//! let id = world.add_body(cube).unwrap();
//! world.advance(1.0 / 60.0, &mut NoOpStepObserver);
//! assert!(world.contains(id));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod float;
pub mod vec;
pub mod mat;
pub mod particle;
pub mod constraint;
pub mod shape_matching;
pub mod body;
pub mod shapes;
pub mod spatial;
pub mod world;
pub mod observer;
pub mod config;
pub mod error;

// Re-export primary API
pub use float::Float;
pub use vec::{Vec, Vec3};
pub use mat::Mat3;
pub use particle::{Particle, DEFAULT_RADIUS};
pub use constraint::{Constraint, DistanceConstraint};
pub use shape_matching::{extract_rotation, ShapeMatchingConstraint};
pub use body::{resolve_ground, Aabb, Body};
pub use shapes::{BlobConfig, CubeConfig, LatticeConfig, RopeConfig, SphereConfig};
pub use spatial::{CellKey, SpatialHashGrid};
pub use world::{BodyId, CollisionPair, ParticleRef, SimulationWorld};
pub use config::{CollisionConfig, CorrectionMode, GroundPlane, SolverConfig, WorldConfig};
pub use observer::{LogStepObserver, NoOpStepObserver, StepObserver};
pub use error::PhysicsError;
