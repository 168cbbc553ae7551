#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Dynamics
//!
//! Secondary motion for transform hierarchies: hair, tails, cloth strips,
//! soft appendages. A [`Structure`] binds [`Particle`]s to hierarchy nodes,
//! connects them with [`Link`]s, and keeps them out of sphere and capsule
//! [`Collider`]s. Particles move by Verlet integration in a model space
//! anchored to the character root, so whole-body motion does not read as
//! velocity.
//!
//! A [`DynamicsManager`] drives every registered structure from host
//! callbacks; each structure decides from its [`UpdateMethod`] whether a
//! callback steps it. Collider contacts run on one of three backends
//! selected by [`ComputeMethod`]: a sequential loop, a rayon parallel-for,
//! or the compute kernels from the `compute` crate.

pub mod backend;
pub mod cadence;
pub mod collider;
pub mod error;
pub mod hierarchy;
pub mod link;
pub mod manager;
pub mod math;
pub mod particle;
pub mod prewarm;
pub mod space;
pub mod steps;
pub mod structure;

pub use backend::{CollisionBackend, CollisionScene, ComputeMethod};
pub use cadence::{HostCallback, UpdateMethod};
pub use collider::{Collider, ColliderId, ColliderShape};
pub use error::DynamicsError;
pub use hierarchy::{Hierarchy, NodeId, Transform};
pub use link::{Link, LinkId, LinkSettings};
pub use manager::{share, DynamicsManager, SharedStructure};
pub use particle::{Particle, ParticleId, ParticleSettings};
pub use prewarm::prewarm_schedule;
pub use space::ModelSpace;
pub use structure::{Structure, StructureSettings, StructureStats};

pub use glam::{Quat, Vec3};
