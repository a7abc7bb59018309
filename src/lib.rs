//! Tether: 2D kinematics and collision resolution
//!
//! The simulation core of a tick-based multiplayer game. Every entity
//! carries a kinematic [`Profile`] and is resolved each tick against the
//! entities nearby, with one-way platforms, stairs, sticky projectiles and
//! attachments (grappling hooks, riding platforms) layered on top.
//!
//! # Architecture
//!
//! 1. **math** - Sign and vector helpers over `glam::DVec2`
//! 2. **ecs** - Entity store ([`Grid`]) and components over hecs
//! 3. **physics** - Profiles, narrowphase, resolution, attachments and the
//!    fixed timestep [`PhysicsWorld`]
//! 4. **error** - [`TetherError`]

pub mod ecs;
pub mod error;
pub mod math;
pub mod physics;

pub use ecs::prelude::*;

pub use error::{Result, TetherError};

pub use physics::attachment::Connection;
pub use physics::collider::{Aabb, Body, Candidate};
pub use physics::{
    ColliderOptions, CollideResult, PhysicsConfig, PhysicsWorld, Profile, ProfileData,
    SnapResults, SubProfile,
};

// Re-export glam for convenience
pub use glam;
