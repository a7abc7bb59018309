//! Kinematic simulation and collision resolution.
//!
//! # Architecture
//!
//! The pipeline runs in a fixed timestep loop:
//!
//! 0. Remove embedded projectiles whose anchor is gone
//! 1. Queue gravity on free dynamic bodies
//! 2. Attachment pre-update (spring forces)
//! 3. Integrate forces, jerk and acceleration into velocity
//! 4. Integrate total velocity into position
//! 5. Broadphase (spatial hash, nearest first)
//! 6. Narrowphase resolution (`snap`, or overlap and `stick` for sticky bodies)
//! 7. Attachment post-update (rigid offset follow)

pub mod attachment;
pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod flag;
pub mod integrate;
pub mod narrowphase;
pub mod options;
pub mod profile;
pub mod solver;
pub mod sub_profile;

use std::collections::HashMap;

use glam::DVec2;
use tracing::debug;

use crate::ecs::components::physics::Sticky;
use crate::ecs::grid::{Grid, ObjectId};
use crate::error::{Result, TetherError};

use self::attachment::Connection;
use self::broadphase::SpatialHashGrid;
use self::collider::Candidate;
use self::narrowphase::overlap_profile;

pub use self::attachment::{Attachment, ConnectionKind};
pub use self::contact::{CollideResult, SnapResults};
pub use self::narrowphase::{snap_object, OVERLAP_EPSILON, STAIR_STEP_LIMIT, ZERO_VEL_EPSILON};
pub use self::options::ColliderOptions;
pub use self::profile::{Profile, ProfileData};
pub use self::solver::{snap, stick, STICK_TIME_LIMIT};
pub use self::sub_profile::{ProfileKey, SubProfile};

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsConfig {
    /// Gravity in units/s². Default: (0, -30).
    pub gravity: DVec2,
    /// Fixed timestep in seconds. Default: 0.016.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Smallest broadphase cell size. Default: 4.0.
    pub cell_size: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DVec2::new(0.0, -30.0),
            fixed_timestep: 0.016,
            max_substeps: 4,
            cell_size: 4.0,
        }
    }
}

impl PhysicsConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(TetherError::InvalidConfig {
                field: "fixed_timestep",
                reason: "must be positive and finite",
            });
        }
        if self.max_substeps == 0 {
            return Err(TetherError::InvalidConfig {
                field: "max_substeps",
                reason: "must be at least 1",
            });
        }
        if !self.gravity.is_finite() {
            return Err(TetherError::InvalidConfig {
                field: "gravity",
                reason: "must be finite",
            });
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(TetherError::InvalidConfig {
                field: "cell_size",
                reason: "must be positive and finite",
            });
        }
        Ok(())
    }
}

/// The physics world driving every entity in a [`Grid`].
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    ticks: u64,
    broadphase: SpatialHashGrid,
    results: HashMap<ObjectId, SnapResults>,
}

impl PhysicsWorld {
    /// Create a world with a validated config.
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        debug!(?config, "physics world created");
        Ok(Self {
            broadphase: SpatialHashGrid::new(config.cell_size),
            config,
            accumulator: 0.0,
            ticks: 0,
            results: HashMap::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Number of fixed steps run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Resolution outcome of `id` in the most recent fixed step.
    pub fn results(&self, id: ObjectId) -> Option<&SnapResults> {
        self.results.get(&id)
    }

    /// Advance by `delta_time` seconds. Returns the number of fixed steps run.
    pub fn step(&mut self, grid: &mut Grid, delta_time: f64) -> u32 {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps {
            self.fixed_step(grid, self.config.fixed_timestep);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
        substeps
    }

    /// Run one tick of `dt` seconds.
    pub fn fixed_step(&mut self, grid: &mut Grid, dt: f64) {
        remove_orphaned_sticky(grid);
        integrate::apply_gravity(grid, self.config.gravity, dt);
        attachment::pre_update_all(grid);
        integrate::integrate_velocities(grid, dt);
        integrate::integrate_positions(grid, dt);

        let mut nearby = self.broadphase.nearby(grid);
        let mut movers: Vec<ObjectId> = nearby.keys().copied().collect();
        movers.sort();

        self.results.clear();
        for id in movers {
            let candidates = nearby.remove(&id).unwrap_or_default();
            let sticky = grid.world().get::<&Sticky>(id).ok().map(|s| *s);
            let results = match sticky {
                Some(Sticky { stuck_to: Some(_) }) => continue,
                Some(Sticky { stuck_to: None }) => resolve_sticky(grid, id, candidates),
                None => match grid.profile_mut(id) {
                    Some(mut profile) => solver::snap(&mut profile, candidates),
                    None => continue,
                },
            };
            self.results.insert(id, results);
        }

        attachment::post_update_all(grid);
        self.ticks += 1;
    }
}

/// Delete embedded projectiles whose anchor no longer exists.
fn remove_orphaned_sticky(grid: &mut Grid) {
    let orphans: Vec<ObjectId> = grid
        .world()
        .query::<&Sticky>()
        .iter()
        .filter_map(|(id, sticky)| match sticky.stuck_to {
            Some(target) if !grid.contains(target) => Some(id),
            _ => None,
        })
        .collect();

    for id in orphans {
        grid.delete(id);
        debug!(?id, "anchor gone, sticky body removed");
    }
}

/// Embed a sticky body in the first candidate it overlaps and attach it there.
fn resolve_sticky(grid: &mut Grid, id: ObjectId, candidates: Vec<Candidate>) -> SnapResults {
    let mut results = SnapResults::new();

    let stuck = {
        let Some(mut profile) = grid.profile_mut(id) else {
            return results;
        };
        let mut stuck = None;
        for candidate in &candidates {
            let result = overlap_profile(&profile, candidate);
            if !result.hit {
                continue;
            }
            solver::stick(&mut profile, &result);
            profile.stop();
            results.add(candidate.id, result);
            stuck = Some((candidate.id, profile.pos() - candidate.pos));
            break;
        }
        stuck
    };

    if let Some((target, offset)) = stuck {
        let attached = grid
            .connect(id, target, Connection::new_offset(offset))
            .and_then(|()| grid.upsert(id, Sticky { stuck_to: Some(target) }));
        match attached {
            Ok(()) => debug!(?id, ?target, "stuck"),
            Err(err) => debug!(?id, %err, "could not stick"),
        }
    }
    results
}
