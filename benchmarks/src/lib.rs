//! Shared setup helpers for tether benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench kinematics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench kinematics -- snap

use glam::DVec2;
use tether::ecs::components::physics::{Attribute, Attributes, MotionType, SpaceType};
use tether::{Candidate, ColliderOptions, Grid, PhysicsConfig, PhysicsWorld, Profile};

/// Snap options of a player: stopped by anything solid.
pub fn solid_options() -> ColliderOptions {
    ColliderOptions::new().with_attribute(Attribute::Solid)
}

/// A unit-sized player profile falling onto whatever is below.
pub fn player_profile(pos: DVec2) -> Profile {
    Profile::new(pos, DVec2::ONE)
        .with_vel(DVec2::new(2.0, -8.0))
        .with_snap_options(solid_options())
}

/// `n` solid tiles in a row under the origin, each overlapping a player at
/// `(0, 0.9)`, ordered nearest first.
pub fn floor_candidates(n: usize) -> Vec<Candidate> {
    let mut grid = Grid::new();
    let mut candidates: Vec<Candidate> = (0..n)
        .filter_map(|i| {
            let x = (i as f64 - n as f64 / 2.0) * 0.05;
            let id = grid.spawn_with(
                SpaceType::Wall,
                MotionType::Static,
                Profile::new(DVec2::new(x, 0.0), DVec2::new(1.0, 1.0)),
                Attributes::from_slice(&[Attribute::Solid]),
            );
            grid.candidate(id)
        })
        .collect();
    candidates.sort_by(|a, b| a.pos.x.abs().total_cmp(&b.pos.x.abs()));
    candidates
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Level with a long floor, a row of one-way platforms and `n` players
/// scattered above them.
pub fn setup_level(n: usize) -> Grid {
    let mut grid = Grid::new();
    let width = (n as f64).sqrt().ceil() * 3.0;

    grid.spawn_with(
        SpaceType::Wall,
        MotionType::Static,
        Profile::new(DVec2::ZERO, DVec2::new(width * 2.0 + 10.0, 1.0)),
        Attributes::from_slice(&[Attribute::Solid]),
    );

    let platforms = (width / 4.0).ceil() as usize;
    for i in 0..platforms {
        grid.spawn_with(
            SpaceType::Wall,
            MotionType::Static,
            Profile::new(DVec2::new(i as f64 * 4.0 - width / 2.0, 3.0), DVec2::new(3.0, 0.4)),
            Attributes::from_slice(&[Attribute::Solid, Attribute::Platform]),
        );
    }

    let cols = (n as f64).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f64 * 1.5 - width / 2.0;
        let y = 1.0 + (i / cols) as f64 * 1.2;
        grid.spawn(SpaceType::Player, MotionType::Dynamic, player_profile(DVec2::new(x, y)));
    }
    grid
}

/// [`setup_level`] plus a physics world with default configuration.
pub fn setup_scene(n: usize) -> (Grid, PhysicsWorld) {
    let physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
    (setup_level(n), physics)
}
