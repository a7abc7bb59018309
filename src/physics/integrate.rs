//! Integration stages of the tick pipeline.

use glam::DVec2;

use crate::ecs::components::physics::{MotionType, Sticky};
use crate::ecs::grid::Grid;

use super::profile::Profile;

/// Embedded projectiles are moved by their anchor, never by integration.
#[inline]
fn is_anchored(sticky: Option<&Sticky>) -> bool {
    sticky.is_some_and(Sticky::is_stuck)
}

/// Queue one tick of gravity as a velocity change on every free dynamic body.
pub fn apply_gravity(grid: &mut Grid, gravity: DVec2, dt: f64) {
    let force = gravity * dt;
    for (_, (motion, profile, sticky)) in grid
        .world_mut()
        .query_mut::<(&MotionType, &mut Profile, Option<&Sticky>)>()
    {
        if *motion == MotionType::Dynamic && !is_anchored(sticky) {
            profile.add_force(force);
        }
    }
}

/// Drain queued forces into velocity, then integrate jerk and acceleration.
///
/// Static bodies and embedded projectiles keep whatever they have queued.
pub fn integrate_velocities(grid: &mut Grid, dt: f64) {
    for (_, (motion, profile, sticky)) in grid
        .world_mut()
        .query_mut::<(&MotionType, &mut Profile, Option<&Sticky>)>()
    {
        if *motion == MotionType::Static || is_anchored(sticky) {
            continue;
        }
        profile.apply_forces();

        let acc = profile.acc() + profile.jerk() * dt;
        profile.set_acc(acc);
        let vel = profile.vel() + acc * dt;
        profile.set_vel(vel);
    }
}

/// Move every non-static, non-embedded body by its total velocity.
pub fn integrate_positions(grid: &mut Grid, dt: f64) {
    for (_, (motion, profile, sticky)) in grid
        .world_mut()
        .query_mut::<(&MotionType, &mut Profile, Option<&Sticky>)>()
    {
        if *motion == MotionType::Static || is_anchored(sticky) {
            continue;
        }
        let pos = profile.pos() + profile.total_vel() * dt;
        profile.set_pos(pos);
    }
}
