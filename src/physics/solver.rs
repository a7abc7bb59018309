//! Resolution of a profile against the outcome of narrow-phase tests.

use std::collections::HashSet;

use glam::DVec2;
use tracing::trace;

use crate::math::{fsign, Vec2Ext};

use super::collider::Candidate;
use super::contact::{CollideResult, SnapResults};
use super::narrowphase::{snap_object, ZERO_VEL_EPSILON};
use super::profile::Profile;

/// Corrections implying a collision further than this many seconds away are
/// not the real sticking point. Two 30 Hz network frames.
pub const STICK_TIME_LIMIT: f64 = 2.0 / 30.0;

/// Resolve `profile` against an ordered sequence of candidates.
///
/// Candidates are drained in order and every hit is applied to the live
/// position before the next test, so earlier candidates win overlapping
/// corrections. Afterwards velocity is clamped against the aggregate
/// correction and the summed push force is split into carried external
/// velocity and, for downward pushes, a queued force. The ignored set is
/// rebuilt from this pass alone.
pub fn snap<I>(profile: &mut Profile, candidates: I) -> SnapResults
where
    I: IntoIterator<Item = Candidate>,
{
    let mut results = SnapResults::new();
    let mut ignored = HashSet::new();

    for candidate in candidates {
        let result = snap_object(profile, &candidate);
        if result.ignored {
            ignored.insert(candidate.id);
        } else if result.hit {
            profile.set_pos(profile.pos() + result.pos_adjustment);
        }
        results.add(candidate.id, result);
    }

    if results.snap {
        let vel = clamp_velocity(profile.vel(), results.pos_adjustment);

        let mut force = results.force;
        let mut ext_vel = results.force;
        if force.y < 0.0 {
            ext_vel.y = 0.0;
            force.x = 0.0;
            profile.add_force(force);
        }
        profile.set_ext_vel(ext_vel);
        profile.set_vel(vel);

        trace!(
            adjustment = ?results.pos_adjustment,
            ext_vel = ?ext_vel,
            "snapped"
        );
    } else {
        profile.set_ext_vel(DVec2::ZERO);
    }

    profile.replace_ignored(ignored);
    results
}

/// Forbid velocity that would carry the profile back along a corrected axis.
fn clamp_velocity(mut vel: DVec2, adjustment: DVec2) -> DVec2 {
    if adjustment.x > 0.0 {
        vel.x = vel.x.max(0.0);
    } else if adjustment.x < 0.0 {
        vel.x = vel.x.min(0.0);
    }
    if adjustment.y > 0.0 {
        vel.y = vel.y.max(0.0);
    } else if adjustment.y < 0.0 {
        vel.y = vel.y.min(0.0);
    }
    vel
}

/// Embed `profile` along its own velocity using a precomputed hit.
///
/// Axes the profile is not moving along are left alone. With motion on both
/// axes the later axis is rescaled so the correction follows the velocity
/// vector, then any axis whose implied collision time reaches
/// [`STICK_TIME_LIMIT`] is discarded.
pub fn stick(profile: &mut Profile, result: &CollideResult) {
    if !result.hit || result.pos_adjustment.is_zero() {
        return;
    }

    let vel = profile.vel();
    let mut adjustment = result.pos_adjustment;

    if vel.x.abs() < ZERO_VEL_EPSILON {
        adjustment.x = 0.0;
    }
    if vel.y.abs() < ZERO_VEL_EPSILON {
        adjustment.y = 0.0;
    }
    if adjustment.is_zero() {
        return;
    }

    // A zero adjustment implies no division; a non-zero one implies a moving axis.
    let time = |adj: f64, v: f64| if adj == 0.0 { 0.0 } else { (adj / v).abs() };
    let tx = time(adjustment.x, vel.x);
    let ty = time(adjustment.y, vel.y);

    if adjustment.x != 0.0 && adjustment.y != 0.0 {
        if tx < ty {
            adjustment.y = fsign(adjustment.y) * (vel.y / vel.x * adjustment.x).abs();
        } else {
            adjustment.x = fsign(adjustment.x) * (vel.x / vel.y * adjustment.y).abs();
        }
    }

    if tx >= STICK_TIME_LIMIT {
        adjustment.x = 0.0;
    }
    if ty >= STICK_TIME_LIMIT {
        adjustment.y = 0.0;
    }

    profile.set_pos(profile.pos() + adjustment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Attribute, Attributes, SpaceType};
    use crate::ecs::grid::ObjectId;
    use crate::physics::options::ColliderOptions;

    const EPS: f64 = 1e-9;

    fn id(n: u32) -> ObjectId {
        hecs::Entity::from_bits((1u64 << 32) | u64::from(n)).unwrap()
    }

    fn block(n: u32, pos: DVec2, dim: DVec2, attributes: &[Attribute]) -> Candidate {
        Candidate {
            id: id(n),
            space: SpaceType::Wall,
            attributes: Attributes::from_slice(attributes),
            pos,
            dim,
            vel: DVec2::ZERO,
            ext_vel: DVec2::ZERO,
        }
    }

    fn player(pos: DVec2, vel: DVec2) -> Profile {
        Profile::new(pos, DVec2::ONE)
            .with_vel(vel)
            .with_snap_options(ColliderOptions::new().with_attribute(Attribute::Solid))
    }

    #[test]
    fn test_snap_without_candidates_resets_ext_vel() {
        let mut profile = player(DVec2::new(1.0, 2.0), DVec2::new(3.0, -1.0));
        profile.set_ext_vel(DVec2::new(2.0, 0.0));

        let results = snap(&mut profile, Vec::new());

        assert!(!results.snap);
        assert!(results.results.is_empty());
        assert_eq!(profile.pos(), DVec2::new(1.0, 2.0));
        assert_eq!(profile.vel(), DVec2::new(3.0, -1.0));
        assert_eq!(profile.ext_vel(), DVec2::ZERO);
    }

    #[test]
    fn test_snap_landing_clamps_velocity() {
        let mut profile = player(DVec2::new(0.0, 0.9), DVec2::new(1.0, -5.0));
        let floor = block(1, DVec2::ZERO, DVec2::new(10.0, 1.0), &[Attribute::Solid]);

        let results = snap(&mut profile, vec![floor]);

        assert!(results.snap);
        assert!((profile.pos().y - 1.0).abs() < EPS, "pos = {}", profile.pos());
        assert_eq!(profile.vel(), DVec2::new(1.0, 0.0));
        assert!(results.get(id(1)).unwrap().hit);
    }

    #[test]
    fn test_snap_earlier_candidate_wins() {
        let mut profile = player(DVec2::new(0.0, 0.9), DVec2::new(0.0, -5.0));
        let left = block(1, DVec2::new(-0.5, 0.0), DVec2::new(1.0, 1.0), &[Attribute::Solid]);
        let right = block(2, DVec2::new(0.5, 0.0), DVec2::new(1.0, 1.0), &[Attribute::Solid]);

        let results = snap(&mut profile, vec![left, right]);

        // The second tile sees the already corrected position.
        assert!((results.pos_adjustment.y - 0.1).abs() < 1e-6, "{:?}", results.pos_adjustment);
        assert!((profile.pos().y - 1.0).abs() < 1e-6);
        assert_eq!(results.results.len(), 2);
    }

    #[test]
    fn test_snap_riding_carries_ext_vel() {
        let mut profile = player(DVec2::new(0.0, 0.9), DVec2::new(0.0, -5.0));
        let mut lift = block(1, DVec2::ZERO, DVec2::new(4.0, 1.0), &[Attribute::Solid]);
        lift.vel = DVec2::new(2.0, 0.0);

        snap(&mut profile, vec![lift]);

        assert_eq!(profile.ext_vel(), DVec2::new(2.0, 0.0));
        assert!(!profile.has_forces());
    }

    #[test]
    fn test_snap_downward_push_becomes_force() {
        let mut profile = player(DVec2::new(0.0, 0.9), DVec2::new(0.0, -5.0));
        let mut lift = block(1, DVec2::ZERO, DVec2::new(4.0, 1.0), &[Attribute::Solid]);
        lift.vel = DVec2::new(1.0, -3.0);

        let results = snap(&mut profile, vec![lift]);

        assert!(results.snap);
        assert_eq!(results.force, DVec2::new(1.0, -3.0));
        // Horizontal carry stays external, vertical push is queued.
        assert_eq!(profile.ext_vel(), DVec2::new(1.0, 0.0));
        assert_eq!(profile.vel(), DVec2::ZERO);
        assert_eq!(profile.apply_forces(), DVec2::new(0.0, -3.0));
        assert_eq!(profile.vel(), DVec2::new(0.0, -3.0));
    }

    #[test]
    fn test_platform_ignored_then_rearmed() {
        let platform_attrs = [Attribute::Solid, Attribute::Platform];
        let platform = || block(7, DVec2::ZERO, DVec2::new(4.0, 0.4), &platform_attrs);

        // Jumping up through the platform.
        let mut profile = player(DVec2::new(0.0, -0.6), DVec2::new(0.0, 8.0));
        let results = snap(&mut profile, vec![platform()]);
        assert!(results.get(id(7)).unwrap().ignored);
        assert!(!results.snap);
        assert!(profile.is_ignored(id(7)));
        assert!((profile.pos().y + 0.6).abs() < EPS);

        // Still inside and now falling: stays ignored, no correction.
        profile.set_pos(DVec2::new(0.0, 0.4));
        profile.set_vel(DVec2::new(0.0, -2.0));
        let results = snap(&mut profile, vec![platform()]);
        assert!(results.get(id(7)).unwrap().ignored);
        assert!((profile.pos().y - 0.4).abs() < EPS);

        // Separated: the ignore is dropped.
        profile.set_pos(DVec2::new(0.0, 2.0));
        snap(&mut profile, vec![platform()]);
        assert!(!profile.is_ignored(id(7)));

        // Falling back onto it from above now lands.
        profile.set_pos(DVec2::new(0.0, 0.6));
        let results = snap(&mut profile, vec![platform()]);
        assert!(results.snap);
        assert!((profile.pos().y - 0.7).abs() < EPS, "pos = {}", profile.pos());
    }

    #[test]
    fn test_stick_vertical() {
        let mut profile = player(DVec2::new(2.0, 1.0), DVec2::new(0.0, -5.0));
        let result = CollideResult::hit(DVec2::new(0.0, -0.3), DVec2::ZERO);

        stick(&mut profile, &result);

        assert_eq!(profile.pos().x, 2.0);
        assert!((profile.pos().y - 0.7).abs() < EPS, "pos = {}", profile.pos());
    }

    #[test]
    fn test_stick_ignores_misses_and_still_axes() {
        let mut profile = player(DVec2::ZERO, DVec2::new(0.0, -5.0));
        stick(&mut profile, &CollideResult::empty());
        stick(&mut profile, &CollideResult::hit(DVec2::ZERO, DVec2::ZERO));
        // No horizontal motion, so the horizontal correction is dropped.
        stick(&mut profile, &CollideResult::hit(DVec2::new(0.2, 0.0), DVec2::ZERO));
        assert_eq!(profile.pos(), DVec2::ZERO);
    }

    #[test]
    fn test_stick_follows_velocity_direction() {
        let mut profile = player(DVec2::ZERO, DVec2::new(3.0, -4.0));
        let result = CollideResult::hit(DVec2::new(0.06, -0.02), DVec2::ZERO);

        stick(&mut profile, &result);

        let pos = profile.pos();
        assert!((pos.x - 0.015).abs() < EPS, "pos = {pos}");
        assert!((pos.y + 0.02).abs() < EPS, "pos = {pos}");
    }

    #[test]
    fn test_stick_discards_distant_correction() {
        let mut profile = player(DVec2::ZERO, DVec2::new(0.0, -5.0));
        stick(&mut profile, &CollideResult::hit(DVec2::new(0.0, -1.0), DVec2::ZERO));
        assert_eq!(profile.pos(), DVec2::ZERO);
    }
}
