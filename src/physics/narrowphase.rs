//! Narrow phase: pairwise tests between a profile and one nearby candidate.

use glam::DVec2;
use tracing::trace;

use crate::ecs::components::physics::Attribute;
use crate::math::Vec2Ext;

use super::collider::{Body, Candidate};
use super::contact::CollideResult;
use super::profile::Profile;

/// Relative velocity below this is treated as no motion on that axis.
pub const ZERO_VEL_EPSILON: f64 = 1e-6;

/// Overlap below this on one axis is a graze, not a collision on the other axis.
pub const OVERLAP_EPSILON: f64 = 0.01;

/// Largest upward correction applied when stepping onto a stair in one tick.
pub const STAIR_STEP_LIMIT: f64 = 0.2;

/// Candidate collision axes, narrowed down step by step.
#[derive(Debug, Clone, Copy)]
struct AxisMask {
    x: bool,
    y: bool,
}

impl AxisMask {
    fn both(&self) -> bool {
        self.x && self.y
    }

    fn none(&self) -> bool {
        !self.x && !self.y
    }

    fn apply(&self, v: DVec2) -> DVec2 {
        DVec2::new(
            if self.x { v.x } else { 0.0 },
            if self.y { v.y } else { 0.0 },
        )
    }
}

/// Test `profile` against one candidate and compute the position correction.
///
/// Chooses a single collision axis where possible: grazes are dropped first,
/// then the axis without relative motion, then the axis that would have
/// collided later. Stairs turn a sideways hit into a bounded step up and
/// platforms only ever push up.
pub fn snap_object(profile: &Profile, candidate: &Candidate) -> CollideResult {
    let mut adjustment = profile.pos_adjustment(candidate);

    if !profile.snap_options().evaluate(candidate) || adjustment.area() <= 0.0 {
        return CollideResult::empty();
    }

    if profile.is_ignored(candidate.id) {
        return CollideResult::ignored();
    }

    let relative_vel = profile.total_vel() - candidate.total_vel();
    let mut mask = AxisMask { x: true, y: true };

    // Grazes. Both checks may fire.
    if mask.both() {
        if adjustment.y.abs() < OVERLAP_EPSILON {
            mask.x = false;
        }
        if adjustment.x.abs() < OVERLAP_EPSILON {
            mask.y = false;
        }
    }

    if mask.both() {
        let still_x = relative_vel.x.abs() < ZERO_VEL_EPSILON;
        let still_y = relative_vel.y.abs() < ZERO_VEL_EPSILON;
        match (still_x, still_y) {
            (true, false) => mask.x = false,
            (false, true) => mask.y = false,
            (true, true) => {
                // Resting inside the candidate: resolve along the shallower axis.
                if adjustment.x.abs() >= adjustment.y.abs() {
                    mask.x = false;
                } else {
                    mask.y = false;
                }
            }
            (false, false) => {}
        }
    }

    if mask.both() {
        let tx = (adjustment.x / relative_vel.x).abs();
        let ty = (adjustment.y / relative_vel.y).abs();
        if tx > ty {
            mask.x = false;
        } else if ty > tx {
            mask.y = false;
        }
    }

    if mask.x && candidate.has_attribute(Attribute::Stair) {
        mask = AxisMask { x: false, y: true };
        let (primary, reverse) = profile.pos_adjustment_y(candidate);
        adjustment.y = primary.max(reverse).min(STAIR_STEP_LIMIT);
        trace!(candidate = ?candidate.id, step = adjustment.y, "stair step");
    }

    let platform = candidate.has_attribute(Attribute::Platform);
    if platform {
        mask.x = false;
        if adjustment.y < 0.0 {
            mask.y = false;
        }
    }

    if mask.none() {
        if platform {
            trace!(candidate = ?candidate.id, "passing through platform");
            return CollideResult::ignored();
        }
        return CollideResult::empty();
    }

    let adjustment = mask.apply(adjustment);
    if adjustment.is_zero() {
        return CollideResult::empty();
    }

    CollideResult::hit(adjustment, candidate.vel)
}

/// Plain overlap test, gated by the profile's overlap options.
///
/// Hits when the candidate's box overlaps the profile or any of its
/// sub-profiles. The adjustment is the unfiltered primary correction.
pub fn overlap_profile(profile: &Profile, candidate: &Candidate) -> CollideResult {
    if !profile.overlap_options().evaluate(candidate) {
        return CollideResult::empty();
    }

    let other = candidate.aabb();
    let overlaps = profile.aabb().overlaps(&other)
        || profile
            .sub_profiles()
            .any(|(_, sp)| sp.profile().aabb().overlaps(&other));
    if !overlaps {
        return CollideResult::empty();
    }

    CollideResult::hit(profile.pos_adjustment(candidate), candidate.vel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Attributes, SpaceType};
    use crate::physics::options::ColliderOptions;

    fn id(n: u32) -> crate::ecs::grid::ObjectId {
        hecs::Entity::from_bits((1u64 << 32) | u64::from(n)).unwrap()
    }

    fn solid_options() -> ColliderOptions {
        ColliderOptions::new().with_attribute(Attribute::Solid)
    }

    fn candidate(n: u32, pos: DVec2, dim: DVec2, attributes: &[Attribute]) -> Candidate {
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

    fn mover(pos: DVec2, vel: DVec2) -> Profile {
        Profile::new(pos, DVec2::ONE)
            .with_vel(vel)
            .with_snap_options(solid_options())
    }

    #[test]
    fn test_rejected_by_options() {
        let profile = Profile::new(DVec2::ZERO, DVec2::ONE).with_vel(DVec2::new(0.0, -1.0));
        let floor = candidate(1, DVec2::new(0.0, -0.9), DVec2::new(10.0, 1.0), &[Attribute::Solid]);
        assert!(snap_object(&profile, &floor).is_empty());
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let profile = mover(DVec2::ZERO, DVec2::new(0.0, -1.0));
        let floor = candidate(1, DVec2::new(0.0, -2.0), DVec2::new(10.0, 1.0), &[Attribute::Solid]);
        assert!(snap_object(&profile, &floor).is_empty());
    }

    #[test]
    fn test_landing_on_floor_pushes_up() {
        let profile = mover(DVec2::new(0.0, 0.9), DVec2::new(0.0, -5.0));
        let floor = candidate(1, DVec2::ZERO, DVec2::new(10.0, 1.0), &[Attribute::Solid]);
        let result = snap_object(&profile, &floor);
        assert!(result.hit);
        assert_eq!(result.pos_adjustment.x, 0.0);
        assert!((result.pos_adjustment.y - 0.1).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_tunneling_through_thin_wall_pushes_back_to_entry_side() {
        // Entered from the left at high speed, centre already past the wall.
        let profile = mover(DVec2::new(0.15, 0.0), DVec2::new(30.0, 0.0));
        let wall = candidate(1, DVec2::ZERO, DVec2::new(0.2, 10.0), &[Attribute::Solid]);
        let result = snap_object(&profile, &wall);
        assert!(result.hit);
        assert!(result.pos_adjustment.x < 0.0, "{:?}", result.pos_adjustment);
        assert!((result.pos_adjustment.x + 1.15).abs() < 1e-9, "{:?}", result.pos_adjustment);
        assert_eq!(result.pos_adjustment.y, 0.0);
        // Clear of the wall on the entry side.
        let right_edge = 0.15 + result.pos_adjustment.x + 0.5;
        assert!(right_edge <= -0.1, "right edge = {right_edge}");
    }

    #[test]
    fn test_resting_contact_resolves_along_shallower_axis() {
        let profile = mover(DVec2::new(0.0, 0.95), DVec2::ZERO);
        let floor = candidate(1, DVec2::ZERO, DVec2::new(1.5, 1.0), &[Attribute::Solid]);
        let result = snap_object(&profile, &floor);
        assert!(result.hit);
        assert_eq!(result.pos_adjustment.x, 0.0);
        assert!((result.pos_adjustment.y - 0.05).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_earlier_axis_wins() {
        // Falling fast into a corner-ish overlap: Y would have collided first.
        let profile = mover(DVec2::new(0.6, 0.8), DVec2::new(1.0, -10.0));
        let block = candidate(1, DVec2::ZERO, DVec2::ONE, &[Attribute::Solid]);
        let result = snap_object(&profile, &block);
        assert!(result.hit);
        assert_eq!(result.pos_adjustment.x, 0.0);
        assert!((result.pos_adjustment.y - 0.2).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_graze_on_top_resolves_vertically() {
        // Sliding right along the top with a hair of sink. By timing alone
        // the sideways hit would come first and shove the mover back left.
        let profile = mover(DVec2::new(-0.9, 0.995), DVec2::new(5.0, -0.001));
        let block = candidate(1, DVec2::ZERO, DVec2::ONE, &[Attribute::Solid]);
        let result = snap_object(&profile, &block);
        assert!(result.hit);
        assert_eq!(result.pos_adjustment.x, 0.0);
        assert!((result.pos_adjustment.y - 0.005).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_graze_on_both_axes_is_empty() {
        let profile = mover(DVec2::new(-0.995, 0.995), DVec2::new(1.0, -1.0));
        let block = candidate(1, DVec2::ZERO, DVec2::ONE, &[Attribute::Solid]);
        assert!(snap_object(&profile, &block).is_empty());
    }

    #[test]
    fn test_equal_times_keep_both_axes() {
        let profile = mover(DVec2::new(-0.9, 0.9), DVec2::new(1.0, -1.0));
        let block = candidate(1, DVec2::ZERO, DVec2::ONE, &[Attribute::Solid]);
        let result = snap_object(&profile, &block);
        assert!(result.hit);
        assert!((result.pos_adjustment.x + 0.1).abs() < 1e-9, "{:?}", result.pos_adjustment);
        assert!((result.pos_adjustment.y - 0.1).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_stair_turns_sideways_hit_into_step() {
        let profile = mover(DVec2::new(-0.9, 0.6), DVec2::new(5.0, 0.0));
        let stair = candidate(1, DVec2::ZERO, DVec2::ONE, &[Attribute::Solid, Attribute::Stair]);
        let result = snap_object(&profile, &stair);
        assert!(result.hit);
        assert_eq!(result.pos_adjustment.x, 0.0);
        assert!(result.pos_adjustment.y > 0.0);
        assert!(result.pos_adjustment.y <= STAIR_STEP_LIMIT);
    }

    #[test]
    fn test_platform_from_below_is_ignored() {
        let profile = mover(DVec2::new(0.0, -0.6), DVec2::new(0.0, 8.0));
        let platform = candidate(1, DVec2::ZERO, DVec2::new(4.0, 0.4), &[Attribute::Solid, Attribute::Platform]);
        let result = snap_object(&profile, &platform);
        assert!(result.ignored);
        assert!(!result.hit);
    }

    #[test]
    fn test_platform_from_above_holds() {
        let profile = mover(DVec2::new(0.0, 0.6), DVec2::new(0.0, -8.0));
        let platform = candidate(1, DVec2::ZERO, DVec2::new(4.0, 0.4), &[Attribute::Solid, Attribute::Platform]);
        let result = snap_object(&profile, &platform);
        assert!(result.hit);
        assert!((result.pos_adjustment.y - 0.1).abs() < 1e-9, "{:?}", result.pos_adjustment);
    }

    #[test]
    fn test_ignored_candidate_short_circuits() {
        let mut profile = mover(DVec2::new(0.0, 0.6), DVec2::new(0.0, -8.0));
        profile.replace_ignored([id(1)].into_iter().collect());
        let platform = candidate(1, DVec2::ZERO, DVec2::new(4.0, 0.4), &[Attribute::Solid, Attribute::Platform]);
        assert!(snap_object(&profile, &platform).ignored);
    }

    #[test]
    fn test_hit_force_is_candidate_velocity() {
        let profile = mover(DVec2::new(0.0, 0.9), DVec2::new(0.0, -5.0));
        let mut lift = candidate(1, DVec2::ZERO, DVec2::new(4.0, 1.0), &[Attribute::Solid]);
        lift.vel = DVec2::new(2.0, 0.0);
        let result = snap_object(&profile, &lift);
        assert!(result.hit);
        assert_eq!(result.force, DVec2::new(2.0, 0.0));
    }

    #[test]
    fn test_overlap_profile() {
        let profile = Profile::new(DVec2::ZERO, DVec2::ONE)
            .with_overlap_options(ColliderOptions::new().with_space(SpaceType::Wall));
        let near = candidate(1, DVec2::new(0.8, 0.0), DVec2::ONE, &[]);
        let far = candidate(2, DVec2::new(3.0, 0.0), DVec2::ONE, &[]);
        assert!(overlap_profile(&profile, &near).hit);
        assert!(overlap_profile(&profile, &far).is_empty());

        let blind = Profile::new(DVec2::ZERO, DVec2::ONE);
        assert!(overlap_profile(&blind, &near).is_empty());
    }
}
