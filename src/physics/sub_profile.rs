//! Shape-local views that follow their owning profile.

use glam::DVec2;

use crate::math::normalize_angle;

use super::options::ColliderOptions;
use super::profile::{Profile, ProfileData};

/// Key of a sub-profile inside its owner.
pub type ProfileKey = u8;

/// A secondary shape rigidly attached to a [`Profile`].
///
/// Position follows the owner plus `offset`; facing follows the owner rotated
/// by the angle of `dir_offset`. Velocity, acceleration, jerk and external
/// velocity are copied through unchanged. Extent is the sub-profile's own.
#[derive(Debug, Clone)]
pub struct SubProfile {
    profile: Profile,
    offset: DVec2,
    dir_offset: DVec2,
}

impl SubProfile {
    /// Wrap `profile` with no offset and no rotation.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            offset: DVec2::ZERO,
            dir_offset: DVec2::X,
        }
    }

    /// Set the position offset from the owner.
    pub fn with_offset(mut self, offset: DVec2) -> Self {
        self.offset = offset;
        self
    }

    /// Set the facing rotation relative to the owner, as a direction.
    pub fn with_dir_offset(mut self, dir_offset: DVec2) -> Self {
        self.dir_offset = dir_offset;
        self
    }

    /// The world-space state of this shape.
    #[inline]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Position offset from the owner.
    #[inline]
    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    /// Takes effect on the next owner position write.
    pub fn set_offset(&mut self, offset: DVec2) {
        self.offset = offset;
    }

    /// Facing rotation relative to the owner.
    #[inline]
    pub fn dir_offset(&self) -> DVec2 {
        self.dir_offset
    }

    /// Takes effect on the next owner facing write.
    pub fn set_dir_offset(&mut self, dir_offset: DVec2) {
        self.dir_offset = dir_offset;
    }

    /// Position and extent, for peers that have never seen the owner.
    pub fn init_data(&self) -> ProfileData {
        ProfileData {
            pos: Some(self.profile.pos()),
            dim: Some(self.profile.dim()),
            ..Default::default()
        }
    }

    /// World position and facing.
    pub fn data(&self) -> ProfileData {
        ProfileData {
            pos: Some(self.profile.pos()),
            dir: Some(self.profile.dir()),
            ..Default::default()
        }
    }

    /// Apply world position and facing from a snapshot taken by [`SubProfile::data`].
    ///
    /// Offsets are not reapplied; the values are already in world space.
    pub fn set_data(&mut self, data: &ProfileData) {
        if let Some(pos) = data.pos {
            self.profile.set_pos(pos);
        }
        if let Some(dir) = data.dir {
            self.profile.set_dir(dir);
        }
    }

    // Owner-driven writes. Values are in owner space.

    /// Follow the owner to `owner_pos`.
    pub(crate) fn set_pos(&mut self, owner_pos: DVec2) {
        self.profile.set_pos(owner_pos + self.offset);
    }

    /// Follow the owner facing `owner_dir`.
    pub(crate) fn set_dir(&mut self, owner_dir: DVec2) {
        let angle = normalize_angle(owner_dir.to_angle() + self.dir_offset.to_angle());
        self.profile.set_dir(DVec2::from_angle(angle));
    }

    /// Mirror the owner velocity.
    pub(crate) fn set_vel(&mut self, vel: DVec2) {
        self.profile.set_vel(vel);
    }

    /// Mirror the owner acceleration.
    pub(crate) fn set_acc(&mut self, acc: DVec2) {
        self.profile.set_acc(acc);
    }

    /// Mirror the owner jerk.
    pub(crate) fn set_jerk(&mut self, jerk: DVec2) {
        self.profile.set_jerk(jerk);
    }

    /// Mirror the owner external velocity.
    pub(crate) fn set_ext_vel(&mut self, ext_vel: DVec2) {
        self.profile.set_ext_vel(ext_vel);
    }

    /// Mirror the owner overlap predicate.
    pub(crate) fn set_overlap_options(&mut self, options: ColliderOptions) {
        self.profile.set_overlap_options(options);
    }

    /// Mirror the owner snap predicate.
    pub(crate) fn set_snap_options(&mut self, options: ColliderOptions) {
        self.profile.set_snap_options(options);
    }

    /// Bring the kinematic state in line with `owner`.
    pub(crate) fn sync(&mut self, owner: &Profile) {
        self.set_pos(owner.pos());
        self.set_dir(owner.dir());
        self.set_vel(owner.vel());
        self.set_acc(owner.acc());
        self.set_jerk(owner.jerk());
        self.set_ext_vel(owner.ext_vel());
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    fn owner() -> Profile {
        Profile::new(DVec2::new(1.0, 1.0), DVec2::ONE)
    }

    #[test]
    fn test_sync_on_add() {
        let mut owner = owner();
        owner.set_vel(DVec2::new(2.0, 0.0));
        owner.add_sub_profile(
            0,
            SubProfile::new(Profile::new(DVec2::ZERO, DVec2::splat(0.3))).with_offset(DVec2::new(0.0, 0.4)),
        );

        let sp = owner.sub_profile(0).unwrap();
        assert_eq!(sp.profile().pos(), DVec2::new(1.0, 1.4));
        assert_eq!(sp.profile().vel(), DVec2::new(2.0, 0.0));
        assert_eq!(sp.profile().dim(), DVec2::splat(0.3));
    }

    #[test]
    fn test_dir_offset_rotates_facing() {
        let mut owner = owner();
        owner.add_sub_profile(
            0,
            SubProfile::new(Profile::new(DVec2::ZERO, DVec2::ONE)).with_dir_offset(DVec2::Y),
        );
        // Facing +X plus a quarter turn.
        let dir = owner.sub_profile(0).unwrap().profile().dir();
        assert!(dir.abs_diff_eq(DVec2::Y, 1e-9));

        owner.set_dir(DVec2::Y);
        let dir = owner.sub_profile(0).unwrap().profile().dir();
        let expected = DVec2::from_angle(2.0 * FRAC_PI_2);
        assert!(dir.abs_diff_eq(expected, 1e-9), "dir = {dir}");
    }

    #[test]
    fn test_ext_vel_follows_owner() {
        let mut owner = owner();
        owner.add_sub_profile(3, SubProfile::new(Profile::new(DVec2::ZERO, DVec2::ONE)));
        owner.set_ext_vel(DVec2::new(-1.5, 0.0));
        assert_eq!(owner.sub_profile(3).unwrap().profile().ext_vel(), DVec2::new(-1.5, 0.0));
    }

    #[test]
    fn test_data_reports_position_and_facing() {
        let mut owner = owner();
        owner.add_sub_profile(
            0,
            SubProfile::new(Profile::new(DVec2::ZERO, DVec2::new(0.2, 0.6))).with_offset(DVec2::X),
        );
        let sp = owner.sub_profile(0).unwrap();

        let init = sp.init_data();
        assert_eq!(init.pos, Some(DVec2::new(2.0, 1.0)));
        assert_eq!(init.dim, Some(DVec2::new(0.2, 0.6)));
        assert_eq!(init.vel, None);

        let data = sp.data();
        assert_eq!(data.pos, Some(DVec2::new(2.0, 1.0)));
        assert!(data.dir.is_some());
        assert_eq!(data.dim, None);
    }

    #[test]
    fn test_set_data_accepts_own_snapshot() {
        let mut source = SubProfile::new(Profile::new(DVec2::ZERO, DVec2::ONE))
            .with_offset(DVec2::X)
            .with_dir_offset(DVec2::Y);
        source.sync(&owner());

        let mut replica = SubProfile::new(Profile::new(DVec2::ZERO, DVec2::ONE))
            .with_offset(DVec2::X)
            .with_dir_offset(DVec2::Y);
        replica.set_data(&source.data());

        assert_eq!(replica.profile().pos(), DVec2::new(2.0, 1.0));
        assert!(replica.profile().dir().abs_diff_eq(DVec2::Y, 1e-9));
    }
}
