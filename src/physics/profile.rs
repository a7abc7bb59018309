//! Kinematic profile: the per-entity motion state every other stage reads and writes.

use std::collections::{BTreeMap, HashSet};

use glam::DVec2;

use crate::ecs::components::physics::{Attributes, SpaceType};
use crate::ecs::grid::ObjectId;
use crate::math::{fsign, fsign_pos, Vec2Ext};

use super::collider::{Body, Candidate};
use super::flag::DirtyFlag;
use super::options::ColliderOptions;
use super::sub_profile::{ProfileKey, SubProfile};

/// Sparse kinematic snapshot exchanged with the network layer.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileData {
    pub pos: Option<DVec2>,
    pub vel: Option<DVec2>,
    pub acc: Option<DVec2>,
    pub jerk: Option<DVec2>,
    pub dir: Option<DVec2>,
    pub dim: Option<DVec2>,
}

impl ProfileData {
    /// True if no field is present.
    pub fn is_empty(&self) -> bool {
        self.pos.is_none()
            && self.vel.is_none()
            && self.acc.is_none()
            && self.jerk.is_none()
            && self.dir.is_none()
            && self.dim.is_none()
    }
}

/// Position, motion and extent of one entity, plus its collision memory.
///
/// All kinematic writes go through the setters: a write within
/// [`crate::math::APPROX_EPSILON`] of the current value is dropped, a real
/// change marks the field dirty and is pushed down to every sub-profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pos: DVec2,
    vel: DVec2,
    acc: DVec2,
    jerk: DVec2,
    dir: DVec2,
    dim: DVec2,
    pos_flag: DirtyFlag,
    vel_flag: DirtyFlag,
    acc_flag: DirtyFlag,
    jerk_flag: DirtyFlag,
    dir_flag: DirtyFlag,
    dim_flag: DirtyFlag,

    ext_vel: DVec2,
    forces: Vec<DVec2>,

    sub_profiles: BTreeMap<ProfileKey, SubProfile>,
    ignored: HashSet<ObjectId>,
    overlap_options: ColliderOptions,
    snap_options: ColliderOptions,
}

impl Profile {
    /// Create a resting profile centred on `pos` with full size `dim`, facing +X.
    pub fn new(pos: DVec2, dim: DVec2) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
            acc: DVec2::ZERO,
            jerk: DVec2::ZERO,
            dir: DVec2::X,
            dim,
            pos_flag: DirtyFlag::new(),
            vel_flag: DirtyFlag::new(),
            acc_flag: DirtyFlag::new(),
            jerk_flag: DirtyFlag::new(),
            dir_flag: DirtyFlag::new(),
            dim_flag: DirtyFlag::new(),
            ext_vel: DVec2::ZERO,
            forces: Vec::new(),
            sub_profiles: BTreeMap::new(),
            ignored: HashSet::new(),
            overlap_options: ColliderOptions::new(),
            snap_options: ColliderOptions::new(),
        }
    }

    /// Set the initial facing.
    pub fn with_dir(mut self, dir: DVec2) -> Self {
        self.dir = dir;
        self
    }

    /// Set the initial velocity.
    pub fn with_vel(mut self, vel: DVec2) -> Self {
        self.vel = vel;
        self
    }

    /// Set which candidates [`crate::physics::snap`] resolves against.
    pub fn with_snap_options(mut self, options: ColliderOptions) -> Self {
        self.set_snap_options(options);
        self
    }

    /// Set which candidates overlap queries report.
    pub fn with_overlap_options(mut self, options: ColliderOptions) -> Self {
        self.set_overlap_options(options);
        self
    }

    // -----------------------------------------------------------------------
    // Kinematic state
    // -----------------------------------------------------------------------

    /// Centre position.
    #[inline]
    pub fn pos(&self) -> DVec2 {
        self.pos
    }

    /// Move to `pos`, pushing the change to sub-profiles. Ignored within epsilon.
    pub fn set_pos(&mut self, pos: DVec2) {
        if self.pos.approx_eq(pos) {
            return;
        }
        self.pos = pos;
        for sp in self.sub_profiles.values_mut() {
            sp.set_pos(pos);
        }
        self.pos_flag.mark();
    }

    /// Self-driven velocity.
    #[inline]
    pub fn vel(&self) -> DVec2 {
        self.vel
    }

    /// Set velocity, pushing the change to sub-profiles. Ignored within epsilon.
    pub fn set_vel(&mut self, vel: DVec2) {
        if self.vel.approx_eq(vel) {
            return;
        }
        self.vel = vel;
        for sp in self.sub_profiles.values_mut() {
            sp.set_vel(vel);
        }
        self.vel_flag.mark();
    }

    /// Acceleration.
    #[inline]
    pub fn acc(&self) -> DVec2 {
        self.acc
    }

    /// Set acceleration, pushing the change to sub-profiles. Ignored within epsilon.
    pub fn set_acc(&mut self, acc: DVec2) {
        if self.acc.approx_eq(acc) {
            return;
        }
        self.acc = acc;
        for sp in self.sub_profiles.values_mut() {
            sp.set_acc(acc);
        }
        self.acc_flag.mark();
    }

    /// Jerk.
    #[inline]
    pub fn jerk(&self) -> DVec2 {
        self.jerk
    }

    /// Set jerk, pushing the change to sub-profiles. Ignored within epsilon.
    pub fn set_jerk(&mut self, jerk: DVec2) {
        if self.jerk.approx_eq(jerk) {
            return;
        }
        self.jerk = jerk;
        for sp in self.sub_profiles.values_mut() {
            sp.set_jerk(jerk);
        }
        self.jerk_flag.mark();
    }

    /// Facing, as a unit vector.
    #[inline]
    pub fn dir(&self) -> DVec2 {
        self.dir
    }

    /// Set facing, rotating every sub-profile with it. Ignored within epsilon.
    pub fn set_dir(&mut self, dir: DVec2) {
        if self.dir.approx_eq(dir) {
            return;
        }
        self.dir = dir;
        for sp in self.sub_profiles.values_mut() {
            sp.set_dir(dir);
        }
        self.dir_flag.mark();
    }

    /// Width and height.
    #[inline]
    pub fn dim(&self) -> DVec2 {
        self.dim
    }

    /// Resize. Extent is per shape, so it is not pushed to sub-profiles.
    pub fn set_dim(&mut self, dim: DVec2) {
        if self.dim.approx_eq(dim) {
            return;
        }
        self.dim = dim;
        self.dim_flag.mark();
    }

    /// Velocity imposed by whatever the entity rests on or is carried by.
    #[inline]
    pub fn ext_vel(&self) -> DVec2 {
        self.ext_vel
    }

    /// Set external velocity. Mirrored to sub-profiles but never marked dirty.
    pub fn set_ext_vel(&mut self, ext_vel: DVec2) {
        if self.ext_vel.approx_eq(ext_vel) {
            return;
        }
        self.ext_vel = ext_vel;
        for sp in self.sub_profiles.values_mut() {
            sp.set_ext_vel(ext_vel);
        }
    }

    /// Self-driven plus external velocity.
    #[inline]
    pub fn total_vel(&self) -> DVec2 {
        self.vel + self.ext_vel
    }

    // -----------------------------------------------------------------------
    // Forces
    // -----------------------------------------------------------------------

    /// Queue a velocity change for the next [`Profile::apply_forces`].
    pub fn add_force(&mut self, force: DVec2) {
        if force.is_zero() {
            return;
        }
        self.forces.push(force);
    }

    /// Whether any force is queued.
    pub fn has_forces(&self) -> bool {
        !self.forces.is_empty()
    }

    /// Drain the force queue into velocity and return the summed force.
    pub fn apply_forces(&mut self) -> DVec2 {
        if self.forces.is_empty() {
            return DVec2::ZERO;
        }
        let total: DVec2 = self.forces.drain(..).sum();
        self.set_vel(self.vel + total);
        total
    }

    /// Zero velocity, acceleration and jerk.
    pub fn stop(&mut self) {
        self.set_vel(DVec2::ZERO);
        self.set_acc(DVec2::ZERO);
        self.set_jerk(DVec2::ZERO);
    }

    // -----------------------------------------------------------------------
    // Network sync
    // -----------------------------------------------------------------------

    /// Full-state snapshot, consuming the dirty flags it reports.
    ///
    /// Position, acceleration and jerk are only reported alongside a
    /// velocity change; until then their flags stay armed.
    pub fn data(&mut self) -> ProfileData {
        let mut data = ProfileData::default();

        if self.dir_flag.pop() {
            data.dir = Some(self.dir);
        }
        if self.dim_flag.pop() {
            data.dim = Some(self.dim);
        }

        if !self.vel_flag.has() {
            return data;
        }

        if self.pos_flag.pop() {
            data.pos = Some(self.pos);
        }
        if self.vel_flag.pop() {
            data.vel = Some(self.vel);
        }
        if self.acc_flag.pop() {
            data.acc = Some(self.acc);
        }
        if self.jerk_flag.pop() {
            data.jerk = Some(self.jerk);
        }
        data
    }

    /// One-shot incremental update: the extent, once per resize.
    pub fn updates(&mut self) -> ProfileData {
        let mut data = ProfileData::default();
        if self.dim_flag.take_once() {
            data.dim = Some(self.dim);
        }
        data
    }

    /// Complete state for a peer that has never seen this entity.
    pub fn init_data(&self) -> ProfileData {
        ProfileData {
            pos: Some(self.pos),
            vel: Some(self.vel),
            acc: Some(self.acc),
            jerk: Some(self.jerk),
            dir: Some(self.dir),
            dim: Some(self.dim),
        }
    }

    /// Apply every present field through its setter.
    pub fn set_data(&mut self, data: &ProfileData) {
        if let Some(pos) = data.pos {
            self.set_pos(pos);
        }
        if let Some(vel) = data.vel {
            self.set_vel(vel);
        }
        if let Some(acc) = data.acc {
            self.set_acc(acc);
        }
        if let Some(jerk) = data.jerk {
            self.set_jerk(jerk);
        }
        if let Some(dir) = data.dir {
            self.set_dir(dir);
        }
        if let Some(dim) = data.dim {
            self.set_dim(dim);
        }
    }

    // -----------------------------------------------------------------------
    // Sub-profiles
    // -----------------------------------------------------------------------

    /// Attach a shape-local view. It is synchronised to the current state immediately.
    pub fn add_sub_profile(&mut self, key: ProfileKey, mut sub_profile: SubProfile) {
        sub_profile.sync(self);
        self.sub_profiles.insert(key, sub_profile);
    }

    /// The sub-profile stored under `key`.
    pub fn sub_profile(&self, key: ProfileKey) -> Option<&SubProfile> {
        self.sub_profiles.get(&key)
    }

    /// Every sub-profile, in key order.
    pub fn sub_profiles(&self) -> impl Iterator<Item = (&ProfileKey, &SubProfile)> {
        self.sub_profiles.iter()
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Vector from `other` to self.
    pub fn offset(&self, other: &impl Body) -> DVec2 {
        self.pos - other.pos()
    }

    /// Squared centre distance to `other`.
    pub fn dist_sqr(&self, other: &impl Body) -> f64 {
        let x = self.dist_x(other);
        let y = self.dist_y(other);
        x * x + y * y
    }

    /// Centre distance to `other`.
    pub fn dist(&self, other: &impl Body) -> f64 {
        self.dist_sqr(other).sqrt()
    }

    /// Horizontal centre distance to `other`.
    pub fn dist_x(&self, other: &impl Body) -> f64 {
        (other.pos().x - self.pos.x).abs()
    }

    /// Vertical centre distance to `other`.
    pub fn dist_y(&self, other: &impl Body) -> f64 {
        (other.pos().y - self.pos.y).abs()
    }

    /// Primary position correction on both axes; zero on an axis without overlap.
    pub fn pos_adjustment(&self, other: &impl Body) -> DVec2 {
        let (x, _) = self.pos_adjustment_x(other);
        let (y, _) = self.pos_adjustment_y(other);
        DVec2::new(x, y)
    }

    /// `(primary, reverse)` X correction against `other`.
    pub fn pos_adjustment_x(&self, other: &impl Body) -> (f64, f64) {
        axis_adjustment(
            AxisState::new(self.pos.x, self.vel.x, self.dim.x),
            AxisState::new(other.pos().x, other.vel().x, other.dim().x),
        )
    }

    /// `(primary, reverse)` Y correction against `other`.
    pub fn pos_adjustment_y(&self, other: &impl Body) -> (f64, f64) {
        axis_adjustment(
            AxisState::new(self.pos.y, self.vel.y, self.dim.y),
            AxisState::new(other.pos().y, other.vel().y, other.dim().y),
        )
    }

    /// Whether the point lies inside this profile or any of its sub-profiles.
    pub fn contains(&self, point: DVec2) -> bool {
        self.aabb().contains(point)
            || self
                .sub_profiles
                .values()
                .any(|sp| sp.profile().contains(point))
    }

    // -----------------------------------------------------------------------
    // Collision configuration
    // -----------------------------------------------------------------------

    /// Predicate used by overlap queries.
    pub fn overlap_options(&self) -> &ColliderOptions {
        &self.overlap_options
    }

    /// Replace the overlap predicate here and on every sub-profile.
    pub fn set_overlap_options(&mut self, options: ColliderOptions) {
        for sp in self.sub_profiles.values_mut() {
            sp.set_overlap_options(options.clone());
        }
        self.overlap_options = options;
    }

    /// Predicate used by snap resolution.
    pub fn snap_options(&self) -> &ColliderOptions {
        &self.snap_options
    }

    /// Replace the snap predicate here and on every sub-profile.
    pub fn set_snap_options(&mut self, options: ColliderOptions) {
        for sp in self.sub_profiles.values_mut() {
            sp.set_snap_options(options.clone());
        }
        self.snap_options = options;
    }

    /// Candidates passed through in the last [`crate::physics::snap`] pass.
    pub fn ignored(&self) -> &HashSet<ObjectId> {
        &self.ignored
    }

    /// Whether `id` was passed through in the last resolution pass.
    pub fn is_ignored(&self, id: ObjectId) -> bool {
        self.ignored.contains(&id)
    }

    /// Swap in the ignored set of a finished resolution pass.
    pub(crate) fn replace_ignored(&mut self, ignored: HashSet<ObjectId>) {
        self.ignored = ignored;
    }

    /// Snapshot of this profile as a collision candidate for others.
    pub fn as_candidate(
        &self,
        id: ObjectId,
        space: SpaceType,
        attributes: Attributes,
    ) -> Candidate {
        Candidate::from_profile(id, space, attributes, self)
    }
}

impl Body for Profile {
    fn pos(&self) -> DVec2 {
        self.pos
    }
    fn dim(&self) -> DVec2 {
        self.dim
    }
    fn vel(&self) -> DVec2 {
        self.vel
    }
    fn ext_vel(&self) -> DVec2 {
        self.ext_vel
    }
}

/// One axis of one body, as needed by [`axis_adjustment`].
#[derive(Clone, Copy)]
struct AxisState {
    pos: f64,
    vel: f64,
    extent: f64,
}

impl AxisState {
    fn new(pos: f64, vel: f64, extent: f64) -> Self {
        Self { pos, vel, extent }
    }
}

/// Overlap correction along one axis.
///
/// When the relative position and relative velocity point the same way the
/// mover has already passed the other body's centre, so the raw overlap is
/// measured from the wrong side and is replaced by `reverse - overlap`.
fn axis_adjustment(own: AxisState, other: AxisState) -> (f64, f64) {
    let half_sum = own.extent / 2.0 + other.extent / 2.0;
    let mut overlap = half_sum - (other.pos - own.pos).abs();
    if overlap <= 0.0 {
        return (0.0, 0.0);
    }

    let relative_pos = fsign(own.pos - other.pos);
    let relative_vel = fsign(own.vel - other.vel);
    let reverse_dist = own.extent.max(other.extent) + half_sum;
    if relative_pos == relative_vel {
        overlap = reverse_dist - overlap;
    }
    let reverse_overlap = reverse_dist - overlap;

    (
        fsign_pos(-relative_vel) * overlap,
        fsign_pos(relative_vel) * reverse_overlap,
    )
}
