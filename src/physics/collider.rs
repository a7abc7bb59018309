//! Collider geometry shared by the broad and narrow phases.

use glam::DVec2;

use crate::ecs::components::physics::{Attribute, Attributes, SpaceType};
use crate::ecs::grid::ObjectId;

use super::profile::Profile;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    /// Box centred on `center` with full size `dim`.
    #[inline]
    pub fn from_center(center: DVec2, dim: DVec2) -> Self {
        let half = dim * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Test whether two boxes overlap with positive area. Touching edges do not count.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Whether `point` lies inside or on the boundary.
    #[inline]
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Centre point.
    #[inline]
    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }
}

/// Read-only kinematic view of anything that can be collided against.
pub trait Body {
    fn pos(&self) -> DVec2;
    fn dim(&self) -> DVec2;
    fn vel(&self) -> DVec2;
    fn ext_vel(&self) -> DVec2;

    /// Self-driven plus externally imposed velocity.
    fn total_vel(&self) -> DVec2 {
        self.vel() + self.ext_vel()
    }

    fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos(), self.dim())
    }
}

/// Snapshot of a nearby entity, taken once per tick by the broad phase.
///
/// Holding copies instead of references lets the resolving entity mutate
/// its own profile while candidates are drained.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: ObjectId,
    pub space: SpaceType,
    pub attributes: Attributes,
    pub pos: DVec2,
    pub dim: DVec2,
    pub vel: DVec2,
    pub ext_vel: DVec2,
}

impl Candidate {
    /// Copy the collision-relevant state out of `profile`.
    pub fn from_profile(
        id: ObjectId,
        space: SpaceType,
        attributes: Attributes,
        profile: &Profile,
    ) -> Self {
        Self {
            id,
            space,
            attributes,
            pos: profile.pos(),
            dim: profile.dim(),
            vel: profile.vel(),
            ext_vel: profile.ext_vel(),
        }
    }

    /// Whether the candidate carries `attribute`.
    #[inline]
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.has(attribute)
    }
}

impl Body for Candidate {
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
