//! Physics components for ECS entities.

use crate::ecs::grid::ObjectId;

/// How an entity takes part in the tick pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionType {
    /// Affected by gravity and forces, resolved against nearby entities.
    Dynamic,
    /// Moves under its own velocity (moving platforms) but is never resolved.
    Kinematic,
    /// Immovable.
    Static,
}

/// Coarse entity category, used by collider predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpaceType {
    Unknown,
    Player,
    Wall,
    Weapon,
    Bomb,
    Pellet,
    Bolt,
    Rocket,
    Star,
    GrapplingHook,
    Explosion,
    Pickup,
}

/// Boolean capability tags carried by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Attribute {
    Solid,
    Stair,
    Platform,
    Attached,
    Charging,
    Charged,
    Grounded,
    Dead,
    CanJump,
    CanDoubleJump,
}

impl Attribute {
    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

/// Set of [`Attribute`]s, stored as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes(u32);

impl Attributes {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from a list of attributes.
    pub fn from_slice(attributes: &[Attribute]) -> Self {
        let mut set = Self::empty();
        for attribute in attributes {
            set.add(*attribute);
        }
        set
    }

    /// Whether `attribute` is in the set.
    #[inline]
    pub fn has(&self, attribute: Attribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    /// True if the two sets share at least one attribute.
    #[inline]
    pub fn intersects(&self, other: &Attributes) -> bool {
        self.0 & other.0 != 0
    }

    /// Insert `attribute`.
    #[inline]
    pub fn add(&mut self, attribute: Attribute) {
        self.0 |= attribute.bit();
    }

    /// Remove `attribute`.
    #[inline]
    pub fn remove(&mut self, attribute: Attribute) {
        self.0 &= !attribute.bit();
    }

    /// True if no attribute is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Marks a projectile that embeds itself in the first surface it overlaps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sticky {
    /// The entity the projectile is embedded in, once stuck.
    pub stuck_to: Option<ObjectId>,
}

impl Sticky {
    /// Whether the projectile is embedded and no longer moves on its own.
    #[inline]
    pub fn is_stuck(&self) -> bool {
        self.stuck_to.is_some()
    }
}
