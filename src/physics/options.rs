//! Collider predicates deciding which entities a profile reacts to.

use std::collections::BTreeSet;

use crate::ecs::components::physics::{Attribute, Attributes, SpaceType};

use super::collider::Candidate;

/// Predicate over another entity's space type and attributes.
///
/// A candidate is accepted when its space type is listed or it carries any
/// of the listed attributes, and it carries none of the excluded attributes.
/// The default options accept nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColliderOptions {
    spaces: BTreeSet<SpaceType>,
    attributes: Attributes,
    excluded: Attributes,
}

impl ColliderOptions {
    /// Options that accept nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept every entity of this space type.
    pub fn with_space(mut self, space: SpaceType) -> Self {
        self.spaces.insert(space);
        self
    }

    /// Accept every entity carrying this attribute.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.add(attribute);
        self
    }

    /// Reject every entity carrying this attribute, even if otherwise accepted.
    pub fn without_attribute(mut self, attribute: Attribute) -> Self {
        self.excluded.add(attribute);
        self
    }

    /// True when nothing can ever be accepted.
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty() && self.attributes.is_empty()
    }

    /// Whether `candidate` passes this predicate.
    pub fn evaluate(&self, candidate: &Candidate) -> bool {
        self.accepts(candidate.space, &candidate.attributes)
    }

    /// Whether an entity of `space` with `attributes` passes. Exclusions win.
    pub fn accepts(&self, space: SpaceType, attributes: &Attributes) -> bool {
        if attributes.intersects(&self.excluded) {
            return false;
        }
        self.spaces.contains(&space) || attributes.intersects(&self.attributes)
    }
}
