//! Outcomes of narrow-phase tests.

use std::collections::BTreeMap;

use glam::DVec2;

use crate::ecs::grid::ObjectId;

/// Outcome of testing one profile against one candidate.
///
/// `hit` and `ignored` are never both set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollideResult {
    pub hit: bool,
    pub ignored: bool,
    pub pos_adjustment: DVec2,
    pub force: DVec2,
}

impl CollideResult {
    /// Nothing happened.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The candidate was deliberately passed through.
    pub fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    /// A collision correcting by `pos_adjustment`, pushed by `force`.
    pub fn hit(pos_adjustment: DVec2, force: DVec2) -> Self {
        Self {
            hit: true,
            ignored: false,
            pos_adjustment,
            force,
        }
    }

    /// Neither hit nor ignored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.hit && !self.ignored
    }
}

/// Aggregate outcome of resolving one profile against every nearby candidate in a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResults {
    /// Sum of the adjustments of every hit, in resolution order.
    pub pos_adjustment: DVec2,
    /// True if any candidate was hit.
    pub snap: bool,
    /// Sum of the push forces of every hit.
    pub force: DVec2,
    /// Individual outcome per candidate.
    pub results: BTreeMap<ObjectId, CollideResult>,
}

impl SnapResults {
    /// An empty aggregate with no hits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result` against `id`, folding hits into the aggregate.
    pub fn add(&mut self, id: ObjectId, result: CollideResult) {
        if result.hit {
            self.snap = true;
            self.pos_adjustment += result.pos_adjustment;
            self.force += result.force;
        }
        self.results.insert(id, result);
    }

    /// Outcome recorded against `id`, if it was tested.
    pub fn get(&self, id: ObjectId) -> Option<&CollideResult> {
        self.results.get(&id)
    }

    /// Ids of every candidate that was hit.
    pub fn hits(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.results
            .iter()
            .filter(|(_, result)| result.hit)
            .map(|(id, _)| *id)
    }
}
