//! Attachments: force and position coupling from a child entity to its parents.
//!
//! Runs around the collision pass. [`pre_update`] adds spring forces before
//! integration, [`post_update`] rigidly places offset-connected children
//! after resolution. A parent that no longer exists drops its connection;
//! the child loses [`Attribute::Attached`] with its last connection.

use std::collections::BTreeMap;

use glam::DVec2;
use tracing::debug;

use crate::ecs::components::physics::Attribute;
use crate::ecs::grid::{Grid, ObjectId};

/// Pull strength used for grappling hooks.
pub const GRAPPLE_ATTRACT: f64 = 4.0;

/// Longest rest distance a grappling hook settles at.
pub const GRAPPLE_MAX_DISTANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionKind {
    /// Child sits at `parent + offset` and moves with the parent.
    Offset,
    /// Child is pulled towards `parent + offset` until `distance` away from it.
    Attract { factor: f64, distance: f64 },
}

/// Directed edge from a child to one parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    kind: ConnectionKind,
    offset: DVec2,
}

impl Connection {
    /// Rigidly follow the parent at `offset`.
    pub fn new_offset(offset: DVec2) -> Self {
        Self {
            kind: ConnectionKind::Offset,
            offset,
        }
    }

    /// Spring-like pull of strength `factor`, resting on the target point.
    pub fn new_attract(factor: f64) -> Self {
        Self {
            kind: ConnectionKind::Attract {
                factor,
                distance: 0.0,
            },
            offset: DVec2::ZERO,
        }
    }

    /// Grappling hook pull for a rope of `length`, resting at a quarter of
    /// it, capped at [`GRAPPLE_MAX_DISTANCE`].
    pub fn grapple(length: f64) -> Self {
        let mut connection = Self::new_attract(GRAPPLE_ATTRACT);
        connection.set_distance((length / 4.0).min(GRAPPLE_MAX_DISTANCE));
        connection
    }

    /// Offset or attract, with its parameters.
    #[inline]
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Target point relative to the parent.
    #[inline]
    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    /// Move the target point relative to the parent.
    pub fn set_offset(&mut self, offset: DVec2) {
        self.offset = offset;
    }

    /// Rest distance of an attract connection. No effect on offset connections.
    pub fn set_distance(&mut self, rest: f64) {
        if let ConnectionKind::Attract { distance, .. } = &mut self.kind {
            *distance = rest;
        }
    }

    /// Pull on a child at `child_pos` towards `target`.
    ///
    /// Scales with the excess over the rest distance; inside a window as
    /// wide as the pull strength it falls off quadratically.
    fn attract_force(factor: f64, distance: f64, target: DVec2, child_pos: DVec2) -> DVec2 {
        let delta = target - child_pos;
        let excess = delta.length() - distance;
        let mut force = delta.normalize_or_zero() * factor;

        let smoothing = factor;
        if excess < smoothing {
            let scale = excess / smoothing;
            force *= scale * scale;
        }
        force
    }
}

/// Connections owned by a child entity, keyed by parent id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    connections: BTreeMap<ObjectId, Connection>,
}

impl Attachment {
    /// An attachment with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the connection to `parent`.
    pub fn add_connection(&mut self, parent: ObjectId, connection: Connection) {
        self.connections.insert(parent, connection);
    }

    /// Remove the connection to `parent`, returning it.
    pub fn remove_connection(&mut self, parent: ObjectId) -> Option<Connection> {
        self.connections.remove(&parent)
    }

    /// The connection to `parent`.
    pub fn connection(&self, parent: ObjectId) -> Option<&Connection> {
        self.connections.get(&parent)
    }

    /// Every connection, in parent id order.
    pub fn connections(&self) -> impl Iterator<Item = (&ObjectId, &Connection)> {
        self.connections.iter()
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if no connection remains.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Drop connections to vanished parents and return what is left, with each
/// parent's current position and velocity.
///
/// Returns `None` when the child has no attachment, or its last connection
/// was just dropped (in which case `Attached` is cleared).
fn live_connections(grid: &mut Grid, child: ObjectId) -> Option<Vec<(Connection, DVec2, DVec2)>> {
    let connections = grid.connections(child);
    if connections.is_empty() {
        return None;
    }

    let mut live = Vec::with_capacity(connections.len());
    for (parent, connection) in connections {
        let state = grid.profile(parent).map(|p| (p.pos(), p.vel()));
        match state {
            Some((pos, vel)) => live.push((connection, pos, vel)),
            None => {
                grid.disconnect(child, parent);
                debug!(?child, ?parent, "parent gone, connection dropped");
            }
        }
    }

    if live.is_empty() {
        None
    } else {
        Some(live)
    }
}

/// Add attract forces to `child` and reaffirm its attached marker.
pub fn pre_update(grid: &mut Grid, child: ObjectId) {
    if !grid.contains(child) {
        return;
    }
    let Some(live) = live_connections(grid, child) else {
        return;
    };

    if let Some(mut profile) = grid.profile_mut(child) {
        for (connection, parent_pos, _) in &live {
            if let ConnectionKind::Attract { factor, distance } = connection.kind {
                let target = *parent_pos + connection.offset;
                let force = Connection::attract_force(factor, distance, target, profile.pos());
                profile.add_force(force);
            }
        }
    }
    grid.add_attribute(child, Attribute::Attached);
}

/// Place offset-connected `child` on its parent and reaffirm its attached marker.
pub fn post_update(grid: &mut Grid, child: ObjectId) {
    if !grid.contains(child) {
        return;
    }
    let Some(live) = live_connections(grid, child) else {
        return;
    };

    if let Some(mut profile) = grid.profile_mut(child) {
        for (connection, parent_pos, parent_vel) in &live {
            if connection.kind == ConnectionKind::Offset {
                profile.set_pos(*parent_pos + connection.offset);
                profile.set_vel(*parent_vel);
            }
        }
    }
    grid.add_attribute(child, Attribute::Attached);
}

fn attached_ids(grid: &Grid) -> Vec<ObjectId> {
    let mut ids: Vec<ObjectId> = grid
        .world()
        .query::<&Attachment>()
        .iter()
        .map(|(id, _)| id)
        .collect();
    ids.sort();
    ids
}

/// [`pre_update`] for every entity with an attachment, in id order.
pub fn pre_update_all(grid: &mut Grid) {
    for child in attached_ids(grid) {
        pre_update(grid, child);
    }
}

/// [`post_update`] for every entity with an attachment, in id order.
pub fn post_update_all(grid: &mut Grid) {
    for child in attached_ids(grid) {
        post_update(grid, child);
    }
}
