//! Entity store: by-id lookup, upsert and delete over a `hecs::World`.

use hecs::{Component, EntityRef, Ref, RefMut, World};
use tracing::debug;

use crate::ecs::components::physics::{Attribute, Attributes, MotionType, SpaceType};
use crate::error::{Result, TetherError};
use crate::physics::attachment::{Attachment, Connection};
use crate::physics::collider::Candidate;
use crate::physics::profile::Profile;

/// Stable handle of a simulated entity.
///
/// Generational, so the id of a deleted entity never resolves to a later one.
pub type ObjectId = hecs::Entity;

/// The authoritative entity store.
///
/// Every entity spawned through [`Grid::spawn`] carries a [`SpaceType`], a
/// [`MotionType`], a [`Profile`] and an [`Attributes`] set. Other components
/// (attachments, sticky markers, game data) are added with [`Grid::upsert`].
#[derive(Default)]
pub struct Grid {
    world: World,
}

impl Grid {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying ECS world, for queries.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the underlying ECS world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Spawn an entity with no attributes.
    pub fn spawn(&mut self, space: SpaceType, motion: MotionType, profile: Profile) -> ObjectId {
        self.spawn_with(space, motion, profile, Attributes::empty())
    }

    /// Spawn an entity with an initial attribute set.
    pub fn spawn_with(
        &mut self,
        space: SpaceType,
        motion: MotionType,
        profile: Profile,
        attributes: Attributes,
    ) -> ObjectId {
        let id = self.world.spawn((space, motion, profile, attributes));
        debug!(?id, ?space, ?motion, "spawned");
        id
    }

    /// Resolve `id` to a live entity.
    pub fn get(&self, id: ObjectId) -> Option<EntityRef<'_>> {
        self.world.entity(id).ok()
    }

    /// Whether `id` resolves to a live entity.
    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.world.contains(id)
    }

    /// Number of live entities.
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    /// True if the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Insert or replace one component on a live entity.
    pub fn upsert<C: Component>(&mut self, id: ObjectId, component: C) -> Result<()> {
        self.world
            .insert_one(id, component)
            .map_err(|_| TetherError::UnknownObject(id))
    }

    /// Remove an entity. Returns false if it was already gone.
    pub fn delete(&mut self, id: ObjectId) -> bool {
        let deleted = self.world.despawn(id).is_ok();
        if deleted {
            debug!(?id, "deleted");
        }
        deleted
    }

    /// Every entity that carries a profile, in id order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .world
            .query::<&Profile>()
            .iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Borrow the kinematic profile of `id`.
    pub fn profile(&self, id: ObjectId) -> Option<Ref<'_, Profile>> {
        self.world.get::<&Profile>(id).ok()
    }

    /// Mutably borrow the kinematic profile of `id`.
    pub fn profile_mut(&self, id: ObjectId) -> Option<RefMut<'_, Profile>> {
        self.world.get::<&mut Profile>(id).ok()
    }

    /// Space type of `id`.
    pub fn space(&self, id: ObjectId) -> Option<SpaceType> {
        self.world.get::<&SpaceType>(id).ok().map(|space| *space)
    }

    /// Motion type of `id`.
    pub fn motion(&self, id: ObjectId) -> Option<MotionType> {
        self.world.get::<&MotionType>(id).ok().map(|motion| *motion)
    }

    /// Attribute set of `id`; empty for unknown entities.
    pub fn attributes(&self, id: ObjectId) -> Attributes {
        self.world
            .get::<&Attributes>(id)
            .map(|attributes| *attributes)
            .unwrap_or_default()
    }

    /// Whether `id` carries `attribute`. False for unknown entities.
    pub fn has_attribute(&self, id: ObjectId, attribute: Attribute) -> bool {
        self.attributes(id).has(attribute)
    }

    /// Tag `id` with `attribute`. No-op for unknown entities.
    pub fn add_attribute(&mut self, id: ObjectId, attribute: Attribute) {
        if let Ok(mut attributes) = self.world.get::<&mut Attributes>(id) {
            attributes.add(attribute);
        }
    }

    /// Clear `attribute` from `id`. No-op for unknown entities.
    pub fn remove_attribute(&mut self, id: ObjectId, attribute: Attribute) {
        if let Ok(mut attributes) = self.world.get::<&mut Attributes>(id) {
            attributes.remove(attribute);
        }
    }

    /// Snapshot of `id` as seen by other entities' collision tests.
    pub fn candidate(&self, id: ObjectId) -> Option<Candidate> {
        let space = self.space(id)?;
        let profile = self.profile(id)?;
        Some(Candidate::from_profile(id, space, self.attributes(id), &profile))
    }

    /// Add or replace the connection from `child` to `parent` and mark the child attached.
    pub fn connect(&mut self, child: ObjectId, parent: ObjectId, connection: Connection) -> Result<()> {
        if child == parent {
            return Err(TetherError::SelfConnection(child));
        }
        if !self.contains(parent) {
            return Err(TetherError::UnknownObject(parent));
        }
        if !self.contains(child) {
            return Err(TetherError::UnknownObject(child));
        }

        let updated = match self.world.get::<&mut Attachment>(child) {
            Ok(mut attachment) => {
                attachment.add_connection(parent, connection);
                true
            }
            Err(_) => false,
        };
        if !updated {
            let mut attachment = Attachment::new();
            attachment.add_connection(parent, connection);
            self.upsert(child, attachment)?;
        }
        self.add_attribute(child, Attribute::Attached);
        debug!(?child, ?parent, ?connection, "connected");
        Ok(())
    }

    /// Remove the connection from `child` to `parent`. Returns false if there was none.
    pub fn disconnect(&mut self, child: ObjectId, parent: ObjectId) -> bool {
        let (removed, now_empty) = match self.world.get::<&mut Attachment>(child) {
            Ok(mut attachment) => {
                let removed = attachment.remove_connection(parent).is_some();
                (removed, attachment.is_empty())
            }
            Err(_) => return false,
        };
        if removed && now_empty {
            self.remove_attribute(child, Attribute::Attached);
        }
        removed
    }

    /// Current connections of `child`, keyed by parent.
    pub fn connections(&self, child: ObjectId) -> Vec<(ObjectId, Connection)> {
        self.world
            .get::<&Attachment>(child)
            .map(|attachment| attachment.connections().map(|(p, c)| (*p, *c)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    fn spawn_box(grid: &mut Grid, pos: DVec2) -> ObjectId {
        grid.spawn(SpaceType::Wall, MotionType::Static, Profile::new(pos, DVec2::ONE))
    }

    #[test]
    fn test_spawn_get_delete() {
        let mut grid = Grid::new();
        let id = spawn_box(&mut grid, DVec2::new(1.0, 2.0));

        assert!(grid.contains(id));
        assert!(grid.get(id).is_some());
        assert_eq!(grid.profile(id).unwrap().pos(), DVec2::new(1.0, 2.0));
        assert_eq!(grid.space(id), Some(SpaceType::Wall));
        assert_eq!(grid.motion(id), Some(MotionType::Static));

        assert!(grid.delete(id));
        assert!(!grid.delete(id));
        assert!(grid.get(id).is_none());
        assert!(grid.profile(id).is_none());
        assert!(grid.attributes(id).is_empty());
    }

    #[test]
    fn test_deleted_id_does_not_alias() {
        let mut grid = Grid::new();
        let old = spawn_box(&mut grid, DVec2::ZERO);
        grid.delete(old);
        let new = spawn_box(&mut grid, DVec2::ZERO);
        assert_ne!(old, new);
        assert!(!grid.contains(old));
    }

    #[test]
    fn test_ids_are_sorted_and_skip_deleted() {
        let mut grid = Grid::new();
        let a = spawn_box(&mut grid, DVec2::ZERO);
        let b = spawn_box(&mut grid, DVec2::X);
        let c = spawn_box(&mut grid, DVec2::Y);
        grid.delete(b);
        assert_eq!(grid.ids(), vec![a, c]);
    }

    #[test]
    fn test_upsert_unknown_is_error() {
        let mut grid = Grid::new();
        let id = spawn_box(&mut grid, DVec2::ZERO);
        grid.delete(id);
        assert_eq!(grid.upsert(id, MotionType::Dynamic), Err(TetherError::UnknownObject(id)));
    }

    #[test]
    fn test_upsert_replaces_component() {
        let mut grid = Grid::new();
        let id = spawn_box(&mut grid, DVec2::ZERO);
        grid.upsert(id, MotionType::Kinematic).unwrap();
        assert_eq!(grid.motion(id), Some(MotionType::Kinematic));
    }

    #[test]
    fn test_attributes() {
        let mut grid = Grid::new();
        let id = spawn_box(&mut grid, DVec2::ZERO);
        grid.add_attribute(id, Attribute::Solid);
        assert!(grid.has_attribute(id, Attribute::Solid));
        grid.remove_attribute(id, Attribute::Solid);
        assert!(!grid.has_attribute(id, Attribute::Solid));
    }

    #[test]
    fn test_candidate_snapshot() {
        let mut grid = Grid::new();
        let id = grid.spawn_with(
            SpaceType::Wall,
            MotionType::Kinematic,
            Profile::new(DVec2::new(0.0, -1.0), DVec2::new(4.0, 1.0)).with_vel(DVec2::X),
            Attributes::from_slice(&[Attribute::Solid, Attribute::Platform]),
        );
        let candidate = grid.candidate(id).unwrap();
        assert_eq!(candidate.id, id);
        assert_eq!(candidate.pos, DVec2::new(0.0, -1.0));
        assert_eq!(candidate.vel, DVec2::X);
        assert!(candidate.has_attribute(Attribute::Platform));
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut grid = Grid::new();
        let parent = spawn_box(&mut grid, DVec2::ZERO);
        let child = spawn_box(&mut grid, DVec2::new(0.0, 1.0));

        assert_eq!(
            grid.connect(child, child, Connection::new_offset(DVec2::ZERO)),
            Err(TetherError::SelfConnection(child))
        );

        grid.connect(child, parent, Connection::new_offset(DVec2::Y)).unwrap();
        assert!(grid.has_attribute(child, Attribute::Attached));
        assert_eq!(grid.connections(child).len(), 1);

        assert!(grid.disconnect(child, parent));
        assert!(!grid.disconnect(child, parent));
        assert!(!grid.has_attribute(child, Attribute::Attached));
        assert!(grid.connections(child).is_empty());
    }

    #[test]
    fn test_connect_to_deleted_parent_fails() {
        let mut grid = Grid::new();
        let parent = spawn_box(&mut grid, DVec2::ZERO);
        let child = spawn_box(&mut grid, DVec2::ZERO);
        grid.delete(parent);
        assert_eq!(
            grid.connect(child, parent, Connection::new_attract(4.0)),
            Err(TetherError::UnknownObject(parent))
        );
    }
}
