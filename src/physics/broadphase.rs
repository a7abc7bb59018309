//! Broadphase: spatial hash grid producing ordered candidate lists per mover.

use std::collections::HashMap;

use glam::DVec2;

use crate::ecs::components::physics::{Attributes, MotionType, SpaceType};
use crate::ecs::grid::{Grid, ObjectId};

use super::collider::{Aabb, Body, Candidate};
use super::profile::Profile;

type CellKey = (i32, i32);

/// Uniform 2D spatial hash over entity boxes.
///
/// The cell size adapts each query to twice the largest entity extent, never
/// below the configured minimum.
pub struct SpatialHashGrid {
    min_cell_size: f64,
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl SpatialHashGrid {
    /// Create an empty hash whose cells never shrink below `min_cell_size`.
    pub fn new(min_cell_size: f64) -> Self {
        Self {
            min_cell_size,
            cell_size: min_cell_size,
            cells: HashMap::new(),
        }
    }

    /// Cell size chosen by the last query.
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    fn cell_coords(&self, point: DVec2) -> CellKey {
        let inv = 1.0 / self.cell_size;
        ((point.x * inv).floor() as i32, (point.y * inv).floor() as i32)
    }

    /// Candidates overlapping each dynamic entity, nearest first.
    ///
    /// Ties in distance are broken by id so the order is reproducible.
    /// Dynamic entities with nothing nearby get an empty list.
    pub fn nearby(&mut self, grid: &Grid) -> HashMap<ObjectId, Vec<Candidate>> {
        self.cells.clear();

        let mut entries: Vec<(Candidate, Aabb, MotionType)> = Vec::new();
        let mut max_extent: f64 = 0.0;
        for (id, (space, motion, profile, attributes)) in grid
            .world()
            .query::<(&SpaceType, &MotionType, &Profile, &Attributes)>()
            .iter()
        {
            let candidate = Candidate::from_profile(id, *space, *attributes, profile);
            let aabb = candidate.aabb();
            max_extent = max_extent.max(candidate.dim.max_element());
            entries.push((candidate, aabb, *motion));
        }

        self.cell_size = (max_extent * 2.0).max(self.min_cell_size);

        for (index, (_, aabb, _)) in entries.iter().enumerate() {
            let (min_x, min_y) = self.cell_coords(aabb.min);
            let (max_x, max_y) = self.cell_coords(aabb.max);
            for cx in min_x..=max_x {
                for cy in min_y..=max_y {
                    self.cells.entry((cx, cy)).or_default().push(index);
                }
            }
        }

        let mut nearby = HashMap::new();
        for (index, (mover, aabb, motion)) in entries.iter().enumerate() {
            if *motion != MotionType::Dynamic {
                continue;
            }

            let mut found: Vec<usize> = Vec::new();
            let (min_x, min_y) = self.cell_coords(aabb.min);
            let (max_x, max_y) = self.cell_coords(aabb.max);
            for cx in min_x..=max_x {
                for cy in min_y..=max_y {
                    if let Some(cell) = self.cells.get(&(cx, cy)) {
                        found.extend(cell.iter().copied().filter(|&other| other != index));
                    }
                }
            }
            found.sort_unstable();
            found.dedup();

            let mut candidates: Vec<(f64, Candidate)> = found
                .into_iter()
                .filter(|&other| aabb.overlaps(&entries[other].1))
                .map(|other| {
                    let candidate = entries[other].0.clone();
                    (mover.pos.distance_squared(candidate.pos), candidate)
                })
                .collect();
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

            nearby.insert(mover.id, candidates.into_iter().map(|(_, c)| c).collect());
        }

        nearby
    }
}
