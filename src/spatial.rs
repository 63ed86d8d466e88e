//! Spatial hash grid for broad-phase neighbour queries.
//!
//! Space is divided into cubic cells of `cell_size`; every item is filed
//! under `floor(position / cell_size)` per axis. Cells live in a hash map, so
//! the grid is unbounded and only occupied cells cost memory. The grid keeps
//! no identity between steps: clear it and re-insert every step.

use alloc::vec::Vec as AllocVec;
use hashbrown::HashMap;

use crate::error::PhysicsError;
use crate::float::Float;
use crate::vec::Vec3;

/// Integer cell coordinates.
pub type CellKey = (i32, i32, i32);

/// Below this many cells `clear` never prunes.
const MIN_RETAINED_CELLS: usize = 64;

#[derive(Clone, Debug)]
pub struct SpatialHashGrid<F: Float, T: Copy> {
    cell_size: F,
    inv_cell_size: F,
    cells: HashMap<CellKey, AllocVec<T>>,
    len: usize,
}

impl<F: Float, T: Copy> SpatialHashGrid<F, T> {
    pub fn new(cell_size: F) -> Result<Self, PhysicsError> {
        if !(cell_size.is_finite() && cell_size > F::zero()) {
            return Err(PhysicsError::InvalidCellSize);
        }
        Ok(SpatialHashGrid {
            cell_size,
            inv_cell_size: F::one() / cell_size,
            cells: HashMap::new(),
            len: 0,
        })
    }

    pub fn cell_size(&self) -> F { self.cell_size }
    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Number of cells holding at least one item.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|c| !c.is_empty()).count()
    }

    /// Cells held by the map, including empty ones kept for reuse.
    pub fn allocated_cells(&self) -> usize { self.cells.len() }

    /// Empty every cell. Cell storage is kept for reuse, but cells left
    /// empty since the previous clear are dropped once the map outgrows
    /// four times the item count, so a moving cloud does not grow it
    /// without bound.
    pub fn clear(&mut self) {
        if self.cells.len() > (self.len * 4).max(MIN_RETAINED_CELLS) {
            self.cells.retain(|_, c| !c.is_empty());
        }
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.len = 0;
    }

    /// Drop empty cells, releasing storage left by items that moved away.
    pub fn shrink(&mut self) {
        self.cells.retain(|_, c| !c.is_empty());
    }

    pub fn cell_of(&self, pos: Vec3<F>) -> CellKey {
        (
            (pos.x * self.inv_cell_size).floor().to_i32(),
            (pos.y * self.inv_cell_size).floor().to_i32(),
            (pos.z * self.inv_cell_size).floor().to_i32(),
        )
    }

    pub fn insert(&mut self, item: T, pos: Vec3<F>) {
        let key = self.cell_of(pos);
        self.cells.entry(key).or_default().push(item);
        self.len += 1;
    }

    /// Items in the cell containing `pos`.
    pub fn cell_items(&self, pos: Vec3<F>) -> &[T] {
        self.cells.get(&self.cell_of(pos)).map_or(&[], |c| c.as_slice())
    }

    /// Append to `out` every item whose cell lies within `radius` of the
    /// cell holding `pos`.
    ///
    /// With `radius <= cell_size` this is the 3x3x3 block around the query
    /// cell; larger radii sweep a proportionally wider block so no item
    /// within `radius` is missed. Results are candidates: callers still test
    /// exact distances.
    pub fn query_neighbors(&self, pos: Vec3<F>, radius: F, out: &mut AllocVec<T>) {
        let reach = (radius * self.inv_cell_size).ceil().to_i32().max(1);
        let (cx, cy, cz) = self.cell_of(pos);
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let key = (cx.wrapping_add(dx), cy.wrapping_add(dy), cz.wrapping_add(dz));
                    if let Some(cell) = self.cells.get(&key) {
                        out.extend_from_slice(cell);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_prunes_cells_left_behind() {
        let mut grid = SpatialHashGrid::<f32, usize>::new(0.25).unwrap();
        let mut x = 0.0f32;
        for _ in 0..5000 {
            grid.clear();
            grid.insert(0, Vec3::new(x, 0.0, 0.0));
            x += 0.3;
        }
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.occupied_cells(), 1);
        assert!(grid.allocated_cells() <= MIN_RETAINED_CELLS + 1, "{} cells", grid.allocated_cells());
    }

    #[test]
    fn clear_keeps_storage_for_a_steady_cloud() {
        let mut grid = SpatialHashGrid::<f32, usize>::new(1.0).unwrap();
        for _ in 0..3 {
            grid.clear();
            for i in 0..10 {
                grid.insert(i, Vec3::new(i as f32, 0.0, 0.0));
            }
        }
        assert_eq!(grid.allocated_cells(), 10);
        assert_eq!(grid.occupied_cells(), 10);
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        assert!(SpatialHashGrid::<f32, usize>::new(0.0).is_err());
        assert!(SpatialHashGrid::<f32, usize>::new(-1.0).is_err());
        assert!(SpatialHashGrid::<f32, usize>::new(f32::NAN).is_err());
    }

    #[test]
    fn cells_floor_toward_negative_infinity() {
        let grid = SpatialHashGrid::<f32, usize>::new(0.5).unwrap();
        assert_eq!(grid.cell_of(Vec3::new(0.1, -0.1, 0.99)), (0, -1, 1));
    }

    #[test]
    fn query_sees_neighbouring_cells_only() {
        let mut grid = SpatialHashGrid::<f32, usize>::new(1.0).unwrap();
        grid.insert(0, Vec3::new(0.5, 0.5, 0.5));
        grid.insert(1, Vec3::new(1.5, 0.5, 0.5));
        grid.insert(2, Vec3::new(5.5, 0.5, 0.5));
        let mut out = AllocVec::new();
        grid.query_neighbors(Vec3::new(0.9, 0.5, 0.5), 0.5, &mut out);
        out.sort_unstable();
        assert_eq!(out, [0, 1]);
    }

    #[test]
    fn wide_radius_sweeps_more_cells() {
        let mut grid = SpatialHashGrid::<f32, usize>::new(0.25).unwrap();
        grid.insert(7, Vec3::new(1.0, 0.0, 0.0));
        let mut out = AllocVec::new();
        grid.query_neighbors(Vec3::new(0.0, 0.0, 0.0), 1.1, &mut out);
        assert_eq!(out, [7]);
    }

    #[test]
    fn clear_keeps_cells_shrink_drops_them() {
        let mut grid = SpatialHashGrid::<f64, u32>::new(1.0).unwrap();
        grid.insert(1, Vec3::new(0.0, 0.0, 0.0));
        grid.insert(2, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.occupied_cells(), 2);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.cell_items(Vec3::new(0.0, 0.0, 0.0)).is_empty());
        grid.shrink();
        assert_eq!(grid.cells.len(), 0);
    }
}
