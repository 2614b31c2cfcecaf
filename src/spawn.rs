use std::collections::{BTreeSet, HashMap};

use crate::arcade::Vec2;

// ---------------------------------------------
// STARTING GRID LAYOUT
// ---------------------------------------------
const LANE_OFFSET: f32 = 4.0;  // m, half the gap between the two columns
const ROW_SPACING: f32 = 8.0;  // m, distance between rows
const GRID_HEADING: f32 = 0.0; // everybody faces +Y

// ---------------------------------------------
// SPAWN RESULT RETURNED TO THE WORLD
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub slot: usize,
    pub position: Vec2,
    pub heading: f32,
}

// ---------------------------------------------
// GRID SLOT ALLOCATOR
// ---------------------------------------------
#[derive(Debug)]
pub struct SpawnManager {
    /// Which slot each vehicle occupies
    slots: HashMap<String, usize>,

    /// Slots given back by despawned vehicles, lowest first
    free: BTreeSet<usize>,

    /// Next never-used slot
    next: usize,

    capacity: usize,
}

impl SpawnManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            free: BTreeSet::new(),
            next: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ---------------------------------------------------------
    // Two columns, rows stepping back along -Y
    // ---------------------------------------------------------
    pub fn slot_position(slot: usize) -> Vec2 {
        let column = (slot % 2) as f32;
        let row = (slot / 2) as f32;
        Vec2::new((column * 2.0 - 1.0) * LANE_OFFSET, -row * ROW_SPACING)
    }

    // ---------------------------------------------------------
    // Reuse the lowest free slot, else open a new one.
    // A vehicle that already holds a slot keeps it.
    // ---------------------------------------------------------
    pub fn allocate_spawn(&mut self, vehicle_id: &str) -> Option<SpawnPoint> {
        let slot = match self.slots.get(vehicle_id) {
            Some(&slot) => slot,
            None => {
                let slot = match self.free.pop_first() {
                    Some(slot) => slot,
                    None if self.next < self.capacity => {
                        self.next += 1;
                        self.next - 1
                    }
                    None => return None,
                };
                self.slots.insert(vehicle_id.to_string(), slot);
                slot
            }
        };

        Some(SpawnPoint {
            slot,
            position: Self::slot_position(slot),
            heading: GRID_HEADING,
        })
    }

    pub fn release(&mut self, vehicle_id: &str) {
        if let Some(slot) = self.slots.remove(vehicle_id) {
            self.free.insert(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_grid_left_right_then_back() {
        let mut grid = SpawnManager::new(4);
        let a = grid.allocate_spawn("a").unwrap();
        let b = grid.allocate_spawn("b").unwrap();
        let c = grid.allocate_spawn("c").unwrap();

        assert_eq!(a.position, Vec2::new(-4.0, 0.0));
        assert_eq!(b.position, Vec2::new(4.0, 0.0));
        assert_eq!(c.position, Vec2::new(-4.0, -8.0));
    }

    #[test]
    fn released_slots_are_reused_lowest_first() {
        let mut grid = SpawnManager::new(4);
        for id in ["a", "b", "c"] {
            grid.allocate_spawn(id);
        }
        grid.release("c");
        grid.release("a");

        assert_eq!(grid.allocate_spawn("d").unwrap().slot, 0);
        assert_eq!(grid.allocate_spawn("e").unwrap().slot, 2);
        assert_eq!(grid.allocate_spawn("f").unwrap().slot, 3);
    }

    #[test]
    fn respawn_keeps_slot_and_full_grid_refuses() {
        let mut grid = SpawnManager::new(2);
        let first = grid.allocate_spawn("a").unwrap();
        assert_eq!(grid.allocate_spawn("a").unwrap(), first);

        grid.allocate_spawn("b").unwrap();
        assert!(grid.allocate_spawn("c").is_none());
    }
}
