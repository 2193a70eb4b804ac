//! Per-level vehicle counts, capped at `level_capacity` and independently locked from
//! [`crate::registry::PlateRegistry`].

use parking_lot::Mutex;

pub struct LevelOccupancy {
    counts: Mutex<Vec<usize>>,
    capacity: usize,
}

impl LevelOccupancy {
    pub fn new(n_lvl: usize, capacity: usize) -> Self {
        Self {
            counts: Mutex::new(vec![0; n_lvl]),
            capacity,
        }
    }

    /// Levels currently below capacity, in index order.
    pub fn available_levels(&self) -> Vec<usize> {
        self.counts
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, &count)| count < self.capacity)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_space(&self, level: usize) -> bool {
        self.counts.lock()[level] < self.capacity
    }

    pub fn increment(&self, level: usize) {
        self.counts.lock()[level] += 1;
    }

    pub fn decrement(&self, level: usize) {
        let mut counts = self.counts.lock();
        counts[level] = counts[level].saturating_sub(1);
    }

    pub fn count(&self, level: usize) -> usize {
        self.counts.lock()[level]
    }
}
