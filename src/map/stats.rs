//! Map occupancy statistics

/// Snapshot of a map's slot usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Live mappings
    pub count: usize,
    /// Live plus tombstoned slots
    pub filled: usize,
    /// Total slots
    pub capacity: usize,
}

impl MapStats {
    /// Slots left behind by removals and not yet reclaimed by a rehash
    pub fn tombstones(&self) -> usize {
        self.filled - self.count
    }

    /// Ratio of filled slots to capacity (0.0 to 1.0)
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.filled as f64 / self.capacity as f64
    }

    /// Get a summary string of the statistics
    pub fn summary(&self) -> String {
        format!(
            "MapStats {{ count: {}, tombstones: {}, capacity: {}, load: {:.2}% }}",
            self.count,
            self.tombstones(),
            self.capacity,
            self.load_factor() * 100.0
        )
    }
}
