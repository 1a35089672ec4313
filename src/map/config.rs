//! Map configuration

use crate::{
    config::DEFAULT_MAX_LOAD_FACTOR,
    error::{Result, UglyError},
};

/// Configuration for hash maps
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Number of mappings the map should hold before its first rehash
    pub initial_capacity: usize,
    /// Ratio of filled (live + tombstoned) slots that triggers a rehash
    pub max_load_factor: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl MapConfig {
    /// Create a new configuration with an initial capacity hint
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Default::default()
        }
    }

    /// Set the initial capacity hint
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the maximum load factor
    pub fn with_max_load_factor(mut self, load_factor: f64) -> Self {
        self.max_load_factor = load_factor;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // probing relies on at least one never-used slot, so the bound is strict
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(UglyError::invalid_parameter(
                "max_load_factor",
                "Max load factor must lie strictly between 0 and 1",
            ));
        }

        Ok(())
    }

    /// Slot count for the first table: the hint scaled by the load factor,
    /// rounded up to a power of two
    pub fn table_capacity(&self) -> Result<usize> {
        let scaled = (self.initial_capacity as f64 / self.max_load_factor) as usize;
        scaled.max(1).checked_next_power_of_two().ok_or_else(|| {
            UglyError::invalid_parameter("initial_capacity", "Capacity overflows")
        })
    }
}

/// Builder pattern for map configuration
#[derive(Debug, Default)]
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set initial capacity
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Set maximum load factor
    pub fn max_load_factor(mut self, load_factor: f64) -> Self {
        self.config.max_load_factor = load_factor;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MapConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
