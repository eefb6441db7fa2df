use crate::error::{Error, Result};
use crate::reduce::MIN_TABLE_LENGTH;

/// Sizing policy of a table's indices.
#[derive(Clone, Debug, PartialEq)]
pub struct TableOptions {
    /// Number of slots each index starts with, at least [`MIN_TABLE_LENGTH`].
    pub initial_length: usize,
    /// Largest fraction of occupied slots an index tolerates before it grows.
    pub max_load: f32,
    /// Factor applied to an index's length when it grows.
    pub growth_factor: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            initial_length: 16,
            max_load: 0.8,
            growth_factor: 2,
        }
    }
}

impl TableOptions {
    pub fn with_initial_length(mut self, initial_length: usize) -> Self {
        self.initial_length = initial_length;
        self
    }

    pub fn with_max_load(mut self, max_load: f32) -> Self {
        self.max_load = max_load;
        self
    }

    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_length < MIN_TABLE_LENGTH {
            return Err(Error::InvalidOptions(format!(
                "initial_length must be at least {MIN_TABLE_LENGTH}, got {}",
                self.initial_length
            )));
        }
        if !(self.max_load > 0.0 && self.max_load < 1.0) {
            return Err(Error::InvalidOptions(format!(
                "max_load must lie strictly between 0 and 1, got {}",
                self.max_load
            )));
        }
        if self.growth_factor < 2 {
            return Err(Error::InvalidOptions(format!(
                "growth_factor must be at least 2, got {}",
                self.growth_factor
            )));
        }
        Ok(())
    }

    /// Length an index of `length` slots grows to.
    pub fn grown_length(&self, length: usize) -> usize {
        length.saturating_mul(self.growth_factor).max(MIN_TABLE_LENGTH)
    }

    /// Smallest length that holds `keys` keys without exceeding the load limit.
    pub fn length_for(&self, keys: usize) -> usize {
        let length = (keys as f64 / self.max_load as f64).floor() as usize + 1;
        length.max(MIN_TABLE_LENGTH)
    }
}
