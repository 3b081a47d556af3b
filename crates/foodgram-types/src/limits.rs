/// Inclusive `[min, max]` range for a bounded quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Quantity bounds enforced when recipes are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Minutes.
    pub cooking_time: Bounds,
    pub amount: Bounds,
}

pub const DEFAULT_MIN_QUANTITY: i64 = 1;
pub const DEFAULT_MAX_QUANTITY: i64 = 32_000;

/// Longest accepted recipe name, in characters.
pub const MAX_NAME_LENGTH: usize = 200;

impl Default for Limits {
    fn default() -> Self {
        Self {
            cooking_time: Bounds::new(DEFAULT_MIN_QUANTITY, DEFAULT_MAX_QUANTITY),
            amount: Bounds::new(DEFAULT_MIN_QUANTITY, DEFAULT_MAX_QUANTITY),
        }
    }
}
