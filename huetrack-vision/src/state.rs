//! The shared offset cell.

use parking_lot::Mutex;
use std::sync::Arc;

/// Horizontal offset, in pixels from frame center, of the most recently
/// detected target of either color — whichever pipeline wrote last. Both
/// pipelines race to update it; each store and load is atomic under the
/// lock, but which color's value persists at any instant is unspecified.
#[derive(Clone, Default)]
pub struct SharedOffset {
    inner: Arc<Mutex<f64>>,
}

impl SharedOffset {
    /// Starts at 0.0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, offset: f64) {
        *self.inner.lock() = offset;
    }

    pub fn load(&self) -> f64 {
        *self.inner.lock()
    }
}
