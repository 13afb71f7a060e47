use crate::align::ALIGNMENT;
use crate::block::MIN_BLOCK_SIZE;

/// Default amount the heap grows by when no free block fits.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 12;

/// Heap tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Minimum number of bytes requested from the arena per extension,
  /// including the seed extension performed at init.
  pub chunk_size: usize,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }
}

impl HeapConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the growth increment, rounded up to the alignment unit and never
  /// below one minimum block.
  pub fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    let rounded = chunk_size
      .checked_next_multiple_of(ALIGNMENT)
      .unwrap_or(usize::MAX & !(ALIGNMENT - 1));

    self.chunk_size = rounded.max(MIN_BLOCK_SIZE);
    self
  }
}
