//! Growable, never-shrinking byte ranges that back a [`Heap`](crate::Heap).
//!
//! ```text
//!   low                                  high
//!    │                                    │
//!    ▼                                    ▼
//!    ┌────────────────────────────────────┬ ─ ─ ─ ─ ─ ─ ─ ─ ┐
//!    │        committed arena bytes       │   grow(n) adds
//!    └────────────────────────────────────┴ ─ ─ ─ ─ ─ ─ ─ ─ ┘
//!                                         ▲
//!                                         └── returned by grow(n)
//! ```

mod fixed;
mod sbrk;

use std::ptr::NonNull;

use crate::error::{AllocError, Result};

pub use fixed::FixedArena;
pub use sbrk::SbrkArena;

/// A contiguous region `[low, high)` that can only grow at its high end.
///
/// Implementations guarantee that `low` is aligned to
/// [`ALIGNMENT`](crate::align::ALIGNMENT) and never moves, and that every byte
/// in `[low, high)` stays valid for reads and writes for as long as the arena
/// lives.
pub trait Arena {
  /// First byte of the arena.
  fn low(&self) -> *mut u8;

  /// One past the last committed byte.
  fn high(&self) -> *mut u8;

  /// Extends the arena by `increment` bytes and returns the previous `high`,
  /// i.e. the start of the newly available region.
  ///
  /// On failure the arena is left unchanged.
  fn grow(
    &mut self,
    increment: isize,
  ) -> Result<NonNull<u8>>;

  /// Returns `(low, high - 1)`: the first and last committed bytes.
  fn bounds(&self) -> (*const u8, *const u8) {
    (self.low(), self.high().wrapping_sub(1))
  }

  /// Number of committed bytes.
  fn size(&self) -> usize {
    self.high() as usize - self.low() as usize
  }

  /// The OS page size. Informational only.
  fn page_size(&self) -> usize {
    os_page_size()
  }
}

/// Rejects negative growth requests.
pub(crate) fn checked_increment(increment: isize) -> Result<usize> {
  usize::try_from(increment).map_err(|_| {
    AllocError::InvalidArgument(format!("arena cannot shrink (increment = {increment})"))
  })
}

pub(crate) fn os_page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size <= 0 { 4096 } else { size as usize }
}
