//! Boundary tag codec.
//!
//! A tag is one machine word holding a block size and an allocated bit:
//!
//! ```text
//!   63                                                  3   2   1   0
//!   ┌────────────────────────────────────────────────────┬───┬───┬───┐
//!   │                 size (multiple of 8)               │ 0 │ 0 │ a │
//!   └────────────────────────────────────────────────────┴───┴───┴───┘
//! ```
//!
//! Sizes are stored at word granularity. Well-formed blocks only use
//! multiples of [`ALIGNMENT`](crate::align::ALIGNMENT).
//!
//! All raw word reads and writes into arena memory go through [`read`] and
//! [`write`].

use std::fmt;

use crate::align::WORD_SIZE;

const ALLOCATED: usize = 0x1;
const SIZE_MASK: usize = !(WORD_SIZE - 1);

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Tag(usize);

impl Tag {
  /// Packs a size and an allocated flag. `size` must be a multiple of
  /// [`WORD_SIZE`].
  pub const fn pack(
    size: usize,
    allocated: bool,
  ) -> Self {
    debug_assert!((size & !SIZE_MASK) == 0);
    Self(size | allocated as usize)
  }

  pub const fn free(size: usize) -> Self {
    Self::pack(size, false)
  }

  pub const fn allocated(size: usize) -> Self {
    Self::pack(size, true)
  }

  pub const fn size(self) -> usize {
    self.0 & SIZE_MASK
  }

  pub const fn is_allocated(self) -> bool {
    self.0 & ALLOCATED != 0
  }

  /// The raw word as stored in the arena.
  pub const fn bits(self) -> usize {
    self.0
  }
}

impl fmt::Debug for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "[{}:{}]", self.size(), if self.is_allocated() { 'a' } else { 'f' })
  }
}

impl fmt::Display for Tag {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Reads the tag stored at `at`.
///
/// # Safety
///
/// `at` must be word-aligned and point inside a live arena.
pub unsafe fn read(at: *const u8) -> Tag {
  Tag(unsafe { (at as *const usize).read() })
}

/// Writes `tag` at `at`.
///
/// # Safety
///
/// `at` must be word-aligned and point inside a live arena.
pub unsafe fn write(
  at: *mut u8,
  tag: Tag,
) {
  unsafe { (at as *mut usize).write(tag.0) }
}
