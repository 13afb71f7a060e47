use std::alloc::{self, Layout};
use std::ptr::NonNull;

use tracing::{trace, warn};

use super::{Arena, checked_increment};
use crate::align::{ALIGNMENT, checked_align};
use crate::error::{AllocError, Result};

/// Arena carved out of a single up-front reservation.
///
/// ```text
///   base                        high                  base + capacity
///    │                           │                           │
///    ▼                           ▼                           ▼
///    ┌───────────────────────────┬───────────────────────────┐
///    │        committed          │       still reserved      │
///    └───────────────────────────┴───────────────────────────┘
/// ```
///
/// Growing past the capacity fails with [`AllocError::OutOfMemory`], which
/// makes exhaustion reproducible. Each instance is independent of the
/// process break, so many can coexist.
pub struct FixedArena {
  base: NonNull<u8>,
  layout: Layout,
  len: usize,
}

impl FixedArena {
  /// Reserves `capacity` bytes (rounded up to [`ALIGNMENT`]) without
  /// committing any of them.
  pub fn with_capacity(capacity: usize) -> Result<Self> {
    if capacity == 0 {
      return Err(AllocError::InvalidArgument("arena capacity must be non-zero".into()));
    }

    let capacity = checked_align(capacity)
      .ok_or_else(|| AllocError::InvalidArgument(format!("capacity {capacity} overflows")))?;

    let layout = Layout::from_size_align(capacity, ALIGNMENT)
      .map_err(|err| AllocError::InvalidArgument(err.to_string()))?;

    let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
      .ok_or(AllocError::OutOfMemory { requested: capacity })?;

    Ok(Self { base, layout, len: 0 })
  }

  /// Total reserved bytes.
  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  /// Bytes that can still be committed by `grow`.
  pub fn remaining(&self) -> usize {
    self.capacity() - self.len
  }
}

impl Arena for FixedArena {
  fn low(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  fn high(&self) -> *mut u8 {
    self.base.as_ptr().wrapping_add(self.len)
  }

  fn grow(
    &mut self,
    increment: isize,
  ) -> Result<NonNull<u8>> {
    let bytes = checked_increment(increment)?;

    if bytes > self.remaining() {
      warn!(requested = bytes, remaining = self.remaining(), "fixed arena exhausted");
      return Err(AllocError::OutOfMemory { requested: bytes });
    }

    let previous = unsafe { self.base.add(self.len) };
    self.len += bytes;
    trace!(requested = bytes, size = self.len, "fixed arena grew");

    Ok(previous)
  }
}

impl Drop for FixedArena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}
