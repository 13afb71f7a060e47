use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};
use tracing::{trace, warn};

use super::{Arena, checked_increment};
use crate::align::ALIGNMENT;
use crate::align_to;
use crate::error::{AllocError, Result};

const SBRK_FAILED: *mut c_void = usize::MAX as *mut c_void;

/// Arena backed by the process break, moved with `sbrk(2)`.
///
/// ```text
///   ┌──────────────┬───────────────────────────┐
///   │  data / bss  │       SbrkArena           │
///   └──────────────┴───────────────────────────┘
///                  ▲                           ▲
///                 low                   high = sbrk(0)
/// ```
///
/// The break is process-wide. If anything else in the process moves it
/// between two growths, the arena would stop being contiguous, so `grow`
/// reports [`AllocError::OutOfMemory`] instead. The bytes `sbrk` handed out
/// in that case are returned when the break is still where that call left
/// it; otherwise they stay with the process until exit.
pub struct SbrkArena {
  low: *mut u8,
  high: *mut u8,
}

impl SbrkArena {
  /// Starts an empty arena at the current program break, padded up to
  /// [`ALIGNMENT`].
  pub fn new() -> Result<Self> {
    unsafe {
      let start = sbrk(0);

      if start == SBRK_FAILED {
        return Err(AllocError::OutOfMemory { requested: 0 });
      }

      let padding = align_to!(start as usize, ALIGNMENT) - start as usize;

      if padding > 0 && sbrk(padding as intptr_t) == SBRK_FAILED {
        return Err(AllocError::OutOfMemory { requested: padding });
      }

      let low = sbrk(0) as *mut u8;

      if low as usize % ALIGNMENT != 0 {
        warn!(break_addr = ?low, "program break moved while aligning the arena");
        return Err(AllocError::OutOfMemory { requested: padding });
      }

      trace!(low = ?low, padding, "sbrk arena initialized");

      Ok(Self { low, high: low })
    }
  }
}

impl Arena for SbrkArena {
  fn low(&self) -> *mut u8 {
    self.low
  }

  fn high(&self) -> *mut u8 {
    self.high
  }

  fn grow(
    &mut self,
    increment: isize,
  ) -> Result<NonNull<u8>> {
    let bytes = checked_increment(increment)?;

    let previous = unsafe { sbrk(increment as intptr_t) };

    if previous == SBRK_FAILED {
      warn!(requested = bytes, "sbrk refused to grow the arena");
      return Err(AllocError::OutOfMemory { requested: bytes });
    }

    let previous = previous as *mut u8;

    if previous != self.high {
      // Hand the bytes back if nothing moved the break after us.
      let released = unsafe {
        sbrk(0) as *mut u8 == previous.wrapping_add(bytes) && sbrk(-increment as intptr_t) != SBRK_FAILED
      };

      warn!(
        expected = ?self.high,
        actual = ?previous,
        requested = bytes,
        released,
        "program break moved outside the arena"
      );
      return Err(AllocError::OutOfMemory { requested: bytes });
    }

    self.high = previous.wrapping_add(bytes);
    trace!(requested = bytes, size = self.size(), "sbrk arena grew");

    NonNull::new(previous).ok_or(AllocError::OutOfMemory { requested: bytes })
  }
}
