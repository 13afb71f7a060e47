use std::mem;

/// Width of one boundary tag (a machine word).
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// Two words. Block sizes and payload addresses are multiples of this.
pub const DOUBLE_WORD: usize = 2 * WORD_SIZE;

/// Alignment unit for every payload handed out by the heap.
pub const ALIGNMENT: usize = DOUBLE_WORD;

/// Rounds `value` up to the next multiple of `unit`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $unit:expr) => {
    ($value + $unit - 1) & !($unit - 1)
  };
}

/// Rounds `value` up to the heap's alignment unit (double word).
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use tagalloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(17), 32), // 64 bit machine.
///     4 => assert_eq!(align!(9), 16),  // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Like [`align!`] but returns `None` instead of wrapping on overflow.
pub fn checked_align(value: usize) -> Option<usize> {
  value.checked_add(ALIGNMENT - 1).map(|v| v & !(ALIGNMENT - 1))
}
