use std::ptr::NonNull;

use crate::align::{ALIGNMENT, DOUBLE_WORD, WORD_SIZE};
use crate::tag::{self, Tag};

/// Header plus footer bytes carried by every block.
pub const OVERHEAD: usize = 2 * WORD_SIZE;

/// The prologue sentinel is a bare header/footer pair with no payload.
pub const PROLOGUE_SIZE: usize = OVERHEAD;

/// Smallest block handed to a client: tags plus one alignment unit of
/// payload. A split only happens when the remainder is at least this big.
pub const MIN_BLOCK_SIZE: usize = OVERHEAD + ALIGNMENT;

/// Typed view over one block, identified by its payload address.
///
/// ```text
///            header                                    footer
///   ┌───────────────────┬─────────────────────────┬───────────────────┐
///   │  [size : a/f]     │        payload          │  [size : a/f]     │
///   └───────────────────┴─────────────────────────┴───────────────────┘
///   ▲                   ▲                                             ▲
///   bp - WORD           bp                                   bp + size - WORD
///                                                            (next block's header)
/// ```
///
/// The view holds no state of its own; every accessor reads the tags in
/// arena memory, so it is `Copy` and cheap to rebuild after a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  payload: NonNull<u8>,
}

impl Block {
  /// # Safety
  ///
  /// `payload` must be preceded by a header word inside a live arena.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    Self { payload }
  }

  pub fn payload(self) -> NonNull<u8> {
    self.payload
  }

  pub fn addr(self) -> usize {
    self.payload.as_ptr() as usize
  }

  pub fn is_aligned(self) -> bool {
    self.addr() % ALIGNMENT == 0
  }

  pub(crate) fn header_ptr(self) -> *mut u8 {
    self.payload.as_ptr().wrapping_sub(WORD_SIZE)
  }

  pub unsafe fn header(self) -> Tag {
    unsafe { tag::read(self.header_ptr()) }
  }

  pub unsafe fn size(self) -> usize {
    unsafe { self.header().size() }
  }

  pub unsafe fn is_allocated(self) -> bool {
    unsafe { self.header().is_allocated() }
  }

  /// Footer location, derived from the size currently in the header.
  pub(crate) unsafe fn footer_ptr(self) -> *mut u8 {
    unsafe { self.payload.as_ptr().add(self.size()).sub(DOUBLE_WORD) }
  }

  pub unsafe fn footer(self) -> Tag {
    unsafe { tag::read(self.footer_ptr()) }
  }

  /// Rewrites the header, then the footer at the position implied by the
  /// new size.
  pub unsafe fn set_tags(
    self,
    tag: Tag,
  ) {
    unsafe {
      tag::write(self.header_ptr(), tag);
      tag::write(self.footer_ptr(), tag);
    }
  }

  /// The block that starts right after this one.
  pub unsafe fn next(self) -> Block {
    unsafe { Block::from_payload(self.payload.add(self.size())) }
  }

  /// Tag of the previous block, read from its footer.
  pub unsafe fn prev_footer(self) -> Tag {
    unsafe { tag::read(self.payload.as_ptr().sub(DOUBLE_WORD)) }
  }

  /// The block that ends right before this one.
  pub unsafe fn prev(self) -> Block {
    unsafe { Block::from_payload(self.payload.sub(self.prev_footer().size())) }
  }

  /// Bytes available to the client.
  pub unsafe fn usable_size(self) -> usize {
    unsafe { self.size().saturating_sub(OVERHEAD) }
  }
}
