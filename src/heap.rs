use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::{debug, trace, warn};

use crate::align::{ALIGNMENT, WORD_SIZE, checked_align};
use crate::arena::{Arena, SbrkArena};
use crate::block::{Block, MIN_BLOCK_SIZE, OVERHEAD, PROLOGUE_SIZE};
use crate::check::BlockInfo;
use crate::config::HeapConfig;
use crate::error::{AllocError, Result};
use crate::tag::{self, Tag};

/// Block size needed to serve a `size`-byte request: room for both tags,
/// rounded up to the alignment unit, never below [`MIN_BLOCK_SIZE`].
///
/// Returns `None` when the computation overflows.
pub fn adjusted_size(size: usize) -> Option<usize> {
  if size <= ALIGNMENT {
    return Some(MIN_BLOCK_SIZE);
  }

  size.checked_add(OVERHEAD).and_then(checked_align)
}

/// First-fit allocator over an implicit, boundary-tagged block list.
///
/// ```text
///   low                                                            high
///    │                                                               │
///    ▼                                                               ▼
///    ┌─────┬─────┬─────┬──────────────┬────────────┬───────────┬─────┐
///    │ pad │ P.h │ P.f │  block ...   │  block ... │ block ... │ E.h │
///    └─────┴─────┴─────┴──────────────┴────────────┴───────────┴─────┘
///            prologue                                         epilogue
///         [16:a]  [16:a]                                        [0:a]
/// ```
///
/// Blocks are found by walking `payload + size` from the prologue until the
/// zero-sized epilogue. Freed blocks are merged with free neighbours right
/// away, so no two free blocks are ever adjacent.
pub struct Heap<A: Arena> {
  arena: A,
  prologue: Block,
  config: HeapConfig,
}

impl Heap<SbrkArena> {
  /// Builds a heap on top of the process break.
  pub fn from_sbrk() -> Result<Self> {
    Self::new(SbrkArena::new()?)
  }
}

impl<A: Arena> Heap<A> {
  /// Lays out the sentinels in `arena` and seeds it with one chunk of free
  /// space.
  pub fn new(arena: A) -> Result<Self> {
    Self::with_config(arena, HeapConfig::default())
  }

  pub fn with_config(
    mut arena: A,
    config: HeapConfig,
  ) -> Result<Self> {
    let start = arena.grow((4 * WORD_SIZE) as isize)?;

    if start.as_ptr() as usize % ALIGNMENT != 0 {
      return Err(AllocError::InvalidArgument(format!(
        "arena end {:?} is not aligned to {ALIGNMENT} bytes",
        start
      )));
    }

    let prologue = unsafe {
      let base = start.as_ptr();
      tag::write(base, Tag::default());
      tag::write(base.add(WORD_SIZE), Tag::allocated(PROLOGUE_SIZE));
      tag::write(base.add(2 * WORD_SIZE), Tag::allocated(PROLOGUE_SIZE));
      tag::write(base.add(3 * WORD_SIZE), Tag::allocated(0));

      Block::from_payload(start.add(2 * WORD_SIZE))
    };

    let mut heap = Self {
      arena,
      prologue,
      config,
    };

    heap.extend(config.chunk_size)?;

    debug!(
      prologue = ?heap.prologue.payload(),
      chunk_size = config.chunk_size,
      arena_size = heap.arena.size(),
      "heap initialized"
    );

    Ok(heap)
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  pub fn config(&self) -> HeapConfig {
    self.config
  }

  pub(crate) fn prologue(&self) -> Block {
    self.prologue
  }

  /// Allocates a block with at least `size` bytes of payload.
  ///
  /// Returns `None` for zero-sized requests and when the arena cannot grow.
  /// A failed allocation leaves every existing block untouched.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }

    let Some(asize) = adjusted_size(size) else {
      warn!(requested = size, "allocation size overflows");
      return None;
    };

    let block = match self.find_fit(asize) {
      Some(block) => block,
      None => match self.extend(asize.max(self.config.chunk_size)) {
        Ok(block) => block,
        Err(err) => {
          warn!(requested = size, %err, "allocation failed");
          return None;
        }
      },
    };

    unsafe { self.place(block, asize) };

    trace!(requested = size, adjusted = asize, payload = ?block.payload(), "allocated");

    Some(block.payload())
  }

  /// Allocates for a [`Layout`]. Alignments above [`ALIGNMENT`] are not
  /// supported and yield `None`.
  pub fn allocate_layout(
    &mut self,
    layout: Layout,
  ) -> Option<NonNull<u8>> {
    if layout.align() > ALIGNMENT {
      warn!(align = layout.align(), "unsupported alignment");
      return None;
    }

    self.allocate(layout.size())
  }

  /// Returns a block to the heap and merges it with free neighbours.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by [`Heap::allocate`] on this
  /// heap that has not been freed since.
  pub unsafe fn free(
    &mut self,
    ptr: *mut u8,
  ) {
    let Some(payload) = NonNull::new(ptr) else {
      return;
    };

    unsafe {
      let block = Block::from_payload(payload);
      let size = block.size();

      block.set_tags(Tag::free(size));
      let merged = self.coalesce(block);

      trace!(payload = ?payload, size, merged_size = merged.size(), "freed");
    }
  }

  /// Payload bytes available behind `ptr`.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live pointer returned by [`Heap::allocate`] on this heap.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { Block::from_payload(ptr).usable_size() }
  }

  /// Client blocks in address order, sentinels excluded.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      next: unsafe { self.prologue.next() },
      _heap: PhantomData,
    }
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      arena_size: self.arena.size(),
      ..HeapStats::default()
    };

    for info in self.blocks() {
      let size = info.header.size();

      if info.header.is_allocated() {
        stats.allocated_blocks += 1;
        stats.allocated_bytes += size;
      } else {
        stats.free_blocks += 1;
        stats.free_bytes += size;
        stats.largest_free = stats.largest_free.max(size);
      }
    }

    stats
  }

  /// First-fit scan from the block after the prologue up to the epilogue.
  /// Worst case visits every block in the arena.
  fn find_fit(
    &self,
    asize: usize,
  ) -> Option<Block> {
    unsafe {
      let mut block = self.prologue.next();

      while block.size() > 0 {
        if !block.is_allocated() && block.size() >= asize {
          return Some(block);
        }
        block = block.next();
      }
    }

    None
  }

  /// Marks `asize` bytes at the start of free `block` as allocated, splitting
  /// off the rest when it can hold a block of its own.
  unsafe fn place(
    &mut self,
    block: Block,
    asize: usize,
  ) {
    unsafe {
      let csize = block.size();

      if csize - asize >= MIN_BLOCK_SIZE {
        block.set_tags(Tag::allocated(asize));
        block.next().set_tags(Tag::free(csize - asize));
        trace!(block_size = csize, taken = asize, "split free block");
      } else {
        block.set_tags(Tag::allocated(csize));
      }
    }
  }

  /// Grows the arena by at least `bytes`, turns the new space into a free
  /// block where the old epilogue was, and writes a new epilogue.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<Block> {
    let size = checked_align(bytes).ok_or(AllocError::OutOfMemory { requested: bytes })?;
    let increment = isize::try_from(size).map_err(|_| AllocError::OutOfMemory { requested: size })?;

    let start = self.arena.grow(increment)?;

    unsafe {
      let block = Block::from_payload(start);
      block.set_tags(Tag::free(size));
      tag::write(block.next().header_ptr(), Tag::allocated(0));

      debug!(grown_by = size, arena_size = self.arena.size(), "heap extended");

      Ok(self.coalesce(block))
    }
  }

  /// Boundary-tag coalescing of a block whose tags were just marked free.
  /// Returns the merged block, which starts at the previous block when that
  /// one was free.
  unsafe fn coalesce(
    &mut self,
    block: Block,
  ) -> Block {
    unsafe {
      let prev_allocated = block.prev_footer().is_allocated();
      let next = block.next();
      let next_allocated = next.is_allocated();
      let size = block.size();

      match (prev_allocated, next_allocated) {
        (true, true) => block,
        (true, false) => {
          block.set_tags(Tag::free(size + next.size()));
          block
        }
        (false, true) => {
          let prev = block.prev();
          prev.set_tags(Tag::free(prev.size() + size));
          prev
        }
        (false, false) => {
          let prev = block.prev();
          prev.set_tags(Tag::free(prev.size() + size + next.size()));
          prev
        }
      }
    }
  }
}

/// Aggregate view of the heap, computed by walking every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub arena_size: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

/// Iterator over client blocks. See [`Heap::blocks`].
pub struct Blocks<'a> {
  next: Block,
  _heap: PhantomData<&'a ()>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    unsafe {
      let block = self.next;

      if block.size() == 0 {
        return None;
      }

      self.next = block.next();

      Some(BlockInfo {
        addr: block.addr(),
        header: block.header(),
        footer: Some(block.footer()),
      })
    }
  }
}
