//! # tagalloc - A Boundary-Tag Memory Allocator
//!
//! This crate provides a first-fit allocator over a single contiguous,
//! growable arena. Blocks carry a boundary tag at both ends, which lets a
//! freed block find and merge with its neighbours in constant time.
//!
//! ## Overview
//!
//! ```text
//!   Implicit Block List:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                             ARENA                                    │
//!   │                                                                      │
//!   │   ┌────┬─────┬──────────┬──────────┬─────────────────────────┬────┐  │
//!   │   │ P  │ A1  │   free   │    A2    │          free           │ E  │  │
//!   │   └────┴─────┴──────────┴──────────┴─────────────────────────┴────┘  │
//!   │     │     ▲                                                     ▲    │
//!   │     └─────┘ next = payload + size                               │    │
//!   │                                                              high    │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   P = prologue sentinel, E = epilogue sentinel.
//!   Allocation scans from P to E and takes the first free block that fits.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment constants and macros (align!, align_to!)
//!   ├── arena      - Arena trait, SbrkArena and FixedArena
//!   ├── tag        - Boundary tag codec (internal)
//!   ├── block      - Typed view over one block (internal)
//!   ├── config     - HeapConfig
//!   ├── heap       - Heap: allocate, free, coalesce, extend
//!   ├── check      - Heap::check consistency auditor
//!   └── error      - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::{FixedArena, Heap};
//!
//! let mut heap = Heap::new(FixedArena::with_capacity(1 << 16)?)?;
//!
//! let ptr = heap.allocate(24).expect("arena has room");
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 24);
//!     heap.free(ptr.as_ptr());
//! }
//!
//! assert!(heap.check(false).is_consistent());
//! # Ok::<(), tagalloc::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! Every block has the same shape:
//!
//! ```text
//!   ┌──────────────┬────────────────────────────────┬──────────────┐
//!   │   header     │            payload             │   footer     │
//!   │ [size : a/f] │    size - 16 bytes usable      │ [size : a/f] │
//!   └──────────────┴────────────────────────────────┴──────────────┘
//!                  ▲
//!                  └── pointer returned to the client (16-byte aligned)
//! ```
//!
//! - **allocate**: round the request up, scan for the first free block that
//!   fits, split it when the leftover can stand on its own. When nothing
//!   fits, grow the arena by at least one chunk and place there.
//! - **free**: mark the block free and merge it with whichever neighbours are
//!   free. The previous neighbour is found through its footer.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`
//! - **Linear search**: allocation is O(n) in the number of blocks
//! - **No shrinking**: the arena never returns memory to the OS
//! - **Unix-only**: `SbrkArena` requires `libc` and `sbrk`
//!
//! ## Safety
//!
//! `free` and `usable_size` take raw pointers and are `unsafe`: passing a
//! pointer that did not come from the same heap is undefined behaviour.

pub mod align;
pub mod arena;
mod block;
mod check;
mod config;
mod error;
mod heap;
mod tag;

pub use arena::{Arena, FixedArena, SbrkArena};
pub use block::{MIN_BLOCK_SIZE, OVERHEAD, PROLOGUE_SIZE};
pub use check::{BlockInfo, HeapReport, Violation};
pub use config::{DEFAULT_CHUNK_SIZE, HeapConfig};
pub use error::{AllocError, Result};
pub use heap::{Blocks, Heap, HeapStats, adjusted_size};
pub use tag::Tag;
