use std::ptr::NonNull;

use tagalloc::align::ALIGNMENT;
use tagalloc::{
  AllocError, Arena, FixedArena, Heap, HeapConfig, MIN_BLOCK_SIZE, OVERHEAD, Violation, adjusted_size,
};

fn heap() -> Heap<FixedArena> {
  Heap::new(FixedArena::with_capacity(1 << 20).unwrap()).unwrap()
}

fn addr(ptr: NonNull<u8>) -> usize {
  ptr.as_ptr() as usize
}

#[test]
fn zero_size_request_returns_none_without_growth() {
  let mut heap = heap();
  let size = heap.arena().size();

  assert!(heap.allocate(0).is_none());
  assert_eq!(heap.arena().size(), size);
  assert!(heap.check(false).is_consistent());
}

#[test]
fn freed_block_is_reused_first_fit() {
  let mut heap = heap();

  let a = heap.allocate(16).unwrap();
  let b = heap.allocate(24).unwrap();
  unsafe { heap.free(a.as_ptr()) };

  let size = heap.arena().size();
  let c = heap.allocate(8).unwrap();

  assert_eq!(c, a);
  assert_ne!(c, b);
  assert_eq!(heap.arena().size(), size);
  assert!(heap.check(false).is_consistent());
}

#[test]
fn split_leaves_usable_remainder() {
  let mut heap = heap();
  let free_before = heap.stats().largest_free;

  let small = heap.allocate(100).unwrap();
  let taken = adjusted_size(100).unwrap();

  let report = heap.check(true);
  assert!(report.is_consistent(), "{report}");

  // prologue, small, remainder, epilogue
  let remainder = report.blocks[2];
  assert_eq!(remainder.addr, addr(small) + taken);
  assert_eq!(remainder.header.size(), free_before - taken);
  assert!(!remainder.header.is_allocated());
  assert_eq!(remainder.footer, Some(remainder.header));

  let size = heap.arena().size();
  let rest = heap.allocate(remainder.header.size() - OVERHEAD).unwrap();

  assert_eq!(addr(rest), remainder.addr);
  assert_eq!(heap.arena().size(), size);
  assert_eq!(heap.stats().free_blocks, 0);
  assert!(heap.check(false).is_consistent());
}

#[test]
fn exhausted_heap_grows() {
  let mut heap = heap();
  let free = heap.stats().largest_free;

  let all = heap.allocate(free - OVERHEAD).unwrap();
  assert_eq!(heap.stats().free_blocks, 0);

  let size = heap.arena().size();
  let more = heap.allocate(64).unwrap();

  assert!(heap.arena().size() > size);
  assert!(addr(more) > addr(all));
  assert!(addr(more) < heap.arena().high() as usize);
  assert!(heap.check(false).is_consistent());
}

#[test]
fn growth_merges_with_trailing_free_block() {
  let mut heap = heap();

  let big = heap.allocate(8000).unwrap();
  let report = heap.check(true);
  assert!(report.is_consistent(), "{report}");

  // The seed chunk was too small, so it merged with the extension.
  assert_eq!(heap.blocks().count(), 2);
  assert!(unsafe { heap.usable_size(big) } >= 8000);
}

#[test]
fn growth_path_places_adjusted_size() {
  let mut heap = Heap::with_config(
    FixedArena::with_capacity(1 << 20).unwrap(),
    HeapConfig::new().with_chunk_size(MIN_BLOCK_SIZE),
  )
  .unwrap();

  // Odd size that cannot fit in the seed chunk.
  let ptr = heap.allocate(4099).unwrap();

  assert!(unsafe { heap.usable_size(ptr) } >= 4099);
  assert_eq!(addr(ptr) % ALIGNMENT, 0);
  assert!(heap.check(false).is_consistent());

  let next = heap.allocate(1).unwrap();
  assert!(addr(next) >= addr(ptr) + 4099);
}

#[test]
fn out_of_memory_leaves_heap_intact() {
  let mut heap = Heap::new(FixedArena::with_capacity(8192).unwrap()).unwrap();

  let a = heap.allocate(128).unwrap();
  unsafe { a.as_ptr().write_bytes(0x5A, 128) };

  let before = heap.check(true);
  let size = heap.arena().size();

  assert!(heap.allocate(1 << 16).is_none());

  assert_eq!(heap.arena().size(), size);
  assert_eq!(heap.check(true), before);
  assert!(unsafe { std::slice::from_raw_parts(a.as_ptr(), 128) }.iter().all(|&b| b == 0x5A));

  // Still usable afterwards.
  assert!(heap.allocate(64).is_some());
}

#[test]
fn heap_init_reports_out_of_memory() {
  let arena = FixedArena::with_capacity(1024).unwrap();

  assert!(matches!(Heap::new(arena), Err(AllocError::OutOfMemory { .. })));
}

#[test]
fn huge_request_fails_cleanly() {
  let mut heap = heap();

  assert!(heap.allocate(usize::MAX).is_none());
  assert!(heap.allocate(usize::MAX / 2).is_none());
  assert!(heap.check(false).is_consistent());
}

#[test]
fn check_twice_reports_identically() {
  let mut heap = heap();
  let ptrs: Vec<_> = (1..20).map(|n| heap.allocate(n * 7).unwrap()).collect();

  for ptr in ptrs.iter().step_by(3) {
    unsafe { heap.free(ptr.as_ptr()) };
  }

  let first = heap.check(true);
  let second = heap.check(true);

  assert_eq!(first, second);
  assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn corrupted_epilogue_is_reported() {
  let mut heap = heap();
  heap.allocate(32).unwrap();

  let epilogue = heap.arena().high().wrapping_sub(std::mem::size_of::<usize>());
  unsafe { (epilogue as *mut usize).write(0) };

  let report = heap.check(false);

  match report.violations.as_slice() {
    [Violation::BadEpilogue { addr, .. }] => assert_eq!(*addr, heap.arena().high() as usize),
    other => panic!("unexpected violations: {other:?}"),
  }
}

#[test]
fn independent_heaps_do_not_interfere() {
  let mut first = heap();
  let mut second = heap();

  let a = first.allocate(48).unwrap();
  let b = second.allocate(48).unwrap();

  unsafe {
    a.as_ptr().write_bytes(1, 48);
    b.as_ptr().write_bytes(2, 48);
    first.free(a.as_ptr());
  }

  assert_eq!(unsafe { *b.as_ptr() }, 2);
  assert!(first.check(false).is_consistent());
  assert!(second.check(false).is_consistent());
}
