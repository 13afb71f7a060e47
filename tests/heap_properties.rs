use proptest::prelude::*;

use tagalloc::align::ALIGNMENT;
use tagalloc::{Arena, FixedArena, Heap, HeapConfig};

#[derive(Debug, Clone)]
enum Op {
  Alloc(usize),
  Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (0usize..600).prop_map(Op::Alloc),
    2 => any::<usize>().prop_map(Op::Free),
  ]
}

struct Live {
  addr: usize,
  size: usize,
  fill: u8,
}

fn run(
  mut heap: Heap<FixedArena>,
  ops: Vec<Op>,
) -> Result<(), TestCaseError> {
  let mut live: Vec<Live> = Vec::new();

  for (step, op) in ops.into_iter().enumerate() {
    match op {
      Op::Alloc(size) => {
        let grown_from = heap.arena().size();

        match heap.allocate(size) {
          Some(ptr) => {
            prop_assert!(size > 0);
            prop_assert_eq!(ptr.as_ptr() as usize % ALIGNMENT, 0);
            let usable = unsafe { heap.usable_size(ptr) };
            prop_assert!(usable >= size);

            let fill = step as u8;
            unsafe { ptr.as_ptr().write_bytes(fill, size) };
            live.push(Live { addr: ptr.as_ptr() as usize, size, fill });
          }
          None => {
            prop_assert_eq!(size, 0);
            prop_assert_eq!(heap.arena().size(), grown_from);
          }
        }
      }
      Op::Free(index) => {
        if !live.is_empty() {
          let victim = live.swap_remove(index % live.len());
          unsafe { heap.free(victim.addr as *mut u8) };
        }
      }
    }

    let report = heap.check(false);
    prop_assert!(report.is_consistent(), "step {}: {}", step, report);

    live.sort_by_key(|l| l.addr);
    for pair in live.windows(2) {
      prop_assert!(pair[0].addr + pair[0].size <= pair[1].addr, "overlapping payloads");
    }

    for l in &live {
      let bytes = unsafe { std::slice::from_raw_parts(l.addr as *const u8, l.size) };
      prop_assert!(bytes.iter().all(|&b| b == l.fill), "payload at {:#x} was clobbered", l.addr);
    }
  }

  Ok(())
}

proptest! {
  #[test]
  fn random_sequences_keep_heap_consistent(ops in prop::collection::vec(op(), 1..120)) {
    let heap = Heap::new(FixedArena::with_capacity(1 << 20).unwrap()).unwrap();
    run(heap, ops)?;
  }

  #[test]
  fn small_chunks_force_frequent_growth(
    chunk in 32usize..512,
    ops in prop::collection::vec(op(), 1..120),
  ) {
    let config = HeapConfig::new().with_chunk_size(chunk);
    let heap = Heap::with_config(FixedArena::with_capacity(1 << 20).unwrap(), config).unwrap();
    run(heap, ops)?;
  }

  #[test]
  fn freeing_everything_restores_one_free_block(sizes in prop::collection::vec(1usize..2048, 1..40)) {
    let mut heap = Heap::new(FixedArena::with_capacity(1 << 20).unwrap()).unwrap();
    let ptrs: Vec<_> = sizes.iter().map(|&n| heap.allocate(n).unwrap()).collect();

    for ptr in ptrs {
      unsafe { heap.free(ptr.as_ptr()) };
    }

    let stats = heap.stats();
    prop_assert_eq!(stats.allocated_blocks, 0);
    prop_assert_eq!(stats.free_blocks, 1);
    prop_assert!(heap.check(false).is_consistent());
  }
}
