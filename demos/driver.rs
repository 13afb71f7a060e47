use std::process::ExitCode;

use tagalloc::{Arena, Heap};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ROUNDS: usize = 40;

/// Interleaves allocations with frees of the previous request and prints how
/// much arena the heap needed, followed by a full heap dump.
///
/// Set `RUST_LOG=tagalloc=trace` to follow every placement and merge.
fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut heap = match Heap::from_sbrk() {
    Ok(heap) => heap,
    Err(err) => {
      error!(%err, "could not initialize the heap");
      return ExitCode::FAILURE;
    }
  };

  info!(
    page_size = heap.arena().page_size(),
    bounds = ?heap.arena().bounds(),
    "heap ready"
  );

  let mut requested = 0;

  for i in (0..ROUNDS).step_by(2) {
    let short_lived = heap.allocate(i);
    let kept = heap.allocate(i + 1);

    if kept.is_none() {
      error!(size = i + 1, "allocation failed");
      return ExitCode::FAILURE;
    }

    unsafe { heap.free(short_lived.map_or(std::ptr::null_mut(), |p| p.as_ptr())) };
    requested += i + 1;
  }

  let stats = heap.stats();
  println!("malloc size: {requested}, heap_size: {}", stats.arena_size);
  println!("{stats:?}");

  let report = heap.check(true);
  print!("{report}");

  if report.is_consistent() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
