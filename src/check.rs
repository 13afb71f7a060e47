//! Heap consistency auditor.
//!
//! [`Heap::check`] walks the block list and reports every broken invariant
//! it finds. It never panics and never changes the heap, so calling it twice
//! in a row yields equal reports.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::arena::Arena;
use crate::block::PROLOGUE_SIZE;
use crate::heap::Heap;
use crate::tag::Tag;

/// A broken heap invariant. Every `addr` is a payload address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("bad prologue header {tag}")]
  BadPrologue { tag: Tag },

  #[error("{addr:#x} is not doubleword aligned")]
  Misaligned { addr: usize },

  #[error("{addr:#x}: header {header} does not match footer {footer}")]
  TagMismatch { addr: usize, header: Tag, footer: Tag },

  #[error("{addr:#x}: free block follows another free block")]
  Uncoalesced { addr: usize },

  #[error("{addr:#x}: block of {size} bytes runs past the arena end")]
  OutOfBounds { addr: usize, size: usize },

  #[error("bad epilogue header {tag} at {addr:#x}")]
  BadEpilogue { addr: usize, tag: Tag },
}

/// One line of a verbose heap dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Payload address.
  pub addr: usize,
  pub header: Tag,
  /// `None` for the epilogue, or when the footer lies outside the arena.
  pub footer: Option<Tag>,
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.footer {
      _ if self.header.size() == 0 => write!(f, "{:#x}: EOL", self.addr),
      Some(footer) => write!(f, "{:#x}: header: {} footer: {}", self.addr, self.header, footer),
      None => write!(f, "{:#x}: header: {} footer: <unreadable>", self.addr, self.header),
    }
  }
}

/// Result of [`Heap::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapReport {
  /// Payload address of the prologue.
  pub start: usize,
  pub violations: Vec<Violation>,
  /// Per-block dump including both sentinels. Empty unless verbose.
  pub blocks: Vec<BlockInfo>,
}

impl HeapReport {
  pub fn is_consistent(&self) -> bool {
    self.violations.is_empty()
  }

  fn logged(self) -> Self {
    for block in &self.blocks {
      debug!("{block}");
    }

    for violation in &self.violations {
      warn!(%violation, "heap check");
    }

    self
  }
}

impl fmt::Display for HeapReport {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Heap ({:#x}):", self.start)?;

    for block in &self.blocks {
      writeln!(f, "{block}")?;
    }

    for violation in &self.violations {
      writeln!(f, "Error: {violation}")?;
    }

    Ok(())
  }
}

impl<A: Arena> Heap<A> {
  /// Audits the whole heap. With `verbose` the report also carries a dump of
  /// every block, logged at debug level.
  pub fn check(
    &self,
    verbose: bool,
  ) -> HeapReport {
    let prologue = self.prologue();
    let end = self.arena().high() as usize;

    let mut report = HeapReport {
      start: prologue.addr(),
      ..HeapReport::default()
    };

    unsafe {
      let tag = prologue.header();
      if tag.size() != PROLOGUE_SIZE || !tag.is_allocated() {
        report.violations.push(Violation::BadPrologue { tag });
      }

      let mut block = prologue;
      let mut prev_free = false;

      loop {
        let header = block.header();
        let size = header.size();

        if size == 0 {
          break;
        }

        let addr = block.addr();

        if !block.is_aligned() {
          report.violations.push(Violation::Misaligned { addr });
        }

        if addr.checked_add(size).is_none_or(|block_end| block_end > end) {
          if verbose {
            report.blocks.push(BlockInfo { addr, header, footer: None });
          }
          report.violations.push(Violation::OutOfBounds { addr, size });
          return report.logged();
        }

        let footer = block.footer();
        if header != footer {
          report.violations.push(Violation::TagMismatch { addr, header, footer });
        }

        if verbose {
          report.blocks.push(BlockInfo { addr, header, footer: Some(footer) });
        }

        let free = !header.is_allocated();
        if free && prev_free {
          report.violations.push(Violation::Uncoalesced { addr });
        }
        prev_free = free;

        block = block.next();
      }

      let tag = block.header();

      if verbose {
        report.blocks.push(BlockInfo { addr: block.addr(), header: tag, footer: None });
      }

      // The epilogue header is the last word of the arena.
      if tag.size() != 0 || !tag.is_allocated() || block.addr() != end {
        report.violations.push(Violation::BadEpilogue { addr: block.addr(), tag });
      }
    }

    report.logged()
  }
}
