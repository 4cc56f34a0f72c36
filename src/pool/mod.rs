//! Fixed-size chunk pools.
//!
//! A pool is one provider block cut into `chunk_count` equally sized chunks.
//! Free chunks are threaded into a singly linked list through their own first
//! word, so a chunk carries no header at all:
//!
//! ```text
//!   pool:  ┌────────┬────────┬────────┬────────┐
//!          │ chunk0 │ chunk1 │ chunk2 │ chunk3 │
//!          └───┬────┴────────┴───▲─┬──┴───▲────┘
//!   free list: head ─────────────┘ └──────┘ tail
//!                (chunk0 and chunk1 are mapped)
//! ```
//!
//! Mapping pops from the head of the list, unmapping appends to its tail.
//! Both are O(1) per chunk.
use std::marker::PhantomData;
use std::{mem, ptr};

pub use self::dynamic_mapper::DynamicPoolMapper;
pub use self::static_mapper::StaticPoolMapper;

use crate::link::{self, LINK_SIZE};
use crate::{ErrorKind, MIN_ALIGN, Result};

mod dynamic_mapper;
mod static_mapper;

/// Byte size of the chunks handed out for `T`.
///
/// A chunk must be able to hold a link word while it is free, and is rounded
/// to the machine word so every chunk of a pool stays aligned.
pub struct ChunkLayout<T>(PhantomData<T>);

impl<T> ChunkLayout<T> {
  pub const SIZE: usize = align!(if mem::size_of::<T>() > LINK_SIZE {
    mem::size_of::<T>()
  } else {
    LINK_SIZE
  });

  fn validate(chunk_count: usize) -> Result<usize> {
    track_assert_ne!(chunk_count, 0, ErrorKind::InvalidInput);
    track_assert!(
      mem::align_of::<T>() <= MIN_ALIGN,
      ErrorKind::InvalidInput,
      "chunk alignment {} exceeds provider alignment {}",
      mem::align_of::<T>(),
      MIN_ALIGN
    );
    let bytes = track_assert_some!(
      chunk_count.checked_mul(Self::SIZE).and_then(|b| b.checked_add(LINK_SIZE)),
      ErrorKind::InvalidInput
    );
    Ok(bytes - LINK_SIZE)
  }
}

/// Intrusive list of free chunks with O(1) access to both ends.
#[derive(Debug)]
struct FreeChunks {
  head: *mut u8,
  tail: *mut u8,
  count: usize,
}

impl FreeChunks {
  const fn new() -> Self {
    FreeChunks {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      count: 0,
    }
  }

  fn clear(&mut self) {
    *self = Self::new();
  }

  // The caller checks `count > 0`.
  unsafe fn pop(&mut self) -> *mut u8 {
    debug_assert!(self.count > 0);

    let chunk = self.head;
    self.head = unsafe { link::read_ptr(chunk) };
    if self.head.is_null() {
      self.tail = ptr::null_mut();
    }
    self.count -= 1;
    chunk
  }

  // Appends `count` chunks that already form a run from `first` to `last`.
  unsafe fn append_run(
    &mut self,
    first: *mut u8,
    last: *mut u8,
    count: usize,
  ) {
    unsafe {
      link::write_null(last);
      if self.head.is_null() {
        self.head = first;
      } else {
        link::write_ptr(self.tail, first);
      }
    }
    self.tail = last;
    self.count += count;
  }

  // Appends every chunk in `chunks`, in slice order.
  unsafe fn append<T>(
    &mut self,
    chunks: &[*mut T],
  ) {
    let (Some(first), Some(last)) = (chunks.first(), chunks.last()) else {
      return;
    };

    unsafe {
      link::link_ptrs(chunks);
      self.append_run(first.cast::<u8>(), last.cast::<u8>(), chunks.len());
    }
  }

  // Threads a whole pool of `chunk_count` chunks starting at `chunks`.
  unsafe fn append_pool(
    &mut self,
    chunks: *mut u8,
    chunk_count: usize,
    chunk_size: usize,
  ) {
    unsafe {
      link::link_stride(chunks, chunk_count, chunk_size);
      self.append_run(chunks, chunks.add((chunk_count - 1) * chunk_size), chunk_count);
    }
  }
}
