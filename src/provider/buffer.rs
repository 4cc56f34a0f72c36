use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::provider::RawProvider;
use crate::{ErrorKind, MIN_ALIGN, Result};

/// Provider that carves blocks out of a caller owned byte buffer.
///
/// Blocks are handed out front to back, each start rounded up to
/// [`MIN_ALIGN`]. Giving back the most recently carved block rolls the
/// cursor back; any other release is a no-op, so memory in the middle of the
/// buffer is only reused once everything above it has been returned.
///
/// ```text
///   buffer: ┌──────┬──┬────────┬──────────────────────┐
///           │ blk0 │░░│  blk1  │        unused        │
///           └──────┴──┴────────┴──────────────────────┘
///                   pad        ▲
///                              cursor
/// ```
#[derive(Debug)]
pub struct BufferProvider<'a> {
  base: NonNull<u8>,
  len: usize,
  cursor: usize,
  _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> BufferProvider<'a> {
  pub fn new(buffer: &'a mut [u8]) -> Self {
    let len = buffer.len();
    BufferProvider {
      base: NonNull::from(buffer).cast::<u8>(),
      len,
      cursor: 0,
      _buffer: PhantomData,
    }
  }

  /// Bytes consumed so far, alignment padding included.
  pub fn used(&self) -> usize {
    self.cursor
  }

  /// Size of the underlying buffer.
  pub fn capacity(&self) -> usize {
    self.len
  }
}

impl RawProvider for BufferProvider<'_> {
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    track_assert_ne!(byte_count, 0, ErrorKind::InvalidInput);

    let base = self.base.as_ptr() as usize;
    let start = track_assert_some!(
      crate::align::checked_align_to(base + self.cursor, MIN_ALIGN),
      ErrorKind::OutOfMemory
    ) - base;
    let end = track_assert_some!(start.checked_add(byte_count), ErrorKind::OutOfMemory);
    track_assert!(
      end <= self.len,
      ErrorKind::OutOfMemory;
      byte_count, self.cursor, self.len
    );

    self.cursor = end;
    Ok(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(start)) })
  }

  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    byte_count: usize,
  ) {
    let start = memory.as_ptr() as usize - self.base.as_ptr() as usize;
    if start + byte_count == self.cursor {
      self.cursor = start;
    }
  }
}
