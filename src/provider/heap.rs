use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::provider::RawProvider;
use crate::{ErrorKind, MIN_ALIGN, Result};

/// Provider backed by the Rust global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapProvider;

impl HeapProvider {
  pub fn new() -> Self {
    HeapProvider
  }

  fn layout(byte_count: usize) -> Result<Layout> {
    track_assert_ne!(byte_count, 0, ErrorKind::InvalidInput);
    let layout = track!(Layout::from_size_align(byte_count, MIN_ALIGN).map_err(crate::Error::from))?;
    Ok(layout)
  }
}

impl RawProvider for HeapProvider {
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    let layout = track!(Self::layout(byte_count))?;

    let address = unsafe { alloc::alloc(layout) };
    match NonNull::new(address) {
      Some(memory) => Ok(memory),
      None => track_panic!(ErrorKind::OutOfMemory; byte_count),
    }
  }

  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    byte_count: usize,
  ) {
    // The layout was valid when the block was handed out.
    if let Ok(layout) = Self::layout(byte_count) {
      unsafe { alloc::dealloc(memory.as_ptr(), layout) }
    }
  }
}
