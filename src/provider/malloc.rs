use std::ptr::NonNull;

use libc::{c_void, free, malloc};

use crate::provider::RawProvider;
use crate::{ErrorKind, Result};

/// Provider backed by the C heap (`malloc(3)` / `free(3)`).
///
/// `malloc` guarantees alignment suitable for any fundamental type, which
/// covers [`MIN_ALIGN`](crate::MIN_ALIGN).
#[derive(Debug, Default, Clone, Copy)]
pub struct MallocProvider;

impl MallocProvider {
  pub fn new() -> Self {
    MallocProvider
  }
}

impl RawProvider for MallocProvider {
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    track_assert_ne!(byte_count, 0, ErrorKind::InvalidInput);

    let address = unsafe { malloc(byte_count) };
    match NonNull::new(address.cast::<u8>()) {
      Some(memory) => Ok(memory),
      None => track_panic!(ErrorKind::OutOfMemory, "malloc({}) returned null", byte_count),
    }
  }

  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    _byte_count: usize,
  ) {
    unsafe { free(memory.as_ptr().cast::<c_void>()) }
  }
}

#[cfg(test)]
mod tests {
  use trackable::result::TestResult;

  use super::*;
  use crate::MIN_ALIGN;

  #[test]
  fn test_malloc_round_trip() -> TestResult {
    let mut provider = MallocProvider::new();
    let memory = track!(provider.allocate(128))?;

    assert_eq!(memory.as_ptr() as usize % MIN_ALIGN, 0);

    unsafe {
      memory.as_ptr().write_bytes(0xAB, 128);
      assert_eq!(*memory.as_ptr().add(127), 0xAB);
      provider.deallocate(memory, 128);
    }
    Ok(())
  }

  #[test]
  fn test_malloc_rejects_zero() {
    let mut provider = MallocProvider::new();
    let error = provider.allocate(0).unwrap_err();
    assert_eq!(*error.kind(), ErrorKind::InvalidInput);
  }
}
