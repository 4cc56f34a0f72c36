#![cfg(test)]

use std::collections::HashMap;
use std::ptr::NonNull;

use crate::provider::{HeapProvider, RawProvider};
use crate::{ErrorKind, Result};

/// Heap backed provider that keeps a ledger of every live block.
///
/// Releasing a block that is not live, or with the wrong size, panics so
/// bookkeeping bugs in a strategy show up at the faulty call.
#[derive(Debug, Default)]
pub struct CountingProvider {
  inner: HeapProvider,
  live: HashMap<usize, usize>,
  allocations: usize,
  deallocations: usize,
  successes_left: usize,
  failures_left: usize,
}

impl CountingProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes the next `count` requests fail with `OutOfMemory`.
  pub fn fail_next(
    &mut self,
    count: usize,
  ) {
    self.fail_after(0, count);
  }

  /// Lets `successes` requests through, then fails the next `count`.
  pub fn fail_after(
    &mut self,
    successes: usize,
    count: usize,
  ) {
    self.successes_left = successes;
    self.failures_left = count;
  }

  pub fn live_blocks(&self) -> usize {
    self.live.len()
  }

  pub fn live_bytes(&self) -> usize {
    self.live.values().sum()
  }

  pub fn allocations(&self) -> usize {
    self.allocations
  }

  pub fn deallocations(&self) -> usize {
    self.deallocations
  }
}

impl RawProvider for CountingProvider {
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    if self.successes_left > 0 {
      self.successes_left -= 1;
    } else if self.failures_left > 0 {
      self.failures_left -= 1;
      track_panic!(ErrorKind::OutOfMemory, "injected failure");
    }

    let memory = track!(self.inner.allocate(byte_count))?;
    self.live.insert(memory.as_ptr() as usize, byte_count);
    self.allocations += 1;
    Ok(memory)
  }

  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    byte_count: usize,
  ) {
    let recorded = self.live.remove(&(memory.as_ptr() as usize));
    assert_eq!(recorded, Some(byte_count), "release of unknown block {:?}", memory);
    self.deallocations += 1;
    unsafe { self.inner.deallocate(memory, byte_count) }
  }
}

impl Drop for CountingProvider {
  fn drop(&mut self) {
    // Whatever a test left behind.
    for (address, byte_count) in self.live.drain() {
      if let Some(memory) = NonNull::new(address as *mut u8) {
        unsafe { self.inner.deallocate(memory, byte_count) }
      }
    }
  }
}
