use std::ptr::NonNull;

use slog::{Discard, Logger};

use crate::linear::has_enough_memory;
use crate::provider::RawProvider;
use crate::{ErrorKind, Result};

/// Bump mapper over one buffer of fixed size.
///
/// The buffer is requested from the provider on [`initialize`] or on the
/// first [`map`], whichever comes first.
///
/// [`initialize`]: StaticLinearMapper::initialize
/// [`map`]: StaticLinearMapper::map
pub struct StaticLinearMapper<P: RawProvider> {
  memory: Option<NonNull<u8>>,
  capacity: usize,
  offset: usize,
  provider: P,
  logger: Logger,
}

unsafe impl<P: RawProvider + Send> Send for StaticLinearMapper<P> {}

impl<P: RawProvider> StaticLinearMapper<P> {
  /// Creates an uninitialized mapper whose arena will hold `capacity` bytes.
  ///
  /// # Errors
  ///
  /// `ErrorKind::InvalidInput` if `capacity` is zero.
  pub fn new(
    provider: P,
    capacity: usize,
  ) -> Result<Self> {
    track_assert_ne!(capacity, 0, ErrorKind::InvalidInput);
    Ok(StaticLinearMapper {
      memory: None,
      capacity,
      offset: 0,
      provider,
      logger: Logger::root(Discard, o!()),
    })
  }

  pub fn with_logger(
    mut self,
    logger: Logger,
  ) -> Self {
    self.logger = logger;
    self
  }

  /// Requests the arena from the provider unless it is already backed.
  ///
  /// Returns `false` if the provider failed; the mapper then stays
  /// uninitialized and the next `map` tries again.
  pub fn initialize(&mut self) -> bool {
    if self.memory.is_some() {
      return true;
    }

    match self.provider.allocate(self.capacity) {
      Ok(memory) => {
        debug!(self.logger, "Linear arena allocated"; "size" => self.capacity);
        self.memory = Some(memory);
        self.offset = 0;
        true
      }
      Err(e) => {
        warn!(self.logger, "Cannot allocate linear arena"; "size" => self.capacity, "error" => %e);
        false
      }
    }
  }

  /// Hands out `byte_count` bytes at the current offset.
  ///
  /// Returns `None` if `byte_count` is zero, the arena cannot be obtained, or
  /// fewer than `byte_count` bytes remain.
  pub fn map(
    &mut self,
    byte_count: usize,
  ) -> Option<NonNull<u8>> {
    self.bump(byte_count)
  }

  /// Hands out `out.len()` consecutive ranges of `byte_count` bytes each.
  ///
  /// All or nothing: on failure `out` and the offset are left untouched.
  pub fn map_batch(
    &mut self,
    byte_count: usize,
    out: &mut [*mut u8],
  ) -> bool {
    if out.is_empty() {
      return false;
    }

    let total = match byte_count.checked_mul(out.len()) {
      Some(total) => total,
      None => return false,
    };

    let Some(first) = self.bump(total) else {
      return false;
    };

    for (index, slot) in out.iter_mut().enumerate() {
      *slot = unsafe { first.as_ptr().add(index * byte_count) };
    }
    true
  }

  /// Rewinds the offset to the start of the arena, keeping the memory.
  pub fn clear(&mut self) {
    self.offset = 0;
  }

  /// Gives the arena back to the provider.
  pub fn reset(&mut self) {
    if let Some(memory) = self.memory.take() {
      unsafe { self.provider.deallocate(memory, self.capacity) };
      info!(self.logger, "Linear arena released"; "size" => self.capacity);
    }
    self.offset = 0;
  }

  pub fn is_initialized(&self) -> bool {
    self.memory.is_some()
  }

  /// Configured arena size in bytes.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  /// Bytes still available, zero while uninitialized.
  pub fn remaining(&self) -> usize {
    if self.memory.is_some() { self.capacity - self.offset } else { 0 }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  fn bump(
    &mut self,
    byte_count: usize,
  ) -> Option<NonNull<u8>> {
    if byte_count == 0 || !self.initialize() {
      return None;
    }

    let memory = self.memory?;
    if !has_enough_memory(self.capacity, self.offset, byte_count) {
      return None;
    }

    let allocation = unsafe { memory.as_ptr().add(self.offset) };
    self.offset += byte_count;
    NonNull::new(allocation)
  }
}

impl<P: RawProvider> Drop for StaticLinearMapper<P> {
  fn drop(&mut self) {
    self.reset();
  }
}
