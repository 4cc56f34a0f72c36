use std::mem;
use std::ptr::{self, NonNull};

use slog::{Discard, Logger};

use crate::linear::has_enough_memory;
use crate::provider::RawProvider;
use crate::{ErrorKind, Result};

/// Header at the start of every block of the chain; the payload follows it.
#[repr(C)]
struct BlockNode {
  offset: usize,
  next: *mut BlockNode,
}

const NODE_SIZE: usize = mem::size_of::<BlockNode>();

/// Bump mapper over a chain of equally sized blocks.
///
/// ```text
///   head                          current                 tail
///   ┌──────┬──────────────┐      ┌──────┬──────────────┐  ┌──────┬──────────────┐
///   │ node │ ████████████ │ ───► │ node │ █████░░░░░░░ │─►│ node │ ░░░░░░░░░░░░ │
///   └──────┴──────────────┘      └──────┴──────────────┘  └──────┴──────────────┘
///           block_size bytes
/// ```
///
/// When the current block cannot hold a request the mapper moves to the next
/// block of the chain, and only appends a new block (one provider call) when
/// there is none. A request larger than `block_size` always fails.
pub struct DynamicLinearMapper<P: RawProvider> {
  block_size: usize,
  head: *mut BlockNode,
  tail: *mut BlockNode,
  current: *mut BlockNode,
  block_count: usize,
  provider: P,
  logger: Logger,
}

unsafe impl<P: RawProvider + Send> Send for DynamicLinearMapper<P> {}

impl<P: RawProvider> DynamicLinearMapper<P> {
  /// Creates an empty mapper whose blocks hold `block_size` bytes each.
  ///
  /// # Errors
  ///
  /// `ErrorKind::InvalidInput` if `block_size` is zero or too large to be
  /// requested together with its node header.
  pub fn new(
    provider: P,
    block_size: usize,
  ) -> Result<Self> {
    track_assert_ne!(block_size, 0, ErrorKind::InvalidInput);
    track_assert!(
      block_size.checked_add(NODE_SIZE).is_some(),
      ErrorKind::InvalidInput;
      block_size
    );
    Ok(DynamicLinearMapper {
      block_size,
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      current: ptr::null_mut(),
      block_count: 0,
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

  /// Allocates the first block unless the chain already exists.
  pub fn initialize(&mut self) -> bool {
    if !self.head.is_null() {
      return true;
    }

    match self.append_block() {
      Ok(node) => {
        self.current = node;
        true
      }
      Err(e) => {
        warn!(self.logger, "Cannot allocate first linear block"; "block_size" => self.block_size, "error" => %e);
        false
      }
    }
  }

  /// Hands out `byte_count` bytes from the current block, moving along or
  /// growing the chain if needed.
  pub fn map(
    &mut self,
    byte_count: usize,
  ) -> Option<NonNull<u8>> {
    self.bump(byte_count)
  }

  /// Hands out `out.len()` consecutive ranges of `byte_count` bytes each.
  ///
  /// The ranges are carved from a single block, so `byte_count * out.len()`
  /// must not exceed the block size. All or nothing.
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

  /// Rewinds every block and makes the head the current block again.
  pub fn clear(&mut self) {
    let mut node = self.head;
    while !node.is_null() {
      unsafe {
        (*node).offset = 0;
        node = (*node).next;
      }
    }
    self.current = self.head;
  }

  /// Gives every block back to the provider.
  pub fn reset(&mut self) {
    if self.head.is_null() {
      return;
    }

    let released = self.block_count;
    let mut node = self.head;
    while !node.is_null() {
      unsafe {
        let next = (*node).next;
        self.provider.deallocate(NonNull::new_unchecked(node.cast::<u8>()), NODE_SIZE + self.block_size);
        node = next;
      }
    }

    self.head = ptr::null_mut();
    self.tail = ptr::null_mut();
    self.current = ptr::null_mut();
    self.block_count = 0;
    info!(self.logger, "Linear blocks released"; "blocks" => released, "block_size" => self.block_size);
  }

  pub fn is_initialized(&self) -> bool {
    !self.head.is_null()
  }

  /// Configured payload size of each block, also the largest single request.
  pub fn block_size(&self) -> usize {
    self.block_size
  }

  pub fn block_count(&self) -> usize {
    self.block_count
  }

  /// Offset into the current block, zero while uninitialized.
  pub fn offset(&self) -> usize {
    if self.current.is_null() { 0 } else { unsafe { (*self.current).offset } }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  fn bump(
    &mut self,
    byte_count: usize,
  ) -> Option<NonNull<u8>> {
    if byte_count == 0 || byte_count > self.block_size || !self.initialize() {
      return None;
    }

    let node = match self.find_block(byte_count) {
      Some(node) => node,
      None => match self.append_block() {
        Ok(node) => node,
        Err(e) => {
          warn!(self.logger, "Cannot grow linear chain"; "blocks" => self.block_count, "error" => %e);
          return None;
        }
      },
    };

    self.current = node;
    unsafe {
      let payload = node.cast::<u8>().add(NODE_SIZE);
      let allocation = payload.add((*node).offset);
      (*node).offset += byte_count;
      NonNull::new(allocation)
    }
  }

  // The current block or one of its successors that can hold `byte_count`.
  fn find_block(
    &self,
    byte_count: usize,
  ) -> Option<*mut BlockNode> {
    let mut node = self.current;
    while !node.is_null() {
      unsafe {
        if has_enough_memory(self.block_size, (*node).offset, byte_count) {
          return Some(node);
        }
        node = (*node).next;
      }
    }
    None
  }

  fn append_block(&mut self) -> Result<*mut BlockNode> {
    let memory = track!(self.provider.allocate(NODE_SIZE + self.block_size))?;
    let node = memory.as_ptr().cast::<BlockNode>();

    unsafe {
      node.write(BlockNode {
        offset: 0,
        next: ptr::null_mut(),
      });

      if self.head.is_null() {
        self.head = node;
      } else {
        (*self.tail).next = node;
      }
    }
    self.tail = node;
    self.block_count += 1;

    debug!(self.logger, "Linear block appended"; "blocks" => self.block_count, "block_size" => self.block_size);
    Ok(node)
  }
}

impl<P: RawProvider> Drop for DynamicLinearMapper<P> {
  fn drop(&mut self) {
    self.reset();
  }
}
