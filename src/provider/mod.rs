//! Raw byte providers.
//!
//! Every mapping strategy obtains its backing memory from a [`RawProvider`]
//! and gives it back through the same provider. The strategies never talk to
//! the system allocator directly, so the same mapper can sit on top of
//! `malloc`, the Rust global allocator, or a fixed buffer.
//!
//! ```text
//!   strategy ──allocate(n)──► RawProvider ──► malloc / std::alloc / &mut [u8]
//!            ◄──NonNull<u8>──
//! ```
use std::ptr::NonNull;

pub use self::buffer::BufferProvider;
pub use self::heap::HeapProvider;
pub use self::malloc::MallocProvider;

use crate::Result;

mod buffer;
mod heap;
mod malloc;

pub(crate) mod testing;

/// Source of raw, untyped memory.
///
/// Implementations must hand out blocks that are at least `byte_count` bytes
/// long and aligned to [`MIN_ALIGN`](crate::MIN_ALIGN). Failure is reported
/// through the returned `Result`, never by panicking.
pub trait RawProvider {
  /// Requests a block of `byte_count` bytes.
  ///
  /// # Errors
  ///
  /// - `ErrorKind::InvalidInput` if `byte_count` is zero
  /// - `ErrorKind::OutOfMemory` if the request cannot be satisfied
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>>;

  /// Returns a block previously obtained from [`allocate`](Self::allocate).
  ///
  /// # Safety
  ///
  /// `memory` must come from this provider, with the same `byte_count`, and
  /// must not have been returned already.
  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    byte_count: usize,
  );
}

impl<P: RawProvider + ?Sized> RawProvider for &mut P {
  fn allocate(
    &mut self,
    byte_count: usize,
  ) -> Result<NonNull<u8>> {
    (**self).allocate(byte_count)
  }

  unsafe fn deallocate(
    &mut self,
    memory: NonNull<u8>,
    byte_count: usize,
  ) {
    unsafe { (**self).deallocate(memory, byte_count) }
  }
}
