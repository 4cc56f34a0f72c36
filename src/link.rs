//! Intrusive singly linked lists threaded through raw memory.
//!
//! A free chunk or block stores the address of its successor in its own first
//! pointer-sized word:
//!
//! ```text
//!   ┌────────┬─────────┐   ┌────────┬─────────┐   ┌────────┬─────────┐
//!   │ next ──┼──► ...  │   │ next ──┼──► ...  │   │ null   │         │
//!   └────────┴─────────┘   └────────┴─────────┘   └────────┴─────────┘
//!     unit 0                 unit 1                 unit n - 1
//! ```
//!
//! These are the only functions in the crate that read or write a link word.
//! Every slot passed in must be valid for a pointer-sized read or write and be
//! aligned to [`MIN_ALIGN`](crate::MIN_ALIGN).
use std::{mem, ptr};

/// Size of one link word in bytes.
pub const LINK_SIZE: usize = mem::size_of::<*mut u8>();

/// Stores `target` in the link word at `slot`.
///
/// # Safety
///
/// `slot` must be valid for writes of a pointer-sized, pointer-aligned word.
#[inline]
pub unsafe fn write_ptr(
  slot: *mut u8,
  target: *const u8,
) {
  debug_assert_eq!(slot as usize % mem::align_of::<*mut u8>(), 0);
  unsafe { slot.cast::<*mut u8>().write(target as *mut u8) }
}

/// Loads the link word stored at `slot`.
///
/// # Safety
///
/// `slot` must be valid for reads of a pointer-sized, pointer-aligned word
/// previously written by [`write_ptr`] or [`write_null`].
#[inline]
pub unsafe fn read_ptr(slot: *const u8) -> *mut u8 {
  debug_assert_eq!(slot as usize % mem::align_of::<*mut u8>(), 0);
  unsafe { slot.cast::<*mut u8>().read() }
}

/// Terminates a list at `slot`.
///
/// # Safety
///
/// Same as [`write_ptr`].
#[inline]
pub unsafe fn write_null(slot: *mut u8) {
  unsafe { write_ptr(slot, ptr::null()) }
}

/// Links `count` units laid out every `stride` bytes starting at `memory`.
///
/// Unit `i` ends up pointing at unit `i + 1`. The last unit's slot is left
/// untouched; the caller writes the terminator. A no-op when `count < 2`.
///
/// # Safety
///
/// `memory .. memory + count * stride` must be writable and `stride` a
/// multiple of the pointer alignment.
pub unsafe fn link_stride(
  memory: *mut u8,
  count: usize,
  stride: usize,
) {
  if count < 2 {
    return;
  }

  for index in 0..count - 1 {
    unsafe {
      let unit = memory.add(index * stride);
      write_ptr(unit, unit.add(stride));
    }
  }
}

/// Links the units listed in `units` in slice order.
///
/// The last unit's slot is left untouched. A no-op when fewer than two units
/// are given.
///
/// # Safety
///
/// Every pointer in `units` must satisfy the requirements of [`write_ptr`].
pub unsafe fn link_ptrs<T>(units: &[*mut T]) {
  for pair in units.windows(2) {
    unsafe { write_ptr(pair[0].cast::<u8>(), pair[1].cast::<u8>()) }
  }
}
