//! In-page metadata of the free-list allocator.
//!
//! ```text
//!   page:
//!   ┌────────────────┬────────┬──────────────┬────────┬──────────────────┐
//!   │  PageHeader    │ Block  │   payload    │ Block  │  payload / link  │
//!   │ size available │ Header │  (mapped)    │ Header │  (free)          │
//!   │ free_head next │ size   │              │ size   │ next ─► ...      │
//!   └────────────────┴────────┴──────────────┴────────┴──────────────────┘
//! ```
//!
//! A block header holds only the payload size. While a block is free its
//! payload's first word is the link to the next free block of the page, so
//! every payload is at least one word long.
use std::mem;
use std::ptr;

use crate::link;

pub const PAGE_HEADER_SIZE: usize = mem::size_of::<PageHeader>();
pub const BLOCK_HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

#[repr(C)]
pub struct BlockHeader {
  pub size: usize,
}

impl BlockHeader {
  /// Header of the block whose payload starts at `payload`.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut BlockHeader {
    unsafe { payload.sub(BLOCK_HEADER_SIZE) }.cast::<BlockHeader>()
  }

  pub unsafe fn payload(block: *mut BlockHeader) -> *mut u8 {
    unsafe { block.cast::<u8>().add(BLOCK_HEADER_SIZE) }
  }

  /// First byte past the payload, where a physically adjacent block starts.
  pub unsafe fn end(block: *mut BlockHeader) -> *mut u8 {
    unsafe { Self::payload(block).add((*block).size) }
  }

  pub unsafe fn next_free(block: *mut BlockHeader) -> *mut BlockHeader {
    unsafe { link::read_ptr(Self::payload(block)) }.cast::<BlockHeader>()
  }

  pub unsafe fn set_next_free(
    block: *mut BlockHeader,
    next: *mut BlockHeader,
  ) {
    unsafe { link::write_ptr(Self::payload(block), next.cast::<u8>()) }
  }
}

#[repr(C)]
pub struct PageHeader {
  pub size: usize,
  pub available: usize,
  pub free_head: *mut BlockHeader,
  pub next: *mut PageHeader,
}

impl PageHeader {
  pub fn new(
    size: usize,
    available: usize,
    free_head: *mut BlockHeader,
    next: *mut PageHeader,
  ) -> Self {
    Self {
      size,
      available,
      free_head,
      next,
    }
  }

  /// Writes a fresh header into `page` and turns the rest of it into one free
  /// block. The `next` link of an existing header is kept.
  pub unsafe fn format(
    page: *mut PageHeader,
    size: usize,
    next: *mut PageHeader,
  ) {
    unsafe {
      let block = Self::first_block(page);
      let available = size - PAGE_HEADER_SIZE - BLOCK_HEADER_SIZE;

      (*block).size = available;
      BlockHeader::set_next_free(block, ptr::null_mut());
      page.write(Self::new(size, available, block, next));
    }
  }

  pub unsafe fn first_block(page: *mut PageHeader) -> *mut BlockHeader {
    unsafe { page.cast::<u8>().add(PAGE_HEADER_SIZE) }.cast::<BlockHeader>()
  }

  /// Whether `payload` can be a block payload inside `page`.
  pub unsafe fn contains(
    page: *mut PageHeader,
    payload: *const u8,
  ) -> bool {
    let start = page as usize + PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE;
    let end = page as usize + unsafe { (*page).size };
    (start..end).contains(&(payload as usize))
  }
}
