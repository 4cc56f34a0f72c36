//! Variable-size allocation from a growing list of pages.
//!
//! Each page keeps its own free-block list in ascending address order:
//!
//! ```text
//!   pages ─► ┌────────┬─────┬───────┬─────┬─────────┐    ┌────────┬─────────┐
//!            │ header │ A   │ free ─┼─►B  │ free    │ ─► │ header │ free    │
//!            └────────┴─────┴───────┴─────┴─────────┘    └────────┴─────────┘
//! ```
//!
//! Mapping is first fit over the pages that have enough bytes available. A
//! block larger than the request is split unless the leftover could not hold
//! a block header plus a link word. Unmapping puts the block back in address
//! order and merges it with a physically adjacent predecessor and successor.
//! When no page fits, a new page of the request plus headers, rounded up to
//! the page size, is appended.
use std::ptr::{self, NonNull};

use slog::{Discard, Logger};

use self::block::{BLOCK_HEADER_SIZE, BlockHeader, PAGE_HEADER_SIZE, PageHeader};
use crate::align::checked_align_to;
use crate::link::LINK_SIZE;
use crate::provider::RawProvider;
use crate::{ErrorKind, Result};

mod block;

/// Snapshot of one page, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
  /// Address of the page as handed out by the provider.
  pub base: *const u8,
  /// Page size in bytes, headers included.
  pub size: usize,
  /// Bytes the page accounts as free.
  pub available: usize,
  pub free_blocks: usize,
  /// Sum of the payload sizes of the free blocks.
  pub free_bytes: usize,
  pub largest_free_block: usize,
}

/// General purpose allocator over pages obtained from `P`.
pub struct FreeListPageAllocator<P: RawProvider> {
  page_size: usize,
  head: *mut PageHeader,
  tail: *mut PageHeader,
  page_count: usize,
  provider: P,
  logger: Logger,
}

unsafe impl<P: RawProvider + Send> Send for FreeListPageAllocator<P> {}

impl<P: RawProvider> FreeListPageAllocator<P> {
  /// Creates an allocator without pages. Every page it later requests is a
  /// multiple of `page_size` bytes.
  ///
  /// # Errors
  ///
  /// `ErrorKind::InvalidInput` if `page_size` is not a multiple of the
  /// machine word or too small for the headers and one word of payload.
  pub fn new(
    provider: P,
    page_size: usize,
  ) -> Result<Self> {
    track_assert_eq!(page_size % LINK_SIZE, 0, ErrorKind::InvalidInput);
    track_assert!(
      page_size >= PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE + LINK_SIZE,
      ErrorKind::InvalidInput,
      "page size {} cannot hold a single block",
      page_size
    );
    Ok(FreeListPageAllocator {
      page_size,
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      page_count: 0,
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

  /// Hands out at least `byte_count` bytes.
  ///
  /// Requests are widened to at least one word and rounded to a multiple of
  /// the word. Returns `None` for a zero-byte request, if a new page was
  /// needed and the provider failed, or if the request is too large to be
  /// described.
  pub fn map(
    &mut self,
    byte_count: usize,
  ) -> Option<NonNull<u8>> {
    if byte_count == 0 {
      return None;
    }
    let request = checked_align_to(byte_count.max(LINK_SIZE), LINK_SIZE)?;

    let mut page = self.head;
    while !page.is_null() {
      unsafe {
        if (*page).available >= request {
          if let Some(payload) = Self::take_block(page, request) {
            return Some(payload);
          }
        }
        page = (*page).next;
      }
    }

    match self.add_page(request) {
      Ok(page) => unsafe { Self::take_block(page, request) },
      Err(e) => {
        warn!(self.logger, "Cannot add page"; "request" => request, "error" => %e);
        None
      }
    }
  }

  /// Maps `out.len()` blocks of `byte_count` bytes each.
  ///
  /// All or nothing: if one request fails, the blocks mapped so far are
  /// unmapped again, the pages added on the way are released, and `out` is
  /// left untouched.
  pub fn map_batch(
    &mut self,
    byte_count: usize,
    out: &mut [*mut u8],
  ) -> bool {
    if out.is_empty() || byte_count == 0 {
      return false;
    }

    let tail = self.tail;
    let page_count = self.page_count;
    let mut mapped = Vec::with_capacity(out.len());
    for _ in 0..out.len() {
      match self.map(byte_count) {
        Some(payload) => mapped.push(payload),
        None => {
          for payload in mapped.into_iter().rev() {
            unsafe { self.unmap(payload) };
          }
          unsafe { self.truncate_pages(tail, page_count) };
          return false;
        }
      }
    }

    for (slot, payload) in out.iter_mut().zip(mapped) {
      *slot = payload.as_ptr();
    }
    true
  }

  /// Gives the block at `payload` back to its page.
  ///
  /// A pointer outside every page is logged and ignored.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by `map` of this instance and not
  /// unmapped since.
  pub unsafe fn unmap(
    &mut self,
    payload: NonNull<u8>,
  ) {
    let page = self.find_page(payload.as_ptr());
    if page.is_null() {
      warn!(self.logger, "Unmapping a pointer outside every page"; "address" => format!("{:p}", payload));
      return;
    }

    unsafe { Self::release_block(page, BlockHeader::from_payload(payload.as_ptr())) }
  }

  /// Unmaps every block of `payloads`, in slice order.
  ///
  /// Returns `false` without effect if `payloads` is empty or holds a null
  /// pointer.
  ///
  /// # Safety
  ///
  /// Every pointer must satisfy the contract of [`unmap`] and appear only
  /// once.
  ///
  /// [`unmap`]: FreeListPageAllocator::unmap
  pub unsafe fn unmap_batch(
    &mut self,
    payloads: &[*mut u8],
  ) -> bool {
    if payloads.is_empty() || payloads.iter().any(|p| p.is_null()) {
      return false;
    }

    for payload in payloads.iter().filter_map(|p| NonNull::new(*p)) {
      unsafe { self.unmap(payload) };
    }
    true
  }

  /// Turns every page back into a single free block, keeping the pages.
  pub fn clear(&mut self) {
    let mut page = self.head;
    while !page.is_null() {
      unsafe {
        let next = (*page).next;
        PageHeader::format(page, (*page).size, next);
        page = next;
      }
    }
  }

  /// Gives every page back to the provider.
  pub fn reset(&mut self) {
    if self.head.is_null() {
      return;
    }

    let released = self.page_count;
    let mut page = self.head;
    while !page.is_null() {
      unsafe {
        let next = (*page).next;
        let size = (*page).size;
        self.provider.deallocate(NonNull::new_unchecked(page.cast::<u8>()), size);
        page = next;
      }
    }

    self.head = ptr::null_mut();
    self.tail = ptr::null_mut();
    self.page_count = 0;
    info!(self.logger, "Pages released"; "pages" => released);
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn page_count(&self) -> usize {
    self.page_count
  }

  /// Walks every page and its free list.
  pub fn pages(&self) -> Vec<PageInfo> {
    let mut pages = Vec::with_capacity(self.page_count);
    let mut page = self.head;
    while !page.is_null() {
      unsafe {
        let mut info = PageInfo {
          base: page.cast::<u8>(),
          size: (*page).size,
          available: (*page).available,
          free_blocks: 0,
          free_bytes: 0,
          largest_free_block: 0,
        };

        let mut block = (*page).free_head;
        while !block.is_null() {
          info.free_blocks += 1;
          info.free_bytes += (*block).size;
          info.largest_free_block = info.largest_free_block.max((*block).size);
          block = BlockHeader::next_free(block);
        }

        pages.push(info);
        page = (*page).next;
      }
    }
    pages
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  fn add_page(
    &mut self,
    request: usize,
  ) -> Result<*mut PageHeader> {
    let size = track_assert_some!(
      request
        .checked_add(PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE)
        .and_then(|bytes| checked_align_to(bytes, self.page_size)),
      ErrorKind::OutOfMemory,
      "request {} overflows the page size",
      request
    );
    let memory = track!(self.provider.allocate(size))?;

    let page = memory.as_ptr().cast::<PageHeader>();
    unsafe {
      PageHeader::format(page, size, ptr::null_mut());
      if self.tail.is_null() {
        self.head = page;
      } else {
        (*self.tail).next = page;
      }
    }
    self.tail = page;
    self.page_count += 1;

    debug!(self.logger, "Page added"; "size" => size, "pages" => self.page_count);
    Ok(page)
  }

  // Releases every page appended after `tail`, which must all be free again.
  unsafe fn truncate_pages(
    &mut self,
    tail: *mut PageHeader,
    page_count: usize,
  ) {
    if self.tail == tail {
      return;
    }

    let mut page = if tail.is_null() { self.head } else { unsafe { (*tail).next } };
    while !page.is_null() {
      unsafe {
        debug_assert_eq!((*page).available, (*page).size - PAGE_HEADER_SIZE - BLOCK_HEADER_SIZE);
        let next = (*page).next;
        let size = (*page).size;
        self.provider.deallocate(NonNull::new_unchecked(page.cast::<u8>()), size);
        page = next;
      }
    }

    if tail.is_null() {
      self.head = ptr::null_mut();
    } else {
      unsafe { (*tail).next = ptr::null_mut() };
    }
    self.tail = tail;
    debug!(self.logger, "Pages of a failed batch released"; "released" => self.page_count - page_count);
    self.page_count = page_count;
  }

  fn find_page(
    &self,
    payload: *const u8,
  ) -> *mut PageHeader {
    let mut page = self.head;
    while !page.is_null() {
      unsafe {
        if PageHeader::contains(page, payload) {
          return page;
        }
        page = (*page).next;
      }
    }
    ptr::null_mut()
  }

  // First fit within `page`. `request` is a word multiple of at least one
  // word.
  unsafe fn take_block(
    page: *mut PageHeader,
    request: usize,
  ) -> Option<NonNull<u8>> {
    unsafe {
      let mut prev: *mut BlockHeader = ptr::null_mut();
      let mut block = (*page).free_head;

      while !block.is_null() {
        let size = (*block).size;
        if size < request {
          prev = block;
          block = BlockHeader::next_free(block);
          continue;
        }

        let next = BlockHeader::next_free(block);
        let replacement = if size - request > BLOCK_HEADER_SIZE {
          let rest = BlockHeader::payload(block).add(request).cast::<BlockHeader>();
          (*rest).size = size - request - BLOCK_HEADER_SIZE;
          BlockHeader::set_next_free(rest, next);

          (*block).size = request;
          (*page).available -= request + BLOCK_HEADER_SIZE;
          rest
        } else {
          (*page).available -= size;
          next
        };

        if prev.is_null() {
          (*page).free_head = replacement;
        } else {
          BlockHeader::set_next_free(prev, replacement);
        }
        return NonNull::new(BlockHeader::payload(block));
      }
      None
    }
  }

  // Inserts `block` in address order, then merges it with its neighbours.
  unsafe fn release_block(
    page: *mut PageHeader,
    block: *mut BlockHeader,
  ) {
    unsafe {
      let mut prev: *mut BlockHeader = ptr::null_mut();
      let mut next = (*page).free_head;
      while !next.is_null() && next < block {
        prev = next;
        next = BlockHeader::next_free(next);
      }
      debug_assert_ne!(next, block, "block unmapped twice");

      BlockHeader::set_next_free(block, next);
      if prev.is_null() {
        (*page).free_head = block;
      } else {
        BlockHeader::set_next_free(prev, block);
      }
      (*page).available += (*block).size;

      if !next.is_null() && BlockHeader::end(block) == next.cast::<u8>() {
        (*block).size += BLOCK_HEADER_SIZE + (*next).size;
        BlockHeader::set_next_free(block, BlockHeader::next_free(next));
        (*page).available += BLOCK_HEADER_SIZE;
      }

      if !prev.is_null() && BlockHeader::end(prev) == block.cast::<u8>() {
        (*prev).size += BLOCK_HEADER_SIZE + (*block).size;
        BlockHeader::set_next_free(prev, BlockHeader::next_free(block));
        (*page).available += BLOCK_HEADER_SIZE;
      }
    }
  }
}

impl<P: RawProvider> Drop for FreeListPageAllocator<P> {
  fn drop(&mut self) {
    self.reset();
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use trackable::result::TestResult;

  use super::*;
  use crate::provider::testing::CountingProvider;
  use crate::provider::{BufferProvider, HeapProvider};

  const PAGE: usize = 4096;
  const FIRST_BLOCK: usize = PAGE - PAGE_HEADER_SIZE - BLOCK_HEADER_SIZE;

  fn assert_accounting<P: RawProvider>(allocator: &FreeListPageAllocator<P>) {
    for page in allocator.pages() {
      assert_eq!(page.available, page.free_bytes, "{:?}", page);
    }
  }

  #[test]
  fn test_rejects_bad_page_sizes() {
    assert!(FreeListPageAllocator::new(HeapProvider::new(), 0).is_err());
    assert!(FreeListPageAllocator::new(HeapProvider::new(), PAGE + 1).is_err());
    assert!(FreeListPageAllocator::new(HeapProvider::new(), PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE).is_err());
    assert!(FreeListPageAllocator::new(HeapProvider::new(), PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE + LINK_SIZE).is_ok());
  }

  #[test]
  fn test_map_unmap_map_returns_same_address() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    let first = allocator.map(100).unwrap();
    unsafe { allocator.unmap(first) };
    assert_eq!(allocator.pages()[0].free_blocks, 1);
    assert_eq!(allocator.pages()[0].available, FIRST_BLOCK);

    let second = allocator.map(100).unwrap();
    assert_eq!(first, second);
    assert_eq!(allocator.page_count(), 1);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_steady_state_loop_does_not_grow() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    let first = allocator.map(48).unwrap();
    for _ in 0..1000 {
      let payload = allocator.map(48).unwrap();
      unsafe { allocator.unmap(payload) };
    }
    let again = allocator.map(48).unwrap();
    unsafe {
      allocator.unmap(again);
      allocator.unmap(first);
    }

    assert_eq!(allocator.page_count(), 1);
    assert_eq!(allocator.pages()[0].free_blocks, 1);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_large_requests_add_pages() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    let small = allocator.map(100).unwrap();
    unsafe { allocator.unmap(small) };

    allocator.map(3000).unwrap();
    assert_eq!(allocator.page_count(), 1);
    allocator.map(3000).unwrap();
    assert_eq!(allocator.page_count(), 2);

    // Headers push a page sized request over one page.
    allocator.map(PAGE).unwrap();
    assert_eq!(allocator.page_count(), 3);
    assert_eq!(allocator.pages()[2].size, 2 * PAGE);
    assert_eq!(allocator.provider().live_bytes(), 4 * PAGE);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_split_leaves_remainder() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    let payload = allocator.map(64).unwrap();
    let page = allocator.pages()[0];
    assert_eq!(page.free_blocks, 1);
    assert_eq!(page.available, FIRST_BLOCK - 64 - BLOCK_HEADER_SIZE);
    assert_eq!(payload.as_ptr() as usize, page.base as usize + PAGE_HEADER_SIZE + BLOCK_HEADER_SIZE);

    // Rounded to a word multiple.
    let odd = allocator.map(13).unwrap();
    assert_eq!(odd.as_ptr() as usize - payload.as_ptr() as usize, 64 + BLOCK_HEADER_SIZE);
    assert_eq!(allocator.pages()[0].available, FIRST_BLOCK - 64 - align!(13) - 2 * BLOCK_HEADER_SIZE);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_small_surplus_grants_whole_block() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    allocator.map(64).unwrap();
    let rest = FIRST_BLOCK - 64 - BLOCK_HEADER_SIZE;

    // A surplus of exactly one header is not worth a block.
    allocator.map(rest - BLOCK_HEADER_SIZE).unwrap();
    let page = allocator.pages()[0];
    assert_eq!(page.free_blocks, 0);
    assert_eq!(page.available, 0);

    allocator.map(8).unwrap();
    assert_eq!(allocator.page_count(), 2);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_coalesces_both_neighbours() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    let a = allocator.map(64).unwrap();
    let b = allocator.map(64).unwrap();
    let c = allocator.map(64).unwrap();
    let d = allocator.map(64).unwrap();

    unsafe {
      allocator.unmap(a);
      allocator.unmap(c);
    }
    assert_eq!(allocator.pages()[0].free_blocks, 3);
    assert_accounting(&allocator);

    // `b` closes the gap between `a` and `c`.
    unsafe { allocator.unmap(b) };
    let page = allocator.pages()[0];
    assert_eq!(page.free_blocks, 2);
    let merged = 3 * 64 + 2 * BLOCK_HEADER_SIZE;
    let tail = FIRST_BLOCK - 4 * (64 + BLOCK_HEADER_SIZE);
    assert_eq!(page.available, merged + tail);
    assert_eq!(page.largest_free_block, tail);
    assert_accounting(&allocator);

    unsafe { allocator.unmap(d) };
    let page = allocator.pages()[0];
    assert_eq!(page.free_blocks, 1);
    assert_eq!(page.available, FIRST_BLOCK);
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_mixed_sizes_keep_accounting() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), 1024))?;
    let mut live = Vec::new();

    for round in 0..200usize {
      let byte_count = 1 + (round * 37) % 300;
      let payload = allocator.map(byte_count).unwrap();
      unsafe { payload.as_ptr().write_bytes(round as u8, byte_count) };
      live.push((payload, byte_count, round as u8));

      if round % 3 == 0 {
        let (payload, _, _) = live.swap_remove(round % live.len());
        unsafe { allocator.unmap(payload) };
      }
      assert_accounting(&allocator);
    }

    for (payload, byte_count, fill) in &live {
      let bytes = unsafe { std::slice::from_raw_parts(payload.as_ptr(), *byte_count) };
      assert!(bytes.iter().all(|b| b == fill));
    }

    for (payload, _, _) in live {
      unsafe { allocator.unmap(payload) };
    }
    for page in allocator.pages() {
      assert_eq!(page.free_blocks, 1);
      assert_eq!(page.available, page.size - PAGE_HEADER_SIZE - BLOCK_HEADER_SIZE);
    }
    Ok(())
  }

  #[test]
  fn test_batch_map_and_unmap() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;

    let mut out = [ptr::null_mut(); 8];
    assert!(allocator.map_batch(200, &mut out));
    let distinct: HashSet<_> = out.iter().map(|p| *p as usize).collect();
    assert_eq!(distinct.len(), 8);

    unsafe {
      assert!(!allocator.unmap_batch(&[]));
      assert!(!allocator.unmap_batch(&[out[0], ptr::null_mut()]));
      assert!(allocator.unmap_batch(&out));
    }
    assert_eq!(allocator.pages()[0].free_blocks, 1);
    assert_eq!(allocator.pages()[0].available, FIRST_BLOCK);
    Ok(())
  }

  #[test]
  fn test_failed_batch_rolls_back() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    let kept = allocator.map(16).unwrap();
    let before = allocator.pages();

    // Two blocks fit in the first page, the third needs a page that fails.
    allocator.provider.fail_next(1);
    let mut out = [ptr::null_mut(); 3];
    assert!(!allocator.map_batch(1800, &mut out));
    assert!(out.iter().all(|p| p.is_null()));
    assert_eq!(allocator.pages(), before);
    assert_eq!(allocator.page_count(), 1);

    unsafe { allocator.unmap(kept) };
    assert_eq!(allocator.pages()[0].available, FIRST_BLOCK);
    Ok(())
  }

  #[test]
  fn test_failed_batch_releases_added_pages() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    let kept = allocator.map(16).unwrap();
    let before = allocator.pages();

    // The second block needs a new page, the third one another that fails.
    allocator.provider.fail_after(1, 1);
    let mut out = [ptr::null_mut(); 3];
    assert!(!allocator.map_batch(3000, &mut out));
    assert!(out.iter().all(|p| p.is_null()));
    assert_eq!(allocator.pages(), before);
    assert_eq!(allocator.page_count(), 1);
    assert_eq!(allocator.provider().live_blocks(), 1);
    assert_eq!(allocator.provider().deallocations(), 1);

    // The chain still grows normally afterwards.
    assert!(allocator.map_batch(3000, &mut out[..2]));
    assert_eq!(allocator.page_count(), 2);
    unsafe { allocator.unmap(kept) };
    assert_accounting(&allocator);
    Ok(())
  }

  #[test]
  fn test_failed_batch_from_empty_allocator() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    allocator.provider.fail_after(1, 1);
    let mut out = [ptr::null_mut(); 2];
    assert!(!allocator.map_batch(3000, &mut out));
    assert_eq!(allocator.page_count(), 0);
    assert!(allocator.pages().is_empty());
    assert_eq!(allocator.provider().live_blocks(), 0);

    assert!(allocator.map(8).is_some());
    assert_eq!(allocator.page_count(), 1);
    Ok(())
  }

  #[test]
  fn test_zero_sized_requests() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    assert!(allocator.map(0).is_none());
    let mut out = [ptr::null_mut(); 2];
    assert!(!allocator.map_batch(0, &mut out));
    assert!(out.iter().all(|p| p.is_null()));
    assert!(!allocator.map_batch(8, &mut []));
    assert_eq!(allocator.page_count(), 0);
    assert_eq!(allocator.provider().allocations(), 0);

    // Below one word is still a request.
    assert!(allocator.map(1).is_some());
    assert_eq!(allocator.provider().allocations(), 1);
    Ok(())
  }

  #[test]
  fn test_failed_growth_keeps_pages() -> TestResult {
    let mut provider = CountingProvider::new();
    let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

    allocator.map(2000).unwrap();
    let before = allocator.pages();

    allocator.provider.fail_next(1);
    assert!(allocator.map(3000).is_none());
    assert_eq!(allocator.pages(), before);
    assert!(allocator.map(usize::MAX).is_none());
    assert!(allocator.map(usize::MAX - PAGE).is_none());
    assert_eq!(allocator.pages(), before);

    assert!(allocator.map(3000).is_some());
    assert_eq!(allocator.page_count(), 2);
    Ok(())
  }

  #[test]
  fn test_unmap_foreign_pointer_is_ignored() -> TestResult {
    let mut allocator = track!(FreeListPageAllocator::new(HeapProvider::new(), PAGE))?;
    allocator.map(32).unwrap();
    let before = allocator.pages();

    let mut foreign = [0usize; 4];
    unsafe { allocator.unmap(NonNull::from(&mut foreign[2]).cast::<u8>()) };
    assert_eq!(allocator.pages(), before);
    Ok(())
  }

  #[test]
  fn test_clear_and_reset() -> TestResult {
    let mut provider = CountingProvider::new();
    {
      let mut allocator = track!(FreeListPageAllocator::new(&mut provider, PAGE))?;

      for _ in 0..10 {
        allocator.map(1000).unwrap();
      }
      let pages = allocator.page_count();
      assert!(pages > 1);

      allocator.clear();
      assert_eq!(allocator.page_count(), pages);
      for page in allocator.pages() {
        assert_eq!(page.free_blocks, 1);
        assert_eq!(page.available, page.size - PAGE_HEADER_SIZE - BLOCK_HEADER_SIZE);
      }
      assert_eq!(allocator.provider().deallocations(), 0);

      allocator.reset();
      assert_eq!(allocator.page_count(), 0);
      assert!(allocator.pages().is_empty());
      assert_eq!(allocator.provider().live_blocks(), 0);

      allocator.map(10).unwrap();
    }
    assert_eq!(provider.live_blocks(), 0);
    Ok(())
  }

  #[test]
  fn test_pages_from_fixed_buffer() -> TestResult {
    #[repr(align(16))]
    struct Backing([u8; 1024]);

    let mut backing = Backing([0; 1024]);
    let mut allocator = track!(FreeListPageAllocator::new(BufferProvider::new(&mut backing.0), 256))?;

    let mut out = [ptr::null_mut(); 4];
    assert!(allocator.map_batch(150, &mut out));
    assert_eq!(allocator.page_count(), 4);
    assert!(allocator.map(150).is_none());
    assert_eq!(allocator.provider().used(), 1024);
    Ok(())
  }
}
