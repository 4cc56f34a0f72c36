use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use slog::{Discard, Logger};

use crate::link::{self, LINK_SIZE};
use crate::pool::{ChunkLayout, FreeChunks};
use crate::provider::RawProvider;
use crate::Result;

/// Pool mapper that grows by whole pools when its free list runs dry.
///
/// Every pool starts with a link word pointing at the next pool, followed by
/// its chunks:
///
/// ```text
///   pools ─► ┌──────┬────────┬─────┬────────┐    ┌──────┬────────┬─────┐
///            │ next─┼─chunk0─┼ ... ┼─chunkN─┤ ─► │ null │ chunk0 │ ... │
///            └──────┴────────┴─────┴────────┘    └──────┴────────┴─────┘
/// ```
///
/// A request for `n` chunks with only `f` free allocates
/// `ceil((n - f) / chunk_count)` new pools, so pools stay uniformly sized.
pub struct DynamicPoolMapper<T, P: RawProvider> {
  chunk_count: usize,
  pool_bytes: usize,
  pools_head: *mut u8,
  pools_tail: *mut u8,
  pool_count: usize,
  free: FreeChunks,
  provider: P,
  logger: Logger,
  _chunk: PhantomData<*mut T>,
}

unsafe impl<T, P: RawProvider + Send> Send for DynamicPoolMapper<T, P> {}

impl<T, P: RawProvider> DynamicPoolMapper<T, P> {
  /// Creates an empty mapper growing by pools of `chunk_count` chunks of `T`.
  ///
  /// # Errors
  ///
  /// Same conditions as [`StaticPoolMapper::new`](crate::StaticPoolMapper::new).
  pub fn new(
    provider: P,
    chunk_count: usize,
  ) -> Result<Self> {
    let chunk_bytes = track!(ChunkLayout::<T>::validate(chunk_count))?;
    Ok(DynamicPoolMapper {
      chunk_count,
      pool_bytes: LINK_SIZE + chunk_bytes,
      pools_head: ptr::null_mut(),
      pools_tail: ptr::null_mut(),
      pool_count: 0,
      free: FreeChunks::new(),
      provider,
      logger: Logger::root(Discard, o!()),
      _chunk: PhantomData,
    })
  }

  pub fn with_logger(
    mut self,
    logger: Logger,
  ) -> Self {
    self.logger = logger;
    self
  }

  /// Grows until at least `chunk_count` chunks are free.
  ///
  /// Returns `false` if the provider failed; no pool of the failed growth
  /// step is kept.
  pub fn reserve(
    &mut self,
    chunk_count: usize,
  ) -> bool {
    let missing = chunk_count.saturating_sub(self.free.count);
    if missing == 0 {
      return true;
    }

    let pools = (missing - 1) / self.chunk_count + 1;
    match self.grow(pools) {
      Ok(()) => true,
      Err(e) => {
        warn!(self.logger, "Cannot grow pool mapper"; "pools" => pools, "pool_bytes" => self.pool_bytes, "error" => %e);
        false
      }
    }
  }

  /// Takes one chunk off the free list, growing by one pool if it is empty.
  pub fn map(&mut self) -> Option<NonNull<T>> {
    if !self.reserve(1) {
      return None;
    }
    NonNull::new(unsafe { self.free.pop() }.cast::<T>())
  }

  /// Fills `out` with chunks, growing first if too few are free.
  ///
  /// All or nothing: on failure `out` is left untouched.
  pub fn map_batch(
    &mut self,
    out: &mut [*mut T],
  ) -> bool {
    if out.is_empty() || !self.reserve(out.len()) {
      return false;
    }

    for slot in out.iter_mut() {
      *slot = unsafe { self.free.pop() }.cast::<T>();
    }
    true
  }

  /// Puts `chunk` back at the tail of the free list.
  ///
  /// # Safety
  ///
  /// `chunk` must have been mapped by this instance and not unmapped since.
  pub unsafe fn unmap(
    &mut self,
    chunk: NonNull<T>,
  ) {
    if self.pools_head.is_null() {
      return;
    }
    unsafe { self.free.append(&[chunk.as_ptr()]) }
  }

  /// Puts every chunk of `chunks` back, in slice order.
  ///
  /// Returns `false` without effect if `chunks` is empty or holds a null
  /// pointer.
  ///
  /// # Safety
  ///
  /// Every chunk must have been mapped by this instance, not unmapped since,
  /// and appear only once.
  pub unsafe fn unmap_batch(
    &mut self,
    chunks: &[*mut T],
  ) -> bool {
    if chunks.is_empty() || chunks.iter().any(|c| c.is_null()) || self.pools_head.is_null() {
      return false;
    }
    unsafe { self.free.append(chunks) };
    true
  }

  /// Returns every chunk of every pool to the free list, keeping the pools.
  pub fn clear(&mut self) {
    self.free.clear();

    let mut pool = self.pools_head;
    for _ in 0..self.pool_count {
      unsafe {
        self.free.append_pool(pool.add(LINK_SIZE), self.chunk_count, Self::chunk_size());
        pool = link::read_ptr(pool);
      }
    }
  }

  /// Gives every pool back to the provider.
  pub fn reset(&mut self) {
    if self.pools_head.is_null() {
      return;
    }

    let released = self.pool_count;
    unsafe { self.release_pools(self.pools_head, self.pool_count) };

    self.pools_head = ptr::null_mut();
    self.pools_tail = ptr::null_mut();
    self.pool_count = 0;
    self.free.clear();
    info!(self.logger, "Pools released"; "pools" => released, "pool_bytes" => self.pool_bytes);
  }

  /// Size in bytes of every chunk handed out.
  pub fn chunk_size() -> usize {
    ChunkLayout::<T>::SIZE
  }

  /// Chunks per pool.
  pub fn chunk_count(&self) -> usize {
    self.chunk_count
  }

  pub fn pool_count(&self) -> usize {
    self.pool_count
  }

  pub fn free_count(&self) -> usize {
    self.free.count
  }

  /// Chunks owned by the mapper, mapped or free.
  pub fn capacity(&self) -> usize {
    self.pool_count * self.chunk_count
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  // Allocates `pools` pools as a detached chain first, so a failure part way
  // leaves the existing pools and free list untouched.
  fn grow(
    &mut self,
    pools: usize,
  ) -> Result<()> {
    let mut first: *mut u8 = ptr::null_mut();
    let mut last: *mut u8 = ptr::null_mut();

    for allocated in 0..pools {
      let pool = match self.provider.allocate(self.pool_bytes) {
        Ok(memory) => memory.as_ptr(),
        Err(e) => {
          unsafe { self.release_pools(first, allocated) };
          return Err(track!(e));
        }
      };

      unsafe { link::write_null(pool) };
      if first.is_null() {
        first = pool;
      } else {
        unsafe { link::write_ptr(last, pool) };
      }
      last = pool;
    }

    let mut pool = first;
    while !pool.is_null() {
      unsafe {
        self.free.append_pool(pool.add(LINK_SIZE), self.chunk_count, Self::chunk_size());
        pool = link::read_ptr(pool);
      }
    }

    if self.pools_head.is_null() {
      self.pools_head = first;
    } else {
      unsafe { link::write_ptr(self.pools_tail, first) };
    }
    self.pools_tail = last;
    self.pool_count += pools;

    debug!(self.logger, "Pools added"; "added" => pools, "pools" => self.pool_count, "free_chunks" => self.free.count);
    Ok(())
  }

  // Walks `count` pools from `pool`, handing each back to the provider.
  unsafe fn release_pools(
    &mut self,
    mut pool: *mut u8,
    count: usize,
  ) {
    for _ in 0..count {
      unsafe {
        let next = link::read_ptr(pool);
        self.provider.deallocate(NonNull::new_unchecked(pool), self.pool_bytes);
        pool = next;
      }
    }
  }
}

impl<T, P: RawProvider> Drop for DynamicPoolMapper<T, P> {
  fn drop(&mut self) {
    self.reset();
  }
}
