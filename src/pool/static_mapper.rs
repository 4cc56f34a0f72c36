use std::marker::PhantomData;
use std::ptr::NonNull;

use slog::{Discard, Logger};

use crate::pool::{ChunkLayout, FreeChunks};
use crate::provider::RawProvider;
use crate::Result;

/// Pool mapper backed by exactly one pool of `chunk_count` chunks.
///
/// The pool is requested on [`initialize`] or on the first map. Once every
/// chunk is mapped, further maps fail until chunks are unmapped; the mapper
/// never grows.
///
/// [`initialize`]: StaticPoolMapper::initialize
pub struct StaticPoolMapper<T, P: RawProvider> {
  memory: Option<NonNull<u8>>,
  chunk_count: usize,
  pool_bytes: usize,
  free: FreeChunks,
  provider: P,
  logger: Logger,
  _chunk: PhantomData<*mut T>,
}

unsafe impl<T, P: RawProvider + Send> Send for StaticPoolMapper<T, P> {}

impl<T, P: RawProvider> StaticPoolMapper<T, P> {
  /// Creates an empty mapper for a pool of `chunk_count` chunks of `T`.
  ///
  /// # Errors
  ///
  /// `ErrorKind::InvalidInput` if `chunk_count` is zero, the pool size
  /// overflows, or `T` needs more alignment than providers guarantee.
  pub fn new(
    provider: P,
    chunk_count: usize,
  ) -> Result<Self> {
    let pool_bytes = track!(ChunkLayout::<T>::validate(chunk_count))?;
    Ok(StaticPoolMapper {
      memory: None,
      chunk_count,
      pool_bytes,
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

  /// Requests the pool from the provider unless it is already allocated.
  pub fn initialize(&mut self) -> bool {
    if self.memory.is_some() {
      return true;
    }

    match self.provider.allocate(self.pool_bytes) {
      Ok(memory) => {
        self.memory = Some(memory);
        self.assemble_chunks();
        debug!(self.logger, "Pool allocated"; "chunks" => self.chunk_count, "chunk_size" => Self::chunk_size());
        true
      }
      Err(e) => {
        warn!(self.logger, "Cannot allocate pool"; "bytes" => self.pool_bytes, "error" => %e);
        false
      }
    }
  }

  /// Takes one chunk off the free list.
  pub fn map(&mut self) -> Option<NonNull<T>> {
    if !self.initialize() || self.free.count == 0 {
      return None;
    }
    NonNull::new(unsafe { self.free.pop() }.cast::<T>())
  }

  /// Fills `out` with free chunks.
  ///
  /// All or nothing: if fewer than `out.len()` chunks are free, `out` is left
  /// untouched and `false` is returned.
  pub fn map_batch(
    &mut self,
    out: &mut [*mut T],
  ) -> bool {
    if out.is_empty() || !self.initialize() || self.free.count < out.len() {
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
    if self.memory.is_none() {
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
    if chunks.is_empty() || chunks.iter().any(|c| c.is_null()) || self.memory.is_none() {
      return false;
    }
    unsafe { self.free.append(chunks) };
    true
  }

  /// Returns every chunk to the free list without releasing the pool.
  pub fn clear(&mut self) {
    if self.memory.is_some() {
      self.assemble_chunks();
    }
  }

  /// Gives the pool back to the provider.
  pub fn reset(&mut self) {
    if let Some(memory) = self.memory.take() {
      unsafe { self.provider.deallocate(memory, self.pool_bytes) };
      info!(self.logger, "Pool released"; "chunks" => self.chunk_count);
    }
    self.free.clear();
  }

  /// Size in bytes of every chunk handed out.
  pub fn chunk_size() -> usize {
    ChunkLayout::<T>::SIZE
  }

  pub fn chunk_count(&self) -> usize {
    self.chunk_count
  }

  pub fn free_count(&self) -> usize {
    self.free.count
  }

  /// Chunks owned by the mapper, zero until the pool is allocated.
  pub fn capacity(&self) -> usize {
    if self.memory.is_some() { self.chunk_count } else { 0 }
  }

  pub fn is_initialized(&self) -> bool {
    self.memory.is_some()
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  fn assemble_chunks(&mut self) {
    let Some(memory) = self.memory else {
      return;
    };
    self.free.clear();
    unsafe { self.free.append_pool(memory.as_ptr(), self.chunk_count, Self::chunk_size()) };
  }
}

impl<T, P: RawProvider> Drop for StaticPoolMapper<T, P> {
  fn drop(&mut self) {
    self.reset();
  }
}
