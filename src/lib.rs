//! # rmapper - Memory Mapping Strategies over Pluggable Providers
//!
//! This crate provides a family of **memory mappers**: small allocators that
//! carve caller-visible memory out of larger blocks obtained from a
//! [`RawProvider`].
//!
//! ## Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                             caller                                   │
//!   └───────┬───────────────────────┬───────────────────────┬──────────────┘
//!           │ map / clear           │ map / unmap           │ map / unmap
//!   ┌───────▼────────┐      ┌───────▼────────┐      ┌───────▼────────────┐
//!   │ Linear mappers │      │  Pool mappers  │      │ Free-list pages    │
//!   │ (bump cursor)  │      │ (fixed chunks) │      │ (split / coalesce) │
//!   └───────┬────────┘      └───────┬────────┘      └───────┬────────────┘
//!           │                       │                       │
//!   ┌───────▼───────────────────────▼───────────────────────▼────────────┐
//!   │   RawProvider: MallocProvider | HeapProvider | BufferProvider      │
//!   └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Linear**: [`StaticLinearMapper`] bumps through one buffer,
//!   [`DynamicLinearMapper`] chains fixed-size blocks. Memory only comes back
//!   in bulk.
//! - **Pool**: [`StaticPoolMapper`] and [`DynamicPoolMapper`] hand out
//!   equally sized chunks of `T` from an intrusive free list; the dynamic one
//!   grows by whole pools.
//! - **Free list**: [`FreeListPageAllocator`] serves arbitrary sizes, first
//!   fit, splitting large blocks and merging adjacent free ones.
//!
//! ## Crate Structure
//!
//! ```text
//!   rmapper
//!   ├── align      - Word and page rounding (align!)
//!   ├── link       - Intrusive link words inside raw memory
//!   ├── provider   - RawProvider and its implementations
//!   ├── linear     - Static and dynamic bump mappers
//!   ├── pool       - Static and dynamic chunk pools
//!   └── freelist   - Page based free-list allocator
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rmapper::{FreeListPageAllocator, HeapProvider, StaticPoolMapper};
//!
//! let mut pool = StaticPoolMapper::<u64, _>::new(HeapProvider::new(), 16).unwrap();
//! let chunk = pool.map().unwrap();
//! unsafe {
//!   chunk.as_ptr().write(42);
//!   assert_eq!(chunk.as_ptr().read(), 42);
//!   pool.unmap(chunk);
//! }
//!
//! let mut pages = FreeListPageAllocator::new(HeapProvider::new(), 4096).unwrap();
//! let first = pages.map(100).unwrap();
//! unsafe { pages.unmap(first) };
//! assert_eq!(pages.map(100), Some(first));
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: a mapper is `Send` when its provider is, never
//!   `Sync`
//! - **Word alignment**: every provider guarantees [`MIN_ALIGN`] and no more
//! - **Unchecked unmapping**: giving back a pointer that was not mapped by the
//!   same instance is undefined behavior, hence `unsafe`
//!
//! ## Logging
//!
//! Every mapper logs through [`slog`]. The default logger discards
//! everything; attach one with `with_logger`.
#[macro_use]
extern crate slog;
#[macro_use]
extern crate trackable;

#[macro_use]
pub mod align;
pub mod freelist;
pub mod linear;
pub mod link;
pub mod pool;
pub mod provider;

mod error;

pub use crate::error::{Error, ErrorKind};
pub use crate::freelist::{FreeListPageAllocator, PageInfo};
pub use crate::linear::{DynamicLinearMapper, StaticLinearMapper};
pub use crate::pool::{DynamicPoolMapper, StaticPoolMapper};
pub use crate::provider::{BufferProvider, HeapProvider, MallocProvider, RawProvider};

/// Alignment every [`RawProvider`] guarantees for the blocks it hands out.
pub const MIN_ALIGN: usize = std::mem::align_of::<usize>();

/// This crate specific `Result` type.
pub type Result<T> = std::result::Result<T, Error>;
