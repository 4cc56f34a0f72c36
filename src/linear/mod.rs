//! Monotonic ("bump") mappers.
//!
//! ```text
//!   ┌─────┬─────┬─────┬───────────────────────────────┐
//!   │ A1  │ A2  │ A3  │            Free Space         │
//!   └─────┴─────┴─────┴───────────────────────────────┘
//!                     ▲                               ▲
//!                   offset                           size
//! ```
//!
//! Mapping advances `offset`; there is no individual unmap. Memory comes back
//! in bulk, either by `clear` (rewind every cursor, keep the memory) or by
//! `reset` (give every buffer back to the provider).
//!
//! Both variants accept a request iff `remaining > 0 && remaining >= n`, so an
//! exact fit succeeds.
pub use self::dynamic_mapper::DynamicLinearMapper;
pub use self::static_mapper::StaticLinearMapper;

mod dynamic_mapper;
mod static_mapper;

#[inline]
fn has_enough_memory(
  size: usize,
  offset: usize,
  byte_count: usize,
) -> bool {
  let remaining = size - offset;
  remaining > 0 && byte_count > 0 && remaining >= byte_count
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_capacity_rule() {
    assert!(has_enough_memory(64, 10, 54));
    assert!(has_enough_memory(64, 10, 50));
    assert!(!has_enough_memory(64, 10, 55));
    assert!(!has_enough_memory(64, 64, 1));
    assert!(!has_enough_memory(64, 0, 0));
  }
}
