/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use rmapper::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::std::mem::size_of::<usize>() - 1) & !(::std::mem::size_of::<usize>() - 1)
  };
}

/// Rounds `value` up to the next multiple of `unit`, or `None` on overflow.
///
/// Unlike [`align!`], `unit` does not need to be a power of two. Page sizes
/// are rounded this way.
pub(crate) fn checked_align_to(
  value: usize,
  unit: usize,
) -> Option<usize> {
  value.checked_add(unit - 1).map(|v| (v / unit) * unit)
}
