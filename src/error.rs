use trackable::error::ErrorKindExt;

/// Crate specific error type.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// The kinds of errors a raw provider or a constructor can report.
///
/// Mapping operations never return these directly: a failed request to the
/// provider is logged and surfaces as `None` / `false` at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The provider could not hand out the requested bytes.
  ///
  /// Also reported when size arithmetic would overflow `usize`.
  OutOfMemory,

  /// A construction option or a provider request is malformed.
  ///
  /// E.g., a zero sized arena, a zero chunk count, or a page size that
  /// cannot hold its own headers.
  InvalidInput,
}
impl trackable::error::ErrorKind for ErrorKind {}

// A layout is only rejected for a size past `isize::MAX`.
impl From<std::alloc::LayoutError> for Error {
  fn from(e: std::alloc::LayoutError) -> Self {
    ErrorKind::OutOfMemory.cause(e).into()
  }
}
