//! Tuple codec constants.

/// Deepest nested tuple the decoder accepts.
///
/// Each nesting level is one decoder stack frame.
pub const MAX_TUPLE_NESTING_DEPTH: u32 = 64;
