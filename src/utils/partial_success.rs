//! Type alias for operations that succeed while some of their parts fail.
//! The failed parts are handed back to the caller instead of aborting the whole operation.

/// A successful operation where some parts failed but didn't prevent overall success.
/// The `Vec<E>` contains the errors from the failed parts that were skipped.
pub type PartialSuccess<T, E> = ( T, Vec<E> );
