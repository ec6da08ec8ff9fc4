// ABOUTME: Sealed trait pattern for provider traits.
// ABOUTME: Prevents external implementations, allowing non-breaking evolution.

/// Sealed trait to prevent external implementations.
///
/// Only the providers shipped with this crate (the `aws` CLI adapter and the
/// in-memory provider) implement the provider traits.
pub trait Sealed {}
