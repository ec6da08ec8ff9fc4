// ABOUTME: Infrastructure provider seam for load balancer and compute APIs.
// ABOUTME: Exposes capability traits, an aws CLI adapter and an in-memory provider.

mod aws_cli;
mod error;
pub mod memory;
mod retry;
pub mod traits;

pub use aws_cli::{AwsCliError, AwsCliErrorKind, AwsCliProvider};
pub use error::ProviderError;
pub use memory::InMemoryProvider;
pub use retry::{DEFAULT_ATTEMPTS, RetryPolicy};
pub use traits::*;
