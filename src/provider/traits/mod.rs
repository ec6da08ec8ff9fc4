// ABOUTME: Composable capability traits for the infrastructure provider.
// ABOUTME: Defines LookupOps, RoutingOps, ComputeOps and HealthOps.

mod compute;
mod health;
mod lookup;
mod routing;
pub(crate) mod sealed;
mod shared_types;

pub use compute::ComputeOps;
pub use health::HealthOps;
pub use lookup::LookupOps;
pub use routing::RoutingOps;
pub use shared_types::*;

/// Everything the promotion controller needs from a provider.
pub trait Provider: LookupOps + RoutingOps + ComputeOps + HealthOps {}

impl<T> Provider for T where T: LookupOps + RoutingOps + ComputeOps + HealthOps {}
