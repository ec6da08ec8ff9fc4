// ABOUTME: Traffic routing between blue and green target groups.
// ABOUTME: Production cutover, restore, and temporary smoke-test routes.

mod change;
mod priority;
mod router;

pub use change::{RouteChange, TestRoute};
pub use priority::{MAX_RULE_PRIORITY, first_free_priority};
pub use router::{RoutingError, TrafficRouter};
