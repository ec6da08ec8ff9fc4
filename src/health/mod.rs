// ABOUTME: Health probing for blue/green environments.
// ABOUTME: Combines the provider's target-health signal with HTTP health checks.

mod http;
mod prober;

pub use http::{HttpProbe, HttpReply, HyperProbe, ProbeError};
pub use prober::{HealthProber, HealthVerdict, ProbeBudget, ProbeMode, ProbeTarget};
