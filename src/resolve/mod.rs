// ABOUTME: Resource resolution: which infrastructure serves an application.
// ABOUTME: Exposes the resolver, naming strategy and the resolved target types.

mod naming;
mod resolver;
mod target;

pub use naming::{Candidate, NamingStrategy};
pub use resolver::{ResolveError, Resolver};
pub use target::{DeploymentTarget, EnvironmentSlot, Resolution};
