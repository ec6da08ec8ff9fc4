// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types so provider IDs cannot be swapped by accident.

mod app_name;
mod environment;
mod id;
mod image_ref;

pub use app_name::{AppName, AppNameError};
pub use environment::{Environment, ParseEnvironmentError};
pub use id::{
    ClusterId, Id, ListenerId, LoadBalancerId, RuleId, ServiceId, TargetGroupId, TaskDefinitionId,
};
pub use image_ref::{ImageRef, ParseImageRefError};
