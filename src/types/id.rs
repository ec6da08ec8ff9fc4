// ABOUTME: Phantom-typed identifiers for compile-time type safety.
// ABOUTME: Prevents mixing up cluster, service, target group, listener and rule IDs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum ClusterMarker {}
pub enum ServiceMarker {}
pub enum TargetGroupMarker {}
pub enum LoadBalancerMarker {}
pub enum ListenerMarker {}
pub enum RuleMarker {}
pub enum TaskDefinitionMarker {}

/// A provider resource identifier (usually an ARN) tagged with its resource kind.
///
/// A `TargetGroupId` cannot be passed where a `ListenerId` is expected, which
/// matters here because every provider call takes a bare ARN string.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// Last path segment of an ARN-style identifier (`.../cluster/main` -> `main`).
    pub fn short_name(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }
}

// Manual trait implementations that don't require T to implement the trait.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type ClusterId = Id<ClusterMarker>;
pub type ServiceId = Id<ServiceMarker>;
pub type TargetGroupId = Id<TargetGroupMarker>;
pub type LoadBalancerId = Id<LoadBalancerMarker>;
pub type ListenerId = Id<ListenerMarker>;
pub type RuleId = Id<RuleMarker>;
pub type TaskDefinitionId = Id<TaskDefinitionMarker>;
