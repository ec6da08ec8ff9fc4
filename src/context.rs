// ABOUTME: Explicit per-run promotion context passed to every component.
// ABOUTME: Bundles the application, image, mode, run options and settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ApplicationConfig, Config};
use crate::provider::RetryPolicy;
use crate::types::ImageRef;

/// What a promotion run promotes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PromotionMode {
    /// Promote a new image.
    #[default]
    Switch,
    /// Promote the image that was live before the last successful promotion.
    Rollback,
}

impl fmt::Display for PromotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionMode::Switch => f.write_str("switch"),
            PromotionMode::Rollback => f.write_str("rollback"),
        }
    }
}

/// Run-level switches.
#[derive(Debug, Clone, Copy)]
pub struct PromotionOptions {
    /// Continue past failed smoke and drain health gates.
    pub force: bool,
    pub retry: RetryPolicy,
}

impl Default for PromotionOptions {
    fn default() -> Self {
        Self {
            force: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Everything a promotion run is parameterized by.
#[derive(Debug, Clone)]
pub struct PromotionContext {
    pub application: ApplicationConfig,
    pub image: ImageRef,
    pub mode: PromotionMode,
    pub options: PromotionOptions,
    pub settings: Config,
}
