// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates the application list while parsing.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::ApplicationConfig;

pub fn deserialize_applications<'de, D>(
    deserializer: D,
) -> Result<NonEmpty<ApplicationConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let apps: Vec<ApplicationConfig> = Vec::deserialize(deserializer)?;

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();
    for app in &apps {
        app.validate().map_err(serde::de::Error::custom)?;
        if !names.insert(app.name.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate application: {}",
                app.name
            )));
        }
        if !prefixes.insert(app.path_prefix.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate path_prefix: '{}'",
                app.path_prefix
            )));
        }
    }

    if apps.iter().filter(|a| a.primary).count() > 1 {
        return Err(serde::de::Error::custom(
            "at most one application can be primary",
        ));
    }

    NonEmpty::from_vec(apps)
        .ok_or_else(|| serde::de::Error::custom("at least one application is required"))
}
