// ABOUTME: Resource naming templates, tried in order by the resolver.
// ABOUTME: Placeholders: {color}, {key} (name without underscores), {app}.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "default_target_groups")]
    pub target_groups: Vec<String>,

    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            target_groups: default_target_groups(),
            services: default_services(),
        }
    }
}

fn default_target_groups() -> Vec<String> {
    vec!["{color}-tg-{key}".to_string(), "{color}-tg".to_string()]
}

fn default_services() -> Vec<String> {
    vec![
        "{key}-{color}-service".to_string(),
        "{color}-service".to_string(),
    ]
}

impl NamingConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (label, templates) in [
            ("naming.target_groups", &self.target_groups),
            ("naming.services", &self.services),
        ] {
            if templates.is_empty() {
                return Err(format!("{} must list at least one template", label));
            }
            if let Some(t) = templates.iter().find(|t| !t.contains("{color}")) {
                return Err(format!(
                    "{} template '{}' must contain {{color}}",
                    label, t
                ));
            }
        }
        Ok(())
    }
}
