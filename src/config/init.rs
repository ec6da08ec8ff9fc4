// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a bgctl.yml template with the default naming scheme.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::AppName;

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, application: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let application = match application {
        Some(name) => AppName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?,
        None => AppName::new("app_2").map_err(|e| Error::InvalidConfig(e.to_string()))?,
    };

    std::fs::write(&config_path, generate_template_yaml(&application))?;
    Ok(())
}

fn generate_template_yaml(application: &AppName) -> String {
    format!(
        r#"# bgctl blue-green promotion settings
load_balancer: blue-green-alb
# listener_port: 80
# cluster: blue-green-cluster

provider:
  # region: us-east-1
  # profile: deploy
  subnets: []
  security_groups: []

naming:
  target_groups: ["{{color}}-tg-{{key}}", "{{color}}-tg"]
  services: ["{{key}}-{{color}}-service", "{{color}}-service"]

health:
  smoke: {{ budget: 30s, interval: 10s }}
  drain: {{ budget: 5m, interval: 10s }}
  request_timeout: 5s

routing:
  rule_base_priority: 50
  test_base_priority: 10
  test_path_suffix: /test
  propagation_delay: 10s

applications:
  - name: app_1
    primary: true
{extra}"#,
        extra = extra_application(application),
    )
}

fn extra_application(application: &AppName) -> String {
    if application.as_str() == "app_1" {
        return String::new();
    }
    format!(
        "  - name: {}\n    path_prefix: /{}\n",
        application,
        application.resource_key()
    )
}
