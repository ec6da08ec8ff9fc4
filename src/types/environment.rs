// ABOUTME: The two fixed deployment environments, blue and green.
// ABOUTME: Live/idle is always a single value plus its complement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown environment '{0}' (expected blue or green)")]
pub struct ParseEnvironmentError(String);

/// One of the two parallel service environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Blue,
    Green,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Blue, Environment::Green];

    /// The complementary environment.
    pub fn other(self) -> Self {
        match self {
            Environment::Blue => Environment::Green,
            Environment::Green => Environment::Blue,
        }
    }

    /// Lowercase colour used in resource naming templates.
    pub fn color(self) -> &'static str {
        match self {
            Environment::Blue => "blue",
            Environment::Green => "green",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Blue => f.write_str("BLUE"),
            Environment::Green => f.write_str("GREEN"),
        }
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Ok(Environment::Blue),
            "green" => Ok(Environment::Green),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_an_involution() {
        for env in Environment::ALL {
            assert_ne!(env, env.other());
            assert_eq!(env, env.other().other());
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("GREEN".parse::<Environment>().unwrap(), Environment::Green);
        assert_eq!("blue".parse::<Environment>().unwrap(), Environment::Blue);
        assert!("purple".parse::<Environment>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Environment::Green).unwrap(), "\"GREEN\"");
    }
}
