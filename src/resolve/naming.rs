// ABOUTME: Ordered naming strategy for blue/green resource lookups.
// ABOUTME: Templates are evaluated in order; the first existing resource wins.

use crate::types::{AppName, Environment};

/// One rendered lookup candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Position in the strategy; 0 is the preferred convention.
    pub rank: usize,
    pub template: String,
    pub name: String,
}

impl Candidate {
    /// Whether this candidate is a fallback rather than the preferred name.
    pub fn is_fallback(&self) -> bool {
        self.rank > 0
    }
}

/// Ordered list of naming templates for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingStrategy {
    kind: &'static str,
    templates: Vec<String>,
}

impl NamingStrategy {
    pub fn new(kind: &'static str, templates: Vec<String>) -> Self {
        Self { kind, templates }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Render a template: `{color}`, `{key}` and `{app}` are substituted.
    pub fn render(template: &str, app: &AppName, env: Environment) -> String {
        template
            .replace("{color}", env.color())
            .replace("{key}", &app.resource_key())
            .replace("{app}", app.as_str())
    }

    /// Candidates in evaluation order, without duplicates.
    pub fn candidates(&self, app: &AppName, env: Environment) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = Vec::with_capacity(self.templates.len());
        for (rank, template) in self.templates.iter().enumerate() {
            let name = Self::render(template, app, env);
            if out.iter().all(|c| c.name != name) {
                out.push(Candidate {
                    rank,
                    template: template.clone(),
                    name,
                });
            }
        }
        out
    }
}
