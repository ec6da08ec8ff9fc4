// ABOUTME: Collision-avoiding listener rule priority selection.
// ABOUTME: Scans ascending from a band's base, skipping priorities in use.

use std::collections::HashSet;

use crate::provider::ListenerRule;

/// Highest priority a listener rule may carry.
pub const MAX_RULE_PRIORITY: u32 = 50_000;

/// First priority at or above `base` not used by any rule.
pub fn first_free_priority(rules: &[ListenerRule], base: u32) -> Option<u32> {
    let used: HashSet<u32> = rules.iter().filter_map(|r| r.priority).collect();
    (base.max(1)..=MAX_RULE_PRIORITY).find(|p| !used.contains(p))
}
