//! Policy engine for two-sided edits
//!
//! Maps a file path (relative to the link root) to the policy that settles a
//! conflict on it. Rules from configuration are glob patterns matched in
//! first-match-wins order; the default policy applies when none matches.

use std::fmt;
use std::str::FromStr;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use docsync_core::config::{ConflictRuleConfig, SyncConfig};
use docsync_core::ports::ConflictChoice;

use crate::error::ConflictError;

/// How a conflict on a matching path is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    PreferLocal,
    PreferRemote,
    Neither,
    /// Defer to the decision provider
    Ask,
}

impl ConflictPolicy {
    /// The fixed choice this policy implies, `None` for `Ask`
    pub fn choice(self) -> Option<ConflictChoice> {
        match self {
            ConflictPolicy::PreferLocal => Some(ConflictChoice::PreferLocal),
            ConflictPolicy::PreferRemote => Some(ConflictChoice::PreferRemote),
            ConflictPolicy::Neither => Some(ConflictChoice::Neither),
            ConflictPolicy::Ask => None,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictPolicy::PreferLocal => "prefer_local",
            ConflictPolicy::PreferRemote => "prefer_remote",
            ConflictPolicy::Neither => "neither",
            ConflictPolicy::Ask => "ask",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConflictPolicy {
    type Err = ConflictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer_local" => Ok(ConflictPolicy::PreferLocal),
            "prefer_remote" => Ok(ConflictPolicy::PreferRemote),
            "neither" => Ok(ConflictPolicy::Neither),
            "ask" => Ok(ConflictPolicy::Ask),
            other => Err(ConflictError::InvalidPolicy(other.to_string())),
        }
    }
}

/// A compiled conflict rule
#[derive(Debug, Clone)]
pub struct ConflictRule {
    pattern: Pattern,
    policy: ConflictPolicy,
}

impl ConflictRule {
    /// Compiles a configured rule, rejecting bad globs and unknown policies
    pub fn compile(rule: &ConflictRuleConfig) -> Result<Self, ConflictError> {
        let pattern = Pattern::new(&rule.pattern).map_err(|e| ConflictError::InvalidPattern {
            pattern: rule.pattern.clone(),
            reason: e.to_string(),
        })?;
        let policy = rule.policy.parse()?;
        Ok(Self { pattern, policy })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }
}

/// Engine that evaluates conflict rules
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: Vec<ConflictRule>,
    default_policy: ConflictPolicy,
}

impl PolicyEngine {
    /// Creates a PolicyEngine from the default policy name and configured rules
    ///
    /// An unknown default falls back to `ask`. Invalid rules are logged and skipped.
    pub fn new(default_policy: &str, rules: &[ConflictRuleConfig]) -> Self {
        let default_policy = default_policy.parse().unwrap_or_else(|_| {
            tracing::warn!(policy = %default_policy, "Unknown default conflict policy, using ask");
            ConflictPolicy::Ask
        });

        let rules: Vec<ConflictRule> = rules
            .iter()
            .filter_map(|rule| match ConflictRule::compile(rule) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(
                        pattern = %rule.pattern,
                        policy = %rule.policy,
                        error = %e,
                        "Skipping invalid conflict rule"
                    );
                    None
                }
            })
            .collect();

        debug!(
            rules_count = rules.len(),
            default = %default_policy,
            "PolicyEngine initialized"
        );

        Self {
            rules,
            default_policy,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.conflict_policy, &config.conflict_rules)
    }

    /// Evaluates the policy for a path relative to the link root
    pub fn evaluate(&self, relative_path: &str) -> ConflictPolicy {
        for rule in &self.rules {
            if rule.pattern.matches(relative_path) {
                trace!(
                    path = %relative_path,
                    pattern = %rule.pattern,
                    policy = %rule.policy,
                    "Conflict rule matched"
                );
                return rule.policy;
            }
        }
        self.default_policy
    }

    pub fn default_policy(&self) -> ConflictPolicy {
        self.default_policy
    }

    pub fn rules_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_policy: ConflictPolicy::Ask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, policy: &str) -> ConflictRuleConfig {
        ConflictRuleConfig {
            pattern: pattern.to_string(),
            policy: policy.to_string(),
        }
    }

    #[test]
    fn test_default_only() {
        let engine = PolicyEngine::new("prefer_remote", &[]);
        assert_eq!(engine.evaluate("a/b.txt"), ConflictPolicy::PreferRemote);
        assert_eq!(engine.rules_count(), 0);
    }

    #[test]
    fn test_first_match_wins() {
        let engine = PolicyEngine::new(
            "ask",
            &[rule("**/*.docx", "prefer_local"), rule("**/*", "neither")],
        );
        assert_eq!(engine.evaluate("reports/q1.docx"), ConflictPolicy::PreferLocal);
        assert_eq!(engine.evaluate("reports/q1.pdf"), ConflictPolicy::Neither);
    }

    #[test]
    fn test_invalid_rules_skipped() {
        let engine = PolicyEngine::new(
            "ask",
            &[
                rule("[broken", "prefer_local"),
                rule("*.txt", "keep_both"),
                rule("*.md", "prefer_remote"),
            ],
        );
        assert_eq!(engine.rules_count(), 1);
        assert_eq!(engine.evaluate("notes.md"), ConflictPolicy::PreferRemote);
        assert_eq!(engine.evaluate("notes.txt"), ConflictPolicy::Ask);
    }

    #[test]
    fn test_unknown_default_falls_back_to_ask() {
        let engine = PolicyEngine::new("garbage", &[]);
        assert_eq!(engine.default_policy(), ConflictPolicy::Ask);
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            ConflictRule::compile(&rule("[x", "ask")),
            Err(ConflictError::InvalidPattern { .. })
        ));
        assert!(matches!(
            ConflictRule::compile(&rule("*.x", "yolo")),
            Err(ConflictError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_policy_choice() {
        assert_eq!(ConflictPolicy::PreferLocal.choice(), Some(ConflictChoice::PreferLocal));
        assert_eq!(ConflictPolicy::Ask.choice(), None);
        assert_eq!("neither".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Neither);
    }
}
