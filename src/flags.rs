use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A feature flag definition, as served by the flags endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Unique key of the flag within a snapshot.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub description: Option<String>,
    /// Fallback value when the flag is checked directly, without rules.
    pub is_enabled: bool,
    /// Archived flags always evaluate disabled, regardless of rules.
    #[serde(default)]
    pub is_archived: bool,
    /// When set, the flag is enabled for everyone and rules are skipped.
    #[serde(default)]
    pub rolled_out_to_everyone_at: Option<Timestamp>,
    /// Targeting rules. Only the first rule is consulted in this version.
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[allow(missing_docs)]
    pub created_at: Timestamp,
    #[allow(missing_docs)]
    pub updated_at: Timestamp,
}

impl Flag {
    /// Create a placeholder flag for a key that is not present in the snapshot.
    ///
    /// Used when merging overrides into a snapshot view: an override may name a flag the server
    /// never returned, and the merged view still needs a displayable record for it.
    pub fn synthetic(key: impl Into<String>, is_enabled: bool) -> Flag {
        let key = key.into();
        let now = chrono::Utc::now();
        Flag {
            name: key.clone(),
            key,
            description: None,
            is_enabled,
            is_archived: false,
            rolled_out_to_everyone_at: None,
            rules: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A targeting rule attached to a flag.
///
/// Immutable once part of a [`Flag`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[allow(missing_docs)]
    pub operator: RuleOperator,
    /// User keys targeted by this rule (consulted by [`RuleOperator::Some`]).
    #[serde(default)]
    pub user_ids: Vec<String>,
    /// Company keys targeted by this rule (consulted by [`RuleOperator::Some`]).
    #[serde(default)]
    pub company_ids: Vec<String>,
    /// Percentage of matched targets that receive the flag, in `[0, 100]`.
    ///
    /// Out-of-range values are clamped at evaluation time.
    #[serde(default = "default_rollout_percentage")]
    pub rollout_percentage: f64,
}

fn default_rollout_percentage() -> f64 {
    100.0
}

/// How a rule decides whether a context matches.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleOperator {
    /// Every context matches.
    All,
    /// The context matches iff its user key or company key is in the rule's identity lists.
    Some,
    /// No context matches.
    None,
}

/// The complete set of flag definitions held by a client at a point in time.
///
/// A snapshot is immutable: the synchronization engine replaces it wholesale on every successful
/// refresh, never field-by-field.
#[derive(Debug, Clone, Default)]
pub struct FlagsSnapshot {
    /// Flags keyed by [`Flag::key`].
    pub flags: HashMap<String, Flag>,
}

impl FlagsSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> FlagsSnapshot {
        FlagsSnapshot::default()
    }

    /// Build a snapshot from the flags endpoint response, keyed by flag key.
    pub fn from_flags(flags: Vec<Flag>) -> FlagsSnapshot {
        FlagsSnapshot {
            flags: flags
                .into_iter()
                .map(|flag| (flag.key.clone(), flag))
                .collect(),
        }
    }

    /// Build a snapshot from an already-keyed flags map (e.g., seed defaults).
    pub fn from_map(flags: HashMap<String, Flag>) -> FlagsSnapshot {
        FlagsSnapshot { flags }
    }

    /// Look up a flag by key.
    pub fn get(&self, key: &str) -> Option<&Flag> {
        self.flags.get(key)
    }

    /// Number of flags in the snapshot.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_response() {
        let json = r#"[
            {
                "key": "new-checkout",
                "name": "New checkout",
                "isEnabled": false,
                "isArchived": false,
                "rolledOutToEveryoneAt": null,
                "rules": [
                    {
                        "operator": "SOME",
                        "userIds": ["user-1"],
                        "rolloutPercentage": 50
                    }
                ],
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-06-01T00:00:00Z"
            },
            {
                "key": "dark-mode",
                "name": "Dark mode",
                "isEnabled": true,
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }
        ]"#;

        let flags: Vec<Flag> = serde_json::from_str(json).unwrap();
        let snapshot = FlagsSnapshot::from_flags(flags);

        assert_eq!(snapshot.len(), 2);

        let flag = snapshot.get("new-checkout").unwrap();
        let rule = &flag.rules[0];
        assert_eq!(rule.operator, RuleOperator::Some);
        assert_eq!(rule.user_ids, vec!["user-1".to_owned()]);
        assert!(rule.company_ids.is_empty());
        assert_eq!(rule.rollout_percentage, 50.0);

        // Omitted fields fall back to defaults.
        let flag = snapshot.get("dark-mode").unwrap();
        assert!(!flag.is_archived);
        assert!(flag.rolled_out_to_everyone_at.is_none());
        assert!(flag.rules.is_empty());
    }

    #[test]
    fn rollout_percentage_defaults_to_100() {
        let rule: Rule = serde_json::from_str(r#"{"operator": "ALL"}"#).unwrap();
        assert_eq!(rule.rollout_percentage, 100.0);
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let mut a = Flag::synthetic("flag", false);
        a.name = "first".to_owned();
        let mut b = Flag::synthetic("flag", true);
        b.name = "second".to_owned();

        let snapshot = FlagsSnapshot::from_flags(vec![a, b]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("flag").unwrap().name, "second");
    }
}
