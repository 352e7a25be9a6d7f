//! Rule evaluation.
//!
//! Evaluation is total: absence of the flag, archived status, malformed identity data and missing
//! rules all resolve to a disabled verdict instead of an error.
use std::collections::HashMap;

use crate::{
    context::Context,
    flags::{Flag, RuleOperator},
    rollout::is_in_rollout,
};

/// The verdict of evaluating a single flag for a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagEvaluation {
    /// Key the verdict applies to.
    pub key: String,
    /// Whether the flag is enabled for the evaluated context.
    pub is_enabled: bool,
}

impl FlagEvaluation {
    fn disabled(key: &str) -> FlagEvaluation {
        FlagEvaluation {
            key: key.to_owned(),
            is_enabled: false,
        }
    }

    fn enabled(key: &str) -> FlagEvaluation {
        FlagEvaluation {
            key: key.to_owned(),
            is_enabled: true,
        }
    }
}

/// Evaluate `flag_key` against a flags snapshot for the given context.
///
/// Precedence, in order: missing flag → disabled; archived → disabled; rolled out to everyone →
/// enabled; no rules → disabled; otherwise the first rule decides. Multi-rule chains are not
/// supported in this version: only the first rule is consulted.
///
/// The rollout percentage is only consulted once the rule's operator matches the context.
pub fn evaluate_flag(
    flag_key: &str,
    flags: &HashMap<String, Flag>,
    context: &Context,
) -> FlagEvaluation {
    let Some(flag) = flags.get(flag_key) else {
        return FlagEvaluation::disabled(flag_key);
    };

    // Archived wins over everything else, including a full rollout.
    if flag.is_archived {
        return FlagEvaluation::disabled(&flag.key);
    }

    if flag.rolled_out_to_everyone_at.is_some() {
        return FlagEvaluation::enabled(&flag.key);
    }

    let Some(rule) = flag.rules.first() else {
        return FlagEvaluation::disabled(&flag.key);
    };

    let rule_matches = match rule.operator {
        RuleOperator::All => true,
        RuleOperator::None => false,
        RuleOperator::Some => {
            if rule.user_ids.is_empty() && rule.company_ids.is_empty() {
                // An empty SOME rule never matches; no vacuous truth.
                false
            } else {
                let user_match = context
                    .user
                    .as_ref()
                    .is_some_and(|user| rule.user_ids.contains(&user.key));
                let company_match = context
                    .company
                    .as_ref()
                    .is_some_and(|company| rule.company_ids.contains(&company.key));
                user_match || company_match
            }
        }
    };

    if !rule_matches {
        return FlagEvaluation::disabled(&flag.key);
    }

    let rollout_percentage = rule.rollout_percentage.clamp(0.0, 100.0);
    FlagEvaluation {
        key: flag.key.clone(),
        is_enabled: is_in_rollout(&flag.key, context.rollout_target_id(), rollout_percentage),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::flags::Rule;

    fn flag_with_rule(key: &str, rule: Rule) -> Flag {
        let mut flag = Flag::synthetic(key, false);
        flag.rules = vec![rule];
        flag
    }

    fn snapshot(flags: Vec<Flag>) -> HashMap<String, Flag> {
        flags
            .into_iter()
            .map(|flag| (flag.key.clone(), flag))
            .collect()
    }

    fn all_rule() -> Rule {
        Rule {
            operator: RuleOperator::All,
            user_ids: vec![],
            company_ids: vec![],
            rollout_percentage: 100.0,
        }
    }

    #[test]
    fn missing_flag_is_disabled() {
        let result = evaluate_flag("missing", &HashMap::new(), &Context::new());
        assert_eq!(result.key, "missing");
        assert!(!result.is_enabled);
    }

    #[test]
    fn all_operator_enables_for_any_context() {
        let flags = snapshot(vec![flag_with_rule("flag", all_rule())]);

        assert!(evaluate_flag("flag", &flags, &Context::new()).is_enabled);
        assert!(evaluate_flag("flag", &flags, &Context::for_user("anyone")).is_enabled);
        assert!(evaluate_flag("flag", &flags, &Context::for_company("acme")).is_enabled);
    }

    #[test]
    fn none_operator_disables_even_for_listed_identities() {
        let flags = snapshot(vec![flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::None,
                user_ids: vec!["user-123".to_owned()],
                company_ids: vec!["company-456".to_owned()],
                rollout_percentage: 100.0,
            },
        )]);

        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-123")).is_enabled);
        assert!(!evaluate_flag("flag", &flags, &Context::for_company("company-456")).is_enabled);
    }

    #[test]
    fn some_operator_matches_user_key() {
        let flags = snapshot(vec![flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::Some,
                user_ids: vec!["user-123".to_owned()],
                company_ids: vec![],
                rollout_percentage: 100.0,
            },
        )]);

        assert!(evaluate_flag("flag", &flags, &Context::for_user("user-123")).is_enabled);
        assert!(!evaluate_flag("flag", &flags, &Context::for_user("other")).is_enabled);
        assert!(!evaluate_flag("flag", &flags, &Context::new()).is_enabled);
    }

    #[test]
    fn some_operator_matches_company_key() {
        let flags = snapshot(vec![flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::Some,
                user_ids: vec![],
                company_ids: vec!["company-456".to_owned()],
                rollout_percentage: 100.0,
            },
        )]);

        assert!(evaluate_flag("flag", &flags, &Context::for_company("company-456")).is_enabled);
        assert!(!evaluate_flag("flag", &flags, &Context::for_company("other")).is_enabled);
    }

    #[test]
    fn some_operator_with_empty_identity_lists_never_matches() {
        let flags = snapshot(vec![flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::Some,
                user_ids: vec![],
                company_ids: vec![],
                rollout_percentage: 100.0,
            },
        )]);

        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-123")).is_enabled);
        assert!(!evaluate_flag("flag", &flags, &Context::new()).is_enabled);
    }

    #[test]
    fn archived_wins_over_rules_and_full_rollout() {
        let mut flag = flag_with_rule("flag", all_rule());
        flag.is_archived = true;
        flag.rolled_out_to_everyone_at = Some(Utc::now());
        let flags = snapshot(vec![flag]);

        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);
    }

    #[test]
    fn rolled_out_to_everyone_short_circuits_rules() {
        let mut flag = flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::None,
                user_ids: vec![],
                company_ids: vec![],
                rollout_percentage: 0.0,
            },
        );
        flag.rolled_out_to_everyone_at = Some(Utc::now());
        let flags = snapshot(vec![flag]);

        assert!(evaluate_flag("flag", &flags, &Context::new()).is_enabled);
    }

    #[test]
    fn no_rules_is_disabled() {
        let flags = snapshot(vec![Flag::synthetic("flag", true)]);
        // is_enabled on the definition is a display default, not a rule.
        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);
    }

    #[test]
    fn only_the_first_rule_is_consulted() {
        let mut flag = flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::None,
                user_ids: vec![],
                company_ids: vec![],
                rollout_percentage: 100.0,
            },
        );
        flag.rules.push(all_rule());
        let flags = snapshot(vec![flag]);

        // The second (ALL) rule would enable the flag, but it is never reached.
        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);
    }

    #[test]
    fn zero_rollout_disables_matched_rule() {
        let mut rule = all_rule();
        rule.rollout_percentage = 0.0;
        let flags = snapshot(vec![flag_with_rule("flag", rule)]);

        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);
    }

    #[test]
    fn rollout_is_skipped_when_rule_does_not_match() {
        // 100% rollout, but the identity does not match, so the flag stays off.
        let flags = snapshot(vec![flag_with_rule(
            "flag",
            Rule {
                operator: RuleOperator::Some,
                user_ids: vec!["user-123".to_owned()],
                company_ids: vec![],
                rollout_percentage: 100.0,
            },
        )]);

        assert!(!evaluate_flag("flag", &flags, &Context::for_user("stranger")).is_enabled);
    }

    #[test]
    fn identity_less_context_gets_deterministic_verdict() {
        let mut rule = all_rule();
        rule.rollout_percentage = 50.0;
        let flags = snapshot(vec![flag_with_rule("flag", rule)]);

        // Hashes "flag." — a context-free bucket, but a stable one.
        let first = evaluate_flag("flag", &flags, &Context::new());
        for _ in 0..5 {
            assert_eq!(evaluate_flag("flag", &flags, &Context::new()), first);
        }
    }

    #[test]
    fn out_of_range_rollout_percentage_is_clamped() {
        let mut rule = all_rule();
        rule.rollout_percentage = 150.0;
        let flags = snapshot(vec![flag_with_rule("flag", rule)]);
        assert!(evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);

        let mut rule = all_rule();
        rule.rollout_percentage = -1.0;
        let flags = snapshot(vec![flag_with_rule("flag", rule)]);
        assert!(!evaluate_flag("flag", &flags, &Context::for_user("user-1")).is_enabled);
    }
}
