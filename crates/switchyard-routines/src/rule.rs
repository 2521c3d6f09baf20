//! The predicate engine (§4.E "Predicate engine"): a JSON rule tree
//! evaluated against an [`Envelope`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use switchyard_core::Envelope;

use crate::error::{RoutineError, RoutineResult};

/// A leaf comparison operator (§4.E "Operator semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// String equality, case-sensitive.
    Eq,
    /// Negation of [`Op::Eq`].
    Neq,
    /// Substring match; `value` coerced to string.
    Contains,
    /// `value` is a comma-separated list; field must be one of its
    /// members.
    In,
    /// Field is present and non-null. `value` is ignored.
    Exists,
    /// Regular expression match against the field's string value.
    Matches,
}

/// One node of a rule tree (§4.E "Predicate engine").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// `{field, op, value}`.
    Leaf {
        /// Envelope field name (see [`Envelope::FIELD_NAMES`]).
        field: String,
        /// Comparison operator.
        op: Op,
        /// Comparison operand. Ignored for [`Op::Exists`].
        #[serde(default)]
        value: serde_json::Value,
    },
    /// `{all: [rule, ...]}` — true iff every child is true.
    All {
        /// Child rules, all of which must hold.
        all: Vec<Rule>,
    },
    /// `{any: [rule, ...]}` — true iff at least one child is true.
    Any {
        /// Child rules, at least one of which must hold.
        any: Vec<Rule>,
    },
    /// `{not: rule}` — true iff the child is false.
    Not {
        /// The negated child rule.
        not: Box<Rule>,
    },
}

fn value_as_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluate `rule` against `envelope`.
///
/// # Errors
///
/// Returns [`RoutineError::MalformedRule`] if a [`Op::Matches`] pattern
/// does not compile as a regular expression.
pub fn evaluate(rule: &Rule, envelope: &Envelope) -> RoutineResult<bool> {
    match rule {
        Rule::Leaf { field, op, value } => evaluate_leaf(field, *op, value, envelope),
        Rule::All { all } => {
            for child in all {
                if !evaluate(child, envelope)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Rule::Any { any } => {
            for child in any {
                if evaluate(child, envelope)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Rule::Not { not } => evaluate(not, envelope).map(|result| !result),
    }
}

fn evaluate_leaf(
    field: &str,
    op: Op,
    value: &serde_json::Value,
    envelope: &Envelope,
) -> RoutineResult<bool> {
    if op == Op::Exists {
        return Ok(envelope.field_exists(field));
    }

    let field_value = envelope.field(field);
    Ok(match op {
        Op::Eq => field_value.as_deref() == Some(value_as_string(value).as_str()),
        Op::Neq => field_value.as_deref() != Some(value_as_string(value).as_str()),
        Op::Contains => field_value
            .as_deref()
            .is_some_and(|v| v.contains(&value_as_string(value))),
        Op::In => {
            let needle = field_value.unwrap_or_default();
            value_as_string(value)
                .split(',')
                .any(|candidate| candidate.trim() == needle)
        }
        Op::Matches => match field_value {
            Some(field_value) => {
                let pattern = value_as_string(value);
                let regex = Regex::new(&pattern)
                    .map_err(|e| RoutineError::MalformedRule(format!("{pattern}: {e}")))?;
                regex.is_match(&field_value)
            }
            None => false,
        },
        Op::Exists => unreachable!("handled above"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Actor, ActorKind, SessionKey, WorkItem};

    fn envelope() -> Envelope {
        let item = WorkItem::new(
            switchyard_core::PluginInstanceId::new(),
            SessionKey::new("chatsvc:1"),
            "chatsvc",
            "hello world",
            serde_json::json!({}),
        )
        .with_actor(Actor {
            kind: ActorKind::User,
            handle: "alice".into(),
            display_name: None,
        });
        Envelope::from_work_item(&item, "message")
    }

    #[test]
    fn eq_matches_exact_string() {
        let rule = Rule::Leaf {
            field: "source".into(),
            op: Op::Eq,
            value: serde_json::json!("chatsvc"),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn neq_is_negation_of_eq() {
        let rule = Rule::Leaf {
            field: "source".into(),
            op: Op::Neq,
            value: serde_json::json!("github"),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn contains_matches_substring() {
        let rule = Rule::Leaf {
            field: "actorHandle".into(),
            op: Op::Contains,
            value: serde_json::json!("lic"),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn in_checks_comma_separated_list() {
        let rule = Rule::Leaf {
            field: "source".into(),
            op: Op::In,
            value: serde_json::json!("github,chatsvc,slack"),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn exists_ignores_value_and_checks_presence() {
        let present = Rule::Leaf {
            field: "actorHandle".into(),
            op: Op::Exists,
            value: serde_json::Value::Null,
        };
        let absent = Rule::Leaf {
            field: "sourceRef".into(),
            op: Op::Exists,
            value: serde_json::Value::Null,
        };
        assert!(evaluate(&present, &envelope()).unwrap());
        assert!(!evaluate(&absent, &envelope()).unwrap());
    }

    #[test]
    fn matches_runs_a_regex_against_the_field() {
        let rule = Rule::Leaf {
            field: "eventType".into(),
            op: Op::Matches,
            value: serde_json::json!("^mess.*"),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn all_requires_every_child() {
        let rule = Rule::All {
            all: vec![
                Rule::Leaf {
                    field: "source".into(),
                    op: Op::Eq,
                    value: serde_json::json!("chatsvc"),
                },
                Rule::Leaf {
                    field: "eventType".into(),
                    op: Op::Eq,
                    value: serde_json::json!("wrong"),
                },
            ],
        };
        assert!(!evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn any_requires_one_child() {
        let rule = Rule::Any {
            any: vec![
                Rule::Leaf {
                    field: "source".into(),
                    op: Op::Eq,
                    value: serde_json::json!("wrong"),
                },
                Rule::Leaf {
                    field: "eventType".into(),
                    op: Op::Eq,
                    value: serde_json::json!("message"),
                },
            ],
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }

    #[test]
    fn not_negates_child() {
        let rule = Rule::Not {
            not: Box::new(Rule::Leaf {
                field: "source".into(),
                op: Op::Eq,
                value: serde_json::json!("github"),
            }),
        };
        assert!(evaluate(&rule, &envelope()).unwrap());
    }
}
