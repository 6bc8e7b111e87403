//! Targeting-predicate evaluation.
//!
//! Decides whether a visitor context satisfies a targeting group set: OR
//! across groups, AND within a group, both short-circuiting. Every
//! predicate is type-checked against an operator × type compatibility
//! matrix before any comparison happens, and every violation fails closed —
//! the predicate evaluates to `false`, an event is reported, and evaluation
//! of the remaining predicates continues. Nothing in here ever aborts a
//! resolve pass.
//!
//! Behavior parity with the other client runtimes matters more than
//! internal consistency: lists are rejected outright for the four string
//! operators even though their elements may be strings, because that is
//! what the deployed implementations do.

use crate::error::ComparisonIssue;
use crate::model::{
    ALL_USERS_KEY, ContextValue, Operator, OperatorField, Targeting, TargetingGroupSet, ValueKind,
    VisitorContext,
};
use crate::observability::{Event, EventSink};

/// Evaluates a full targeting group set: OR over groups, AND within each
/// group. Short-circuits on the first failing predicate of a group and on
/// the first matching group.
#[must_use]
pub fn matches(context: &VisitorContext, set: &TargetingGroupSet, sink: &dyn EventSink) -> bool {
    set.targeting_groups
        .iter()
        .any(|group| {
            group
                .targetings
                .iter()
                .all(|predicate| evaluate_predicate(context, predicate, sink))
        })
}

/// Evaluates one predicate against the visitor context. Fail-closed: any
/// type or operator problem reports an event and yields `false`.
#[must_use]
pub fn evaluate_predicate(
    context: &VisitorContext,
    predicate: &Targeting,
    sink: &dyn EventSink,
) -> bool {
    if predicate.key == ALL_USERS_KEY {
        return true;
    }

    // A missing attribute is an ordinary non-match, not an error.
    let Some(context_value) = context.get(&predicate.key) else {
        return false;
    };

    let operator = match &predicate.operator {
        OperatorField::Known(op) => *op,
        OperatorField::Unknown(raw) => {
            report(
                sink,
                &ComparisonIssue::UnknownOperator {
                    key: predicate.key.clone(),
                    operator: raw.clone(),
                },
            );
            return false;
        }
    };

    match compare(&predicate.key, operator, context_value, &predicate.value) {
        Ok(matched) => matched,
        Err(issue) => {
            report(sink, &issue);
            false
        }
    }
}

fn report(sink: &dyn EventSink, issue: &ComparisonIssue) {
    sink.emit(Event::from_comparison_issue(issue));
}

/// Applies `operator` to a context value and a targeting value, enforcing
/// the compatibility matrix:
///
/// | operator                  | boolean | number | string | list        |
/// |---------------------------|---------|--------|--------|-------------|
/// | EQUALS / NOT_EQUALS       | yes     | yes    | yes    | per element |
/// | LOWER/GREATER_THAN[_OR_*] | no      | yes    | no     | per element |
/// | STARTS/ENDS_WITH,         | no      | no     | yes    | no          |
/// | CONTAINS / NOT_CONTAINS   |         |        |        |             |
fn compare(
    key: &str,
    operator: Operator,
    context_value: &ContextValue,
    target: &ContextValue,
) -> Result<bool, ComparisonIssue> {
    if let ContextValue::List(elements) = context_value {
        return compare_list(key, operator, elements, target);
    }

    match operator {
        Operator::Equals | Operator::NotEquals => compare_equality(key, operator, context_value, target),
        Operator::LowerThan
        | Operator::LowerThanOrEquals
        | Operator::GreaterThan
        | Operator::GreaterThanOrEquals => compare_ordering(key, operator, context_value, target),
        Operator::StartsWith | Operator::EndsWith | Operator::Contains | Operator::NotContains => {
            compare_string(key, operator, context_value, target)
        }
    }
}

/// List context values match if ANY element individually satisfies the
/// operator. Elements must be homogeneous primitives of the targeting
/// value's kind, and the four string operators reject lists outright.
fn compare_list(
    key: &str,
    operator: Operator,
    elements: &[ContextValue],
    target: &ContextValue,
) -> Result<bool, ComparisonIssue> {
    if matches!(
        operator,
        Operator::StartsWith | Operator::EndsWith | Operator::Contains | Operator::NotContains
    ) {
        return Err(ComparisonIssue::UnsupportedCombination {
            key: key.to_owned(),
            operator,
            context_kind: ValueKind::List,
        });
    }

    let Some(element_kind) = homogeneous_kind(elements) else {
        return Err(ComparisonIssue::HeterogeneousList {
            key: key.to_owned(),
        });
    };

    if element_kind != target.kind() {
        return Err(ComparisonIssue::TypeMismatch {
            key: key.to_owned(),
            context_kind: element_kind,
            target_kind: target.kind(),
        });
    }

    for element in elements {
        if compare(key, operator, element, target)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns the common primitive kind of all elements, or `None` if the
/// list is empty, nested, or mixed.
fn homogeneous_kind(elements: &[ContextValue]) -> Option<ValueKind> {
    let first = elements.first()?;
    let kind = first.kind();
    if kind == ValueKind::List {
        return None;
    }
    elements.iter().all(|e| e.kind() == kind).then_some(kind)
}

// Numbers compare exactly: the other client runtimes use strict equality
// and assignment parity across runtimes wins over float hygiene.
#[allow(clippy::float_cmp)]
fn compare_equality(
    key: &str,
    operator: Operator,
    context_value: &ContextValue,
    target: &ContextValue,
) -> Result<bool, ComparisonIssue> {
    let equal = match (context_value, target) {
        (ContextValue::Bool(a), ContextValue::Bool(b)) => a == b,
        (ContextValue::Num(a), ContextValue::Num(b)) => a == b,
        (ContextValue::Str(a), ContextValue::Str(b)) => a == b,
        _ => {
            return Err(ComparisonIssue::TypeMismatch {
                key: key.to_owned(),
                context_kind: context_value.kind(),
                target_kind: target.kind(),
            });
        }
    };
    Ok(match operator {
        Operator::NotEquals => !equal,
        _ => equal,
    })
}

fn compare_ordering(
    key: &str,
    operator: Operator,
    context_value: &ContextValue,
    target: &ContextValue,
) -> Result<bool, ComparisonIssue> {
    let ContextValue::Num(context_num) = context_value else {
        return Err(ComparisonIssue::UnsupportedCombination {
            key: key.to_owned(),
            operator,
            context_kind: context_value.kind(),
        });
    };
    let ContextValue::Num(target_num) = target else {
        return Err(ComparisonIssue::TypeMismatch {
            key: key.to_owned(),
            context_kind: ValueKind::Num,
            target_kind: target.kind(),
        });
    };
    Ok(match operator {
        Operator::LowerThan => context_num < target_num,
        Operator::LowerThanOrEquals => context_num <= target_num,
        Operator::GreaterThan => context_num > target_num,
        Operator::GreaterThanOrEquals => context_num >= target_num,
        // compare() only routes the four ordering operators here.
        _ => unreachable!("non-ordering operator routed to compare_ordering"),
    })
}

fn compare_string(
    key: &str,
    operator: Operator,
    context_value: &ContextValue,
    target: &ContextValue,
) -> Result<bool, ComparisonIssue> {
    let ContextValue::Str(context_str) = context_value else {
        return Err(ComparisonIssue::UnsupportedCombination {
            key: key.to_owned(),
            operator,
            context_kind: context_value.kind(),
        });
    };
    let ContextValue::Str(target_str) = target else {
        return Err(ComparisonIssue::TypeMismatch {
            key: key.to_owned(),
            context_kind: ValueKind::Str,
            target_kind: target.kind(),
        });
    };
    Ok(match operator {
        Operator::StartsWith => context_str.starts_with(target_str.as_str()),
        Operator::EndsWith => context_str.ends_with(target_str.as_str()),
        Operator::Contains => context_str.contains(target_str.as_str()),
        Operator::NotContains => !context_str.contains(target_str.as_str()),
        _ => unreachable!("non-string operator routed to compare_string"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetingGroup;
    use crate::observability::{MemorySink, NullSink};

    fn predicate(key: &str, operator: impl Into<OperatorField>, value: ContextValue) -> Targeting {
        Targeting {
            key: key.to_owned(),
            operator: operator.into(),
            value,
        }
    }

    fn set(groups: Vec<Vec<Targeting>>) -> TargetingGroupSet {
        TargetingGroupSet {
            targeting_groups: groups
                .into_iter()
                .map(|targetings| TargetingGroup { targetings })
                .collect(),
        }
    }

    #[test]
    fn all_users_key_matches_empty_context() {
        let context = VisitorContext::new();
        let p = predicate(ALL_USERS_KEY, Operator::Equals, ContextValue::Bool(false));
        assert!(evaluate_predicate(&context, &p, &NullSink));

        let s = set(vec![vec![p]]);
        assert!(matches(&context, &s, &NullSink));
    }

    #[test]
    fn missing_key_is_a_plain_non_match() {
        let context = VisitorContext::new().with("present", true);
        let p = predicate("absent", Operator::Equals, ContextValue::Bool(true));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(sink.is_empty(), "missing key must not be reported");
    }

    #[test]
    fn equality_on_each_primitive() {
        let context = VisitorContext::new()
            .with("isVip", true)
            .with("age", 30_i64)
            .with("plan", "premium");
        for (key, value) in [
            ("isVip", ContextValue::Bool(true)),
            ("age", ContextValue::Num(30.0)),
            ("plan", ContextValue::Str("premium".into())),
        ] {
            assert!(evaluate_predicate(
                &context,
                &predicate(key, Operator::Equals, value.clone()),
                &NullSink
            ));
            assert!(!evaluate_predicate(
                &context,
                &predicate(key, Operator::NotEquals, value),
                &NullSink
            ));
        }
    }

    #[test]
    fn ordering_operators_on_numbers() {
        let context = VisitorContext::new().with("age", 30_i64);
        let cases = [
            (Operator::LowerThan, 40.0, true),
            (Operator::LowerThan, 30.0, false),
            (Operator::LowerThanOrEquals, 30.0, true),
            (Operator::GreaterThan, 20.0, true),
            (Operator::GreaterThan, 30.0, false),
            (Operator::GreaterThanOrEquals, 30.0, true),
        ];
        for (op, target, expected) in cases {
            let p = predicate("age", op, ContextValue::Num(target));
            assert_eq!(
                evaluate_predicate(&context, &p, &NullSink),
                expected,
                "{op} {target}"
            );
        }
    }

    #[test]
    fn string_operators() {
        let context = VisitorContext::new().with("email", "ada@example.com");
        let cases = [
            (Operator::StartsWith, "ada", true),
            (Operator::StartsWith, "bob", false),
            (Operator::EndsWith, "@example.com", true),
            (Operator::Contains, "example", true),
            (Operator::Contains, "nowhere", false),
            (Operator::NotContains, "nowhere", true),
            (Operator::NotContains, "example", false),
        ];
        for (op, target, expected) in cases {
            let p = predicate("email", op, ContextValue::Str(target.into()));
            assert_eq!(
                evaluate_predicate(&context, &p, &NullSink),
                expected,
                "{op} {target}"
            );
        }
    }

    #[test]
    fn lower_than_on_boolean_warns_once_and_fails_closed() {
        let context = VisitorContext::new().with("isVip", true);
        let p = predicate("isVip", Operator::LowerThan, ContextValue::Num(10.0));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::UnsupportedComparison { .. }));
        assert_eq!(events[0].severity(), crate::observability::Severity::Warning);
    }

    #[test]
    fn contains_on_number_fails_closed_with_warning() {
        let context = VisitorContext::new().with("age", 30_i64);
        let p = predicate("age", Operator::Contains, ContextValue::Str("3".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(matches!(
            sink.events()[0],
            Event::UnsupportedComparison { .. }
        ));
    }

    #[test]
    fn unknown_operator_reports_error_and_fails_closed() {
        let context = VisitorContext::new().with("isVip", false);
        let p = predicate(
            "isVip",
            OperatorField::Unknown("I_DONT_EXIST".to_owned()),
            ContextValue::Bool(false),
        );
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Event::UnknownOperator {
                key: "isVip".to_owned(),
                operator: "I_DONT_EXIST".to_owned(),
            }
        );
    }

    #[test]
    fn equality_type_mismatch_reports_error() {
        let context = VisitorContext::new().with("age", 30_i64);
        let p = predicate("age", Operator::Equals, ContextValue::Str("30".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(matches!(sink.events()[0], Event::TypeMismatch { .. }));
    }

    #[test]
    fn list_equality_matches_any_element() {
        let context = VisitorContext::new().with(
            "tags",
            ContextValue::List(vec!["alpha".into(), "beta".into()]),
        );
        let hit = predicate("tags", Operator::Equals, ContextValue::Str("beta".into()));
        let miss = predicate("tags", Operator::Equals, ContextValue::Str("gamma".into()));
        assert!(evaluate_predicate(&context, &hit, &NullSink));
        assert!(!evaluate_predicate(&context, &miss, &NullSink));
    }

    #[test]
    fn list_ordering_matches_any_element() {
        let context = VisitorContext::new().with(
            "scores",
            ContextValue::List(vec![
                ContextValue::Num(5.0),
                ContextValue::Num(95.0),
            ]),
        );
        let p = predicate("scores", Operator::GreaterThan, ContextValue::Num(90.0));
        assert!(evaluate_predicate(&context, &p, &NullSink));
    }

    #[test]
    fn string_operators_reject_string_lists() {
        // Parity with the deployed runtimes: lists are rejected for the
        // four string operators even when every element is a string.
        let context = VisitorContext::new().with(
            "tags",
            ContextValue::List(vec!["alpha".into(), "beta".into()]),
        );
        let p = predicate("tags", Operator::Contains, ContextValue::Str("alp".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(matches!(
            sink.events()[0],
            Event::UnsupportedComparison { .. }
        ));
    }

    #[test]
    fn heterogeneous_list_reports_error() {
        let context = VisitorContext::new().with(
            "mixed",
            ContextValue::List(vec![ContextValue::Str("a".into()), ContextValue::Num(1.0)]),
        );
        let p = predicate("mixed", Operator::Equals, ContextValue::Str("a".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::TypeMismatch { .. }));
    }

    #[test]
    fn list_element_kind_must_match_target_kind() {
        let context = VisitorContext::new().with(
            "nums",
            ContextValue::List(vec![ContextValue::Num(1.0), ContextValue::Num(2.0)]),
        );
        let p = predicate("nums", Operator::Equals, ContextValue::Str("1".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(matches!(sink.events()[0], Event::TypeMismatch { .. }));
    }

    #[test]
    fn empty_list_is_not_homogeneous() {
        let context = VisitorContext::new().with("empty", ContextValue::List(vec![]));
        let p = predicate("empty", Operator::Equals, ContextValue::Str("a".into()));
        let sink = MemorySink::new();
        assert!(!evaluate_predicate(&context, &p, &sink));
        assert!(matches!(sink.events()[0], Event::TypeMismatch { .. }));
    }

    #[test]
    fn group_is_and_set_is_or() {
        let context = VisitorContext::new().with("foo1", "yes1").with("isVip", true);

        // Group 1 fails on its second predicate; group 2 matches fully.
        let s = set(vec![
            vec![
                predicate("foo1", Operator::Equals, ContextValue::Str("yes1".into())),
                predicate("isVip", Operator::Equals, ContextValue::Bool(false)),
            ],
            vec![
                predicate("foo1", Operator::Equals, ContextValue::Str("yes1".into())),
                predicate("isVip", Operator::Equals, ContextValue::Bool(true)),
            ],
        ]);
        assert!(matches(&context, &s, &NullSink));

        // Both groups fail.
        let s = set(vec![
            vec![predicate("foo1", Operator::Equals, ContextValue::Str("no".into()))],
            vec![predicate("isVip", Operator::Equals, ContextValue::Bool(false))],
        ]);
        assert!(!matches(&context, &s, &NullSink));
    }

    #[test]
    fn empty_group_set_never_matches() {
        let context = VisitorContext::new().with("isVip", true);
        assert!(!matches(&context, &TargetingGroupSet::default(), &NullSink));
    }

    #[test]
    fn and_short_circuits_on_first_failure() {
        // The second predicate carries an unknown operator; if AND
        // evaluation short-circuits, it is never reached and never reported.
        let context = VisitorContext::new().with("isVip", false);
        let s = set(vec![vec![
            predicate("isVip", Operator::Equals, ContextValue::Bool(true)),
            predicate(
                "isVip",
                OperatorField::Unknown("I_DONT_EXIST".to_owned()),
                ContextValue::Bool(false),
            ),
        ]]);
        let sink = MemorySink::new();
        assert!(!matches(&context, &s, &sink));
        assert!(sink.is_empty());
    }
}
