//! Workflow catalog query expression language
//!
//! A small boolean language over latest-revision metadata:
//!
//! ```text
//! name = "Flow1" AND (project_name != "Legacy" OR variable("cpu", "4"))
//! ```
//!
//! Attribute predicates (`name`, `project_name`) support `=` and `!=`;
//! `variable(name, value)` and `generic_information(name, value)` are
//! existence tests over a revision's owned entries. A value containing `%`
//! is matched as a pattern instead of compared for equality.

pub mod parser;

pub use parser::parse_query;

use crate::domain::workflow::WorkflowRevision;

/// Revision attribute a predicate compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Name,
    ProjectName,
}

/// Owned key/value collection a pair predicate searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    Variable,
    GenericInformation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Parsed query expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpression {
    Attribute {
        attribute: Attribute,
        op: CompareOp,
        value: String,
    },
    Pair {
        kind: PairKind,
        name: String,
        value: String,
    },
    And(Box<QueryExpression>, Box<QueryExpression>),
    Or(Box<QueryExpression>, Box<QueryExpression>),
}

/// Whether a literal should be treated as a `%` wildcard pattern
pub fn is_pattern(value: &str) -> bool {
    value.contains('%')
}

/// Match a `%` wildcard pattern against a value
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();

    // No wildcard: exact comparison
    if segments.len() == 1 {
        return pattern == value;
    }

    let mut remaining = value;

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }

        if i == 0 {
            match remaining.strip_prefix(segment) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return remaining.ends_with(segment);
        } else {
            match remaining.find(segment) {
                Some(pos) => remaining = &remaining[pos + segment.len()..],
                None => return false,
            }
        }
    }

    true
}

fn value_matches(expected: &str, actual: &str) -> bool {
    if is_pattern(expected) {
        pattern_matches(expected, actual)
    } else {
        expected == actual
    }
}

impl QueryExpression {
    /// Evaluate the expression against one revision's metadata
    pub fn matches(&self, revision: &WorkflowRevision) -> bool {
        match self {
            Self::Attribute {
                attribute,
                op,
                value,
            } => {
                let actual = match attribute {
                    Attribute::Name => revision.name(),
                    Attribute::ProjectName => revision.project_name(),
                };
                let matched = value_matches(value, actual);
                match op {
                    CompareOp::Eq => matched,
                    CompareOp::Ne => !matched,
                }
            }
            Self::Pair { kind, name, value } => {
                let entries = match kind {
                    PairKind::Variable => revision.variables(),
                    PairKind::GenericInformation => revision.generic_information(),
                };
                entries
                    .iter()
                    .any(|entry| entry.name == *name && value_matches(value, &entry.value))
            }
            Self::And(left, right) => left.matches(revision) && right.matches(revision),
            Self::Or(left, right) => left.matches(revision) || right.matches(revision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::BucketId;
    use crate::domain::workflow::{KeyValue, NewRevision, ParsedWorkflow, WorkflowId};
    use bytes::Bytes;
    use chrono::Utc;

    fn revision(name: &str, project: &str, variables: Vec<KeyValue>) -> WorkflowRevision {
        let content = NewRevision::new(
            ParsedWorkflow {
                name: name.to_string(),
                project_name: project.to_string(),
                generic_information: vec![KeyValue::new("team", "ops")],
                variables,
            },
            None,
            Bytes::from_static(b"<job/>"),
        )
        .unwrap();

        WorkflowRevision::new(1, WorkflowId::new(1), 1, BucketId::new(1), Utc::now(), content)
    }

    #[test]
    fn test_pattern_matches_prefix() {
        assert!(pattern_matches("Flow%", "Flow1"));
        assert!(pattern_matches("Flow%", "Flow"));
        assert!(!pattern_matches("Flow%", "Workflow"));
    }

    #[test]
    fn test_pattern_matches_suffix_and_infix() {
        assert!(pattern_matches("%Job", "NightlyJob"));
        assert!(pattern_matches("%tly%", "NightlyJob"));
        assert!(!pattern_matches("%tly%", "DailyJob"));
    }

    #[test]
    fn test_pattern_without_wildcard_is_exact() {
        assert!(pattern_matches("Flow1", "Flow1"));
        assert!(!pattern_matches("Flow1", "Flow12"));
    }

    #[test]
    fn test_attribute_eq() {
        let expr = QueryExpression::Attribute {
            attribute: Attribute::Name,
            op: CompareOp::Eq,
            value: "Flow1".to_string(),
        };

        assert!(expr.matches(&revision("Flow1", "P", vec![])));
        assert!(!expr.matches(&revision("Flow2", "P", vec![])));
    }

    #[test]
    fn test_attribute_ne() {
        let expr = QueryExpression::Attribute {
            attribute: Attribute::ProjectName,
            op: CompareOp::Ne,
            value: "Legacy".to_string(),
        };

        assert!(expr.matches(&revision("Flow1", "Active", vec![])));
        assert!(!expr.matches(&revision("Flow1", "Legacy", vec![])));
    }

    #[test]
    fn test_pair_predicate() {
        let expr = QueryExpression::Pair {
            kind: PairKind::Variable,
            name: "cpu".to_string(),
            value: "4".to_string(),
        };

        assert!(expr.matches(&revision("F", "P", vec![KeyValue::new("cpu", "4")])));
        assert!(!expr.matches(&revision("F", "P", vec![KeyValue::new("cpu", "8")])));
        assert!(!expr.matches(&revision("F", "P", vec![])));
    }

    #[test]
    fn test_pair_predicate_with_pattern_value() {
        let expr = QueryExpression::Pair {
            kind: PairKind::GenericInformation,
            name: "team".to_string(),
            value: "o%".to_string(),
        };

        assert!(expr.matches(&revision("F", "P", vec![])));
    }

    #[test]
    fn test_and_or_combination() {
        let name_eq = QueryExpression::Attribute {
            attribute: Attribute::Name,
            op: CompareOp::Eq,
            value: "Flow1".to_string(),
        };
        let project_eq = QueryExpression::Attribute {
            attribute: Attribute::ProjectName,
            op: CompareOp::Eq,
            value: "Other".to_string(),
        };

        let and = QueryExpression::And(Box::new(name_eq.clone()), Box::new(project_eq.clone()));
        let or = QueryExpression::Or(Box::new(name_eq), Box::new(project_eq));

        let rev = revision("Flow1", "P", vec![]);
        assert!(!and.matches(&rev));
        assert!(or.matches(&rev));
    }
}
