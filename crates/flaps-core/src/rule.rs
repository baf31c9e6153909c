//! Operator library and targeting-rule types.
//!
//! A rule is a tagged predicate evaluated against an [`EvaluationContext`](crate::context::EvaluationContext):
//! it either references a [`Segment`](crate::segment::Segment), compares one attribute against a
//! literal, or checks subject-id membership in an explicit list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::segment::SegmentId;

/// Unique identifier for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub Uuid);

impl RuleId {
    /// Creates a new random rule ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute values carried in an evaluation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Boolean(bool),
    StringList(Vec<String>),
    Map(std::collections::HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns the string value if applicable.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number value if applicable.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value if applicable.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string list if applicable.
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::StringList(list) => Some(list),
            _ => None,
        }
    }

    /// Renders the value as a string for operator comparisons.
    ///
    /// Numbers and booleans are formatted textually; lists and maps have no
    /// single string form and yield `None`.
    pub fn coerce_str(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Number(n) => Some(format!("{n}")),
            AttributeValue::Boolean(b) => Some(b.to_string()),
            AttributeValue::StringList(_) | AttributeValue::Map(_) => None,
        }
    }

    /// Renders the value as a number for ordering comparisons.
    ///
    /// A string whose text parses as a number is coerced (wire payloads
    /// frequently carry numeric attributes as strings); booleans, lists,
    /// and maps have no numeric form and yield `None`.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::String(s) => s.parse::<f64>().ok(),
            AttributeValue::Boolean(_) | AttributeValue::StringList(_) | AttributeValue::Map(_) => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

/// Comparison operators usable in attribute rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Regex,
}

/// Evaluates `attr <operator> literal`, failing closed to `false` on any
/// missing or malformed input. No operator ever panics or propagates an error.
pub fn evaluate_operator(operator: Operator, attr: Option<&AttributeValue>, literal: &str) -> bool {
    // `neq` still fails closed on a missing attribute: missingness isn't inequality.
    let Some(attr) = attr else {
        return false;
    };

    match operator {
        Operator::Eq => attr.coerce_str().as_deref() == Some(literal),
        Operator::Neq => attr.coerce_str().as_deref() != Some(literal),
        Operator::Contains => attr
            .coerce_str()
            .map(|s| s.contains(literal))
            .unwrap_or(false),
        Operator::NotContains => attr
            .coerce_str()
            .map(|s| !s.contains(literal))
            .unwrap_or(false),
        Operator::StartsWith => attr
            .coerce_str()
            .map(|s| s.starts_with(literal))
            .unwrap_or(false),
        Operator::EndsWith => attr
            .coerce_str()
            .map(|s| s.ends_with(literal))
            .unwrap_or(false),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let (Some(actual), Ok(expected)) = (attr.coerce_number(), literal.parse::<f64>()) else {
                return false;
            };
            match operator {
                Operator::Gt => actual > expected,
                Operator::Gte => actual >= expected,
                Operator::Lt => actual < expected,
                Operator::Lte => actual <= expected,
                _ => unreachable!(),
            }
        },
        Operator::In | Operator::NotIn => {
            let Some(actual) = attr.coerce_str() else {
                return false;
            };
            let is_member = literal.split(',').map(str::trim).any(|item| item == actual);
            if operator == Operator::In {
                is_member
            } else {
                !is_member
            }
        },
        Operator::Regex => {
            let Some(actual) = attr.coerce_str() else {
                return false;
            };
            regex::Regex::new(literal)
                .map(|re| re.is_match(&actual))
                .unwrap_or(false)
        },
    }
}

/// The discriminant of a [`FlagRule`]: exactly one shape is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Matches subjects that belong to a segment.
    Segment { segment_id: SegmentId },
    /// Matches a single attribute against a literal.
    Attribute {
        attribute: String,
        operator: Operator,
        value: String,
    },
    /// Matches an explicit list of subject ids.
    UserId { user_ids: Vec<String> },
}

/// An ordered rule attached to a flag's per-environment overlay.
///
/// Rules are walked in `position` order; the first match wins and determines
/// the served outcome via exactly one of `serve_variant`, `serve_percentage`,
/// or `serve_enabled` (checked in that precedence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRule {
    pub id: RuleId,
    pub position: u32,
    pub kind: RuleKind,
    pub serve_enabled: bool,
    pub serve_variant: Option<String>,
    pub serve_percentage: Option<u8>,
    pub description: Option<String>,
}

impl FlagRule {
    /// Creates a segment-matching rule that serves a fixed enabled bit.
    pub fn segment(position: u32, segment_id: SegmentId, serve_enabled: bool) -> Self {
        Self {
            id: RuleId::new(),
            position,
            kind: RuleKind::Segment { segment_id },
            serve_enabled,
            serve_variant: None,
            serve_percentage: None,
            description: None,
        }
    }

    /// Creates an attribute-matching rule that serves a fixed enabled bit.
    pub fn attribute(
        position: u32,
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
        serve_enabled: bool,
    ) -> Self {
        Self {
            id: RuleId::new(),
            position,
            kind: RuleKind::Attribute {
                attribute: attribute.into(),
                operator,
                value: value.into(),
            },
            serve_enabled,
            serve_variant: None,
            serve_percentage: None,
            description: None,
        }
    }

    /// Creates a user-id allowlist rule.
    pub fn user_id(position: u32, user_ids: Vec<String>, serve_enabled: bool) -> Self {
        Self {
            id: RuleId::new(),
            position,
            kind: RuleKind::UserId { user_ids },
            serve_enabled,
            serve_variant: None,
            serve_percentage: None,
            description: None,
        }
    }

    /// Serves a specific variant key on match instead of a plain enabled bit.
    pub fn with_serve_variant(mut self, variant_key: impl Into<String>) -> Self {
        self.serve_variant = Some(variant_key.into());
        self
    }

    /// Serves a sub-rollout percentage on match instead of a plain enabled bit.
    pub fn with_serve_percentage(mut self, percentage: u8) -> Self {
        self.serve_percentage = Some(percentage.min(100));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_and_neq() {
        let attr = AttributeValue::String("pro".to_string());
        assert!(evaluate_operator(Operator::Eq, Some(&attr), "pro"));
        assert!(!evaluate_operator(Operator::Eq, Some(&attr), "free"));
        assert!(evaluate_operator(Operator::Neq, Some(&attr), "free"));
        assert!(!evaluate_operator(Operator::Neq, None, "free"));
    }

    #[test]
    fn test_contains_family() {
        let attr = AttributeValue::String("user@nubster.com".to_string());
        assert!(evaluate_operator(Operator::Contains, Some(&attr), "nubster"));
        assert!(!evaluate_operator(Operator::NotContains, Some(&attr), "nubster"));
        assert!(evaluate_operator(Operator::StartsWith, Some(&attr), "user@"));
        assert!(evaluate_operator(Operator::EndsWith, Some(&attr), ".com"));
    }

    #[test]
    fn test_numeric_operators_fail_closed_on_non_numeric() {
        let attr = AttributeValue::String("not-a-number".to_string());
        assert!(!evaluate_operator(Operator::Gt, Some(&attr), "5"));
        assert!(!evaluate_operator(Operator::Lte, Some(&attr), "5"));
    }

    #[test]
    fn test_numeric_operators_coerce_string_valued_numbers() {
        let attr = AttributeValue::String("42".to_string());
        assert!(evaluate_operator(Operator::Gt, Some(&attr), "10"));
        assert!(evaluate_operator(Operator::Gte, Some(&attr), "42"));
        assert!(evaluate_operator(Operator::Lt, Some(&attr), "100"));
        assert!(!evaluate_operator(Operator::Lte, Some(&attr), "41"));
    }

    #[test]
    fn test_in_and_not_in() {
        let attr = AttributeValue::String("pro".to_string());
        assert!(evaluate_operator(Operator::In, Some(&attr), "free, pro, enterprise"));
        assert!(!evaluate_operator(Operator::NotIn, Some(&attr), "free, pro, enterprise"));

        let missing_attr = AttributeValue::String("trial".to_string());
        assert!(!evaluate_operator(Operator::In, Some(&missing_attr), "free,pro"));
        assert!(evaluate_operator(Operator::NotIn, Some(&missing_attr), "free,pro"));
    }

    #[test]
    fn test_regex_fails_closed_on_bad_pattern() {
        let attr = AttributeValue::String("abc123".to_string());
        assert!(evaluate_operator(Operator::Regex, Some(&attr), r"^[a-z]+\d+$"));
        assert!(!evaluate_operator(Operator::Regex, Some(&attr), "(unterminated"));
    }

    #[test]
    fn test_missing_attribute_fails_closed() {
        assert!(!evaluate_operator(Operator::Eq, None, "anything"));
        assert!(!evaluate_operator(Operator::In, None, "a,b"));
    }
}
