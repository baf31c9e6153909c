//! Reusable segments for targeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flag::UserId;
use crate::project::ProjectId;
use crate::rule::{evaluate_operator, Operator};

/// Unique identifier for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    /// Creates a new random segment ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a segment ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a segment's ordered rules combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Every rule must match.
    All,
    /// Any rule matching is sufficient.
    Any,
}

/// A reusable segment of subjects for targeting.
///
/// Segments are referenced by flag rules across multiple flags. Membership
/// is determined by `match_type` over the ordered [`SegmentRule`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// Machine-readable key (e.g., "beta-testers", "premium-users").
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub match_type: MatchType,
    /// Ordered rules combined per `match_type`.
    pub rules: Vec<SegmentRule>,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl Segment {
    /// Creates a new segment with `match_type = All`.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SegmentId::new(),
            key: key.into(),
            name: name.into(),
            description: None,
            match_type: MatchType::All,
            rules: Vec::new(),
            project_id,
            created_at: now,
            updated_at: now,
            created_by,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_rule(mut self, rule: SegmentRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluates the ordered rules against the resolved attribute lookup,
    /// combining per `match_type`. An empty rule set matches nothing.
    pub fn rules_match(&self, lookup: impl Fn(&str) -> Option<crate::rule::AttributeValue>) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        match self.match_type {
            MatchType::All => self.rules.iter().all(|r| r.matches(&lookup)),
            MatchType::Any => self.rules.iter().any(|r| r.matches(&lookup)),
        }
    }

    /// Full membership test against a context: the ordered rules combined
    /// per `match_type`. An empty rule set matches nothing.
    pub fn matches(&self, context: &crate::context::EvaluationContext) -> bool {
        self.rules_match(|attr| context.get(attr).cloned())
    }
}

/// A single ordered predicate within a segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRule {
    pub position: u32,
    pub attribute: String,
    pub operator: Operator,
    pub value: String,
}

impl SegmentRule {
    pub fn new(position: u32, attribute: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            position,
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    fn matches(&self, lookup: &impl Fn(&str) -> Option<crate::rule::AttributeValue>) -> bool {
        evaluate_operator(self.operator, lookup(&self.attribute).as_ref(), &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;

    #[test]
    fn test_create_segment() {
        let segment = Segment::new(
            "beta-testers",
            "Beta Testers",
            ProjectId::new(),
            UserId::new("user-1"),
        )
        .with_description("Users who opted into beta testing")
        .with_rule(SegmentRule::new(0, "email", Operator::EndsWith, "@nubster.com"));

        assert_eq!(segment.key, "beta-testers");
        assert_eq!(segment.rules.len(), 1);
    }

    #[test]
    fn test_matches_delegates_to_rules_and_matches_nothing_when_empty() {
        let segment = Segment::new("s", "S", ProjectId::new(), UserId::new("u"))
            .with_rule(SegmentRule::new(0, "plan", Operator::Eq, "pro"));

        let member = EvaluationContext::new().set("plan", "pro");
        let non_member = EvaluationContext::new().set("plan", "free");
        assert!(segment.matches(&member));
        assert!(!segment.matches(&non_member));

        let empty = Segment::new("s", "S", ProjectId::new(), UserId::new("u"));
        assert!(!empty.matches(&member));
    }

    #[test]
    fn test_match_type_all_vs_any() {
        let segment_all = Segment::new("s", "S", ProjectId::new(), UserId::new("u"))
            .with_rule(SegmentRule::new(0, "plan", Operator::Eq, "pro"))
            .with_rule(SegmentRule::new(1, "country", Operator::Eq, "FR"));

        let segment_any = segment_all.clone().with_match_type(MatchType::Any);

        let ctx = EvaluationContext::new().set("plan", "pro").set("country", "DE");
        let lookup = |attr: &str| ctx.get(attr).cloned();

        assert!(!segment_all.rules_match(lookup));
        assert!(segment_any.rules_match(lookup));
    }

    #[test]
    fn test_empty_rules_match_nothing() {
        let segment = Segment::new("s", "S", ProjectId::new(), UserId::new("u"));
        assert!(!segment.rules_match(|_| None));
    }
}
