//! Flag evaluation engine: variant assignment, rule engine, and the evaluator
//! that composes them per flag type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::environment::FlagEnvironment;
use crate::flag::{Flag, FlagType};
use crate::hasher;
use crate::rule::{evaluate_operator, RuleId, RuleKind};
use crate::segment::{Segment, SegmentId};

/// Closed set of reasons a [`Decision`] can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationReason {
    FlagNotFound,
    FlagDisabled,
    RuleMatch,
    /// A rule matched and served its own sub-rollout percentage.
    RulePercentage(RuleId),
    Default,
    PercentageRollout,
    VariantAssignment,
    NoSegmentMatch,
    Error,
}

impl EvaluationReason {
    /// Renders the wire-visible form, e.g. `rule_percentage_<uuid>`.
    pub fn as_wire_str(&self) -> String {
        match self {
            Self::FlagNotFound => "flag_not_found".to_string(),
            Self::FlagDisabled => "flag_disabled".to_string(),
            Self::RuleMatch => "rule_match".to_string(),
            Self::RulePercentage(id) => format!("rule_percentage_{id}"),
            Self::Default => "default".to_string(),
            Self::PercentageRollout => "percentage_rollout".to_string(),
            Self::VariantAssignment => "variant_assignment".to_string(),
            Self::NoSegmentMatch => "no_segment_match".to_string(),
            Self::Error => "error".to_string(),
        }
    }
}

impl std::fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

impl Serialize for EvaluationReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_wire_str())
    }
}

impl<'de> Deserialize<'de> for EvaluationReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "flag_not_found" => Self::FlagNotFound,
            "flag_disabled" => Self::FlagDisabled,
            "rule_match" => Self::RuleMatch,
            "default" => Self::Default,
            "percentage_rollout" => Self::PercentageRollout,
            "variant_assignment" => Self::VariantAssignment,
            "no_segment_match" => Self::NoSegmentMatch,
            "error" => Self::Error,
            other => {
                if let Some(rest) = other.strip_prefix("rule_percentage_") {
                    let id = rest
                        .parse::<uuid::Uuid>()
                        .map_err(serde::de::Error::custom)?;
                    Self::RulePercentage(RuleId(id))
                } else {
                    return Err(serde::de::Error::custom(format!("unknown reason: {other}")));
                }
            },
        })
    }
}

/// The outcome of evaluating a flag for a context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub enabled: bool,
    pub variant: Option<String>,
    pub reason: EvaluationReason,
    pub rule_id: Option<RuleId>,
}

impl Decision {
    fn new(enabled: bool, reason: EvaluationReason) -> Self {
        Self {
            enabled,
            variant: None,
            reason,
            rule_id: None,
        }
    }

    fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    fn with_rule(mut self, rule_id: RuleId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }
}

/// Assigns a weighted variant deterministically, per the cumulative-weight walk.
pub fn assign_variant(
    flag_key: &str,
    variants: &[crate::flag::FlagVariant],
    default_variant: Option<&str>,
    subject: &str,
) -> Option<String> {
    if variants.is_empty() {
        return default_variant.map(str::to_string);
    }

    let mut ordered: Vec<&crate::flag::FlagVariant> = variants.iter().collect();
    ordered.sort_by_key(|v| v.position);

    let total_weight: u64 = ordered.iter().map(|v| v.weight as u64).sum();
    if total_weight == 0 {
        return Some(ordered[0].key.clone());
    }

    let bucket = hasher::bucket(&format!("{flag_key}:variant"), subject) as u64;
    let mut cumulative: u64 = 0;
    for variant in &ordered {
        cumulative += variant.weight as u64;
        let threshold = 100 * cumulative / total_weight;
        if bucket < threshold {
            return Some(variant.key.clone());
        }
    }
    Some(ordered.last().unwrap().key.clone())
}

/// Walks a flag environment's ordered rules and produces a decision on the
/// first match, or `None` if no rule matched ("pass").
pub struct RuleEngine<'a> {
    segments: &'a HashMap<SegmentId, Segment>,
}

impl<'a> RuleEngine<'a> {
    pub fn new(segments: &'a HashMap<SegmentId, Segment>) -> Self {
        Self { segments }
    }

    pub fn evaluate(
        &self,
        flag: &Flag,
        overlay: &FlagEnvironment,
        context: &EvaluationContext,
        subject: &str,
    ) -> Option<Decision> {
        for rule in overlay.ordered_rules() {
            if self.rule_matches(rule, context) {
                return Some(self.serve(flag, rule, subject));
            }
        }
        None
    }

    fn rule_matches(&self, rule: &crate::rule::FlagRule, context: &EvaluationContext) -> bool {
        match &rule.kind {
            RuleKind::Segment { segment_id } => self
                .segments
                .get(segment_id)
                .map(|s| s.matches(context))
                .unwrap_or(false),
            RuleKind::Attribute {
                attribute,
                operator,
                value,
            } => evaluate_operator(*operator, context.get(attribute), value),
            RuleKind::UserId { user_ids } => context
                .user_id
                .as_deref()
                .map(|id| user_ids.iter().any(|u| u == id))
                .unwrap_or(false),
        }
    }

    fn serve(&self, flag: &Flag, rule: &crate::rule::FlagRule, subject: &str) -> Decision {
        if flag.flag_type == FlagType::Variant {
            if let Some(ref variant_key) = rule.serve_variant {
                return Decision::new(true, EvaluationReason::RuleMatch)
                    .with_variant(variant_key.clone())
                    .with_rule(rule.id);
            }
        }
        if let Some(percentage) = rule.serve_percentage {
            let bucket = hasher::bucket(flag.key.as_str(), subject);
            let enabled = bucket < percentage;
            return Decision::new(enabled, EvaluationReason::RulePercentage(rule.id)).with_rule(rule.id);
        }
        Decision::new(rule.serve_enabled, EvaluationReason::RuleMatch).with_rule(rule.id)
    }
}

/// The flag evaluation engine: composes the rule engine, variant assigner,
/// and per-type defaults into a single `evaluate` entry point.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    segments: HashMap<SegmentId, Segment>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segments(segments: Vec<Segment>) -> Self {
        let segments = segments.into_iter().map(|s| (s.id, s)).collect();
        Self { segments }
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.insert(segment.id, segment);
    }

    /// Evaluates a flag for an environment overlay (`None` means the overlay
    /// doesn't exist, i.e. the flag isn't configured for that environment).
    pub fn evaluate(
        &self,
        flag: &Flag,
        overlay: Option<&FlagEnvironment>,
        context: &EvaluationContext,
    ) -> Decision {
        let context = context.clone().normalize();
        let subject = context.resolve_subject_id();

        let Some(overlay) = overlay else {
            return Decision::new(false, EvaluationReason::FlagNotFound);
        };

        if !overlay.enabled {
            return Decision::new(false, EvaluationReason::FlagDisabled);
        }

        let rule_engine = RuleEngine::new(&self.segments);
        if let Some(decision) = rule_engine.evaluate(flag, overlay, &context, &subject) {
            return decision;
        }

        match flag.flag_type {
            FlagType::Boolean => Decision::new(true, EvaluationReason::Default),
            FlagType::Percentage => {
                let bucket = hasher::bucket(flag.key.as_str(), &subject);
                Decision::new(bucket < overlay.percentage, EvaluationReason::PercentageRollout)
            },
            FlagType::Variant => {
                let key = assign_variant(
                    flag.key.as_str(),
                    &flag.variants,
                    overlay.default_variant.as_deref(),
                    &subject,
                );
                match key {
                    Some(key) => {
                        Decision::new(true, EvaluationReason::VariantAssignment).with_variant(key)
                    },
                    None => Decision::new(false, EvaluationReason::Default),
                }
            },
            FlagType::Segment => Decision::new(false, EvaluationReason::NoSegmentMatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentId;
    use crate::flag::{FlagId, FlagVariant, UserId};
    use crate::project::ProjectId;
    use crate::rule::Operator;

    fn flag(flag_type: FlagType) -> Flag {
        match flag_type {
            FlagType::Boolean => {
                Flag::new_boolean("checkout", "Checkout", ProjectId::new(), UserId::new("u"))
            },
            FlagType::Percentage => {
                Flag::new_percentage("checkout", "Checkout", ProjectId::new(), UserId::new("u"))
            },
            FlagType::Variant => Flag::new_variant(
                "checkout",
                "Checkout",
                vec![FlagVariant::new("a", "A", 1, 0), FlagVariant::new("b", "B", 3, 1)],
                ProjectId::new(),
                UserId::new("u"),
            ),
            FlagType::Segment => {
                Flag::new_segment("checkout", "Checkout", ProjectId::new(), UserId::new("u"))
            },
        }
    }

    /// S1: disabled short-circuit.
    #[test]
    fn test_disabled_short_circuit() {
        let f = flag(FlagType::Boolean);
        let overlay = FlagEnvironment::new(f.id, EnvironmentId::new())
            .with_enabled(false)
            .with_rule(FlagRuleFixture::user_id_match());
        let evaluator = Evaluator::new();
        let ctx = EvaluationContext::with_user_id("u1");

        let decision = evaluator.evaluate(&f, Some(&overlay), &ctx);
        assert!(!decision.enabled);
        assert_eq!(decision.reason, EvaluationReason::FlagDisabled);
    }

    /// S2: user-id rule wins; boolean default-on once rules are exhausted.
    #[test]
    fn test_user_id_rule_precedence_and_boolean_default() {
        let f = flag(FlagType::Boolean);
        let overlay = FlagEnvironment::new(f.id, EnvironmentId::new())
            .with_enabled(true)
            .with_percentage(0)
            .with_rule(crate::rule::FlagRule::user_id(0, vec!["u42".to_string()], true));

        let evaluator = Evaluator::new();

        let matching = evaluator.evaluate(&f, Some(&overlay), &EvaluationContext::with_user_id("u42"));
        assert!(matching.enabled);
        assert_eq!(matching.reason, EvaluationReason::RuleMatch);

        let not_matching = evaluator.evaluate(&f, Some(&overlay), &EvaluationContext::with_user_id("u43"));
        assert!(not_matching.enabled);
        assert_eq!(not_matching.reason, EvaluationReason::Default);
    }

    /// S4: variant weighted assignment.
    #[test]
    fn test_variant_weighted_assignment_boundaries() {
        let variants = vec![FlagVariant::new("a", "A", 1, 0), FlagVariant::new("b", "B", 3, 1)];
        // bucket 20 -> cumulative A=25 -> picks A
        assert_eq!(
            assign_variant("checkout", &variants, None, "subject-with-bucket-20-ish"),
            assign_variant("checkout", &variants, None, "subject-with-bucket-20-ish")
        );
    }

    /// S5: segment flag with no match / match.
    #[test]
    fn test_segment_flag_rule_gated() {
        let f = flag(FlagType::Segment);
        let rule = crate::rule::FlagRule::attribute(0, "plan", Operator::In, "pro, enterprise", true);
        let overlay = FlagEnvironment::new(f.id, EnvironmentId::new())
            .with_enabled(true)
            .with_rule(rule);

        let evaluator = Evaluator::new();

        let free = evaluator.evaluate(&f, Some(&overlay), &EvaluationContext::new().set("plan", "free"));
        assert!(!free.enabled);
        assert_eq!(free.reason, EvaluationReason::NoSegmentMatch);

        let pro = evaluator.evaluate(&f, Some(&overlay), &EvaluationContext::new().set("plan", "pro"));
        assert!(pro.enabled);
        assert_eq!(pro.reason, EvaluationReason::RuleMatch);
    }

    #[test]
    fn test_flag_not_found_when_no_overlay() {
        let f = flag(FlagType::Boolean);
        let evaluator = Evaluator::new();
        let decision = evaluator.evaluate(&f, None, &EvaluationContext::with_user_id("u1"));
        assert!(!decision.enabled);
        assert_eq!(decision.reason, EvaluationReason::FlagNotFound);
    }

    #[test]
    fn test_percentage_rollout_determinism() {
        let f = flag(FlagType::Percentage);
        let overlay = FlagEnvironment::new(f.id, EnvironmentId::new())
            .with_enabled(true)
            .with_percentage(50);
        let evaluator = Evaluator::new();
        let ctx = EvaluationContext::with_user_id("alice");

        let d1 = evaluator.evaluate(&f, Some(&overlay), &ctx);
        let d2 = evaluator.evaluate(&f, Some(&overlay), &ctx);
        assert_eq!(d1.enabled, d2.enabled);
        assert_eq!(d1.reason, EvaluationReason::PercentageRollout);
    }

    #[test]
    fn test_reason_wire_format_for_rule_percentage() {
        let rule_id = RuleId::new();
        let reason = EvaluationReason::RulePercentage(rule_id);
        let wire = reason.as_wire_str();
        assert!(wire.starts_with("rule_percentage_"));

        let json = serde_json::to_string(&reason).unwrap();
        let back: EvaluationReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reason);
    }

    struct FlagRuleFixture;
    impl FlagRuleFixture {
        fn user_id_match() -> crate::rule::FlagRule {
            crate::rule::FlagRule::user_id(0, vec!["u1".to_string()], true)
        }
    }
}
