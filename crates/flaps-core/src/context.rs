//! Evaluation context for flag evaluation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::AttributeValue;

/// Context for evaluating feature flags.
///
/// The evaluation context contains information about the current subject
/// and any custom attributes that can be used in targeting rules.
///
/// # Example
///
/// ```rust
/// use flaps_core::EvaluationContext;
///
/// let context = EvaluationContext::with_user_id("user-123")
///     .set("plan", "pro")
///     .set("country", "FR")
///     .set("beta_tester", true);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Unique identifier for the subject (used for bucketing).
    pub user_id: Option<String>,
    /// Custom attributes for targeting.
    ///
    /// Flattened on the wire: `{"user_id": "u1", "plan": "pro"}` deserializes
    /// with `plan` landing in `attributes`, not discarded as an unknown field.
    #[serde(flatten)]
    pub attributes: HashMap<String, AttributeValue>,
}

impl EvaluationContext {
    /// Creates a new empty evaluation context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with a user ID.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            attributes: HashMap::new(),
        }
    }

    /// Sets the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets an attribute value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets an attribute value (mutable reference version).
    pub fn set_mut(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Gets an attribute value.
    ///
    /// Attribute keys are matched case-sensitively against the normalized form.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Gets an attribute as a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Gets an attribute as a number.
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(|v| v.as_number())
    }

    /// Gets an attribute as a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(|v| v.as_bool())
    }

    /// Checks if an attribute exists.
    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Removes an attribute.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }

    /// Flattens a `user` sub-object, if present, into top-level attributes.
    ///
    /// Existing top-level attributes win on collision; the `user` key itself
    /// is always removed. Call this once, at the edge, before evaluation.
    pub fn normalize(mut self) -> Self {
        if let Some(AttributeValue::Map(nested)) = self.attributes.remove("user") {
            for (key, value) in nested {
                self.attributes.entry(key).or_insert(value);
            }
        }
        self
    }

    /// Resolves the subject identifier used for deterministic bucketing.
    ///
    /// Falls back, in order: `user_id`, the `id` attribute, the
    /// `anonymous_id` attribute, then a fresh random value. The random
    /// fallback is intentionally non-deterministic across calls; callers
    /// that need stickiness must supply one of the earlier identifiers.
    pub fn resolve_subject_id(&self) -> String {
        if let Some(ref id) = self.user_id {
            return id.clone();
        }
        if let Some(id) = self.get_str("id") {
            return id.to_string();
        }
        if let Some(id) = self.get_str("anonymous_id") {
            return id.to_string();
        }
        tracing::debug!("no stable subject identifier in context, falling back to random id");
        Uuid::new_v4().to_string()
    }

    /// Returns the effective user ID for legacy (non-spec) rollout calculation.
    ///
    /// Falls back to a hash-like string built from attributes if no user ID is set.
    pub fn effective_user_id(&self) -> String {
        if let Some(ref user_id) = self.user_id {
            user_id.clone()
        } else {
            let mut parts: Vec<String> = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{}:{:?}", k, v))
                .collect();
            parts.sort();
            format!("anonymous:{}", parts.join(","))
        }
    }

    /// Merges another context into this one.
    ///
    /// Values from `other` take precedence.
    pub fn merge(mut self, other: EvaluationContext) -> Self {
        if other.user_id.is_some() {
            self.user_id = other.user_id;
        }
        for (key, value) in other.attributes {
            self.attributes.insert(key, value);
        }
        self
    }
}

/// Builder for creating evaluation contexts fluently.
pub struct ContextBuilder {
    context: EvaluationContext,
}

impl ContextBuilder {
    /// Creates a new context builder.
    pub fn new() -> Self {
        Self {
            context: EvaluationContext::new(),
        }
    }

    /// Sets the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.context.user_id = Some(user_id.into());
        self
    }

    /// Sets the email attribute.
    pub fn email(self, email: impl Into<String>) -> Self {
        self.attribute("email", email.into())
    }

    /// Sets the plan attribute.
    pub fn plan(self, plan: impl Into<String>) -> Self {
        self.attribute("plan", plan.into())
    }

    /// Sets the country attribute.
    pub fn country(self, country: impl Into<String>) -> Self {
        self.attribute("country", country.into())
    }

    /// Sets a custom attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.context.attributes.insert(key.into(), value.into());
        self
    }

    /// Builds the evaluation context.
    pub fn build(self) -> EvaluationContext {
        self.context
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_context() {
        let context = EvaluationContext::with_user_id("user-123")
            .set("plan", "pro")
            .set("country", "FR")
            .set("beta_tester", true);

        assert_eq!(context.user_id, Some("user-123".to_string()));
        assert_eq!(context.get_str("plan"), Some("pro"));
        assert_eq!(context.get_str("country"), Some("FR"));
        assert_eq!(context.get_bool("beta_tester"), Some(true));
    }

    #[test]
    fn test_context_builder() {
        let context = ContextBuilder::new()
            .user_id("user-456")
            .email("user@example.com")
            .plan("enterprise")
            .country("DE")
            .attribute("custom_field", 42.0)
            .build();

        assert_eq!(context.user_id, Some("user-456".to_string()));
        assert_eq!(context.get_str("email"), Some("user@example.com"));
        assert_eq!(context.get_number("custom_field"), Some(42.0));
    }

    #[test]
    fn test_effective_user_id() {
        let with_id = EvaluationContext::with_user_id("user-123");
        assert_eq!(with_id.effective_user_id(), "user-123");

        let without_id = EvaluationContext::new().set("session", "abc123");
        assert!(without_id.effective_user_id().starts_with("anonymous:"));
    }

    #[test]
    fn test_merge_contexts() {
        let base = EvaluationContext::with_user_id("user-1")
            .set("plan", "free")
            .set("country", "FR");

        let override_ctx = EvaluationContext::new()
            .set("plan", "pro")
            .set("new_attr", "value");

        let merged = base.merge(override_ctx);
        assert_eq!(merged.user_id, Some("user-1".to_string()));
        assert_eq!(merged.get_str("plan"), Some("pro")); // Overridden
        assert_eq!(merged.get_str("country"), Some("FR")); // Kept
        assert_eq!(merged.get_str("new_attr"), Some("value")); // Added
    }

    #[test]
    fn test_subject_id_resolution_chain() {
        let with_user_id = EvaluationContext::with_user_id("u1");
        assert_eq!(with_user_id.resolve_subject_id(), "u1");

        let with_id_attr = EvaluationContext::new().set("id", "i1");
        assert_eq!(with_id_attr.resolve_subject_id(), "i1");

        let with_anon = EvaluationContext::new().set("anonymous_id", "a1");
        assert_eq!(with_anon.resolve_subject_id(), "a1");

        let with_nothing = EvaluationContext::new();
        // Random fallback: just assert it doesn't panic and is non-empty.
        assert!(!with_nothing.resolve_subject_id().is_empty());
    }

    #[test]
    fn test_deserialize_flat_wire_payload() {
        let context: EvaluationContext =
            serde_json::from_str(r#"{"user_id":"u1","plan":"pro","age":30}"#).unwrap();

        assert_eq!(context.user_id, Some("u1".to_string()));
        assert_eq!(context.get_str("plan"), Some("pro"));
        assert_eq!(context.get_number("age"), Some(30.0));
    }

    #[test]
    fn test_normalize_flattens_user_object() {
        let mut nested = HashMap::new();
        nested.insert("plan".to_string(), AttributeValue::String("pro".to_string()));
        nested.insert("country".to_string(), AttributeValue::String("FR".to_string()));

        let context = EvaluationContext::new()
            .set("user", AttributeValue::Map(nested))
            .set("country", "DE") // top-level wins over nested
            .normalize();

        assert!(!context.has("user"));
        assert_eq!(context.get_str("plan"), Some("pro"));
        assert_eq!(context.get_str("country"), Some("DE"));
    }
}
