//! Environment types and per-environment flag overlays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flag::FlagId;
use crate::project::ProjectId;
use crate::rule::FlagRule;

/// Unique identifier for an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(pub Uuid);

impl EnvironmentId {
    /// Creates a new random environment ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an environment ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EnvironmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An environment where flags can be evaluated (e.g., dev, staging, prod).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    /// Machine-readable key (e.g., "dev", "staging", "prod").
    pub key: String,
    pub name: String,
    pub color: Option<String>,
    pub is_production: bool,
    pub project_id: ProjectId,
    /// Order for display purposes.
    pub order: u32,
}

impl Environment {
    pub fn new(key: impl Into<String>, name: impl Into<String>, project_id: ProjectId) -> Self {
        Self {
            id: EnvironmentId::new(),
            key: key.into(),
            name: name.into(),
            color: None,
            is_production: false,
            project_id,
            order: 0,
        }
    }

    pub fn development(project_id: ProjectId) -> Self {
        Self {
            id: EnvironmentId::new(),
            key: "dev".to_string(),
            name: "Development".to_string(),
            color: Some("#22c55e".to_string()),
            is_production: false,
            project_id,
            order: 0,
        }
    }

    pub fn staging(project_id: ProjectId) -> Self {
        Self {
            id: EnvironmentId::new(),
            key: "staging".to_string(),
            name: "Staging".to_string(),
            color: Some("#f59e0b".to_string()),
            is_production: false,
            project_id,
            order: 1,
        }
    }

    pub fn production(project_id: ProjectId) -> Self {
        Self {
            id: EnvironmentId::new(),
            key: "prod".to_string(),
            name: "Production".to_string(),
            color: Some("#ef4444".to_string()),
            is_production: true,
            project_id,
            order: 2,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_production(mut self, is_production: bool) -> Self {
        self.is_production = is_production;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }
}

/// Per-environment overlay for a flag: whether it's on, its rollout
/// percentage, default variant, ordered rules, and any scheduled transition.
///
/// One row is materialized per `(flag, environment)` pair; see invariants in
/// the flag lifecycle documentation for what triggers its creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagEnvironment {
    pub flag_id: FlagId,
    pub environment_id: EnvironmentId,
    pub enabled: bool,
    /// Flat rollout percentage, used directly by `FlagType::Percentage` flags.
    pub percentage: u8,
    /// Variant key served when no rule matches, for `FlagType::Variant` flags.
    pub default_variant: Option<String>,
    /// Ordered rules; first match wins.
    pub rules: Vec<FlagRule>,
    pub enable_at: Option<DateTime<Utc>>,
    pub disable_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlagEnvironment {
    /// Creates the disabled overlay materialized when a flag is created.
    pub fn new(flag_id: FlagId, environment_id: EnvironmentId) -> Self {
        let now = Utc::now();
        Self {
            flag_id,
            environment_id,
            enabled: false,
            percentage: 0,
            default_variant: None,
            rules: Vec::new(),
            enable_at: None,
            disable_at: None,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.percentage = percentage.min(100);
        self
    }

    pub fn with_default_variant(mut self, variant_key: impl Into<String>) -> Self {
        self.default_variant = Some(variant_key.into());
        self
    }

    pub fn with_rule(mut self, rule: FlagRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_schedule(
        mut self,
        enable_at: Option<DateTime<Utc>>,
        disable_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.enable_at = enable_at;
        self.disable_at = disable_at;
        self
    }

    /// Applies a manual toggle: sets `enabled` and clears any pending schedule
    /// (invariant: manual toggles supersede scheduled transitions).
    pub fn toggle(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.enable_at = None;
        self.disable_at = None;
        self.updated_at = Utc::now();
    }

    /// Rules ordered by `position`, ascending.
    pub fn ordered_rules(&self) -> Vec<&FlagRule> {
        let mut rules: Vec<&FlagRule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.position);
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectId;

    #[test]
    fn test_default_environments() {
        let project_id = ProjectId::new();

        let dev = Environment::development(project_id);
        assert_eq!(dev.key, "dev");
        assert!(!dev.is_production);

        let staging = Environment::staging(project_id);
        assert_eq!(staging.key, "staging");

        let prod = Environment::production(project_id);
        assert_eq!(prod.key, "prod");
        assert!(prod.is_production);
    }

    #[test]
    fn test_manual_toggle_clears_schedule() {
        let mut overlay = FlagEnvironment::new(FlagId::new(), EnvironmentId::new())
            .with_schedule(Some(Utc::now()), Some(Utc::now()));

        overlay.toggle(true);

        assert!(overlay.enabled);
        assert!(overlay.enable_at.is_none());
        assert!(overlay.disable_at.is_none());
    }

    #[test]
    fn test_ordered_rules() {
        use crate::rule::Operator;

        let overlay = FlagEnvironment::new(FlagId::new(), EnvironmentId::new())
            .with_rule(FlagRule::attribute(2, "plan", Operator::Eq, "pro", true))
            .with_rule(FlagRule::attribute(0, "plan", Operator::Eq, "free", false));

        let ordered = overlay.ordered_rules();
        assert_eq!(ordered[0].position, 0);
        assert_eq!(ordered[1].position, 2);
    }
}
