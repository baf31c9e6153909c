//! Feature flag types and structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::project::ProjectId;

/// Unique identifier for a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(pub Uuid);

impl FlagId {
    /// Creates a new random flag ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a flag ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for FlagId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FlagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Machine-readable key for a flag (e.g., "new_checkout", "dark_mode").
///
/// Keys are lowercase, start with a letter, and contain only lowercase
/// alphanumerics and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagKey(pub String);

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FlagKey {
    /// Creates a new flag key.
    ///
    /// # Panics
    ///
    /// Panics if the key does not match `^[a-z][a-z0-9_]*$`.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        assert!(
            is_valid_key(&key),
            "flag key must match ^[a-z][a-z0-9_]*$, got {key:?}"
        );
        Self(key)
    }

    /// Tries to create a new flag key, returning None if invalid.
    pub fn try_new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if is_valid_key(&key) {
            Some(Self(key))
        } else {
            None
        }
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FlagKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Subject/user ID for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// The kind of decision a flag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// Simple on/off flag.
    Boolean,
    /// Flat percentage rollout, no variants.
    Percentage,
    /// Weighted multivariate assignment.
    Variant,
    /// Served only through rules matching a segment.
    Segment,
}

impl Default for FlagType {
    fn default() -> Self {
        Self::Boolean
    }
}

/// One arm of a [`FlagType::Variant`] flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagVariant {
    /// Machine-readable key (e.g., "control", "treatment").
    pub key: String,
    pub name: String,
    /// Opaque payload handed back to the caller alongside the variant key.
    pub payload: Option<serde_json::Value>,
    /// Non-negative weight used by the variant assigner.
    pub weight: u32,
    pub position: u32,
}

impl FlagVariant {
    pub fn new(key: impl Into<String>, name: impl Into<String>, weight: u32, position: u32) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            payload: None,
            weight,
            position,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Value returned by a flag evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Boolean(bool),
    Variant {
        key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}

impl FlagValue {
    /// Returns the boolean value if this is a boolean flag value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the variant key if this is a variant value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Variant { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Returns true if this is a truthy value.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Boolean(b) => *b,
            FlagValue::Variant { key, .. } => !key.is_empty(),
        }
    }
}

impl Default for FlagValue {
    fn default() -> Self {
        Self::Boolean(false)
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Variant {
            key: value,
            payload: None,
        }
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Variant {
            key: value.to_string(),
            payload: None,
        }
    }
}

/// A feature flag: a type, a set of variants (if applicable), and
/// per-environment overlays (stored separately, see [`crate::environment::FlagEnvironment`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub id: FlagId,
    pub key: FlagKey,
    pub name: String,
    pub description: Option<String>,
    pub flag_type: FlagType,
    /// Variants for `FlagType::Variant` flags; empty otherwise.
    pub variants: Vec<FlagVariant>,
    pub tags: Vec<String>,
    /// Archived flags can never be un-archived or deleted.
    pub archived: bool,
    /// Permanent flags reject deletion; archival is their only terminal state.
    pub permanent: bool,
    pub owner_email: Option<String>,
    pub project_id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl Flag {
    fn base(
        key: impl Into<String>,
        name: impl Into<String>,
        flag_type: FlagType,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FlagId::new(),
            key: FlagKey::new(key),
            name: name.into(),
            description: None,
            flag_type,
            variants: Vec::new(),
            tags: Vec::new(),
            archived: false,
            permanent: false,
            owner_email: None,
            project_id,
            created_at: now,
            updated_at: now,
            created_by,
        }
    }

    /// Creates a new boolean flag.
    pub fn new_boolean(
        key: impl Into<String>,
        name: impl Into<String>,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        Self::base(key, name, FlagType::Boolean, project_id, created_by)
    }

    /// Creates a new flat percentage-rollout flag.
    pub fn new_percentage(
        key: impl Into<String>,
        name: impl Into<String>,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        Self::base(key, name, FlagType::Percentage, project_id, created_by)
    }

    /// Creates a new weighted-variant flag.
    pub fn new_variant(
        key: impl Into<String>,
        name: impl Into<String>,
        variants: Vec<FlagVariant>,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        let mut flag = Self::base(key, name, FlagType::Variant, project_id, created_by);
        flag.variants = variants;
        flag
    }

    /// Creates a new segment-only flag.
    pub fn new_segment(
        key: impl Into<String>,
        name: impl Into<String>,
        project_id: ProjectId,
        created_by: UserId,
    ) -> Self {
        Self::base(key, name, FlagType::Segment, project_id, created_by)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    pub fn with_owner(mut self, owner_email: impl Into<String>) -> Self {
        self.owner_email = Some(owner_email.into());
        self
    }

    /// Looks up a variant by key.
    pub fn variant(&self, key: &str) -> Option<&FlagVariant> {
        self.variants.iter().find(|v| v.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_key_validation() {
        assert!(FlagKey::try_new("valid_key").is_some());
        assert!(FlagKey::try_new("valid_key_123").is_some());
        assert!(FlagKey::try_new("").is_none());
        assert!(FlagKey::try_new("Invalid").is_none());
        assert!(FlagKey::try_new("1invalid").is_none());
        assert!(FlagKey::try_new("invalid-key").is_none());
        assert!(FlagKey::try_new("invalid key").is_none());
    }

    #[test]
    fn test_flag_value_conversions() {
        let bool_val: FlagValue = true.into();
        assert_eq!(bool_val.as_bool(), Some(true));
        assert!(bool_val.is_truthy());

        let variant_val: FlagValue = "variant-a".into();
        assert_eq!(variant_val.as_str(), Some("variant-a"));
        assert!(variant_val.is_truthy());
    }

    #[test]
    fn test_create_boolean_flag() {
        let flag = Flag::new_boolean(
            "test_flag",
            "Test Flag",
            ProjectId::new(),
            UserId::new("user-1"),
        );

        assert_eq!(flag.key.as_str(), "test_flag");
        assert_eq!(flag.name, "Test Flag");
        assert_eq!(flag.flag_type, FlagType::Boolean);
    }

    #[test]
    fn test_variant_lookup() {
        let flag = Flag::new_variant(
            "checkout",
            "Checkout Experiment",
            vec![
                FlagVariant::new("a", "A", 1, 0),
                FlagVariant::new("b", "B", 3, 1),
            ],
            ProjectId::new(),
            UserId::new("user-1"),
        );

        assert!(flag.variant("a").is_some());
        assert!(flag.variant("missing").is_none());
    }
}
