//! Flaps SDK client.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use flaps_core::{
    Decision, EvaluationContext, EvaluationReason, Evaluator, Flag, FlagEnvironment, FlagValue,
    Segment,
};

use crate::config::Config;

/// The Flaps SDK client for evaluating feature flags.
///
/// The client maintains a local cache of flags and their environment overlay
/// (for the single environment configured in [`Config`]), and evaluates them
/// locally for optimal performance. It syncs with the server via SSE or polling.
pub struct FlapsClient {
    config: Config,
    evaluator: Evaluator,
    flags: Arc<RwLock<HashMap<String, Flag>>>,
    overlays: Arc<RwLock<HashMap<String, FlagEnvironment>>>,
}

impl FlapsClient {
    /// Creates a new Flaps client with the given configuration.
    ///
    /// This will connect to the server and fetch the initial flag configuration.
    pub async fn new(config: Config) -> Result<Self, FlapsError> {
        let client = Self {
            config,
            evaluator: Evaluator::new(),
            flags: Arc::new(RwLock::new(HashMap::new())),
            overlays: Arc::new(RwLock::new(HashMap::new())),
        };

        // TODO: Fetch initial bootstrap payload from server
        // TODO: Start SSE connection or polling

        Ok(client)
    }

    /// Creates a client in offline mode with preloaded flags, overlays, and segments.
    pub fn offline(flags: Vec<Flag>, overlays: Vec<FlagEnvironment>, segments: Vec<Segment>) -> Self {
        let flags_map: HashMap<String, Flag> =
            flags.into_iter().map(|f| (f.key.as_str().to_string(), f)).collect();

        let key_by_id: HashMap<_, _> = flags_map
            .values()
            .map(|f| (f.id, f.key.as_str().to_string()))
            .collect();
        let overlays_map: HashMap<String, FlagEnvironment> = overlays
            .into_iter()
            .filter_map(|o| key_by_id.get(&o.flag_id).cloned().map(|k| (k, o)))
            .collect();

        Self {
            config: Config::default().offline(),
            evaluator: Evaluator::with_segments(segments),
            flags: Arc::new(RwLock::new(flags_map)),
            overlays: Arc::new(RwLock::new(overlays_map)),
        }
    }

    /// Creates a new evaluation context builder.
    pub fn context(&self) -> EvaluationContext {
        EvaluationContext::new()
    }

    /// Evaluates a flag and returns the full decision.
    pub async fn evaluate(&self, flag_key: &str, context: &EvaluationContext) -> Decision {
        let flags = self.flags.read().await;
        let overlays = self.overlays.read().await;

        match flags.get(flag_key) {
            Some(flag) => self.evaluator.evaluate(flag, overlays.get(flag_key), context),
            None => Decision {
                enabled: false,
                variant: None,
                reason: EvaluationReason::FlagNotFound,
                rule_id: None,
            },
        }
    }

    /// Returns true if the flag is enabled for the given context.
    pub async fn is_enabled(&self, flag_key: &str, context: &EvaluationContext) -> bool {
        self.evaluate(flag_key, context).await.enabled
    }

    /// Returns the boolean value of a flag, or the default if not found or disabled.
    pub async fn get_bool(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
        default: bool,
    ) -> bool {
        let decision = self.evaluate(flag_key, context).await;
        match decision.reason {
            EvaluationReason::FlagNotFound => default,
            _ => decision.enabled,
        }
    }

    /// Returns the variant key of a flag, or the default if not found, disabled, or boolean-typed.
    pub async fn get_string(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
        default: &str,
    ) -> String {
        let decision = self.evaluate(flag_key, context).await;
        match decision.reason {
            EvaluationReason::FlagNotFound => default.to_string(),
            _ => decision.variant.unwrap_or_else(|| default.to_string()),
        }
    }

    /// Returns all flag keys.
    pub async fn all_flag_keys(&self) -> Vec<String> {
        let flags = self.flags.read().await;
        flags.keys().cloned().collect()
    }

    /// Returns all flags and their current values for debugging.
    pub async fn all_flags(&self, context: &EvaluationContext) -> HashMap<String, FlagValue> {
        let flags = self.flags.read().await;
        let overlays = self.overlays.read().await;
        let mut results = HashMap::new();

        for (key, flag) in flags.iter() {
            let decision = self.evaluator.evaluate(flag, overlays.get(key), context);
            let value = match decision.variant {
                Some(variant) => FlagValue::Variant { key: variant, payload: None },
                None => FlagValue::Boolean(decision.enabled),
            };
            results.insert(key.clone(), value);
        }

        results
    }

    /// Forces a refresh of the flag configuration from the server.
    pub async fn refresh(&self) -> Result<(), FlapsError> {
        if self.config.offline_mode {
            return Ok(());
        }

        // TODO: Fetch bootstrap payload from server
        // TODO: Update local cache

        Ok(())
    }

    /// Shuts down the client and cleans up resources.
    pub async fn close(&self) {
        // TODO: Close SSE connection
        // TODO: Stop polling
    }
}

/// Errors that can occur when using the Flaps client.
#[derive(Debug, thiserror::Error)]
pub enum FlapsError {
    /// Failed to connect to the server.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failed to fetch flags.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server returned an error.
    #[error("Server error: {0}")]
    Server(String),
}

#[cfg(test)]
mod tests {
    use flaps_core::{EnvironmentId, ProjectId, UserId};

    use super::*;

    #[tokio::test]
    async fn test_offline_client() {
        let project_id = ProjectId::new();
        let flag = Flag::new_boolean("test_flag", "Test Flag", project_id, UserId::new("test"));
        let overlay = FlagEnvironment::new(flag.id, EnvironmentId::new()).with_enabled(true);

        let client = FlapsClient::offline(vec![flag], vec![overlay], vec![]);
        let context = EvaluationContext::with_user_id("user-1");

        assert!(client.is_enabled("test_flag", &context).await);
        assert!(!client.is_enabled("unknown_flag", &context).await);
    }

    #[tokio::test]
    async fn test_get_bool_with_default() {
        let project_id = ProjectId::new();
        let flag = Flag::new_boolean("enabled_flag", "Enabled", project_id, UserId::new("test"));
        let overlay = FlagEnvironment::new(flag.id, EnvironmentId::new()).with_enabled(true);

        let client = FlapsClient::offline(vec![flag], vec![overlay], vec![]);
        let context = EvaluationContext::new();

        assert!(client.get_bool("enabled_flag", &context, false).await);
        assert!(client.get_bool("unknown_flag", &context, true).await);
        assert!(!client.get_bool("unknown_flag", &context, false).await);
    }
}
