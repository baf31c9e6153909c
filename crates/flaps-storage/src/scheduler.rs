//! Durable-timer scheduler.
//!
//! `schedule`/`cancel` write directly onto the overlay's `enable_at`/
//! `disable_at` columns rather than a separate in-memory registration
//! table, so a registered transition survives a process restart. A
//! background tick loop periodically re-reads storage for due transitions
//! and applies them.

use std::time::Duration;

use chrono::{DateTime, Utc};

use flaps_core::{EnvironmentId, FlagEnvironment, FlagId};

use crate::error::StorageResult;
use crate::repositories::Repositories;
use crate::traits::Scheduler;

/// A [`Scheduler`] backed by the overlay table itself.
#[derive(Debug, Clone)]
pub struct StorageScheduler {
    repos: Repositories,
}

impl StorageScheduler {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Spawns the tick loop applying due `enable_at`/`disable_at` transitions.
    ///
    /// Firing re-reads the current overlay before applying it, so a manual
    /// toggle made since scheduling wins: the schedule only ever sets a
    /// target state, it doesn't own the overlay.
    pub fn spawn_tick_loop(&self, tick_interval: Duration) {
        let repos = self.repos.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;
                if let Err(err) = fire_due(&repos).await {
                    tracing::warn!(error = %err, "scheduler tick failed");
                }
            }
        });
    }
}

async fn fire_due(repos: &Repositories) -> StorageResult<()> {
    let now = Utc::now();
    for due in repos.list_overlays_due(now).await? {
        let mut overlay = due;
        apply_due_transition(&mut overlay, now);
        repos.upsert_overlay(&overlay).await?;
    }
    Ok(())
}

/// Disable wins when both a stale `enable_at` and a due `disable_at` are
/// present on the same overlay; either way both schedule columns are
/// cleared so firing is idempotent on the next tick.
fn apply_due_transition(overlay: &mut FlagEnvironment, now: DateTime<Utc>) {
    let disable_due = overlay.disable_at.is_some_and(|at| at <= now);
    let enable_due = overlay.enable_at.is_some_and(|at| at <= now);

    if disable_due {
        overlay.enabled = false;
    } else if enable_due {
        overlay.enabled = true;
    }
    overlay.enable_at = None;
    overlay.disable_at = None;
    overlay.updated_at = now;
}

impl Scheduler for StorageScheduler {
    async fn schedule(
        &self,
        flag_id: FlagId,
        environment_id: EnvironmentId,
        fire_at: DateTime<Utc>,
        enable: bool,
    ) -> StorageResult<()> {
        let mut overlay = match self.repos.get_overlay(flag_id, environment_id).await? {
            Some(overlay) => overlay,
            None => FlagEnvironment::new(flag_id, environment_id),
        };

        if enable {
            overlay.enable_at = Some(fire_at);
            overlay.disable_at = None;
        } else {
            overlay.disable_at = Some(fire_at);
            overlay.enable_at = None;
        }
        overlay.updated_at = Utc::now();

        self.repos.upsert_overlay(&overlay).await
    }

    async fn cancel(&self, flag_id: FlagId, environment_id: EnvironmentId) -> StorageResult<()> {
        let Some(mut overlay) = self.repos.get_overlay(flag_id, environment_id).await? else {
            return Ok(());
        };
        if overlay.enable_at.is_none() && overlay.disable_at.is_none() {
            return Ok(());
        }

        overlay.enable_at = None;
        overlay.disable_at = None;
        overlay.updated_at = Utc::now();

        self.repos.upsert_overlay(&overlay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_wins_when_both_due() {
        let mut overlay = FlagEnvironment::new(FlagId::new(), EnvironmentId::new());
        let now = Utc::now();
        overlay.enabled = false;
        overlay.enable_at = Some(now - chrono::Duration::seconds(5));
        overlay.disable_at = Some(now - chrono::Duration::seconds(1));

        apply_due_transition(&mut overlay, now);

        assert!(!overlay.enabled);
        assert!(overlay.enable_at.is_none());
        assert!(overlay.disable_at.is_none());
    }

    #[test]
    fn test_enable_at_fires_when_due() {
        let mut overlay = FlagEnvironment::new(FlagId::new(), EnvironmentId::new());
        let now = Utc::now();
        overlay.enabled = false;
        overlay.enable_at = Some(now - chrono::Duration::seconds(1));

        apply_due_transition(&mut overlay, now);

        assert!(overlay.enabled);
        assert!(overlay.enable_at.is_none());
    }
}
