use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::DeploymentResult;
use crate::error::{LaunchError, Result};

#[derive(Debug, Clone)]
enum Slot {
    InFlight,
    Done(Box<DeploymentResult>),
}

/// Deduplicates deployment submissions by idempotency key.
///
/// A key that is still running is rejected with `DuplicateRequest`. A key
/// whose run may have touched the ledger replays the recorded result. Only
/// runs whose failure is safe to redeploy release the key, so corrected
/// input can be resubmitted under it.
///
/// Each run is spawned onto the runtime and records its own outcome, so a
/// caller that goes away mid-deployment cannot cut a partly applied
/// sequence short or free its key.
#[derive(Debug, Default)]
pub struct DeploymentGuard {
    slots: Arc<DashMap<String, Slot>>,
}

impl DeploymentGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<Fut>(&self, key: &str, deploy: Fut) -> Result<DeploymentResult>
    where
        Fut: Future<Output = DeploymentResult> + Send + 'static,
    {
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(occupied) => {
                return match occupied.get() {
                    Slot::InFlight => {
                        warn!(key = key, "Rejected duplicate deployment submission");
                        Err(LaunchError::DuplicateRequest(format!(
                            "deployment '{}' is already in progress",
                            key
                        )))
                    }
                    Slot::Done(result) => {
                        debug!(key = key, "Replaying recorded deployment result");
                        Ok(result.as_ref().clone())
                    }
                };
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight);
            }
        }

        let slots = self.slots.clone();
        let owned_key = key.to_string();
        let task = tokio::spawn(async move {
            let result = deploy.await;
            if releases_key(&result) {
                slots.remove(&owned_key);
            } else {
                slots.insert(owned_key, Slot::Done(Box::new(result.clone())));
            }
            result
        });

        task.await.map_err(|e| {
            error!(key = key, error = %e, "Deployment task did not complete");
            self.slots.remove(key);
            LaunchError::Internal(format!("deployment task failed: {}", e))
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        matches!(self.slots.get(key).as_deref(), Some(Slot::InFlight))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Runs a deployment without a key, still detached from the caller.
pub async fn run_detached<Fut>(deploy: Fut) -> Result<DeploymentResult>
where
    Fut: Future<Output = DeploymentResult> + Send + 'static,
{
    tokio::spawn(deploy)
        .await
        .map_err(|e| LaunchError::Internal(format!("deployment task failed: {}", e)))
}

fn releases_key(result: &DeploymentResult) -> bool {
    result
        .failure
        .as_ref()
        .map_or(false, |failure| failure.is_safe_to_redeploy())
}
