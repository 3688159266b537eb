use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{WizardEvent, WizardState, WizardStep};
use crate::error::{LaunchError, Result};
use crate::orchestrator::{DeploymentGuard, DeploymentOrchestrator, DeploymentResult};

/// Step bar data for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub title: &'static str,
}

/// One user's pass through the wizard.
///
/// Owns the state exclusively; the only suspension points are the balance
/// query and the orchestrator call.
pub struct WizardSession {
    state: WizardState,
    orchestrator: Arc<DeploymentOrchestrator>,
    guard: Arc<DeploymentGuard>,
}

impl WizardSession {
    pub fn new(
        orchestrator: Arc<DeploymentOrchestrator>,
        guard: Arc<DeploymentGuard>,
        min_balance_lamports: u64,
    ) -> Self {
        Self {
            state: WizardState::new(min_balance_lamports),
            orchestrator,
            guard,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Applies `event`; on rejection the state is unchanged.
    pub fn dispatch(&mut self, event: WizardEvent) -> Result<&WizardState> {
        let next = self.state.apply(event)?;
        if next.step != self.state.step {
            debug!(from = %self.state.step, to = %next.step, "Wizard step changed");
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Queries the balance the connected wallet is waiting on, if any.
    pub async fn refresh_balance(&mut self) -> Result<Option<u64>> {
        let Some((address, ticket)) = self.state.pending_balance_query() else {
            return Ok(None);
        };
        let lamports = self.orchestrator.chain().get_balance(&address).await?;
        self.dispatch(WizardEvent::BalanceResolved { ticket, lamports })?;
        Ok(Some(lamports))
    }

    /// Runs the deployment for the current drafts and moves to `Finalize`.
    ///
    /// Reuses the attempt's idempotency key, so a repeated call after a
    /// partial success replays the recorded result instead of minting again.
    pub async fn deploy(&mut self) -> Result<&DeploymentResult> {
        let key = self
            .state
            .deploy_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.dispatch(WizardEvent::DeployStarted {
            idempotency_key: key.clone(),
        })?;

        let token = self.state.token.clone();
        let liquidity = self.state.liquidity.clone();
        let orchestrator = self.orchestrator.clone();
        info!(key = %key, symbol = %token.symbol, "Wizard deployment started");

        let outcome = self
            .guard
            .run(&key, async move {
                orchestrator.deploy(&token, Some(&liquidity)).await
            })
            .await;

        match outcome {
            Ok(result) => {
                self.dispatch(WizardEvent::DeployFinished(Box::new(result)))?;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Wizard deployment not started");
                self.dispatch(WizardEvent::DeployAborted(err.to_string()))?;
                return Err(err);
            }
        }

        self.state
            .last_result
            .as_ref()
            .ok_or_else(|| LaunchError::Internal("deployment finished without a result".to_string()))
    }

    pub fn progress(&self) -> Progress {
        let (current, total) = self.state.progress();
        Progress {
            current,
            total,
            title: self.state.step.title(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state.step, WizardStep::Finalize(_))
    }
}
