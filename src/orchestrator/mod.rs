//! Ordered, non-atomic token deployment.
//!
//! Each step is its own failure domain. Nothing is rolled back: a failure
//! after `createMint` leaves a mint on the ledger, and the result says so.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mintforge_types::{StepEvent, StepStatus};

use crate::chain::{AuthorityKind, ChainClient};
use crate::error::{log_error, with_timeout, ErrorKind, LaunchError, Result};
use crate::liquidity::{
    self, Exchange, LiquidityAmounts, LiquidityPoolInfo, LiquidityProvisioner, LiquiditySpec,
    ProvisionerRegistry,
};
use crate::metadata::{MetadataPublisher, MetadataRequest};
use crate::monitoring;
use crate::token::amount::to_base_units;
use crate::token::{adjusted_supply, TokenSpec};

pub mod idempotency;

pub use idempotency::DeploymentGuard;

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeployStep {
    Validate,
    ComputeSupply,
    FundPayer,
    CreateMint,
    GetOrCreateAssociatedAccount,
    MintTo,
    RevokeAuthority,
    PublishMetadata,
    ProvisionLiquidity,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::Validate => "validate",
            DeployStep::ComputeSupply => "computeSupply",
            DeployStep::FundPayer => "fundPayer",
            DeployStep::CreateMint => "createMint",
            DeployStep::GetOrCreateAssociatedAccount => "getOrCreateAssociatedAccount",
            DeployStep::MintTo => "mintTo",
            DeployStep::RevokeAuthority => "revokeAuthority",
            DeployStep::PublishMetadata => "publishMetadata",
            DeployStep::ProvisionLiquidity => "provisionLiquidity",
        }
    }

    /// Steps that run before anything is written to the ledger.
    pub fn is_offline(&self) -> bool {
        matches!(self, DeployStep::Validate | DeployStep::ComputeSupply)
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for each individual network step.
    pub step_timeout: Duration,
    /// Fee-payer top-up before `createMint`, test networks only.
    pub airdrop_lamports: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout: DEFAULT_STEP_TIMEOUT,
            airdrop_lamports: None,
        }
    }
}

/// Why token creation stopped, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentFailure {
    pub kind: ErrorKind,
    pub step: DeployStep,
    pub detail: String,
    /// Mint left on the ledger by the partial run, if any.
    pub mint: Option<Pubkey>,
}

impl DeploymentFailure {
    /// Whether re-running the whole deployment can create a duplicate mint.
    pub fn is_safe_to_redeploy(&self) -> bool {
        self.mint.is_none() && !(self.step == DeployStep::CreateMint && self.kind == ErrorKind::Timeout)
    }

    pub fn retry_advice(&self) -> String {
        if self.step.is_offline() {
            return "Nothing was sent to the ledger. Correct the input and deploy again.".to_string();
        }
        match self.mint {
            Some(mint) => format!(
                "Mint {} was created but {} failed. Do not recreate the mint; finish the remaining steps against the existing mint.",
                mint, self.step
            ),
            None if self.step == DeployStep::CreateMint && self.kind == ErrorKind::Timeout => {
                "createMint timed out and may still land. Check the requester's mints before deploying again."
                    .to_string()
            }
            None => format!("{} failed before a mint was created. It is safe to deploy again.", self.step),
        }
    }
}

/// Liquidity result, reported independently of token creation.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityOutcome {
    pub success: bool,
    pub exchange: Exchange,
    pub pool: Option<LiquidityPoolInfo>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl LiquidityOutcome {
    fn provisioned(pool: LiquidityPoolInfo) -> Self {
        Self {
            success: true,
            exchange: pool.exchange,
            pool: Some(pool),
            error: None,
            error_kind: None,
        }
    }

    fn failed(exchange: Exchange, err: &LaunchError) -> Self {
        Self {
            success: false,
            exchange,
            pool: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub deployment_id: Uuid,
    pub success: bool,
    pub mint_address: Option<Pubkey>,
    pub token_account_address: Option<Pubkey>,
    /// Signature of the `mintTo` transaction.
    pub transaction_signature: Option<Signature>,
    pub metadata_uri: Option<String>,
    pub liquidity_pool: Option<LiquidityOutcome>,
    pub failure: Option<DeploymentFailure>,
    pub warnings: Vec<String>,
    pub steps: Vec<StepEvent>,
}

impl DeploymentResult {
    fn new(deployment_id: Uuid) -> Self {
        Self {
            deployment_id,
            success: false,
            mint_address: None,
            token_account_address: None,
            transaction_signature: None,
            metadata_uri: None,
            liquidity_pool: None,
            failure: None,
            warnings: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn failed_step(&self) -> Option<DeployStep> {
        self.failure.as_ref().map(|f| f.step)
    }

    /// Step events with the given status, in execution order.
    pub fn steps_with(&self, status: StepStatus) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(move |e| e.status == status)
            .map(|e| e.step.as_str())
    }

    fn record(&mut self, step: DeployStep, status: StepStatus) -> &mut StepEvent {
        self.steps.push(StepEvent::new(self.deployment_id, step.as_str(), status));
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }

    fn completed(&mut self, step: DeployStep, signature: Option<&Signature>) {
        let event = self.record(step, StepStatus::Completed);
        event.signature = signature.map(|s| s.to_string());
    }

    fn skipped(&mut self, step: DeployStep, reason: &str) {
        self.record(step, StepStatus::Skipped).details = Some(reason.to_string());
    }

    fn step_failed(&mut self, step: DeployStep, err: &LaunchError) {
        self.record(step, StepStatus::Failed).details = Some(err.to_string());
        monitoring::record_step_failure(step.as_str());
    }
}

struct LiquidityPlan {
    provisioner: Arc<dyn LiquidityProvisioner>,
    amounts: LiquidityAmounts,
    owner: Pubkey,
}

/// Sequences ledger, metadata and liquidity capabilities for one token.
///
/// Holds only capability handles; every `deploy` call is independent.
#[derive(Clone)]
pub struct DeploymentOrchestrator {
    chain: Arc<dyn ChainClient>,
    metadata: Arc<dyn MetadataPublisher>,
    provisioners: ProvisionerRegistry,
    config: OrchestratorConfig,
}

impl fmt::Debug for DeploymentOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentOrchestrator")
            .field("network", &self.chain.network())
            .field("provisioners", &self.provisioners)
            .field("config", &self.config)
            .finish()
    }
}

impl DeploymentOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        metadata: Arc<dyn MetadataPublisher>,
        provisioners: ProvisionerRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chain,
            metadata,
            provisioners,
            config,
        }
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs the full deployment. Never returns `Err`: every failure is
    /// attributed to a step inside the result.
    pub async fn deploy(&self, spec: &TokenSpec, liquidity: Option<&LiquiditySpec>) -> DeploymentResult {
        let mut result = DeploymentResult::new(Uuid::new_v4());
        info!(
            deployment_id = %result.deployment_id,
            name = %spec.name,
            symbol = %spec.symbol,
            network = %self.chain.network(),
            "Starting token deployment"
        );

        let plan = match self.create_token(spec, liquidity, &mut result).await {
            Ok(plan) => plan,
            Err((step, err)) => {
                log_error(&err, &format!("Deployment {} failed at {}", result.deployment_id, step));
                result.step_failed(step, &err);
                result.failure = Some(DeploymentFailure {
                    kind: err.kind(),
                    step,
                    detail: err.to_string(),
                    mint: result.mint_address,
                });
                monitoring::record_deployment("failure");
                return result;
            }
        };

        result.success = true;
        monitoring::record_deployment("success");

        self.publish_metadata(spec, &mut result).await;

        match plan {
            Some(plan) => self.provision_liquidity(plan, spec, &mut result).await,
            None => result.skipped(DeployStep::ProvisionLiquidity, "liquidity not requested"),
        }

        info!(
            deployment_id = %result.deployment_id,
            mint = ?result.mint_address,
            warnings = result.warnings.len(),
            "Token deployment finished"
        );
        result
    }

    /// Steps 1-6. Returns the liquidity plan validated in step 1.
    async fn create_token(
        &self,
        spec: &TokenSpec,
        liquidity: Option<&LiquiditySpec>,
        result: &mut DeploymentResult,
    ) -> std::result::Result<Option<LiquidityPlan>, (DeployStep, LaunchError)> {
        let (requester, supply, plan) =
            self.validate(spec, liquidity).map_err(|e| (DeployStep::Validate, e))?;
        result.completed(DeployStep::Validate, None);

        let amount = adjusted_supply(supply, spec.decimals).map_err(|e| (DeployStep::ComputeSupply, e))?;
        result.completed(DeployStep::ComputeSupply, None);
        debug!(supply = %supply, decimals = spec.decimals, base_units = amount, "Adjusted supply computed");

        let payer = self.chain.fee_payer();
        if let Some(lamports) = self.config.airdrop_lamports.filter(|_| self.chain.network().is_test()) {
            let signature = self
                .run_step(DeployStep::FundPayer, self.chain.request_airdrop(&payer, lamports))
                .await?;
            result.completed(DeployStep::FundPayer, Some(&signature));
        }

        let freeze_authority = spec.freeze_authority_retained.then_some(&requester);
        let created = self
            .run_step(
                DeployStep::CreateMint,
                self.chain.create_mint(&payer, &requester, freeze_authority, spec.decimals),
            )
            .await?;
        result.mint_address = Some(created.mint);
        result.completed(DeployStep::CreateMint, Some(&created.signature));
        info!(mint = %created.mint, "Mint account created");

        let account = self
            .run_step(
                DeployStep::GetOrCreateAssociatedAccount,
                self.chain.get_or_create_associated_account(&created.mint, &requester),
            )
            .await?;
        result.token_account_address = Some(account.address);
        result.completed(DeployStep::GetOrCreateAssociatedAccount, account.signature.as_ref());

        let signature = self
            .run_step(
                DeployStep::MintTo,
                self.chain.mint_to(&created.mint, &account.address, &requester, amount),
            )
            .await?;
        result.transaction_signature = Some(signature);
        result.completed(DeployStep::MintTo, Some(&signature));
        info!(mint = %created.mint, amount = amount, "Supply minted");

        if spec.mint_authority_retained {
            result.skipped(DeployStep::RevokeAuthority, "mint authority retained");
        } else {
            let signature = self
                .run_step(
                    DeployStep::RevokeAuthority,
                    self.chain
                        .revoke_authority(&created.mint, AuthorityKind::MintTokens, &requester),
                )
                .await?;
            result.completed(DeployStep::RevokeAuthority, Some(&signature));
            info!(mint = %created.mint, "Mint authority revoked, supply is fixed");
        }

        Ok(plan)
    }

    fn validate(
        &self,
        spec: &TokenSpec,
        liquidity: Option<&LiquiditySpec>,
    ) -> Result<(Pubkey, Decimal, Option<LiquidityPlan>)> {
        let validated = spec.validate()?;
        let plan = match liquidity.filter(|l| l.enabled) {
            Some(liquidity) => {
                let provisioner = self.provisioners.get(liquidity.exchange)?;
                let amounts = liquidity.validate(validated.supply, spec.decimals)?;
                if amounts.token != liquidity.token_amount() {
                    debug!(
                        drafted = %liquidity.token_amount(),
                        derived = %amounts.token,
                        "Liquidity token amount re-derived from validated supply"
                    );
                }
                Some(LiquidityPlan {
                    provisioner,
                    amounts,
                    owner: validated.requester,
                })
            }
            None => None,
        };
        Ok((validated.requester, validated.supply, plan))
    }

    /// Step 7. Failure only adds a warning.
    async fn publish_metadata(&self, spec: &TokenSpec, result: &mut DeploymentResult) {
        let Some(mint) = result.mint_address else {
            return;
        };
        if !spec.has_metadata_payload() {
            result.skipped(DeployStep::PublishMetadata, "no logo or links supplied");
            return;
        }
        let request = MetadataRequest {
            mint: &mint,
            name: spec.name.trim(),
            symbol: spec.symbol.trim(),
            links: &spec.links,
            logo: spec.logo.as_ref(),
        };
        match self.run_step(DeployStep::PublishMetadata, self.metadata.publish(request)).await {
            Ok(uri) => {
                result.completed(DeployStep::PublishMetadata, None);
                result.metadata_uri = Some(uri);
            }
            Err((step, err)) => {
                warn!(mint = %mint, error = %err, "Metadata publication failed, continuing without it");
                result.step_failed(step, &err);
                result
                    .warnings
                    .push(format!("Token created without metadata: {}", err));
            }
        }
    }

    /// Step 8. Reported separately; never rolls back the token.
    async fn provision_liquidity(
        &self,
        plan: LiquidityPlan,
        spec: &TokenSpec,
        result: &mut DeploymentResult,
    ) {
        let Some(mint) = result.mint_address else {
            return;
        };
        let exchange = plan.provisioner.exchange();
        let outcome = self
            .run_step(
                DeployStep::ProvisionLiquidity,
                liquidity::provision(
                    plan.provisioner.as_ref(),
                    &mint,
                    &plan.owner,
                    plan.amounts.sol,
                    plan.amounts.token,
                    spec.decimals,
                ),
            )
            .await;

        let outcome = match outcome {
            Ok(pool) => {
                result.completed(DeployStep::ProvisionLiquidity, None);
                monitoring::record_liquidity("success");
                LiquidityOutcome::provisioned(pool)
            }
            Err((step, err)) => {
                log_error(&err, &format!("Liquidity for {}", mint));
                result.step_failed(step, &err);
                monitoring::record_liquidity("failure");
                LiquidityOutcome::failed(exchange, &err)
            }
        };
        result.liquidity_pool = Some(outcome);
    }

    /// Seeds a pool for an already deployed mint (`/setup-liquidity`).
    pub async fn setup_liquidity(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        sol: Decimal,
        token: Decimal,
        exchange: Exchange,
    ) -> Result<LiquidityPoolInfo> {
        let provisioner = self.provisioners.get(exchange)?;
        if sol <= Decimal::ZERO {
            return Err(LaunchError::validation("solAmount must be greater than zero"));
        }

        let info = self
            .run_step(DeployStep::ProvisionLiquidity, self.chain.get_mint(mint))
            .await
            .map_err(|(_, e)| e)?;
        let requested = to_base_units("tokenAmount", token, info.decimals)?;
        if requested > info.supply {
            return Err(LaunchError::validation(format!(
                "token amount {} exceeds the minted supply",
                token
            )));
        }

        let outcome = self
            .run_step(
                DeployStep::ProvisionLiquidity,
                liquidity::provision(provisioner.as_ref(), mint, owner, sol, token, info.decimals),
            )
            .await
            .map_err(|(_, e)| e);
        monitoring::record_liquidity(if outcome.is_ok() { "success" } else { "failure" });
        outcome
    }

    async fn run_step<T, F>(
        &self,
        step: DeployStep,
        fut: F,
    ) -> std::result::Result<T, (DeployStep, LaunchError)>
    where
        F: Future<Output = Result<T>>,
    {
        debug!(step = %step, "Running deployment step");
        with_timeout(step.as_str(), self.config.step_timeout, fut)
            .await
            .map_err(|e| (step, attribute(step, e)))
    }
}

/// Tags transport-level errors with the step they happened in.
fn attribute(step: DeployStep, err: LaunchError) -> LaunchError {
    match err {
        LaunchError::SolanaRpc(_)
        | LaunchError::NetworkError(_)
        | LaunchError::HttpError { .. }
        | LaunchError::Internal(_) => LaunchError::chain(step.as_str(), err.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainOp, InMemoryChain};
    use crate::metadata::InMemoryMetadataPublisher;
    use crate::token::LogoAsset;
    use std::str::FromStr;

    struct Harness {
        chain: Arc<InMemoryChain>,
        metadata: Arc<InMemoryMetadataPublisher>,
        orchestrator: DeploymentOrchestrator,
    }

    fn harness(config: OrchestratorConfig) -> Harness {
        let chain = Arc::new(InMemoryChain::default());
        let metadata = Arc::new(InMemoryMetadataPublisher::new());
        let registry = ProvisionerRegistry::with_defaults(chain.clone());
        let orchestrator = DeploymentOrchestrator::new(chain.clone(), metadata.clone(), registry, config);
        Harness {
            chain,
            metadata,
            orchestrator,
        }
    }

    fn demo_spec(requester: &Pubkey) -> TokenSpec {
        TokenSpec {
            name: "Demo".into(),
            symbol: "DMO".into(),
            supply: "1000000".into(),
            decimals: 6,
            requester: requester.to_string(),
            ..TokenSpec::default()
        }
    }

    #[tokio::test]
    async fn test_freeze_authority_follows_flag() {
        let h = harness(OrchestratorConfig::default());
        let requester = Pubkey::new_unique();

        let result = h.orchestrator.deploy(&demo_spec(&requester), None).await;
        let info = h.chain.get_mint(&result.mint_address.unwrap()).await.unwrap();
        assert_eq!(info.freeze_authority, Some(requester));
        assert_eq!(info.mint_authority, Some(requester));

        let spec = TokenSpec {
            freeze_authority_retained: false,
            ..demo_spec(&requester)
        };
        let result = h.orchestrator.deploy(&spec, None).await;
        let info = h.chain.get_mint(&result.mint_address.unwrap()).await.unwrap();
        assert_eq!(info.freeze_authority, None);
    }

    #[tokio::test]
    async fn test_metadata_published_with_logo() {
        let h = harness(OrchestratorConfig::default());
        let requester = Pubkey::new_unique();
        let spec = TokenSpec {
            logo: Some(LogoAsset::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")),
            ..demo_spec(&requester)
        };

        let result = h.orchestrator.deploy(&spec, None).await;
        assert!(result.success);
        let uri = result.metadata_uri.expect("metadata uri");
        let document = h.metadata.document(&uri).unwrap();
        assert_eq!(document.name, "Demo");
        assert!(document.image.unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_metadata_failure_is_a_warning() {
        let h = harness(OrchestratorConfig::default());
        h.metadata.set_unavailable("bucket offline");
        let requester = Pubkey::new_unique();
        let mut spec = demo_spec(&requester);
        spec.links.website = Some("https://demo.example".into());

        let result = h.orchestrator.deploy(&spec, None).await;
        assert!(result.success);
        assert!(result.metadata_uri.is_none());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.steps_with(StepStatus::Failed).collect::<Vec<_>>(),
            vec!["publishMetadata"]
        );
    }

    #[tokio::test]
    async fn test_fund_payer_only_when_configured() {
        let h = harness(OrchestratorConfig {
            airdrop_lamports: Some(1_000_000_000),
            ..OrchestratorConfig::default()
        });
        let result = h.orchestrator.deploy(&demo_spec(&Pubkey::new_unique()), None).await;
        assert!(result.success);
        assert_eq!(h.chain.call_count(ChainOp::RequestAirdrop), 1);
        assert_eq!(result.steps[2].step, "fundPayer");

        let h = harness(OrchestratorConfig::default());
        h.orchestrator.deploy(&demo_spec(&Pubkey::new_unique()), None).await;
        assert_eq!(h.chain.call_count(ChainOp::RequestAirdrop), 0);
    }

    #[tokio::test]
    async fn test_step_timeout_is_distinct_from_chain_error() {
        let h = harness(OrchestratorConfig {
            step_timeout: Duration::from_millis(20),
            ..OrchestratorConfig::default()
        });
        h.chain.delay(ChainOp::GetOrCreateAssociatedAccount, Duration::from_millis(500));

        let result = h.orchestrator.deploy(&demo_spec(&Pubkey::new_unique()), None).await;
        let failure = result.failure.expect("failure");
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert_eq!(failure.step, DeployStep::GetOrCreateAssociatedAccount);
        assert!(failure.mint.is_some());
        assert!(!failure.is_safe_to_redeploy());
    }

    #[tokio::test]
    async fn test_create_mint_failure_is_safe_to_redeploy() {
        let h = harness(OrchestratorConfig::default());
        h.chain.fail_on(ChainOp::CreateMint, "blockhash not found");

        let result = h.orchestrator.deploy(&demo_spec(&Pubkey::new_unique()), None).await;
        let failure = result.failure.expect("failure");
        assert_eq!(failure.kind, ErrorKind::Chain);
        assert_eq!(failure.step, DeployStep::CreateMint);
        assert!(failure.is_safe_to_redeploy());
        assert!(failure.retry_advice().contains("safe to deploy again"));
    }

    #[tokio::test]
    async fn test_unsupported_exchange_fails_validation_without_calls() {
        let chain = Arc::new(InMemoryChain::default());
        let orchestrator = DeploymentOrchestrator::new(
            chain.clone(),
            Arc::new(InMemoryMetadataPublisher::new()),
            ProvisionerRegistry::new(),
            OrchestratorConfig::default(),
        );
        let spec = demo_spec(&Pubkey::new_unique());
        let liquidity = LiquiditySpec::enabled("2", Exchange::Orca, &spec);

        let result = orchestrator.deploy(&spec, Some(&liquidity)).await;
        let failure = result.failure.expect("failure");
        assert_eq!(failure.kind, ErrorKind::UnsupportedExchange);
        assert_eq!(failure.step, DeployStep::Validate);
        assert_eq!(chain.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fractional_derived_amount_is_floored_to_decimals() {
        let h = harness(OrchestratorConfig::default());
        let requester = Pubkey::new_unique();
        h.chain.set_balance(requester, 5_000_000_000);
        let spec = TokenSpec {
            supply: "1050".into(),
            decimals: 0,
            ..demo_spec(&requester)
        };
        let liquidity = LiquiditySpec::enabled("1", Exchange::Raydium, &spec);

        let result = h.orchestrator.deploy(&spec, Some(&liquidity)).await;
        assert!(result.success);
        let outcome = result.liquidity_pool.expect("liquidity outcome");
        assert!(outcome.success, "liquidity failed: {:?}", outcome.error);
        let pool = outcome.pool.unwrap();
        assert_eq!(pool.initial_price, Decimal::from_str("0.1").unwrap());
    }

    #[tokio::test]
    async fn test_unscalable_sol_amount_fails_before_mint() {
        let h = harness(OrchestratorConfig::default());
        let spec = demo_spec(&Pubkey::new_unique());
        let liquidity = LiquiditySpec::enabled("0.0000000001", Exchange::Raydium, &spec);

        let result = h.orchestrator.deploy(&spec, Some(&liquidity)).await;
        let failure = result.failure.expect("failure");
        assert_eq!(failure.step, DeployStep::Validate);
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(h.chain.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_liquidity_amount_rederived_from_deployed_supply() {
        let h = harness(OrchestratorConfig::default());
        let requester = Pubkey::new_unique();
        h.chain.set_balance(requester, 5_000_000_000);
        let spec = demo_spec(&requester);
        let other = TokenSpec {
            supply: "500000000".into(),
            ..demo_spec(&requester)
        };
        let liquidity = LiquiditySpec::enabled("2", Exchange::Orca, &other);
        assert_eq!(liquidity.token_amount(), Decimal::from(10_000_000));

        let result = h.orchestrator.deploy(&spec, Some(&liquidity)).await;
        let pool = result.liquidity_pool.expect("liquidity outcome").pool.unwrap();
        assert_eq!(pool.initial_price, Decimal::from_str("0.0001").unwrap());
    }

    #[tokio::test]
    async fn test_setup_liquidity_for_existing_mint() {
        let h = harness(OrchestratorConfig::default());
        let requester = Pubkey::new_unique();
        let result = h.orchestrator.deploy(&demo_spec(&requester), None).await;
        let mint = result.mint_address.unwrap();
        h.chain.set_balance(requester, 5_000_000_000);

        let pool = h
            .orchestrator
            .setup_liquidity(&mint, &requester, Decimal::from(2), Decimal::from(20_000), Exchange::Raydium)
            .await
            .unwrap();
        assert_eq!(pool.exchange, Exchange::Raydium);
        assert_eq!(pool.initial_price, Decimal::from_str("0.0001").unwrap());

        let too_much = h
            .orchestrator
            .setup_liquidity(&mint, &requester, Decimal::from(2), Decimal::from(2_000_000), Exchange::Raydium)
            .await;
        assert!(matches!(too_much, Err(LaunchError::Validation(_))));
    }
}
