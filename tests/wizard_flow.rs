// Wizard sessions driven end to end against the in-memory ledger

use mintforge::chain::{ChainOp, InMemoryChain};
use mintforge::error::WizardErrorKind;
use mintforge::wizard::{DetailsPatch, FinalizeView};
use mintforge::{
    DeploymentGuard, DeploymentOrchestrator, Exchange, InMemoryMetadataPublisher, LaunchError,
    OrchestratorConfig, ProvisionerRegistry, WizardEvent, WizardSession, WizardStep,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

const MIN_BALANCE: u64 = 50_000_000;

fn session() -> (Arc<InMemoryChain>, WizardSession) {
    let chain = Arc::new(InMemoryChain::default());
    let orchestrator = DeploymentOrchestrator::new(
        chain.clone(),
        Arc::new(InMemoryMetadataPublisher::new()),
        ProvisionerRegistry::with_defaults(chain.clone()),
        OrchestratorConfig::default(),
    );
    let session = WizardSession::new(
        Arc::new(orchestrator),
        Arc::new(DeploymentGuard::new()),
        MIN_BALANCE,
    );
    (chain, session)
}

fn details() -> DetailsPatch {
    DetailsPatch {
        name: Some("Demo".to_string()),
        symbol: Some("DMO".to_string()),
        supply: Some("1000000".to_string()),
        decimals: Some(6),
        ..DetailsPatch::default()
    }
}

/// Connects a funded wallet and walks the session up to the deploy step.
async fn walk_to_deploy(chain: &InMemoryChain, session: &mut WizardSession) -> Pubkey {
    let wallet = Pubkey::new_unique();
    chain.set_balance(wallet, 3_000_000_000);

    session.dispatch(WizardEvent::WalletConnected(wallet)).unwrap();
    assert_eq!(session.refresh_balance().await.unwrap(), Some(3_000_000_000));
    session.dispatch(WizardEvent::Next).unwrap();
    session.dispatch(WizardEvent::UpdateDetails(details())).unwrap();
    session.dispatch(WizardEvent::Next).unwrap();
    session
        .dispatch(WizardEvent::SetAuthorities {
            mint_retained: false,
            freeze_retained: false,
        })
        .unwrap();
    session.dispatch(WizardEvent::Next).unwrap();
    assert_eq!(session.state().step, WizardStep::Deploy);
    wallet
}

#[tokio::test]
async fn test_unfunded_wallet_cannot_leave_first_step() {
    let (_chain, mut session) = session();
    session
        .dispatch(WizardEvent::WalletConnected(Pubkey::new_unique()))
        .unwrap();

    // Balance not known yet
    assert!(session.dispatch(WizardEvent::Next).is_err());

    assert_eq!(session.refresh_balance().await.unwrap(), Some(0));
    let err = session.dispatch(WizardEvent::Next).unwrap_err();
    assert!(matches!(
        err,
        LaunchError::Wizard {
            kind: WizardErrorKind::UnmetPrecondition,
            ..
        }
    ));
    assert_eq!(session.state().step, WizardStep::ConnectWallet);
    assert_eq!(session.refresh_balance().await.unwrap(), None);
}

#[tokio::test]
async fn test_unmintable_supply_never_reaches_deploy() {
    for (supply, decimals) in [("99999999999999999999", 9u8), ("1.5", 0)] {
        let (chain, mut session) = session();
        let wallet = Pubkey::new_unique();
        chain.set_balance(wallet, 3_000_000_000);
        session.dispatch(WizardEvent::WalletConnected(wallet)).unwrap();
        session.refresh_balance().await.unwrap();
        session.dispatch(WizardEvent::Next).unwrap();

        session
            .dispatch(WizardEvent::UpdateDetails(DetailsPatch {
                supply: Some(supply.to_string()),
                decimals: Some(decimals),
                ..details()
            }))
            .unwrap();
        let err = session.dispatch(WizardEvent::Next).unwrap_err();
        assert!(matches!(
            err,
            LaunchError::Wizard {
                kind: WizardErrorKind::InvalidInput,
                ..
            }
        ));
        assert_eq!(session.state().step, WizardStep::TokenDetails);
        assert_eq!(chain.mint_count(), 0);
    }
}

#[tokio::test]
async fn test_full_flow_without_liquidity() {
    let (chain, mut session) = session();
    let wallet = walk_to_deploy(&chain, &mut session).await;
    assert_eq!(session.progress().current, 4);
    assert_eq!(session.progress().title, "Deploy");

    let result = session.deploy().await.unwrap().clone();

    assert!(result.success);
    assert_eq!(
        session.state().step,
        WizardStep::Finalize(FinalizeView::Results)
    );
    assert!(session.is_finished());
    assert!(!session.state().is_deploying);
    assert!(session.state().notice.is_none());
    assert_eq!(session.state().token.requester, wallet.to_string());
    assert_eq!(chain.call_count(ChainOp::RevokeAuthority), 1);
    assert!(result.liquidity_pool.is_none());

    // Results is the last page.
    assert!(session.dispatch(WizardEvent::Next).is_err());
    assert!(session.dispatch(WizardEvent::Retry).is_err());
}

#[tokio::test]
async fn test_full_flow_with_liquidity() {
    let (chain, mut session) = session();
    walk_to_deploy(&chain, &mut session).await;

    session.dispatch(WizardEvent::SetLiquidityEnabled(true)).unwrap();
    session.dispatch(WizardEvent::SetSolAmount("2".to_string())).unwrap();
    session.dispatch(WizardEvent::SetExchange(Exchange::Orca)).unwrap();
    assert_eq!(
        session.state().liquidity.token_amount(),
        Decimal::from(20_000)
    );

    let result = session.deploy().await.unwrap().clone();
    assert!(result.success);
    let outcome = result.liquidity_pool.expect("liquidity outcome");
    assert!(outcome.success);
    assert_eq!(outcome.exchange, Exchange::Orca);

    assert_eq!(
        session.state().step,
        WizardStep::Finalize(FinalizeView::LiquiditySetup)
    );
    session.dispatch(WizardEvent::Next).unwrap();
    assert_eq!(
        session.state().step,
        WizardStep::Finalize(FinalizeView::Results)
    );
    session.dispatch(WizardEvent::Back).unwrap();
    assert_eq!(
        session.state().step,
        WizardStep::Finalize(FinalizeView::LiquiditySetup)
    );
}

#[tokio::test]
async fn test_failed_deploy_then_retry_creates_a_new_mint() {
    let (chain, mut session) = session();
    walk_to_deploy(&chain, &mut session).await;
    chain.fail_on(ChainOp::CreateMint, "blockhash not found");

    let result = session.deploy().await.unwrap().clone();
    assert!(!result.success);
    assert_eq!(
        session.state().step,
        WizardStep::Finalize(FinalizeView::Results)
    );
    let notice = session.state().notice.clone().expect("retry advice");
    assert!(notice.contains("safe to deploy again"));
    assert_eq!(chain.mint_count(), 0);
    let first_key = session.state().deploy_key.clone();

    chain.clear_failure(ChainOp::CreateMint);
    session.dispatch(WizardEvent::Retry).unwrap();
    assert_eq!(session.state().step, WizardStep::Deploy);
    assert!(session.state().deploy_key.is_none());

    let result = session.deploy().await.unwrap().clone();
    assert!(result.success);
    assert_ne!(session.state().deploy_key, first_key);
    assert_eq!(chain.mint_count(), 1);
}

#[tokio::test]
async fn test_redeploy_with_same_key_replays() {
    let (chain, mut session) = session();
    walk_to_deploy(&chain, &mut session).await;

    let first = session.deploy().await.unwrap().clone();
    session.dispatch(WizardEvent::Back).unwrap();
    assert_eq!(session.state().step, WizardStep::Deploy);

    let second = session.deploy().await.unwrap().clone();
    assert_eq!(second.mint_address, first.mint_address);
    assert_eq!(second.deployment_id, first.deployment_id);
    assert_eq!(chain.mint_count(), 1);
}

#[tokio::test]
async fn test_start_over_keeps_wallet() {
    let (chain, mut session) = session();
    let wallet = walk_to_deploy(&chain, &mut session).await;
    session.deploy().await.unwrap();

    session.dispatch(WizardEvent::StartOver).unwrap();
    let state = session.state();
    assert_eq!(state.step, WizardStep::ConnectWallet);
    assert_eq!(state.token.requester, wallet.to_string());
    assert!(state.token.name.is_empty());
    assert!(state.last_result.is_none());
    assert!(state.wallet_ready());

    session.dispatch(WizardEvent::Next).unwrap();
    assert_eq!(session.state().step, WizardStep::TokenDetails);
}
