//! Launch wizard as one explicit state value.
//!
//! [`WizardState::apply`] is a pure transition function: it never performs
//! I/O and never mutates the state it is called on. Guards reject an event
//! with a [`WizardErrorKind`] and leave the caller's state untouched.
//! [`session::WizardSession`] owns a state and runs the async parts.

use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::config::DEFAULT_MIN_WALLET_BALANCE_LAMPORTS;
use crate::error::{LaunchError, Result, WizardErrorKind};
use crate::liquidity::{Exchange, LiquiditySpec};
use crate::orchestrator::DeploymentResult;
use crate::token::{LogoAsset, SocialLinks, TokenSpec};

pub mod session;

pub use session::WizardSession;

pub const TOTAL_STEPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeView {
    LiquiditySetup,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    ConnectWallet,
    TokenDetails,
    Configuration,
    Deploy,
    Finalize(FinalizeView),
}

impl WizardStep {
    /// Zero-based position in the step bar.
    pub fn index(&self) -> usize {
        match self {
            WizardStep::ConnectWallet => 0,
            WizardStep::TokenDetails => 1,
            WizardStep::Configuration => 2,
            WizardStep::Deploy => 3,
            WizardStep::Finalize(_) => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::ConnectWallet => "Connect Wallet",
            WizardStep::TokenDetails => "Token Details",
            WizardStep::Configuration => "Configuration",
            WizardStep::Deploy => "Deploy",
            WizardStep::Finalize(FinalizeView::LiquiditySetup) => "Liquidity Setup",
            WizardStep::Finalize(FinalizeView::Results) => "Results",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletState {
    Disconnected,
    Connected {
        address: Pubkey,
        /// `None` until the balance query for `ticket` resolves.
        balance_lamports: Option<u64>,
        ticket: u64,
    },
}

/// Partial edit of the token draft; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailsPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub supply: Option<String>,
    pub decimals: Option<u8>,
    pub links: Option<SocialLinks>,
    pub logo: Option<Option<LogoAsset>>,
}

#[derive(Debug, Clone)]
pub enum WizardEvent {
    WalletConnected(Pubkey),
    WalletDisconnected,
    BalanceResolved { ticket: u64, lamports: u64 },
    UpdateDetails(DetailsPatch),
    SetAuthorities { mint_retained: bool, freeze_retained: bool },
    SetLiquidityEnabled(bool),
    SetSolAmount(String),
    SetExchange(Exchange),
    Next,
    Back,
    DeployStarted { idempotency_key: String },
    DeployFinished(Box<DeploymentResult>),
    /// The orchestrator was never reached (e.g. duplicate submission).
    DeployAborted(String),
    Retry,
    StartOver,
}

#[derive(Debug, Clone)]
pub struct WizardState {
    pub step: WizardStep,
    pub wallet: WalletState,
    pub token: TokenSpec,
    pub liquidity: LiquiditySpec,
    pub last_result: Option<DeploymentResult>,
    pub is_deploying: bool,
    /// Key of the current deploy attempt; cleared by `Retry` and `StartOver`.
    pub deploy_key: Option<String>,
    pub notice: Option<String>,
    min_balance_lamports: u64,
    tickets_issued: u64,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WALLET_BALANCE_LAMPORTS)
    }
}

impl WizardState {
    pub fn new(min_balance_lamports: u64) -> Self {
        Self {
            step: WizardStep::ConnectWallet,
            wallet: WalletState::Disconnected,
            token: TokenSpec::default(),
            liquidity: LiquiditySpec::default(),
            last_result: None,
            is_deploying: false,
            deploy_key: None,
            notice: None,
            min_balance_lamports,
            tickets_issued: 0,
        }
    }

    pub fn min_balance_lamports(&self) -> u64 {
        self.min_balance_lamports
    }

    /// `(address, ticket)` of the balance query the wallet is waiting on.
    pub fn pending_balance_query(&self) -> Option<(Pubkey, u64)> {
        match self.wallet {
            WalletState::Connected {
                address,
                balance_lamports: None,
                ticket,
            } => Some((address, ticket)),
            _ => None,
        }
    }

    /// `(current, total)`, one-based.
    pub fn progress(&self) -> (usize, usize) {
        (self.step.index() + 1, TOTAL_STEPS)
    }

    // --- guards ---

    pub fn wallet_ready(&self) -> bool {
        matches!(
            self.wallet,
            WalletState::Connected { balance_lamports: Some(balance), .. }
                if balance >= self.min_balance_lamports
        )
    }

    pub fn details_ready(&self) -> bool {
        self.token.validate_mintable().is_ok()
    }

    pub fn can_go_back(&self) -> bool {
        !self.is_deploying && self.step != WizardStep::ConnectWallet
    }

    pub fn can_retry(&self) -> bool {
        !self.is_deploying
            && matches!(self.step, WizardStep::Finalize(_))
            && self.last_result.as_ref().map_or(false, |r| !r.success)
    }

    /// Applies `event`, returning the next state.
    pub fn apply(&self, event: WizardEvent) -> Result<WizardState> {
        let mut next = self.clone();
        next.notice = None;

        match event {
            WizardEvent::WalletConnected(address) => {
                next.ensure_idle("connect a wallet")?;
                next.tickets_issued += 1;
                next.wallet = WalletState::Connected {
                    address,
                    balance_lamports: None,
                    ticket: next.tickets_issued,
                };
                next.token.requester = address.to_string();
            }
            WizardEvent::WalletDisconnected => {
                next.wallet = WalletState::Disconnected;
            }
            WizardEvent::BalanceResolved { ticket, lamports } => {
                if let WalletState::Connected {
                    ticket: current,
                    balance_lamports,
                    ..
                } = &mut next.wallet
                {
                    if *current == ticket {
                        *balance_lamports = Some(lamports);
                    }
                }
            }
            WizardEvent::UpdateDetails(patch) => {
                next.ensure_idle("edit token details")?;
                let previous = (next.token.supply_value(), next.token.decimals);
                next.apply_details(patch);
                let current = (next.token.supply_value(), next.token.decimals);
                if next.liquidity.enabled && current != previous {
                    next.recompute_liquidity();
                }
            }
            WizardEvent::SetAuthorities {
                mint_retained,
                freeze_retained,
            } => {
                next.ensure_idle("change authorities")?;
                next.token.mint_authority_retained = mint_retained;
                next.token.freeze_authority_retained = freeze_retained;
            }
            WizardEvent::SetLiquidityEnabled(enabled) => {
                next.ensure_idle("change liquidity settings")?;
                let was_enabled = next.liquidity.enabled;
                next.liquidity.enabled = enabled;
                if enabled && !was_enabled {
                    next.recompute_liquidity();
                }
            }
            WizardEvent::SetSolAmount(amount) => {
                next.ensure_idle("change liquidity settings")?;
                let previous = next.liquidity.sol_value();
                next.liquidity.sol_amount = amount;
                if next.liquidity.enabled && next.liquidity.sol_value() != previous {
                    next.recompute_liquidity();
                }
            }
            WizardEvent::SetExchange(exchange) => {
                next.ensure_idle("change liquidity settings")?;
                next.liquidity.exchange = exchange;
            }
            WizardEvent::Next => next.advance()?,
            WizardEvent::Back => next.retreat()?,
            WizardEvent::DeployStarted { idempotency_key } => {
                if next.is_deploying {
                    return Err(busy("start another deployment"));
                }
                if next.step != WizardStep::Deploy {
                    return Err(invalid_transition(format!("cannot deploy from {}", next.step)));
                }
                next.require_details()?;
                next.is_deploying = true;
                next.deploy_key = Some(idempotency_key);
            }
            WizardEvent::DeployFinished(result) => {
                if !next.is_deploying {
                    return Err(invalid_transition("no deployment is in progress"));
                }
                next.is_deploying = false;
                next.step = if result.success && next.liquidity.enabled {
                    WizardStep::Finalize(FinalizeView::LiquiditySetup)
                } else {
                    WizardStep::Finalize(FinalizeView::Results)
                };
                if let Some(failure) = &result.failure {
                    next.notice = Some(failure.retry_advice());
                }
                next.last_result = Some(*result);
            }
            WizardEvent::DeployAborted(reason) => {
                if !next.is_deploying {
                    return Err(invalid_transition("no deployment is in progress"));
                }
                next.is_deploying = false;
                next.notice = Some(reason);
            }
            WizardEvent::Retry => {
                if !next.can_retry() {
                    return Err(invalid_transition("retry is only offered after a failed deployment"));
                }
                next.step = WizardStep::Deploy;
                next.deploy_key = None;
            }
            WizardEvent::StartOver => {
                next.ensure_idle("start over")?;
                let requester = std::mem::take(&mut next.token.requester);
                next.token = TokenSpec {
                    requester,
                    ..TokenSpec::default()
                };
                next.liquidity = LiquiditySpec::default();
                next.last_result = None;
                next.deploy_key = None;
                next.step = WizardStep::ConnectWallet;
            }
        }
        Ok(next)
    }

    fn advance(&mut self) -> Result<()> {
        self.ensure_idle("move forward")?;
        self.step = match self.step {
            WizardStep::ConnectWallet => {
                if !self.wallet_ready() {
                    return Err(LaunchError::wizard(
                        WizardErrorKind::UnmetPrecondition,
                        format!(
                            "connect a wallet holding at least {} lamports",
                            self.min_balance_lamports
                        ),
                    ));
                }
                WizardStep::TokenDetails
            }
            WizardStep::TokenDetails => {
                self.require_details()?;
                WizardStep::Configuration
            }
            WizardStep::Configuration => {
                self.require_details()?;
                WizardStep::Deploy
            }
            WizardStep::Deploy => {
                return Err(invalid_transition("deploy the token to continue"));
            }
            WizardStep::Finalize(FinalizeView::LiquiditySetup) => {
                WizardStep::Finalize(FinalizeView::Results)
            }
            WizardStep::Finalize(FinalizeView::Results) => {
                return Err(invalid_transition("this is the last step; start over to create another token"));
            }
        };
        Ok(())
    }

    fn retreat(&mut self) -> Result<()> {
        self.ensure_idle("go back")?;
        self.step = match self.step {
            WizardStep::ConnectWallet => {
                return Err(invalid_transition("already at the first step"));
            }
            WizardStep::TokenDetails => WizardStep::ConnectWallet,
            WizardStep::Configuration => WizardStep::TokenDetails,
            WizardStep::Deploy => WizardStep::Configuration,
            WizardStep::Finalize(FinalizeView::Results)
                if self.liquidity.enabled
                    && self.last_result.as_ref().map_or(false, |r| r.success) =>
            {
                WizardStep::Finalize(FinalizeView::LiquiditySetup)
            }
            WizardStep::Finalize(_) => WizardStep::Deploy,
        };
        Ok(())
    }

    fn apply_details(&mut self, patch: DetailsPatch) {
        if let Some(name) = patch.name {
            self.token.name = name;
        }
        if let Some(symbol) = patch.symbol {
            self.token.symbol = symbol;
        }
        if let Some(supply) = patch.supply {
            self.token.supply = supply;
        }
        if let Some(decimals) = patch.decimals {
            self.token.decimals = decimals;
        }
        if let Some(links) = patch.links {
            self.token.links = links;
        }
        if let Some(logo) = patch.logo {
            self.token.logo = logo;
        }
    }

    fn recompute_liquidity(&mut self) {
        self.liquidity.recompute(&self.token);
    }

    fn require_details(&self) -> Result<()> {
        self.token
            .validate_mintable()
            .map(|_| ())
            .map_err(|e| LaunchError::wizard(WizardErrorKind::InvalidInput, e.to_string()))
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.is_deploying {
            Err(busy(action))
        } else {
            Ok(())
        }
    }
}

fn busy(action: &str) -> LaunchError {
    LaunchError::wizard(
        WizardErrorKind::Busy,
        format!("cannot {} while a deployment is running", action),
    )
}

fn invalid_transition(message: impl Into<String>) -> LaunchError {
    LaunchError::wizard(WizardErrorKind::InvalidTransition, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn wizard_kind(result: Result<WizardState>) -> WizardErrorKind {
        match result {
            Err(LaunchError::Wizard { kind, .. }) => kind,
            other => panic!("Expected wizard error, got {:?}", other.map(|s| s.step)),
        }
    }

    fn connected(lamports: u64) -> WizardState {
        let state = WizardState::default()
            .apply(WizardEvent::WalletConnected(Pubkey::new_unique()))
            .unwrap();
        let (_, ticket) = state.pending_balance_query().unwrap();
        state
            .apply(WizardEvent::BalanceResolved { ticket, lamports })
            .unwrap()
    }

    fn details() -> DetailsPatch {
        DetailsPatch {
            name: Some("Demo".into()),
            symbol: Some("DMO".into()),
            supply: Some("1000000".into()),
            ..DetailsPatch::default()
        }
    }

    #[test]
    fn test_balance_gate() {
        let poor = connected(49_999_999);
        assert_eq!(wizard_kind(poor.apply(WizardEvent::Next)), WizardErrorKind::UnmetPrecondition);

        let rich = connected(50_000_000);
        assert_eq!(rich.apply(WizardEvent::Next).unwrap().step, WizardStep::TokenDetails);

        let pending = WizardState::default()
            .apply(WizardEvent::WalletConnected(Pubkey::new_unique()))
            .unwrap();
        assert!(pending.apply(WizardEvent::Next).is_err());
    }

    #[test]
    fn test_stale_balance_is_ignored() {
        let state = WizardState::default()
            .apply(WizardEvent::WalletConnected(Pubkey::new_unique()))
            .unwrap();
        let (_, first_ticket) = state.pending_balance_query().unwrap();

        // Disconnect before the query resolves.
        let state = state.apply(WizardEvent::WalletDisconnected).unwrap();
        let state = state
            .apply(WizardEvent::BalanceResolved { ticket: first_ticket, lamports: u64::MAX })
            .unwrap();
        assert_eq!(state.wallet, WalletState::Disconnected);

        // Reconnect: the old ticket must not satisfy the new query.
        let state = state
            .apply(WizardEvent::WalletConnected(Pubkey::new_unique()))
            .unwrap();
        let state = state
            .apply(WizardEvent::BalanceResolved { ticket: first_ticket, lamports: u64::MAX })
            .unwrap();
        assert!(state.pending_balance_query().is_some());
        assert!(!state.wallet_ready());
    }

    #[test]
    fn test_details_gate() {
        let state = connected(100_000_000).apply(WizardEvent::Next).unwrap();
        assert_eq!(wizard_kind(state.apply(WizardEvent::Next)), WizardErrorKind::InvalidInput);

        let partial = state
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                supply: Some(String::new()),
                ..details()
            }))
            .unwrap();
        assert!(partial.apply(WizardEvent::Next).is_err());

        let ready = state.apply(WizardEvent::UpdateDetails(details())).unwrap();
        let config = ready.apply(WizardEvent::Next).unwrap();
        assert_eq!(config.step, WizardStep::Configuration);

        // Clearing the name afterwards still blocks the Deploy step.
        let cleared = config
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                name: Some(String::new()),
                ..DetailsPatch::default()
            }))
            .unwrap();
        assert!(cleared.apply(WizardEvent::Next).is_err());
        assert_eq!(config.apply(WizardEvent::Next).unwrap().step, WizardStep::Deploy);
    }

    #[test]
    fn test_details_gate_rejects_unmintable_supply() {
        let state = connected(100_000_000).apply(WizardEvent::Next).unwrap();
        for (supply, decimals) in [("99999999999999999999", 9u8), ("1.5", 0)] {
            let draft = state
                .apply(WizardEvent::UpdateDetails(DetailsPatch {
                    supply: Some(supply.into()),
                    decimals: Some(decimals),
                    ..details()
                }))
                .unwrap();
            assert!(!draft.details_ready());
            assert_eq!(wizard_kind(draft.apply(WizardEvent::Next)), WizardErrorKind::InvalidInput);
        }

        // Lowering decimals after the details step still blocks Deploy.
        let config = state
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                supply: Some("1.5".into()),
                decimals: Some(1),
                ..details()
            }))
            .unwrap()
            .apply(WizardEvent::Next)
            .unwrap();
        assert_eq!(config.step, WizardStep::Configuration);
        let lowered = config
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                decimals: Some(0),
                ..DetailsPatch::default()
            }))
            .unwrap();
        assert!(lowered.apply(WizardEvent::Next).is_err());
    }

    #[test]
    fn test_token_amount_recomputed_only_on_change() {
        let state = connected(100_000_000)
            .apply(WizardEvent::UpdateDetails(details()))
            .unwrap()
            .apply(WizardEvent::SetSolAmount("2".into()))
            .unwrap();
        // Disabled: nothing derived yet.
        assert_eq!(state.liquidity.revision(), 0);

        let state = state.apply(WizardEvent::SetLiquidityEnabled(true)).unwrap();
        assert_eq!(state.liquidity.revision(), 1);
        assert_eq!(state.liquidity.token_amount(), Decimal::from(20_000));

        // Same value again, and unrelated edits: no recomputation.
        let state = state
            .apply(WizardEvent::SetSolAmount("2.0".into()))
            .unwrap()
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                name: Some("Other".into()),
                ..DetailsPatch::default()
            }))
            .unwrap()
            .apply(WizardEvent::SetExchange(Exchange::Orca))
            .unwrap();
        assert_eq!(state.liquidity.revision(), 1);

        let state = state.apply(WizardEvent::SetSolAmount("3".into())).unwrap();
        assert_eq!(state.liquidity.revision(), 2);
        assert_eq!(state.liquidity.token_amount(), Decimal::from(30_000));

        let state = state
            .apply(WizardEvent::UpdateDetails(DetailsPatch {
                supply: Some("500".into()),
                ..DetailsPatch::default()
            }))
            .unwrap();
        assert_eq!(state.liquidity.revision(), 3);
        assert_eq!(state.liquidity.token_amount(), Decimal::from_str("15").unwrap());
    }

    #[test]
    fn test_everything_locked_while_deploying() {
        let mut state = connected(100_000_000)
            .apply(WizardEvent::Next)
            .unwrap()
            .apply(WizardEvent::UpdateDetails(details()))
            .unwrap();
        for _ in 0..2 {
            state = state.apply(WizardEvent::Next).unwrap();
        }
        assert_eq!(state.step, WizardStep::Deploy);

        let deploying = state
            .apply(WizardEvent::DeployStarted { idempotency_key: "k".into() })
            .unwrap();
        assert!(deploying.is_deploying);

        for event in [
            WizardEvent::Back,
            WizardEvent::Next,
            WizardEvent::UpdateDetails(details()),
            WizardEvent::SetSolAmount("1".into()),
            WizardEvent::SetLiquidityEnabled(true),
            WizardEvent::StartOver,
            WizardEvent::DeployStarted { idempotency_key: "k2".into() },
        ] {
            assert_eq!(wizard_kind(deploying.apply(event)), WizardErrorKind::Busy);
        }

        let aborted = deploying
            .apply(WizardEvent::DeployAborted("duplicate".into()))
            .unwrap();
        assert!(!aborted.is_deploying);
        assert_eq!(aborted.step, WizardStep::Deploy);
    }

    #[test]
    fn test_back_navigation() {
        let state = connected(100_000_000).apply(WizardEvent::Next).unwrap();
        let back = state.apply(WizardEvent::Back).unwrap();
        assert_eq!(back.step, WizardStep::ConnectWallet);
        assert_eq!(
            wizard_kind(back.apply(WizardEvent::Back)),
            WizardErrorKind::InvalidTransition
        );
        assert_eq!(state.progress(), (2, 5));
    }
}
