//! Pool creation and initial deposit for a freshly minted token.
//!
//! Exchanges plug in through [`LiquidityProvisioner`]; the orchestrator picks
//! one from a [`ProvisionerRegistry`] by [`Exchange`] before any ledger call.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::error::{LaunchError, Result};
use crate::token::amount::{sol_to_lamports, to_base_units};
use crate::token::{parse_decimal, TokenSpec};

pub mod constant_product;
pub mod pricing;

pub use constant_product::ConstantProductProvisioner;
pub use pricing::{derive_token_amount, initial_price};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Raydium,
    Orca,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Raydium, Exchange::Orca];

    /// Program the pool address is derived under.
    pub fn program_id(&self) -> Pubkey {
        match self {
            Exchange::Raydium => solana_sdk::pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8"),
            Exchange::Orca => solana_sdk::pubkey!("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Raydium => "raydium",
            Exchange::Orca => "orca",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "raydium" => Ok(Exchange::Raydium),
            "orca" => Ok(Exchange::Orca),
            other => Err(LaunchError::UnsupportedExchange(other.to_string())),
        }
    }
}

/// Liquidity draft. `token_amount` is derived from `sol_amount` and the
/// token supply and is only ever written by [`LiquiditySpec::recompute`].
#[derive(Debug, Clone, PartialEq)]
pub struct LiquiditySpec {
    pub enabled: bool,
    pub sol_amount: String,
    pub exchange: Exchange,
    token_amount: Decimal,
    revision: u64,
}

impl Default for LiquiditySpec {
    fn default() -> Self {
        Self {
            enabled: false,
            sol_amount: String::new(),
            exchange: Exchange::default(),
            token_amount: Decimal::ZERO,
            revision: 0,
        }
    }
}

impl LiquiditySpec {
    /// Enabled spec with `token_amount` already derived from `token`.
    pub fn enabled(sol_amount: &str, exchange: Exchange, token: &TokenSpec) -> Self {
        let mut spec = Self {
            enabled: true,
            sol_amount: sol_amount.to_string(),
            exchange,
            ..Self::default()
        };
        spec.recompute(token);
        spec
    }

    pub fn token_amount(&self) -> Decimal {
        self.token_amount
    }

    /// Number of times `token_amount` has been recomputed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn sol_value(&self) -> Option<Decimal> {
        Decimal::from_str(self.sol_amount.trim())
            .ok()
            .filter(|s| !s.is_sign_negative())
    }

    /// Re-derives `token_amount` from the token's supply and decimals.
    /// Incomplete input yields zero.
    pub fn recompute(&mut self, token: &TokenSpec) {
        self.token_amount = match (self.sol_value(), token.supply_value()) {
            (Some(sol), Some(supply)) => {
                derive_token_amount(sol, supply, token.decimals).unwrap_or(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        };
        self.revision += 1;
    }

    /// Checks run before any ledger call when liquidity is requested.
    ///
    /// The token amount is derived again from the validated supply, so a
    /// draft computed against another token cannot leak through. Price and
    /// base-unit scaling are checked here too.
    pub fn validate(&self, supply: Decimal, decimals: u8) -> Result<LiquidityAmounts> {
        let sol = parse_decimal("solAmount", &self.sol_amount)?;
        if sol <= Decimal::ZERO {
            return Err(LaunchError::validation("solAmount must be greater than zero"));
        }
        let token = derive_token_amount(sol, supply, decimals)?;
        if token > supply {
            return Err(LaunchError::validation(format!(
                "liquidity token amount {} exceeds supply {}",
                token, supply
            )));
        }
        initial_price(sol, token)?;
        sol_to_lamports(sol)?;
        to_base_units("tokenAmount", token, decimals)?;
        Ok(LiquidityAmounts { sol, token })
    }
}

/// Validated pool reserves in human units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityAmounts {
    pub sol: Decimal,
    pub token: Decimal,
}

/// A pool created but not yet funded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolHandle {
    pub pool_id: Pubkey,
    pub exchange: Exchange,
    pub mint: Pubkey,
    pub owner: Pubkey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityPoolInfo {
    pub pool_id: Pubkey,
    pub exchange: Exchange,
    pub lp_token_amount: u64,
    /// SOL per token.
    pub initial_price: Decimal,
}

#[async_trait]
pub trait LiquidityProvisioner: Send + Sync {
    fn exchange(&self) -> Exchange;

    async fn create_pool(&self, mint: &Pubkey, owner: &Pubkey) -> Result<PoolHandle>;

    /// Deposits the initial reserves and returns the LP units issued.
    async fn deposit(&self, pool: &PoolHandle, lamports: u64, token_base_units: u64) -> Result<u64>;
}

/// Creates a pool and seeds it with `sol` / `token` (human units).
///
/// Price and amount scaling are checked before the first provisioner call.
pub async fn provision(
    provisioner: &dyn LiquidityProvisioner,
    mint: &Pubkey,
    owner: &Pubkey,
    sol: Decimal,
    token: Decimal,
    token_decimals: u8,
) -> Result<LiquidityPoolInfo> {
    let price = initial_price(sol, token)?;
    let lamports = sol_to_lamports(sol)?;
    let token_base_units = to_base_units("tokenAmount", token, token_decimals)?;

    debug!(
        exchange = %provisioner.exchange(),
        mint = %mint,
        lamports = lamports,
        token_base_units = token_base_units,
        "Creating liquidity pool"
    );
    let pool = provisioner.create_pool(mint, owner).await?;
    let lp_token_amount = provisioner.deposit(&pool, lamports, token_base_units).await?;

    info!(
        exchange = %pool.exchange,
        pool = %pool.pool_id,
        lp_tokens = lp_token_amount,
        price = %price,
        "Liquidity provisioned"
    );
    Ok(LiquidityPoolInfo {
        pool_id: pool.pool_id,
        exchange: pool.exchange,
        lp_token_amount,
        initial_price: price,
    })
}

/// Provisioners by exchange, fixed at construction.
#[derive(Clone, Default)]
pub struct ProvisionerRegistry {
    provisioners: HashMap<Exchange, Arc<dyn LiquidityProvisioner>>,
}

impl fmt::Debug for ProvisionerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionerRegistry")
            .field("exchanges", &self.exchanges())
            .finish()
    }
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant-product provisioners for every known exchange.
    pub fn with_defaults(chain: Arc<dyn ChainClient>) -> Self {
        let mut registry = Self::new();
        for exchange in Exchange::ALL {
            registry.register(Arc::new(ConstantProductProvisioner::new(exchange, chain.clone())));
        }
        registry
    }

    pub fn register(&mut self, provisioner: Arc<dyn LiquidityProvisioner>) {
        self.provisioners.insert(provisioner.exchange(), provisioner);
    }

    pub fn get(&self, exchange: Exchange) -> Result<Arc<dyn LiquidityProvisioner>> {
        self.provisioners
            .get(&exchange)
            .cloned()
            .ok_or_else(|| LaunchError::UnsupportedExchange(exchange.to_string()))
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        let mut exchanges: Vec<_> = self.provisioners.keys().copied().collect();
        exchanges.sort_by_key(|e| e.as_str());
        exchanges
    }
}
