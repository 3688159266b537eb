use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

use super::{Exchange, LiquidityProvisioner, PoolHandle};
use crate::chain::ChainClient;
use crate::error::{LaunchError, Result};

const POOL_SEED: &[u8] = b"pool";

/// Constant-product pool provisioner for one exchange.
///
/// Pool ids are program-derived from `(mint, wrapped SOL)` under the
/// exchange program, so the same pair always maps to the same pool. The
/// first depositor receives `floor(sqrt(lamports × token units))` LP units.
pub struct ConstantProductProvisioner {
    exchange: Exchange,
    chain: Arc<dyn ChainClient>,
}

impl ConstantProductProvisioner {
    pub fn new(exchange: Exchange, chain: Arc<dyn ChainClient>) -> Self {
        Self { exchange, chain }
    }

    pub fn pool_address(&self, mint: &Pubkey) -> Pubkey {
        let quote = spl_token::native_mint::id();
        Pubkey::find_program_address(
            &[POOL_SEED, mint.as_ref(), quote.as_ref()],
            &self.exchange.program_id(),
        )
        .0
    }
}

#[async_trait]
impl LiquidityProvisioner for ConstantProductProvisioner {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn create_pool(&self, mint: &Pubkey, owner: &Pubkey) -> Result<PoolHandle> {
        // The mint must exist before a pool can reference it.
        let info = self.chain.get_mint(mint).await?;
        let pool_id = self.pool_address(mint);
        debug!(
            exchange = %self.exchange,
            pool = %pool_id,
            decimals = info.decimals,
            "Pool address derived"
        );
        Ok(PoolHandle {
            pool_id,
            exchange: self.exchange,
            mint: *mint,
            owner: *owner,
        })
    }

    async fn deposit(&self, pool: &PoolHandle, lamports: u64, token_base_units: u64) -> Result<u64> {
        if lamports == 0 || token_base_units == 0 {
            return Err(LaunchError::validation("both pool reserves must be non-zero"));
        }
        let balance = self.chain.get_balance(&pool.owner).await?;
        if balance < lamports {
            return Err(LaunchError::chain(
                "deposit",
                format!(
                    "{} holds {} lamports, {} required for the SOL reserve",
                    pool.owner, balance, lamports
                ),
            ));
        }
        Ok(initial_lp_units(lamports, token_base_units))
    }
}

/// `floor(sqrt(a × b))`, exact in integer arithmetic.
pub fn initial_lp_units(lamports: u64, token_base_units: u64) -> u64 {
    let product = lamports as u128 * token_base_units as u128;
    // sqrt of a u128 always fits in u64
    isqrt(product) as u64
}

fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = n / 2 + n % 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{AuthorityKind, ChainOp, InMemoryChain};

    #[test]
    fn test_initial_lp_units() {
        assert_eq!(initial_lp_units(4, 9), 6);
        assert_eq!(initial_lp_units(2, 3), 2);
        assert_eq!(initial_lp_units(u64::MAX, u64::MAX), u64::MAX);
        // 2 SOL against 20_000 tokens at 6 decimals
        assert_eq!(
            initial_lp_units(2_000_000_000, 20_000_000_000),
            6_324_555_320
        );
    }

    #[test]
    fn test_pool_address_is_per_exchange_and_stable() {
        let chain: Arc<dyn ChainClient> = Arc::new(InMemoryChain::default());
        let raydium = ConstantProductProvisioner::new(Exchange::Raydium, chain.clone());
        let orca = ConstantProductProvisioner::new(Exchange::Orca, chain);
        let mint = Pubkey::new_unique();
        assert_eq!(raydium.pool_address(&mint), raydium.pool_address(&mint));
        assert_ne!(raydium.pool_address(&mint), orca.pool_address(&mint));
    }

    #[tokio::test]
    async fn test_create_pool_requires_existing_mint() {
        let chain = Arc::new(InMemoryChain::default());
        let provisioner = ConstantProductProvisioner::new(Exchange::Raydium, chain.clone());
        let result = provisioner
            .create_pool(&Pubkey::new_unique(), &Pubkey::new_unique())
            .await;
        assert!(result.is_err());
        assert_eq!(chain.call_count(ChainOp::GetMint), 1);
    }

    #[tokio::test]
    async fn test_deposit_checks_owner_balance() {
        let chain = Arc::new(InMemoryChain::default());
        let owner = Pubkey::new_unique();
        let payer = chain.fee_payer();
        let created = chain.create_mint(&payer, &owner, None, 6).await.unwrap();
        let provisioner = ConstantProductProvisioner::new(Exchange::Orca, chain.clone());
        let pool = provisioner.create_pool(&created.mint, &owner).await.unwrap();

        let result = provisioner.deposit(&pool, 1_000, 1_000).await;
        assert!(matches!(result, Err(LaunchError::Chain { .. })));

        chain.set_balance(owner, 1_000);
        assert_eq!(provisioner.deposit(&pool, 1_000, 1_000).await.unwrap(), 1_000);

        // Revoking authority does not affect pooling.
        chain
            .revoke_authority(&created.mint, AuthorityKind::MintTokens, &owner)
            .await
            .unwrap();
        assert!(provisioner.create_pool(&created.mint, &owner).await.is_ok());
    }
}
