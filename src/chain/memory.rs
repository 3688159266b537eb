use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashMap;
use std::time::Duration;

use super::{AssociatedAccount, AuthorityKind, ChainClient, CreatedMint, MintInfo, Network};
use crate::error::{LaunchError, Result};

/// Operations of [`InMemoryChain`], used for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOp {
    GetBalance,
    RequestAirdrop,
    CreateMint,
    GetOrCreateAssociatedAccount,
    MintTo,
    RevokeAuthority,
    GetMint,
    Submit,
}

#[derive(Debug, Clone)]
struct TokenAccount {
    mint: Pubkey,
    amount: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<Pubkey, u64>,
    mints: HashMap<Pubkey, MintInfo>,
    token_accounts: HashMap<Pubkey, TokenAccount>,
    next_key: u64,
    next_signature: u64,
}

impl Ledger {
    fn fresh_key(&mut self) -> Pubkey {
        self.next_key += 1;
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        bytes[24..].copy_from_slice(&self.next_key.to_be_bytes());
        Pubkey::new_from_array(bytes)
    }

    fn fresh_signature(&mut self) -> Signature {
        self.next_signature += 1;
        let mut bytes = [0u8; 64];
        bytes[56..].copy_from_slice(&self.next_signature.to_be_bytes());
        Signature::from(bytes)
    }
}

/// Deterministic ledger that enforces SPL mint semantics (authorities,
/// supply) without a network.
///
/// Every call is counted per [`ChainOp`], and any operation can be made to
/// fail or stall to exercise partial-failure paths.
#[derive(Debug)]
pub struct InMemoryChain {
    fee_payer: Pubkey,
    network: Network,
    ledger: Mutex<Ledger>,
    calls: Mutex<HashMap<ChainOp, usize>>,
    failures: Mutex<HashMap<ChainOp, String>>,
    delays: Mutex<HashMap<ChainOp, Duration>>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(Network::Localnet)
    }
}

impl InMemoryChain {
    pub fn new(network: Network) -> Self {
        let mut ledger = Ledger::default();
        let fee_payer = ledger.fresh_key();
        ledger.balances.insert(fee_payer, 10_000_000_000);
        Self {
            fee_payer,
            network,
            ledger: Mutex::new(ledger),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
        }
    }

    /// Makes every subsequent call of `op` fail with `message`.
    pub fn fail_on(&self, op: ChainOp, message: impl Into<String>) {
        self.failures.lock().insert(op, message.into());
    }

    pub fn clear_failure(&self, op: ChainOp) {
        self.failures.lock().remove(&op);
    }

    /// Makes every subsequent call of `op` sleep before answering.
    pub fn delay(&self, op: ChainOp, duration: Duration) {
        self.delays.lock().insert(op, duration);
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.ledger.lock().balances.insert(address, lamports);
    }

    pub fn call_count(&self, op: ChainOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn mint_count(&self) -> usize {
        self.ledger.lock().mints.len()
    }

    pub fn token_balance(&self, account: &Pubkey) -> Option<u64> {
        self.ledger.lock().token_accounts.get(account).map(|a| a.amount)
    }

    async fn enter(&self, op: ChainOp) -> Result<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let delay = self.delays.lock().get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().get(&op) {
            Some(message) => Err(LaunchError::SolanaRpc(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    fn fee_payer(&self) -> Pubkey {
        self.fee_payer
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.enter(ChainOp::GetBalance).await?;
        Ok(self.ledger.lock().balances.get(address).copied().unwrap_or(0))
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        self.enter(ChainOp::RequestAirdrop).await?;
        if !self.network.is_test() {
            return Err(LaunchError::SolanaRpc(format!(
                "airdrops are not available on {}",
                self.network
            )));
        }
        let mut ledger = self.ledger.lock();
        *ledger.balances.entry(*address).or_insert(0) += lamports;
        Ok(ledger.fresh_signature())
    }

    async fn create_mint(
        &self,
        _payer: &Pubkey,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<CreatedMint> {
        self.enter(ChainOp::CreateMint).await?;
        let mut ledger = self.ledger.lock();
        let mint = ledger.fresh_key();
        ledger.mints.insert(
            mint,
            MintInfo {
                decimals,
                supply: 0,
                mint_authority: Some(*mint_authority),
                freeze_authority: freeze_authority.copied(),
            },
        );
        let signature = ledger.fresh_signature();
        Ok(CreatedMint { mint, signature })
    }

    async fn get_or_create_associated_account(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<AssociatedAccount> {
        self.enter(ChainOp::GetOrCreateAssociatedAccount).await?;
        let mut ledger = self.ledger.lock();
        if !ledger.mints.contains_key(mint) {
            return Err(LaunchError::SolanaRpc(format!("mint {} does not exist", mint)));
        }
        let address = get_associated_token_address(owner, mint);
        if ledger.token_accounts.contains_key(&address) {
            return Ok(AssociatedAccount { address, signature: None });
        }
        ledger
            .token_accounts
            .insert(address, TokenAccount { mint: *mint, amount: 0 });
        let signature = ledger.fresh_signature();
        Ok(AssociatedAccount {
            address,
            signature: Some(signature),
        })
    }

    async fn mint_to(
        &self,
        mint: &Pubkey,
        account: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<Signature> {
        self.enter(ChainOp::MintTo).await?;
        let mut ledger = self.ledger.lock();
        let info = ledger
            .mints
            .get(mint)
            .cloned()
            .ok_or_else(|| LaunchError::SolanaRpc(format!("mint {} does not exist", mint)))?;
        match info.mint_authority {
            None => {
                return Err(LaunchError::SolanaRpc(format!(
                    "mint {} has no mint authority; supply is fixed",
                    mint
                )))
            }
            Some(current) if current != *authority => {
                return Err(LaunchError::SolanaRpc(format!(
                    "{} is not the mint authority of {}",
                    authority, mint
                )))
            }
            Some(_) => {}
        }
        let new_supply = info
            .supply
            .checked_add(amount)
            .ok_or_else(|| LaunchError::SolanaRpc("mint supply overflow".to_string()))?;
        let target = ledger
            .token_accounts
            .get_mut(account)
            .filter(|a| a.mint == *mint)
            .ok_or_else(|| {
                LaunchError::SolanaRpc(format!("{} is not a token account for {}", account, mint))
            })?;
        target.amount += amount;
        if let Some(state) = ledger.mints.get_mut(mint) {
            state.supply = new_supply;
        }
        Ok(ledger.fresh_signature())
    }

    async fn revoke_authority(
        &self,
        mint: &Pubkey,
        kind: AuthorityKind,
        current_authority: &Pubkey,
    ) -> Result<Signature> {
        self.enter(ChainOp::RevokeAuthority).await?;
        let mut ledger = self.ledger.lock();
        let state = ledger
            .mints
            .get_mut(mint)
            .ok_or_else(|| LaunchError::SolanaRpc(format!("mint {} does not exist", mint)))?;
        let slot = match kind {
            AuthorityKind::MintTokens => &mut state.mint_authority,
            AuthorityKind::FreezeAccount => &mut state.freeze_authority,
        };
        if *slot != Some(*current_authority) {
            return Err(LaunchError::SolanaRpc(format!(
                "{} is not the {} authority of {}",
                current_authority, kind, mint
            )));
        }
        *slot = None;
        Ok(ledger.fresh_signature())
    }

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo> {
        self.enter(ChainOp::GetMint).await?;
        self.ledger
            .lock()
            .mints
            .get(mint)
            .cloned()
            .ok_or_else(|| LaunchError::SolanaRpc(format!("mint {} does not exist", mint)))
    }

    async fn submit(&self, transaction: Transaction) -> Result<Signature> {
        self.enter(ChainOp::Submit).await?;
        if transaction.message.instructions.is_empty() {
            return Err(LaunchError::SolanaRpc("transaction has no instructions".to_string()));
        }
        Ok(self.ledger.lock().fresh_signature())
    }
}
