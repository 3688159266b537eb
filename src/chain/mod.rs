//! Ledger capabilities consumed by the deployment orchestrator.
//!
//! The orchestrator only ever talks to [`ChainClient`]; [`RpcChainClient`]
//! is the Solana implementation and [`InMemoryChain`] a deterministic ledger
//! used by tests and local dry runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::fmt;

use crate::error::{LaunchError, Result};

pub mod memory;
pub mod rpc;

pub use memory::{ChainOp, InMemoryChain};
pub use rpc::RpcChainClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Airdrops are only available off mainnet.
    pub fn is_test(&self) -> bool {
        !matches!(self, Network::MainnetBeta)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "mainnet-beta",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet-beta" | "mainnet" => Ok(Network::MainnetBeta),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "localnet" | "localhost" => Ok(Network::Localnet),
            other => Err(LaunchError::validation(format!("unknown network '{}'", other))),
        }
    }
}

/// Which control capability of a mint an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityKind {
    MintTokens,
    FreezeAccount,
}

impl fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityKind::MintTokens => write!(f, "mint"),
            AuthorityKind::FreezeAccount => write!(f, "freeze"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMint {
    pub mint: Pubkey,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedAccount {
    pub address: Pubkey,
    /// `None` when the account already existed.
    pub signature: Option<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
}

/// Capability set over the ledger. Every method is a potentially blocking
/// network call; implementations hold whatever signing handles they were
/// delegated, the caller only passes addresses.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that pays fees and rent for every transaction this client sends.
    fn fee_payer(&self) -> Pubkey;

    fn network(&self) -> Network;

    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature>;

    async fn create_mint(
        &self,
        payer: &Pubkey,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<CreatedMint>;

    async fn get_or_create_associated_account(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<AssociatedAccount>;

    async fn mint_to(
        &self,
        mint: &Pubkey,
        account: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<Signature>;

    /// Sets the given authority to none. Irreversible.
    async fn revoke_authority(
        &self,
        mint: &Pubkey,
        kind: AuthorityKind,
        current_authority: &Pubkey,
    ) -> Result<Signature>;

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo>;

    async fn submit(&self, transaction: Transaction) -> Result<Signature>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!("Mainnet-Beta".parse::<Network>().unwrap(), Network::MainnetBeta);
        assert!("moonnet".parse::<Network>().is_err());
        assert!(!Network::MainnetBeta.is_test());
        assert!(Network::Localnet.is_test());
        assert_eq!(Network::Devnet.to_string(), "devnet");
    }
}
