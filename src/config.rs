use config::{Config, ConfigBuilder, Environment};
use config::builder::DefaultState;
use serde::Deserialize;
use std::time::Duration;

use crate::chain::Network;
use crate::error::Result;
use crate::orchestrator::OrchestratorConfig;

pub const DEFAULT_MAX_LOGO_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_MIN_WALLET_BALANCE_LAMPORTS: u64 = 50_000_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // HTTP service
    pub bind_address: String,

    // Solana
    pub network: String,
    pub solana_rpc_url: Option<String>,
    pub fee_payer_private_key: String,
    pub delegated_authority_keys: Option<String>, // comma-separated base58 keypairs
    pub simulation_mode: bool,
    pub airdrop_lamports: Option<u64>,

    // Deployment
    pub step_timeout_secs: u64,
    pub max_logo_bytes: u64,
    pub min_wallet_balance_lamports: u64,

    // Metadata storage; in-memory when no endpoint is set
    pub metadata_endpoint: Option<String>,
    pub metadata_public_base: Option<String>,

    // Monitoring
    pub log_dir: String,
    pub log_level: String,
    pub log_retention: usize,
    pub metrics_bind_address: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        if dotenv::dotenv().is_ok() {
            println!("Loaded configuration from .env file");
        }
        let builder = Self::defaults()?.add_source(Environment::default().separator("__"));
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Builder preloaded with every default; sources added on top override them.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("bind_address", "0.0.0.0:3001")?
            .set_default("network", "devnet")?
            .set_default("simulation_mode", false)?
            .set_default("step_timeout_secs", 30)?
            .set_default("max_logo_bytes", DEFAULT_MAX_LOGO_BYTES)?
            .set_default("min_wallet_balance_lamports", DEFAULT_MIN_WALLET_BALANCE_LAMPORTS)?
            .set_default("log_dir", "logs")?
            .set_default("log_level", "info")?
            .set_default("log_retention", 14)?)
    }

    pub fn network(&self) -> Result<Network> {
        self.network.parse()
    }

    /// Explicit RPC URL, or the public endpoint of the configured network.
    pub fn rpc_url(&self) -> Result<String> {
        match &self.solana_rpc_url {
            Some(url) if !url.trim().is_empty() => Ok(url.clone()),
            _ => Ok(self.network()?.default_rpc_url().to_string()),
        }
    }

    pub fn delegated_authority_keys(&self) -> Vec<String> {
        self.delegated_authority_keys
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            step_timeout: self.step_timeout(),
            airdrop_lamports: self.airdrop_lamports.filter(|l| *l > 0),
        }
    }
}
