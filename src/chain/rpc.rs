use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::instruction::AuthorityType;
use solana_program::program_pack::Pack;
use spl_token::state::Mint;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{AssociatedAccount, AuthorityKind, ChainClient, CreatedMint, MintInfo, Network};
use crate::config::Settings;
use crate::error::{LaunchError, Result};

const AIRDROP_CONFIRM_ATTEMPTS: usize = 30;
const AIRDROP_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Solana implementation of [`ChainClient`].
///
/// Holds the fee payer plus any authority keypairs the host has been
/// delegated. A transaction that needs any other signature is refused
/// before it is sent.
#[derive(Clone)]
pub struct RpcChainClient {
    rpc_client: Arc<RpcClient>,
    fee_payer: Arc<Keypair>,
    signers: HashMap<Pubkey, Arc<Keypair>>,
    network: Network,
    simulation_mode: bool,
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_client", &"<RpcClient>")
            .field("fee_payer", &self.fee_payer.pubkey())
            .field("delegated_signers", &self.signers.len())
            .field("network", &self.network)
            .field("simulation_mode", &self.simulation_mode)
            .finish()
    }
}

impl RpcChainClient {
    pub fn new(
        rpc_url: &str,
        network: Network,
        fee_payer_private_key_bs58: &str,
        delegated_authority_keys: &[String],
        simulation_mode: bool,
    ) -> Result<Self> {
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            rpc_url.to_string(),
            CommitmentConfig::confirmed(),
        ));

        let fee_payer = Arc::new(keypair_from_bs58(fee_payer_private_key_bs58)?);
        let mut signers = HashMap::new();
        signers.insert(fee_payer.pubkey(), fee_payer.clone());
        for key in delegated_authority_keys {
            let keypair = Arc::new(keypair_from_bs58(key)?);
            signers.insert(keypair.pubkey(), keypair);
        }

        info!(
            fee_payer = %fee_payer.pubkey(),
            delegated = signers.len() - 1,
            network = %network,
            simulation_mode = simulation_mode,
            "RpcChainClient initialized"
        );

        Ok(Self {
            rpc_client,
            fee_payer,
            signers,
            network,
            simulation_mode,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let network = settings.network()?;
        Self::new(
            &settings.rpc_url()?,
            network,
            &settings.fee_payer_private_key,
            &settings.delegated_authority_keys(),
            settings.simulation_mode,
        )
    }

    pub fn simulation_mode(&self) -> bool {
        self.simulation_mode
    }

    async fn send_instructions(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> Result<Signature> {
        let message = Message::new(instructions, Some(&self.fee_payer.pubkey()));
        self.sign_and_send(Transaction::new_unsigned(message), extra_signers)
            .await
    }

    async fn sign_and_send(
        &self,
        mut transaction: Transaction,
        extra_signers: &[&Keypair],
    ) -> Result<Signature> {
        let required = transaction.message.header.num_required_signatures as usize;
        let signer_keys: Vec<Pubkey> = transaction
            .message
            .account_keys
            .iter()
            .take(required)
            .copied()
            .collect();
        for key in &signer_keys {
            let extra = extra_signers.iter().any(|k| k.pubkey() == *key);
            if !extra && !self.signers.contains_key(key) {
                return Err(LaunchError::SolanaRpc(format!(
                    "no signing capability delegated for {}",
                    key
                )));
            }
        }

        let recent_blockhash = self.rpc_client.get_latest_blockhash().await?;
        {
            let mut signers: Vec<&dyn Signer> = Vec::with_capacity(required);
            for key in &signer_keys {
                match extra_signers.iter().find(|k| k.pubkey() == *key) {
                    Some(extra) => signers.push(*extra),
                    None => {
                        if let Some(delegated) = self.signers.get(key) {
                            signers.push(delegated.as_ref());
                        }
                    }
                }
            }
            transaction
                .try_sign(signers.as_slice(), recent_blockhash)
                .map_err(|e| LaunchError::SolanaRpc(format!("Failed to sign transaction: {}", e)))?;
        }

        if self.simulation_mode {
            let signature = transaction.signatures[0];
            warn!(simulated_signature = %signature, "SIMULATION MODE ACTIVE: transaction signed but not sent");
            debug!(transaction = %encode_transaction(&transaction)?, "Simulated transaction");
            return Ok(signature);
        }

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&transaction)
            .await?;
        debug!(signature = %signature, "Transaction confirmed");
        Ok(signature)
    }
}

/// Wire encoding accepted by `sendTransaction`: bincode, then base64.
fn encode_transaction(transaction: &Transaction) -> Result<String> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| LaunchError::Internal(format!("Failed to serialize transaction: {}", e)))?;
    Ok(STANDARD.encode(bytes))
}

fn keypair_from_bs58(encoded: &str) -> Result<Keypair> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|e| LaunchError::ConfigError(format!("Invalid base58 private key: {}", e)))?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| LaunchError::ConfigError(format!("Failed to create keypair from bytes: {}", e)))
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn fee_payer(&self) -> Pubkey {
        self.fee_payer.pubkey()
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.rpc_client.get_balance(address).await?)
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        if !self.network.is_test() {
            return Err(LaunchError::SolanaRpc(format!(
                "airdrops are not available on {}",
                self.network
            )));
        }
        let signature = self.rpc_client.request_airdrop(address, lamports).await?;
        for _ in 0..AIRDROP_CONFIRM_ATTEMPTS {
            if self.rpc_client.confirm_transaction(&signature).await? {
                info!(address = %address, lamports = lamports, "Airdrop confirmed");
                return Ok(signature);
            }
            tokio::time::sleep(AIRDROP_POLL_INTERVAL).await;
        }
        Err(LaunchError::SolanaRpc(format!(
            "airdrop {} was not confirmed",
            signature
        )))
    }

    async fn create_mint(
        &self,
        payer: &Pubkey,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> Result<CreatedMint> {
        let mint = Keypair::new();
        let rent = self
            .rpc_client
            .get_minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;

        let instructions = vec![
            system_instruction::create_account(
                payer,
                &mint.pubkey(),
                rent,
                Mint::LEN as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_mint2(
                &spl_token::id(),
                &mint.pubkey(),
                mint_authority,
                freeze_authority,
                decimals,
            )
            .map_err(|e| LaunchError::SolanaRpc(format!("initialize_mint2: {}", e)))?,
        ];

        let signature = self.send_instructions(&instructions, &[&mint]).await?;
        Ok(CreatedMint {
            mint: mint.pubkey(),
            signature,
        })
    }

    async fn get_or_create_associated_account(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<AssociatedAccount> {
        let address = get_associated_token_address(owner, mint);
        let existing = self
            .rpc_client
            .get_account_with_commitment(&address, self.rpc_client.commitment())
            .await?
            .value;
        if existing.is_some() {
            debug!(account = %address, "Associated token account already exists");
            return Ok(AssociatedAccount {
                address,
                signature: None,
            });
        }

        let instruction = create_associated_token_account_idempotent(
            &self.fee_payer.pubkey(),
            owner,
            mint,
            &spl_token::id(),
        );
        let signature = self.send_instructions(&[instruction], &[]).await?;
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
        let instruction =
            spl_token::instruction::mint_to(&spl_token::id(), mint, account, authority, &[], amount)
                .map_err(|e| LaunchError::SolanaRpc(format!("mint_to: {}", e)))?;
        self.send_instructions(&[instruction], &[]).await
    }

    async fn revoke_authority(
        &self,
        mint: &Pubkey,
        kind: AuthorityKind,
        current_authority: &Pubkey,
    ) -> Result<Signature> {
        let authority_type = match kind {
            AuthorityKind::MintTokens => AuthorityType::MintTokens,
            AuthorityKind::FreezeAccount => AuthorityType::FreezeAccount,
        };
        let instruction = spl_token::instruction::set_authority(
            &spl_token::id(),
            mint,
            None,
            authority_type,
            current_authority,
            &[],
        )
        .map_err(|e| LaunchError::SolanaRpc(format!("set_authority: {}", e)))?;
        self.send_instructions(&[instruction], &[]).await
    }

    async fn get_mint(&self, mint: &Pubkey) -> Result<MintInfo> {
        let account = self.rpc_client.get_account(mint).await?;
        let state = Mint::unpack(&account.data)
            .map_err(|e| LaunchError::SolanaRpc(format!("Failed to unpack mint data: {}", e)))?;
        Ok(MintInfo {
            decimals: state.decimals,
            supply: state.supply,
            mint_authority: Option::from(state.mint_authority),
            freeze_authority: Option::from(state.freeze_authority),
        })
    }

    async fn submit(&self, transaction: Transaction) -> Result<Signature> {
        self.sign_and_send(transaction, &[]).await
    }
}
