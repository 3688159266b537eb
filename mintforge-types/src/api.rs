use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::events::StepEvent;

/// Liquidity portion of a `/create-token` response, and the whole body of a
/// `/setup-liquidity` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPoolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lp_tokens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenResponse {
    pub success: bool,
    pub token_mint: String,
    pub token_account: String,
    /// Signature of the transaction that minted the supply.
    pub transaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_pool: Option<LiquidityPoolResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Set when a partially applied deployment created a mint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_kind: None,
            step: None,
            token_mint: None,
        }
    }
}

/// JSON body of `POST /setup-liquidity`. Amounts accept JSON numbers or strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupLiquidityRequest {
    pub token_mint: String,
    pub user_public_key: String,
    pub sol_amount: Decimal,
    pub token_amount: Decimal,
    pub exchange: String,
    pub network: String,
}
