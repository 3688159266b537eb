// Route handlers for the launch API.

use axum::{
    extract::{Json, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use mintforge_types::{
    CreateTokenResponse, ErrorResponse, LiquidityPoolResponse, SetupLiquidityRequest,
};

use super::{status_for, ApiError, AppState};
use crate::error::{ErrorKind, LaunchError};
use crate::liquidity::{Exchange, LiquidityPoolInfo, LiquiditySpec};
use crate::orchestrator::idempotency::run_detached;
use crate::orchestrator::{DeploymentResult, LiquidityOutcome};
use crate::token::{parse_address, LogoAsset, SocialLinks, TokenSpec, DEFAULT_DECIMALS};

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "network": state.network.as_str(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Raw `/create-token` form: text fields by name plus the optional logo.
#[derive(Debug, Default)]
struct CreateTokenForm {
    fields: HashMap<String, String>,
    logo: Option<(Bytes, String)>,
}

impl CreateTokenForm {
    async fn read(multipart: &mut Multipart, max_logo_bytes: usize) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "logo" {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read logo: {}", e)))?;
                // Browsers send an empty part when no file was picked.
                if bytes.is_empty() {
                    continue;
                }
                if !content_type.starts_with("image/") {
                    return Err(ApiError::bad_request(format!(
                        "logo must be an image, got '{}'",
                        content_type
                    )));
                }
                if bytes.len() > max_logo_bytes {
                    return Err(ApiError::bad_request(format!(
                        "logo is {} bytes, the limit is {} bytes",
                        bytes.len(),
                        max_logo_bytes
                    )));
                }
                form.logo = Some((bytes, content_type));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| {
                        ApiError::bad_request(format!("Failed to read '{}': {}", name, e))
                    })?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn owned(&self, name: &str) -> Option<String> {
        self.text(name).map(String::from)
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, ApiError> {
        match self.text(name) {
            None => Ok(default),
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ApiError::bad_request(format!(
                    "'{}' must be true or false, got '{}'",
                    name, raw
                ))),
            },
        }
    }

    fn token_spec(&self) -> Result<TokenSpec, ApiError> {
        let decimals = match self.text("tokenDecimals") {
            None => DEFAULT_DECIMALS,
            Some(raw) => raw.parse::<u8>().map_err(|_| {
                ApiError::bad_request(format!("tokenDecimals '{}' is not a valid integer", raw))
            })?,
        };
        Ok(TokenSpec {
            name: self.owned("tokenName").unwrap_or_default(),
            symbol: self.owned("tokenSymbol").unwrap_or_default(),
            supply: self.owned("tokenSupply").unwrap_or_default(),
            decimals,
            mint_authority_retained: self.flag("mintAuthority", true)?,
            freeze_authority_retained: self.flag("freezeAuthority", true)?,
            requester: self.owned("userPublicKey").unwrap_or_default(),
            links: SocialLinks {
                website: self.owned("website"),
                twitter: self.owned("twitter"),
                telegram: self.owned("telegram"),
            },
            logo: self
                .logo
                .as_ref()
                .map(|(bytes, content_type)| LogoAsset::new(bytes.clone(), content_type.clone())),
        })
    }

    /// Liquidity draft, with the token amount re-derived server side.
    fn liquidity_spec(
        &self,
        token: &TokenSpec,
    ) -> Result<Option<(LiquiditySpec, Option<Decimal>)>, ApiError> {
        if !self.flag("setupLiquidity", false)? {
            return Ok(None);
        }
        let exchange = match self.text("exchange") {
            Some(raw) => Exchange::from_str(raw)?,
            None => Exchange::default(),
        };
        let sol_amount = self.text("solAmount").unwrap_or_default();
        let spec = LiquiditySpec::enabled(sol_amount, exchange, token);
        let submitted = self.text("tokenAmount").and_then(|raw| Decimal::from_str(raw).ok());
        Ok(Some((spec, submitted)))
    }
}

/// `POST /api/create-token`
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = CreateTokenForm::read(&mut multipart, state.max_logo_bytes).await?;
    state.ensure_network(form.text("network").unwrap_or_default())?;

    let token = form.token_spec()?;
    let liquidity = form.liquidity_spec(&token)?;
    let mut notes = Vec::new();
    if let Some((spec, Some(submitted))) = &liquidity {
        if *submitted != spec.token_amount() {
            notes.push(format!(
                "submitted tokenAmount {} replaced by derived amount {}",
                submitted,
                spec.token_amount()
            ));
        }
    }
    let liquidity = liquidity.map(|(spec, _)| spec);

    info!(
        symbol = %token.symbol,
        requester = %token.requester,
        liquidity = liquidity.is_some(),
        "create-token request"
    );

    let orchestrator = state.orchestrator.clone();
    let deploy = async move { orchestrator.deploy(&token, liquidity.as_ref()).await };
    let mut result = match form.text("idempotencyKey") {
        Some(key) => state.guard.run(key, deploy).await?,
        None => run_detached(deploy).await?,
    };
    result.warnings.extend(notes);

    Ok(deployment_response(&result))
}

/// `POST /api/setup-liquidity`
pub async fn setup_liquidity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetupLiquidityRequest>,
) -> Result<Json<LiquidityPoolResponse>, ApiError> {
    state.ensure_network(&request.network)?;
    let mint = parse_address("tokenMint", &request.token_mint)?;
    let owner = parse_address("userPublicKey", &request.user_public_key)?;
    let exchange = Exchange::from_str(&request.exchange)?;

    info!(mint = %mint, exchange = %exchange, "setup-liquidity request");
    let pool = state
        .orchestrator
        .setup_liquidity(&mint, &owner, request.sol_amount, request.token_amount, exchange)
        .await?;
    Ok(Json(pool_response(&pool)))
}

pub fn deployment_response(result: &DeploymentResult) -> Response {
    match (&result.failure, result.mint_address) {
        (None, Some(mint)) => {
            let body = CreateTokenResponse {
                success: true,
                token_mint: mint.to_string(),
                token_account: result
                    .token_account_address
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                transaction: result
                    .transaction_signature
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                metadata_uri: result.metadata_uri.clone(),
                liquidity_pool: result.liquidity_pool.as_ref().map(outcome_response),
                warnings: result.warnings.clone(),
                steps: result.steps.clone(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        (Some(failure), _) => {
            warn!(step = %failure.step, kind = %failure.kind, "Deployment failed");
            let status = match failure.kind {
                ErrorKind::Validation
                | ErrorKind::Overflow
                | ErrorKind::UnsupportedExchange
                | ErrorKind::DivideByZero => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let mut body =
                ErrorResponse::new(format!("{} {}", failure.detail, failure.retry_advice()));
            body.error_kind = Some(failure.kind.to_string());
            body.step = Some(failure.step.as_str().to_string());
            body.token_mint = failure.mint.map(|m| m.to_string());
            (status, Json(body)).into_response()
        }
        (None, None) => {
            let err = LaunchError::Internal("deployment finished without a mint".to_string());
            (status_for(&err), Json(ErrorResponse::new(err.to_string()))).into_response()
        }
    }
}

fn pool_response(pool: &LiquidityPoolInfo) -> LiquidityPoolResponse {
    LiquidityPoolResponse {
        success: true,
        pool_id: Some(pool.pool_id.to_string()),
        lp_tokens: Some(pool.lp_token_amount.to_string()),
        initial_price: Some(pool.initial_price.to_string()),
        error: None,
    }
}

fn outcome_response(outcome: &LiquidityOutcome) -> LiquidityPoolResponse {
    match &outcome.pool {
        Some(pool) => pool_response(pool),
        None => LiquidityPoolResponse {
            success: false,
            pool_id: None,
            lp_tokens: None,
            initial_price: None,
            error: outcome.error.clone(),
        },
    }
}
