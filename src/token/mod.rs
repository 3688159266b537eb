use bytes::Bytes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::{LaunchError, Result};

pub mod amount;

pub use amount::{adjusted_supply, parse_decimal, MAX_DECIMALS};

/// Metaplex convention for on-chain names.
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const DEFAULT_DECIMALS: u8 = 6;

/// Optional project links published alongside the token metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.twitter.is_none() && self.telegram.is_none()
    }
}

/// Logo image as uploaded. Size and MIME checks happen at the HTTP edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    pub bytes: Bytes,
    pub content_type: String,
}

impl LogoAsset {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// File extension used when storing the image.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "png",
        }
    }
}

/// Everything needed to mint a token, as entered by the user.
///
/// `supply` stays a decimal string until validation so drafts can hold
/// partially typed input.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub supply: String,
    pub decimals: u8,
    pub mint_authority_retained: bool,
    pub freeze_authority_retained: bool,
    pub requester: String,
    pub links: SocialLinks,
    pub logo: Option<LogoAsset>,
}

impl Default for TokenSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            symbol: String::new(),
            supply: String::new(),
            decimals: DEFAULT_DECIMALS,
            mint_authority_retained: true,
            freeze_authority_retained: true,
            requester: String::new(),
            links: SocialLinks::default(),
            logo: None,
        }
    }
}

/// Output of [`TokenSpec::validate`]: the parsed values later steps rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    pub requester: Pubkey,
    pub supply: Decimal,
}

impl TokenSpec {
    /// Checks name, symbol, supply and decimals. Used by the wizard before
    /// leaving the details step and by the orchestrator's first step.
    pub fn validate_details(&self) -> Result<Decimal> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LaunchError::validation("token name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(LaunchError::validation(format!(
                "token name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(LaunchError::validation("token symbol is required"));
        }
        if symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(LaunchError::validation(format!(
                "token symbol must be at most {} characters",
                MAX_SYMBOL_LEN
            )));
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(LaunchError::validation("token symbol must not contain whitespace"));
        }

        if self.decimals > MAX_DECIMALS {
            return Err(LaunchError::validation(format!(
                "decimals must be between 0 and {}, got {}",
                MAX_DECIMALS, self.decimals
            )));
        }

        let supply = parse_decimal("supply", &self.supply)?;
        if supply <= Decimal::ZERO {
            return Err(LaunchError::validation("supply must be greater than zero"));
        }
        Ok(supply)
    }

    /// Details plus the scaled supply check, so a draft that passes can
    /// actually be minted. Returns the amount in base units.
    pub fn validate_mintable(&self) -> Result<u64> {
        let supply = self.validate_details()?;
        adjusted_supply(supply, self.decimals)
    }

    /// Full input validation: details plus the requester address.
    pub fn validate(&self) -> Result<ValidatedToken> {
        let supply = self.validate_details()?;
        let requester = parse_address("requester address", &self.requester)?;
        Ok(ValidatedToken { requester, supply })
    }

    /// Parsed supply if the draft currently holds a positive number.
    pub fn supply_value(&self) -> Option<Decimal> {
        Decimal::from_str(self.supply.trim())
            .ok()
            .filter(|s| *s > Decimal::ZERO)
    }

    /// Whether there is anything to publish as off-chain metadata.
    pub fn has_metadata_payload(&self) -> bool {
        self.logo.is_some() || !self.links.is_empty()
    }
}

pub fn parse_address(field: &str, raw: &str) -> Result<Pubkey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::validation(format!("{} is required", field)));
    }
    Pubkey::from_str(trimmed)
        .map_err(|e| LaunchError::validation(format!("{} '{}' is malformed: {}", field, trimmed, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_spec() -> TokenSpec {
        TokenSpec {
            name: "Demo".into(),
            symbol: "DMO".into(),
            supply: "1000000".into(),
            requester: Pubkey::new_unique().to_string(),
            ..TokenSpec::default()
        }
    }

    #[test]
    fn test_valid_spec() {
        let spec = demo_spec();
        let validated = spec.validate().unwrap();
        assert_eq!(validated.supply, Decimal::from(1_000_000));
        assert_eq!(validated.requester.to_string(), spec.requester);
    }

    #[test]
    fn test_defaults_match_wizard_defaults() {
        let spec = TokenSpec::default();
        assert_eq!(spec.decimals, 6);
        assert!(spec.mint_authority_retained);
        assert!(spec.freeze_authority_retained);
        assert!(!spec.has_metadata_payload());
    }

    #[test]
    fn test_rejects_missing_fields() {
        for patch in [
            TokenSpec { name: "  ".into(), ..demo_spec() },
            TokenSpec { symbol: String::new(), ..demo_spec() },
            TokenSpec { supply: String::new(), ..demo_spec() },
            TokenSpec { supply: "0".into(), ..demo_spec() },
            TokenSpec { supply: "-5".into(), ..demo_spec() },
            TokenSpec { supply: "lots".into(), ..demo_spec() },
        ] {
            assert!(matches!(patch.validate(), Err(LaunchError::Validation(_))), "{:?}", patch);
        }
    }

    #[test]
    fn test_rejects_long_name_and_symbol() {
        let spec = TokenSpec { name: "x".repeat(33), ..demo_spec() };
        assert!(spec.validate_details().is_err());
        let spec = TokenSpec { name: "x".repeat(32), ..demo_spec() };
        assert!(spec.validate_details().is_ok());
        let spec = TokenSpec { symbol: "ABCDEFGHIJK".into(), ..demo_spec() };
        assert!(spec.validate_details().is_err());
    }

    #[test]
    fn test_rejects_bad_decimals_and_address() {
        let spec = TokenSpec { decimals: 10, ..demo_spec() };
        assert!(spec.validate_details().is_err());
        let spec = TokenSpec { requester: "not-a-key".into(), ..demo_spec() };
        assert!(matches!(spec.validate(), Err(LaunchError::Validation(_))));
    }

    #[test]
    fn test_mintable_requires_scaled_supply_to_fit() {
        assert_eq!(demo_spec().validate_mintable().unwrap(), 1_000_000_000_000);

        let spec = TokenSpec { supply: "99999999999999999999".into(), decimals: 9, ..demo_spec() };
        assert!(spec.validate_details().is_ok());
        assert!(matches!(spec.validate_mintable(), Err(LaunchError::Overflow(_))));

        let spec = TokenSpec { supply: "1.5".into(), decimals: 0, ..demo_spec() };
        assert!(matches!(spec.validate_mintable(), Err(LaunchError::Validation(_))));
    }

    #[test]
    fn test_metadata_payload() {
        let mut spec = demo_spec();
        spec.links.website = Some("https://demo.example".into());
        assert!(spec.has_metadata_payload());

        let spec = TokenSpec {
            logo: Some(LogoAsset::new(vec![1u8, 2, 3], "image/jpeg")),
            ..demo_spec()
        };
        assert!(spec.has_metadata_payload());
        assert_eq!(spec.logo.unwrap().extension(), "jpg");
    }
}
