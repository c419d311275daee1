//! Widget configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::algorand::Address;

/// Errors produced while building a widget URL or iframe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// `useParentSigner` was requested without an account to sign for.
    #[error("useParentSigner requires an account address")]
    MissingAccountAddress,

    /// The widget base URL could not be parsed.
    #[error("invalid widget base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// An unrecognized network, theme or asset id string.
    #[error("invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Query parameter keys understood by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchParamKey {
    /// When `true`, the widget asks the parent app to sign.
    UseParentSigner,
    /// Signer account, only honoured with `UseParentSigner`.
    AccountAddress,
    Network,
    Theme,
    AssetIn,
    AssetOut,
    IframeBackground,
}

impl SearchParamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchParamKey::UseParentSigner => "useParentSigner",
            SearchParamKey::AccountAddress => "accountAddress",
            SearchParamKey::Network => "network",
            SearchParamKey::Theme => "theme",
            SearchParamKey::AssetIn => "assetIn",
            SearchParamKey::AssetOut => "assetOut",
            SearchParamKey::IframeBackground => "iframeBg",
        }
    }
}

/// Network the widget operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetNetwork {
    #[default]
    Mainnet,
    Testnet,
}

impl WidgetNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetNetwork::Mainnet => "mainnet",
            WidgetNetwork::Testnet => "testnet",
        }
    }

    /// Quote Service base URL for this network.
    pub fn api_base_url(&self) -> &'static str {
        match self {
            WidgetNetwork::Mainnet => "https://mainnet.api.perawallet.app",
            WidgetNetwork::Testnet => "https://testnet.api.perawallet.app",
        }
    }
}

impl fmt::Display for WidgetNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetNetwork {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(WidgetNetwork::Mainnet),
            "testnet" => Ok(WidgetNetwork::Testnet),
            _ => Err(WidgetError::InvalidValue {
                field: "network",
                value: s.to_string(),
            }),
        }
    }
}

/// Widget colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetAppTheme {
    Light,
    Dark,
}

impl WidgetAppTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetAppTheme::Light => "light",
            WidgetAppTheme::Dark => "dark",
        }
    }

    /// Background colour that matches the theme.
    pub fn default_background(&self) -> &'static str {
        match self {
            WidgetAppTheme::Light => "#FFFFFF",
            WidgetAppTheme::Dark => "#242424",
        }
    }
}

impl fmt::Display for WidgetAppTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetAppTheme {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(WidgetAppTheme::Light),
            "dark" => Ok(WidgetAppTheme::Dark),
            _ => Err(WidgetError::InvalidValue {
                field: "theme",
                value: s.to_string(),
            }),
        }
    }
}

/// On-chain asset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl AssetId {
    /// The native asset.
    pub const ALGO: AssetId = AssetId(0);
    /// USDC on mainnet.
    pub const USDC: AssetId = AssetId(31_566_704);
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(AssetId)
            .map_err(|_| WidgetError::InvalidValue {
                field: "asset id",
                value: s.to_string(),
            })
    }
}

/// Immutable widget configuration.
///
/// Built once with the `with_*` methods and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetConfig {
    network: Option<WidgetNetwork>,
    theme: Option<WidgetAppTheme>,
    asset_in: Option<AssetId>,
    asset_out: Option<AssetId>,
    iframe_bg: Option<String>,
    use_parent_signer: bool,
    account_address: Option<Address>,
}

impl WidgetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, network: WidgetNetwork) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_theme(mut self, theme: WidgetAppTheme) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn with_asset_in(mut self, asset: impl Into<AssetId>) -> Self {
        self.asset_in = Some(asset.into());
        self
    }

    pub fn with_asset_out(mut self, asset: impl Into<AssetId>) -> Self {
        self.asset_out = Some(asset.into());
        self
    }

    /// Background colour of the iframe document, e.g. `"#242424"`.
    pub fn with_iframe_bg(mut self, color: impl Into<String>) -> Self {
        self.iframe_bg = Some(color.into());
        self
    }

    /// Ask the widget to delegate signing to the parent, for `account`.
    pub fn with_parent_signer(mut self, account: Address) -> Self {
        self.use_parent_signer = true;
        self.account_address = Some(account);
        self
    }

    /// Set the signer mode alone. Without an account the config fails
    /// validation when a URL is built.
    pub fn with_use_parent_signer(mut self, enabled: bool) -> Self {
        self.use_parent_signer = enabled;
        self
    }

    pub fn with_account_address(mut self, account: Address) -> Self {
        self.account_address = Some(account);
        self
    }

    pub fn network(&self) -> Option<WidgetNetwork> {
        self.network
    }

    pub fn theme(&self) -> Option<WidgetAppTheme> {
        self.theme
    }

    pub fn asset_in(&self) -> Option<AssetId> {
        self.asset_in
    }

    pub fn asset_out(&self) -> Option<AssetId> {
        self.asset_out
    }

    pub fn iframe_bg(&self) -> Option<&str> {
        self.iframe_bg.as_deref()
    }

    pub fn use_parent_signer(&self) -> bool {
        self.use_parent_signer
    }

    /// Only emitted in the URL when the parent signer is in use.
    pub fn account_address(&self) -> Option<&Address> {
        self.account_address.as_ref()
    }

    /// Check preconditions for URL construction.
    pub fn validate(&self) -> Result<(), WidgetError> {
        if self.use_parent_signer && self.account_address.is_none() {
            return Err(WidgetError::MissingAccountAddress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums() {
        assert_eq!("Mainnet".parse::<WidgetNetwork>().unwrap(), WidgetNetwork::Mainnet);
        assert_eq!("testnet".parse::<WidgetNetwork>().unwrap(), WidgetNetwork::Testnet);
        assert!("betanet".parse::<WidgetNetwork>().is_err());
        assert_eq!("dark".parse::<WidgetAppTheme>().unwrap(), WidgetAppTheme::Dark);
        assert_eq!(" 31566704 ".parse::<AssetId>().unwrap(), AssetId::USDC);
        assert!("usdc".parse::<AssetId>().is_err());
    }

    #[test]
    fn test_theme_backgrounds() {
        assert_eq!(WidgetAppTheme::Light.default_background(), "#FFFFFF");
        assert_eq!(WidgetAppTheme::Dark.default_background(), "#242424");
    }

    #[test]
    fn test_parent_signer_requires_address() {
        let config = WidgetConfig::new().with_use_parent_signer(true);
        assert_eq!(config.validate(), Err(WidgetError::MissingAccountAddress));

        let config = WidgetConfig::new().with_parent_signer(Address::ZERO);
        assert!(config.validate().is_ok());
        assert_eq!(config.account_address(), Some(&Address::ZERO));
    }
}
