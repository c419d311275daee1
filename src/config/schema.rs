//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the widget
//! host. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::algorand::Address;
use crate::bridge::origin::{OriginError, OriginPolicy};
use crate::widget::{
    AssetId, IframeOptions, WidgetAppTheme, WidgetConfig, WidgetNetwork, DEFAULT_WIDGET_URL,
};

/// Root configuration for the widget host.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    /// What the embedded widget shows and how it is framed.
    pub widget: WidgetSettings,

    /// Message bridge settings.
    pub bridge: BridgeConfig,

    /// Quote Service client settings.
    pub quote_service: QuoteServiceConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Widget appearance and signer mode.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WidgetSettings {
    /// Widget deployment to embed.
    pub base_url: String,

    pub network: Option<WidgetNetwork>,

    pub theme: Option<WidgetAppTheme>,

    /// Input asset id (ALGO is 0).
    pub asset_in: Option<u64>,

    /// Output asset id.
    pub asset_out: Option<u64>,

    /// Iframe background colour, e.g. "#FFFFFF".
    pub iframe_bg: Option<String>,

    /// Ask the widget to delegate signing to this host.
    pub use_parent_signer: bool,

    /// Account the host signs for. Required with `use_parent_signer`.
    pub account_address: Option<Address>,

    /// Iframe width (default "100%").
    pub iframe_width: Option<String>,

    /// Iframe height (default "488px").
    pub iframe_height: Option<String>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WIDGET_URL.to_string(),
            network: None,
            theme: None,
            asset_in: None,
            asset_out: None,
            iframe_bg: None,
            use_parent_signer: false,
            account_address: None,
            iframe_width: None,
            iframe_height: None,
        }
    }
}

impl WidgetSettings {
    pub fn to_widget_config(&self) -> WidgetConfig {
        let mut config = WidgetConfig::new().with_use_parent_signer(self.use_parent_signer);
        if let Some(network) = self.network {
            config = config.with_network(network);
        }
        if let Some(theme) = self.theme {
            config = config.with_theme(theme);
        }
        if let Some(asset) = self.asset_in {
            config = config.with_asset_in(AssetId(asset));
        }
        if let Some(asset) = self.asset_out {
            config = config.with_asset_out(AssetId(asset));
        }
        if let Some(bg) = &self.iframe_bg {
            config = config.with_iframe_bg(bg.clone());
        }
        if let Some(address) = self.account_address {
            config = config.with_account_address(address);
        }
        config
    }

    pub fn iframe_options(&self) -> IframeOptions {
        IframeOptions {
            width: self.iframe_width.clone(),
            height: self.iframe_height.clone(),
            class_name: None,
            id: None,
        }
    }
}

/// Message bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origins whose messages are answered. `"*"` accepts any origin and
    /// posts replies with a wildcard target origin.
    pub allowed_origins: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_WIDGET_URL.to_string()],
        }
    }
}

impl BridgeConfig {
    pub fn origin_policy(&self) -> Result<OriginPolicy, OriginError> {
        OriginPolicy::allow_list(&self.allowed_origins)
    }
}

/// Quote Service client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuoteServiceConfig {
    pub network: WidgetNetwork,

    /// Override the network's public API, e.g. for a staging deployment.
    pub base_url: Option<String>,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for QuoteServiceConfig {
    fn default() -> Self {
        Self {
            network: WidgetNetwork::Mainnet,
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
