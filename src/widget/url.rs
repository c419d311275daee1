//! Widget URL construction.

use url::Url;

use crate::widget::types::{SearchParamKey, WidgetConfig, WidgetError};

/// Where the hosted widget lives.
pub const DEFAULT_WIDGET_URL: &str = "https://swap-widget.perawallet.app";

/// Keys this builder owns, in emission order.
const PARAM_ORDER: [SearchParamKey; 7] = [
    SearchParamKey::Network,
    SearchParamKey::Theme,
    SearchParamKey::AssetIn,
    SearchParamKey::AssetOut,
    SearchParamKey::IframeBackground,
    SearchParamKey::UseParentSigner,
    SearchParamKey::AccountAddress,
];

/// Build the iframe `src` for `config` against the hosted widget.
pub fn generate_widget_url(config: &WidgetConfig) -> Result<Url, WidgetError> {
    generate_widget_url_with_base(DEFAULT_WIDGET_URL, config)
}

/// Build the iframe `src` for `config` against `base`.
///
/// Query parameters already on `base` are kept unless the config sets the
/// same key, in which case the config's value replaces them.
pub fn generate_widget_url_with_base(base: &str, config: &WidgetConfig) -> Result<Url, WidgetError> {
    config.validate()?;
    let mut url = Url::parse(base)?;

    let params = query_params(config);
    let owned: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !owned.contains(&&**k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    if !retained.is_empty() || !params.is_empty() {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(retained);
        query.extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

fn query_params(config: &WidgetConfig) -> Vec<(SearchParamKey, String)> {
    PARAM_ORDER
        .iter()
        .filter_map(|&key| {
            let value = match key {
                SearchParamKey::Network => config.network().map(|n| n.to_string()),
                SearchParamKey::Theme => config.theme().map(|t| t.to_string()),
                SearchParamKey::AssetIn => config.asset_in().map(|a| a.to_string()),
                SearchParamKey::AssetOut => config.asset_out().map(|a| a.to_string()),
                SearchParamKey::IframeBackground => {
                    config.iframe_bg().filter(|c| !c.is_empty()).map(str::to_owned)
                }
                SearchParamKey::UseParentSigner => {
                    config.use_parent_signer().then(|| "true".to_string())
                }
                SearchParamKey::AccountAddress => config
                    .account_address()
                    .filter(|_| config.use_parent_signer())
                    .map(|a| a.to_string()),
            };
            value.map(|v| (key, v))
        })
        .collect()
}
