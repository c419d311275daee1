//! Quote Service request and response types.

use serde::{Deserialize, Serialize};

use crate::algorand::{Address, Transaction};
use crate::protocol::{SignRequest, WireBytes};
use crate::quote::client::QuoteError;

/// DEX aggregators the service can route through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapProvider {
    Tinyman,
    TinymanSwapRouter,
    VestigeV4,
    /// A provider added after this build.
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl SwapProvider {
    /// Every provider this build can request.
    pub const ALL: [SwapProvider; 3] = [
        SwapProvider::Tinyman,
        SwapProvider::TinymanSwapRouter,
        SwapProvider::VestigeV4,
    ];
}

/// Which side of the swap the amount fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapType {
    #[default]
    FixedInput,
    FixedOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    Verified,
    Unverified,
    Suspicious,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    StandardAsset,
    Collectible,
    DappAsset,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Asset metadata as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub unit_name: String,
    #[serde(default)]
    pub fraction_decimals: u32,
    /// USD value as a decimal string.
    #[serde(default)]
    pub usd_value: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_tier: VerificationTier,
    #[serde(rename = "type", default)]
    pub kind: AssetKind,
}

/// A priced swap route.
///
/// Amounts are base-unit integers and prices are decimals, both as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub id: u64,
    /// Identifier to pass to `prepare_transactions`.
    pub quote_id_str: String,
    pub provider: SwapProvider,
    pub swap_type: SwapType,
    pub swapper_address: String,
    pub asset_in: Asset,
    pub asset_out: Asset,
    pub amount_in: String,
    pub amount_in_with_slippage: String,
    pub amount_in_usd_value: Option<String>,
    pub amount_out: String,
    pub amount_out_with_slippage: String,
    pub amount_out_usd_value: Option<String>,
    pub slippage: String,
    pub price: String,
    pub price_impact: String,
    pub pera_fee_amount: String,
    pub exchange_fee_amount: String,
}

/// Body of `POST /v1/dex-swap/prepare-transactions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareTransactionsBody<'a> {
    pub quote: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_address: Option<&'a Address>,
}

/// Body of `POST /v1/dex-swap/quotes/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuoteBody {
    pub providers: Vec<SwapProvider>,
    pub swapper_address: Address,
    pub swap_type: SwapType,
    pub asset_in_id: u64,
    pub asset_out_id: u64,
    /// Base units of the fixed side.
    pub amount: String,
    /// Fraction, e.g. `"0.005"`.
    pub slippage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteList {
    pub results: Vec<SwapQuote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupPurpose {
    OptIn,
    Swap,
    Fee,
    #[serde(other, rename = "unknown")]
    Unknown,
}

/// One atomic group of the prepared swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTransactionGroup {
    pub purpose: GroupPurpose,
    pub transaction_group_id: String,
    /// Base64 unsigned transactions.
    pub transactions: Vec<String>,
    /// Base64 transactions the service already signed, by position.
    #[serde(default)]
    pub signed_transactions: Vec<Option<String>>,
}

impl SwapTransactionGroup {
    /// Raw bytes of every unsigned transaction.
    pub fn transaction_bytes(&self) -> Result<Vec<WireBytes>, QuoteError> {
        self.transactions
            .iter()
            .enumerate()
            .map(|(index, b64)| {
                WireBytes::from_base64(b64).map_err(|e| {
                    QuoteError::Decode(format!(
                        "group {} transaction {index}: {e}",
                        self.transaction_group_id
                    ))
                })
            })
            .collect()
    }

    pub fn decode(&self) -> Result<Vec<Transaction>, QuoteError> {
        self.transaction_bytes()?
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                Transaction::decode(bytes.as_slice()).map_err(|e| {
                    QuoteError::Decode(format!(
                        "group {} transaction {index}: {e}",
                        self.transaction_group_id
                    ))
                })
            })
            .collect()
    }
}

/// Response of `POST /v1/dex-swap/prepare-transactions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareTransactionsResponse {
    pub transaction_groups: Vec<SwapTransactionGroup>,
}

impl PrepareTransactionsResponse {
    /// Decode every group, preserving group and transaction order.
    pub fn decode_groups(&self) -> Result<Vec<Vec<Transaction>>, QuoteError> {
        self.transaction_groups.iter().map(|g| g.decode()).collect()
    }

    /// The sign request a widget would post for these groups.
    pub fn to_sign_request(&self) -> Result<SignRequest, QuoteError> {
        let groups = self
            .transaction_groups
            .iter()
            .map(|g| g.transaction_bytes())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SignRequest::new(groups))
    }
}

/// Paginated response of `GET /v1/assets/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAssetsResponse {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetList {
    pub results: Vec<Asset>,
}

/// Response of `GET /v1/currencies/USD/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoPrice {
    /// USD per ALGO as a decimal string.
    pub exchange_price: String,
}
