//! swap-widget: command line companion for hosts embedding the swap widget.
//!
//! # Architecture Overview
//!
//! ```text
//!   host page                                   widget iframe
//!  ┌──────────────────────────────┐            ┌──────────────────────┐
//!  │ WidgetController (listener)  │◀── post ───│ TXN_SIGN_REQUEST     │
//!  │   └▶ SigningCoordinator      │            │ TXN_SIGN_REQUEST_    │
//!  │        └▶ WalletSigner       │            │   TIMEOUT            │
//!  │   ◀┘ reply to source window  │── post ───▶│ TXN_SIGN_RESPONSE /  │
//!  │                              │            │ FAILED_TXN_SIGN      │
//!  └──────────────────────────────┘            └──────────┬───────────┘
//!                                                         │ HTTP
//!                                              ┌──────────▼───────────┐
//!                                              │    Quote Service     │
//!                                              └──────────────────────┘
//! ```
//!
//! Subcommands build widget URLs and iframe tags, query the Quote Service,
//! and run a full in-process sign round trip (`simulate`).

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use swap_widget_host::algorand::{Address, Transaction};
use swap_widget_host::bridge::{
    InboundMessage, LocalWindow, SignerError, WalletSigner, WidgetController, WidgetHandlers,
};
use swap_widget_host::config::{load_config, HostConfig, WidgetSettings};
use swap_widget_host::observability::logging::init_logging;
use swap_widget_host::protocol::{Outbound, SignRequest, WireBytes};
use swap_widget_host::quote::{CreateQuoteBody, SwapApiClient, SwapProvider, SwapType};
use swap_widget_host::widget::{
    generate_widget_url_with_base, AssetId, IframeOptions, WidgetAppTheme, WidgetIframe,
    WidgetNetwork,
};

#[derive(Parser)]
#[command(name = "swap-widget")]
#[command(about = "Embed the swap widget and answer its signing requests", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the widget iframe URL
    Url(WidgetArgs),
    /// Print an <iframe> tag for the widget
    Iframe {
        #[command(flatten)]
        widget: WidgetArgs,
        #[arg(long)]
        width: Option<String>,
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Request swap quotes
    Quote {
        #[arg(long)]
        swapper: Address,
        #[arg(long)]
        asset_in: u64,
        #[arg(long)]
        asset_out: u64,
        /// Amount in base units of the fixed side
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "0.005")]
        slippage: String,
        /// fixed-input or fixed-output
        #[arg(long, default_value = "fixed-input", value_parser = parse_swap_type)]
        swap_type: SwapType,
        #[arg(long)]
        network: Option<WidgetNetwork>,
    },
    /// Fetch and decode the transaction groups for a quote
    Prepare {
        quote_id: String,
        #[arg(long)]
        deposit_address: Option<Address>,
        #[arg(long)]
        network: Option<WidgetNetwork>,
    },
    /// Look up assets
    Assets {
        /// Comma-separated asset ids
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,
        #[arg(long)]
        search: Option<String>,
        /// Only assets that can be bought with this asset id
        #[arg(long)]
        available_for: Option<u64>,
        #[arg(long)]
        network: Option<WidgetNetwork>,
    },
    /// Print the ALGO price in USD
    Price {
        #[arg(long)]
        network: Option<WidgetNetwork>,
    },
    /// Run a sign request through the bridge with a demo signer
    Simulate {
        /// Number of transaction groups; group i holds i+1 transactions
        #[arg(long, default_value_t = 2)]
        groups: usize,
        /// Make the demo signer decline
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        request_id: Option<String>,
    },
}

/// Widget settings that override the config file.
#[derive(Args, Debug, Default)]
struct WidgetArgs {
    #[arg(long)]
    network: Option<WidgetNetwork>,
    #[arg(long)]
    theme: Option<WidgetAppTheme>,
    #[arg(long)]
    asset_in: Option<AssetId>,
    #[arg(long)]
    asset_out: Option<AssetId>,
    #[arg(long)]
    iframe_bg: Option<String>,
    /// Use the theme's background colour when --iframe-bg is not given
    #[arg(long)]
    themed_bg: bool,
    /// Ask the widget to delegate signing to the host
    #[arg(long)]
    parent_signer: bool,
    #[arg(long)]
    account: Option<Address>,
    #[arg(long)]
    base_url: Option<String>,
}

impl WidgetArgs {
    fn apply(&self, settings: &mut WidgetSettings) {
        if let Some(network) = self.network {
            settings.network = Some(network);
        }
        if let Some(theme) = self.theme {
            settings.theme = Some(theme);
        }
        if let Some(asset) = self.asset_in {
            settings.asset_in = Some(asset.0);
        }
        if let Some(asset) = self.asset_out {
            settings.asset_out = Some(asset.0);
        }
        if let Some(bg) = &self.iframe_bg {
            settings.iframe_bg = Some(bg.clone());
        } else if self.themed_bg {
            if let Some(theme) = settings.theme {
                settings.iframe_bg = Some(theme.default_background().to_string());
            }
        }
        if self.parent_signer {
            settings.use_parent_signer = true;
        }
        if let Some(account) = self.account {
            settings.account_address = Some(account);
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
    }
}

fn parse_swap_type(s: &str) -> Result<SwapType, String> {
    match s {
        "fixed-input" => Ok(SwapType::FixedInput),
        "fixed-output" => Ok(SwapType::FixedOutput),
        other => Err(format!("expected fixed-input or fixed-output, got '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HostConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::debug!(
        config_file = ?cli.config,
        allowed_origins = ?config.bridge.allowed_origins,
        quote_network = %config.quote_service.network,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Url(args) => {
            let mut settings = config.widget.clone();
            args.apply(&mut settings);
            let url =
                generate_widget_url_with_base(&settings.base_url, &settings.to_widget_config())?;
            println!("{url}");
        }
        Commands::Iframe {
            widget,
            width,
            height,
            class,
            id,
        } => {
            let mut settings = config.widget.clone();
            widget.apply(&mut settings);
            let defaults = settings.iframe_options();
            let options = IframeOptions {
                width: width.or(defaults.width),
                height: height.or(defaults.height),
                class_name: class,
                id,
            };
            let iframe =
                WidgetIframe::with_base(&settings.base_url, &settings.to_widget_config(), options)?;
            println!("{iframe}");
        }
        Commands::Quote {
            swapper,
            asset_in,
            asset_out,
            amount,
            slippage,
            swap_type,
            network,
        } => {
            let client = quote_client(&config, network)?;
            let body = CreateQuoteBody {
                providers: SwapProvider::ALL.to_vec(),
                swapper_address: swapper,
                swap_type,
                asset_in_id: asset_in,
                asset_out_id: asset_out,
                amount,
                slippage,
            };
            let quotes = client.create_quote(&body).await?;
            println!("{}", serde_json::to_string_pretty(&quotes)?);
        }
        Commands::Prepare {
            quote_id,
            deposit_address,
            network,
        } => {
            let client = quote_client(&config, network)?;
            let prepared = client
                .prepare_transactions(&quote_id, deposit_address.as_ref())
                .await?;
            for group in &prepared.transaction_groups {
                println!(
                    "group {} ({:?}, {} txns)",
                    group.transaction_group_id,
                    group.purpose,
                    group.transactions.len()
                );
                for txn in group.decode()? {
                    print_transaction(&txn);
                }
            }
        }
        Commands::Assets {
            ids,
            search,
            available_for,
            network,
        } => {
            let client = quote_client(&config, network)?;
            let assets = match available_for {
                Some(asset_in) => client.available_assets(asset_in, search.as_deref()).await?,
                None => client.assets(&ids, search.as_deref()).await?.results,
            };
            println!("{}", serde_json::to_string_pretty(&assets)?);
        }
        Commands::Price { network } => {
            let client = quote_client(&config, network)?;
            let price = client.algo_price().await?;
            println!("1 ALGO = {} USD", price.exchange_price);
        }
        Commands::Simulate {
            groups,
            reject,
            request_id,
        } => simulate(&config, groups, reject, request_id).await?,
    }

    Ok(())
}

fn quote_client(
    config: &HostConfig,
    network: Option<WidgetNetwork>,
) -> Result<SwapApiClient, Box<dyn std::error::Error>> {
    let mut client = SwapApiClient::from_config(&config.quote_service)?;
    if let Some(network) = network {
        client.set_network(network);
    }
    Ok(client)
}

fn print_transaction(txn: &Transaction) {
    let mut line = format!("  {:<6} from {} fee {}", txn.txn_type, txn.sender, txn.fee);
    if let Some(receiver) = &txn.receiver {
        line.push_str(&format!(" pay {} to {}", txn.amount, receiver));
    }
    if let Some(asset_id) = txn.asset_id {
        line.push_str(&format!(" asset {} amount {}", asset_id, txn.asset_amount));
    }
    if let Some(app_id) = txn.app_id {
        line.push_str(&format!(" app {app_id}"));
    }
    println!("{line}");
}

/// Signs by returning the bytes a key would sign, or declines.
struct DemoSigner {
    reject: bool,
}

#[async_trait]
impl WalletSigner for DemoSigner {
    async fn sign(&self, groups: Vec<Vec<Transaction>>) -> Result<Vec<Vec<u8>>, SignerError> {
        if self.reject {
            return Err(SignerError::Declined("demo signer declined".into()));
        }
        Ok(groups.iter().flatten().map(Transaction::bytes_to_sign).collect())
    }
}

async fn simulate(
    config: &HostConfig,
    groups: usize,
    reject: bool,
    request_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = config.bridge.origin_policy()?;
    let widget_origin = swap_widget_host::bridge::normalize_origin(&config.widget.base_url)?;

    let host = LocalWindow::with_origin("https://host.example");
    let widget = LocalWindow::with_origin(widget_origin.clone());
    let controller = WidgetController::with_policy(Arc::new(host.clone()), policy);

    let handlers = WidgetHandlers::new()
        .with_signer(Arc::new(DemoSigner { reject }))
        .on_sign_request_timeout(|notice| {
            tracing::warn!(request_id = ?notice.request_id, "Widget timed out waiting for signatures");
        })
        .on_swap_success(|result| {
            tracing::info!(payload = %result.payload, "Swap succeeded");
        });
    let registration = controller.register(handlers);

    let sender = config.widget.account_address.unwrap_or(Address::ZERO);
    let mut request = SignRequest::new(demo_groups(sender, groups.max(1))?);
    if let Some(id) = request_id {
        request = request.with_request_id(id.as_str());
    }
    println!("widget -> host: {}", serde_json::to_string_pretty(&request.to_wire())?);

    host.deliver(InboundMessage::new(
        request.to_wire(),
        widget_origin,
        Some(widget.handle()),
    ));

    match widget.recv_timeout(Duration::from_secs(5)).await {
        Some(posted) => {
            println!(
                "host -> widget (targetOrigin {}): {}",
                posted.target_origin,
                serde_json::to_string_pretty(&posted.data)?
            );
            match Outbound::from_wire(&posted.data) {
                Some(Outbound::SignResponse { signed_txns, .. }) => {
                    println!("signed {} transactions", signed_txns.len());
                }
                Some(Outbound::FailedSign { error, .. }) => {
                    println!("signing failed: {} ({})", error.message, error.code);
                }
                None => println!("unrecognized reply"),
            }
        }
        None => println!("no reply within 5s"),
    }

    registration.disconnect();
    Ok(())
}

/// Payment groups from `sender` to itself; group `i` holds `i + 1` payments.
fn demo_groups(
    sender: Address,
    groups: usize,
) -> Result<Vec<Vec<WireBytes>>, Box<dyn std::error::Error>> {
    let mut out = Vec::with_capacity(groups);
    let mut amount = 1_000u64;
    for g in 0..groups {
        let mut group = Vec::with_capacity(g + 1);
        for _ in 0..=g {
            group.push(WireBytes(encode_payment(&sender, amount)?));
            amount += 1_000;
        }
        out.push(group);
    }
    Ok(out)
}

fn encode_payment(sender: &Address, amount: u64) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rmpv::Value;
    // Canonical encoding: keys sorted, zero values omitted.
    let map = Value::Map(vec![
        (Value::from("amt"), Value::from(amount)),
        (Value::from("fee"), Value::from(1_000u64)),
        (Value::from("fv"), Value::from(1u64)),
        (Value::from("gen"), Value::from("testnet-v1.0")),
        (Value::from("lv"), Value::from(1_001u64)),
        (Value::from("rcv"), Value::Binary(sender.as_bytes().to_vec())),
        (Value::from("snd"), Value::Binary(sender.as_bytes().to_vec())),
        (Value::from("type"), Value::from("pay")),
    ]);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &map).map_err(|e| e.to_string())?;
    Ok(buf)
}
