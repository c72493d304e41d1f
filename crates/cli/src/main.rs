use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gateway_core::{ClosePositionPayload, TradeRequestPayload, TradingGateway};
use gateway_metatrader::{MetaTraderConfig, MetaTraderGateway};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mt5-gateway")]
#[command(about = "Trading gateway in front of a MetaTrader 5 Web API")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// TOML config file. Flags and MT5_* variables override its values.
    #[arg(short, long, env = "MT5_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct ConnectionArgs {
    /// Base URL of the MT5 Web API
    #[arg(long, env = "MT5_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "MT5_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "MT5_SERVER_ID")]
    server_id: Option<String>,

    #[arg(long, env = "MT5_LOGIN")]
    login: Option<String>,

    #[arg(long, env = "MT5_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-call timeout in milliseconds
    #[arg(long, env = "MT5_TIMEOUT")]
    timeout: Option<u64>,

    /// Attempts per operation, including the first
    #[arg(long, env = "MT5_RETRY_ATTEMPTS")]
    retry_attempts: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(long, env = "MT5_RETRY_DELAY")]
    retry_delay: Option<u64>,
}

impl ConnectionArgs {
    fn apply(self, config: &mut MetaTraderConfig) {
        if let Some(v) = self.api_url {
            config.api_url = v;
        }
        if let Some(v) = self.api_key {
            config.api_key = v;
        }
        if let Some(v) = self.server_id {
            config.server_id = v;
        }
        if let Some(v) = self.login {
            config.login = v;
        }
        if let Some(v) = self.password {
            config.password = v;
        }
        if let Some(v) = self.timeout {
            config.timeout_ms = v;
        }
        if let Some(v) = self.retry_attempts {
            config.retry_attempts = v;
        }
        if let Some(v) = self.retry_delay {
            config.retry_delay_ms = v;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0:3000")]
        bind: String,
    },

    /// Probe the MT5 server once
    Ping,

    /// Show the account snapshot
    Account,

    /// List open positions
    Positions,

    /// Open a market position
    Trade {
        #[arg(short, long)]
        symbol: String,

        /// "buy" or "sell"
        #[arg(long)]
        side: String,

        #[arg(short, long)]
        volume: f64,

        #[arg(long)]
        price: Option<f64>,

        /// Stop loss price
        #[arg(long)]
        sl: Option<f64>,

        /// Take profit price
        #[arg(long)]
        tp: Option<f64>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Close a position fully or partially
    Close {
        #[arg(short, long)]
        position_id: i64,

        /// Partial volume; omit to close everything
        #[arg(short, long)]
        volume: Option<f64>,
    },

    /// Show the specification of a symbol
    Symbol { symbol: String },

    /// Show current ticks for one or more symbols
    Prices {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.log_json {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    let config = load_config(cli.config.as_ref(), cli.connection)?;
    let gateway = MetaTraderGateway::new(&config)?;

    match cli.command {
        Commands::Serve { bind } => {
            info!(api_url = %config.api_url, server = %config.server_id, "Starting MT5 gateway");
            gateway_api::start_server(Arc::new(gateway), &bind).await?;
        }
        Commands::Ping => {
            let connected = gateway.check_connection().await;
            print_json(&gateway.connection_status())?;
            if !connected {
                anyhow::bail!("MT5 server connection failed");
            }
        }
        Commands::Account => print_json(&gateway.get_account().await?)?,
        Commands::Positions => print_json(&gateway.get_all_positions().await?)?,
        Commands::Trade {
            symbol,
            side,
            volume,
            price,
            sl,
            tp,
            comment,
        } => {
            let payload = TradeRequestPayload {
                symbol,
                volume,
                side,
                price,
                stop_loss: sl,
                take_profit: tp,
                comment,
            };
            print_json(&gateway.execute_trade(&payload).await?)?;
        }
        Commands::Close {
            position_id,
            volume,
        } => {
            let payload = ClosePositionPayload {
                position_id,
                volume,
            };
            print_json(&gateway.execute_close(&payload).await?)?;
        }
        Commands::Symbol { symbol } => print_json(&gateway.get_symbol_info(&symbol).await?)?,
        Commands::Prices { symbols } => print_json(&gateway.get_market_prices(&symbols).await?)?,
    }

    Ok(())
}

/// File values first, then flags and environment on top.
fn load_config(path: Option<&PathBuf>, overrides: ConnectionArgs) -> Result<MetaTraderConfig> {
    let mut config = match path {
        Some(path) => MetaTraderConfig::from_file(path)?,
        None => MetaTraderConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = MetaTraderConfig::from_toml_str(
            r#"
            api_url = "https://file.example"
            login = "1"
            retry_attempts = 5
            "#,
        )
        .unwrap();
        ConnectionArgs {
            login: Some("2".to_string()),
            retry_delay: Some(250),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.api_url, "https://file.example");
        assert_eq!(config.login, "2");
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_delay_ms, 250);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let args = ConnectionArgs {
            api_url: Some("https://mt5.example".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let err = load_config(None, args).unwrap_err();
        assert_eq!(err.to_string(), "Missing required MT5 configuration: server_id");
    }

    #[test]
    fn test_unreadable_config_file() {
        let path = PathBuf::from("/nonexistent/mt5-gateway.toml");
        let err = load_config(Some(&path), ConnectionArgs::default()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }

    #[test]
    fn test_trade_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "mt5-gateway",
            "trade",
            "--symbol",
            "EURUSD",
            "--side",
            "buy",
            "--volume",
            "0.5",
            "--sl",
            "1.05",
        ])
        .unwrap();
        match cli.command {
            Commands::Trade {
                symbol, volume, sl, ..
            } => {
                assert_eq!(symbol, "EURUSD");
                assert_eq!(volume, 0.5);
                assert_eq!(sl, Some(1.05));
            }
            _ => panic!("expected trade"),
        }
    }
}
