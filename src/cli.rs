//! CLI definition and dispatch.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::env_credentials;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::config_validation::{
    bar_type, indicator_kinds, market_hours, parse_symbols, signal_thresholds, validate_config,
};
use crate::domain::error::AutotraderError;
use crate::domain::indicator::Indicators;
use crate::domain::order::{EnterExit, OrderResponse, OrderType, Side};
use crate::domain::position::AssetType;
use crate::domain::price_bar::BarType;
use crate::domain::robot::{Robot, SignalTrades};
use crate::domain::signal::Signal;
use crate::domain::trade::{NewTrade, Trade};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "autotrader", about = "Signal-driven trading robot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load prices, check signals and execute the resulting trades
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols, overriding [robot] symbols
        #[arg(long)]
        symbols: Option<String>,
        /// Write order responses to this JSON file
        #[arg(long)]
        orders: Option<PathBuf>,
        /// End of the price window (RFC 3339), defaults to now
        #[arg(long)]
        end: Option<String>,
    },
    /// Print the signals the latest bars produce, without trading
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Build an order and print its JSON
    Order(OrderArgs),
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct OrderArgs {
    #[arg(long)]
    pub symbol: String,
    /// mkt, lmt, stop, stop_lmt or trailing_stop
    #[arg(long = "type", default_value = "mkt")]
    pub order_type: String,
    /// long or short
    #[arg(long, default_value = "long")]
    pub side: String,
    /// enter or exit
    #[arg(long, default_value = "enter")]
    pub action: String,
    #[arg(long, default_value_t = 0.0)]
    pub price: f64,
    #[arg(long, default_value_t = 0.0)]
    pub stop_limit_price: f64,
    #[arg(long, default_value_t = 1)]
    pub quantity: i64,
    #[arg(long, default_value = "equity")]
    pub asset_type: String,
    #[arg(long)]
    pub take_profit: Option<f64>,
    #[arg(long)]
    pub stop_loss: Option<f64>,
    /// Limit distance past the stop, turning the stop loss into a stop limit
    #[arg(long)]
    pub stop_limit: Option<f64>,
    /// Treat take-profit/stop sizes as fractions of the price
    #[arg(long)]
    pub percentage: bool,
    /// am, pm, normal or seamless
    #[arg(long)]
    pub session: Option<String>,
    /// Good-till-cancel expiry (RFC 3339)
    #[arg(long)]
    pub gtc: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            symbols,
            orders,
            end,
        } => run_robot(&config, symbols.as_deref(), orders.as_deref(), end.as_deref()),
        Command::Signals {
            config,
            symbols,
            end,
        } => run_signals(&config, symbols.as_deref(), end.as_deref()),
        Command::Order(args) => run_order(&args),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &AutotraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Typed values from `[data]` and `[robot]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotSettings {
    pub symbols: Vec<String>,
    pub bar_size: u32,
    pub bar_type: BarType,
    pub lookback_days: i64,
    pub quantity: i64,
    pub data_path: PathBuf,
}

pub fn build_robot_settings(
    config: &dyn ConfigPort,
    symbols_override: Option<&str>,
) -> Result<RobotSettings, AutotraderError> {
    let symbols = resolve_symbols(symbols_override, config);
    if symbols.is_empty() {
        return Err(AutotraderError::ConfigMissing {
            section: "robot".into(),
            key: "symbols".into(),
        });
    }
    let data_path = config
        .get_string("data", "path")
        .ok_or_else(|| AutotraderError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    Ok(RobotSettings {
        symbols,
        bar_size: config.get_int("robot", "bar_size", 1).clamp(1, i64::from(u32::MAX)) as u32,
        bar_type: bar_type(config)?,
        lookback_days: config.get_int("robot", "lookback_days", 1).max(1),
        quantity: config.get_int("robot", "quantity", 1).max(1),
        data_path: PathBuf::from(data_path.trim()),
    })
}

pub fn resolve_symbols(symbols_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    if let Some(symbols) = symbols_override {
        return parse_symbols(symbols);
    }
    config
        .get_string("robot", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default()
}

pub fn parse_end(end: Option<&str>) -> Result<DateTime<Utc>, AutotraderError> {
    match end {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AutotraderError::invalid_order(format!("invalid time '{raw}': {e}"))),
    }
}

/// A logged-in robot with its frame built and signals checked.
#[derive(Debug)]
pub struct SignalScan {
    pub robot: Robot,
    pub indicators: Indicators,
    pub signals: Vec<Signal>,
}

/// Opens a paper session over the CSV data, loads `lookback_days` of bars
/// ending at `end`, applies the configured indicators and checks signals.
pub fn scan_signals(
    config: &dyn ConfigPort,
    settings: &RobotSettings,
    end: DateTime<Utc>,
) -> Result<SignalScan, AutotraderError> {
    let robot_config = env_credentials::robot_config(config)?;
    let broker = PaperBroker::new(CsvAdapter::new(settings.data_path.clone()));
    let mut robot =
        Robot::new(robot_config, Box::new(broker))?.with_market_hours(market_hours(config)?);
    robot.create_portfolio();
    info!(session = %robot.market_hours.session_at(end), "market session");

    let start = Duration::try_days(settings.lookback_days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| AutotraderError::ConfigInvalid {
            section: "robot".into(),
            key: "lookback_days".into(),
            reason: format!("{} days before {end} is out of range", settings.lookback_days),
        })?;
    let bars = robot.grab_historical_prices(
        start,
        end,
        settings.bar_size,
        settings.bar_type,
        Some(settings.symbols.as_slice()),
    )?;
    if bars.is_empty() {
        return Err(AutotraderError::NoData {
            symbol: settings.symbols.join(", "),
        });
    }

    let mut indicators = Indicators::new();
    let frame = robot.create_stock_frame(&bars);
    for kind in indicator_kinds(config)? {
        indicators.apply(frame, kind)?;
    }
    for (column, threshold) in signal_thresholds(config)? {
        indicators.set_indicator_signal(
            &column,
            threshold.buy,
            threshold.sell,
            threshold.buy_operator,
            threshold.sell_operator,
        );
    }
    let signals = indicators.check_signals(frame).unwrap_or_default();
    Ok(SignalScan {
        robot,
        indicators,
        signals,
    })
}

/// Registers a market buy and a market sell per symbol and maps each
/// symbol to them.
pub fn register_signal_trades(
    robot: &mut Robot,
    symbols: &[String],
    quantity: i64,
) -> Result<BTreeMap<String, SignalTrades>, AutotraderError> {
    let mut plan = BTreeMap::new();
    for symbol in symbols {
        let buy_id = format!("buy_{}", symbol.to_lowercase());
        let sell_id = format!("sell_{}", symbol.to_lowercase());
        robot
            .create_trade(NewTrade::market(&buy_id, Side::Long, EnterExit::Enter, 0.0))?
            .instrument(symbol, quantity, AssetType::Equity, None, 0)?;
        robot
            .create_trade(NewTrade::market(&sell_id, Side::Long, EnterExit::Exit, 0.0))?
            .instrument(symbol, quantity, AssetType::Equity, None, 0)?;
        plan.insert(
            symbol.clone(),
            SignalTrades {
                buy: Some(buy_id),
                sell: Some(sell_id),
            },
        );
    }
    Ok(plan)
}

fn print_signals(signals: &[Signal]) {
    println!("symbol\tdatetime\tindicator\tvalue\tclose\taction");
    for s in signals {
        println!(
            "{}\t{}\t{}\t{:.4}\t{:.2}\t{}",
            s.symbol,
            s.datetime.to_rfc3339(),
            s.indicator,
            s.value,
            s.close,
            s.action
        );
    }
}

fn settings_from(
    config_path: &Path,
    symbols: Option<&str>,
) -> Result<(FileConfigAdapter, RobotSettings), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    if let Err(e) = validate_config(&adapter) {
        return Err(fail(&e));
    }
    let settings = build_robot_settings(&adapter, symbols).map_err(|e| fail(&e))?;
    Ok((adapter, settings))
}

fn run_signals(config_path: &Path, symbols: Option<&str>, end: Option<&str>) -> ExitCode {
    let (adapter, settings) = match settings_from(config_path, symbols) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let scan = match parse_end(end).and_then(|end| scan_signals(&adapter, &settings, end)) {
        Ok(scan) => scan,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Checked {} symbols with {} indicators",
        settings.symbols.len(),
        scan.indicators.current_indicators().len()
    );
    if scan.signals.is_empty() {
        eprintln!("No signals");
    } else {
        print_signals(&scan.signals);
    }
    ExitCode::SUCCESS
}

fn print_summary(robot: &mut Robot, responses: &[OrderResponse]) -> Result<(), AutotraderError> {
    let quotes = robot.grab_current_quotes()?;
    let prices: HashMap<String, f64> = quotes
        .iter()
        .map(|(symbol, quote)| (symbol.clone(), quote.close))
        .collect();
    let summary = robot.portfolio.summary(&prices);

    eprintln!("\n=== Orders ===");
    if responses.is_empty() {
        eprintln!("  none");
    }
    for r in responses {
        eprintln!(
            "  {}: {:?} {} x{} @ {}",
            r.order_id,
            r.instruction,
            r.symbol,
            r.quantity,
            r.fill_price
                .map(|p| format!("{p:.2}"))
                .unwrap_or_else(|| "-".into()),
        );
    }

    eprintln!("\n=== Portfolio ===");
    eprintln!("Positions:        {}", summary.positions_count);
    eprintln!("Market Value:     {:.2}", summary.market_value);
    eprintln!("Profit/Loss:      {:.2}", summary.profit_loss);
    for (symbol, share) in &summary.risk_exposure {
        eprintln!("  {}: {:.1}%", symbol, share * 100.0);
    }
    Ok(())
}

fn run_robot(
    config_path: &Path,
    symbols: Option<&str>,
    orders_path: Option<&Path>,
    end: Option<&str>,
) -> ExitCode {
    let (adapter, settings) = match settings_from(config_path, symbols) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let mut scan = match parse_end(end).and_then(|end| scan_signals(&adapter, &settings, end)) {
        Ok(scan) => scan,
        Err(e) => return fail(&e),
    };
    eprintln!("{} signals", scan.signals.len());

    let responses = match register_signal_trades(&mut scan.robot, &settings.symbols, settings.quantity)
        .and_then(|plan| scan.robot.execute_signals(&scan.signals, &plan))
    {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    match serde_json::to_string_pretty(&responses) {
        Ok(json) => println!("{json}"),
        Err(e) => return fail(&AutotraderError::from(e)),
    }
    if let Err(e) = print_summary(&mut scan.robot, &responses) {
        return fail(&e);
    }

    if let Some(path) = orders_path {
        if let Err(e) = scan.robot.save_orders(path) {
            return fail(&e);
        }
        eprintln!("\nOrders written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

pub fn build_order_trade(args: &OrderArgs) -> Result<Trade, AutotraderError> {
    let order_type: OrderType = args.order_type.parse()?;
    let mut trade = Trade::new(NewTrade {
        trade_id: format!("{}_{}_{}", args.symbol.to_lowercase(), args.side, args.action),
        order_type,
        side: args.side.parse()?,
        enter_exit: args.action.parse()?,
        price: args.price,
        stop_limit_price: args.stop_limit_price,
    })?;
    trade.instrument(
        &args.symbol.to_uppercase(),
        args.quantity,
        args.asset_type.parse::<AssetType>()?,
        None,
        0,
    )?;
    if let Some(session) = &args.session {
        trade.modify_session(session.parse()?);
    }
    if let Some(gtc) = &args.gtc {
        trade.good_till_cancel(parse_end(Some(gtc))?);
    }
    match (args.take_profit, args.stop_loss) {
        (Some(profit), Some(stop)) => {
            trade.add_box_range(profit, stop, args.percentage, args.stop_limit)?;
        }
        (Some(profit), None) => {
            trade.add_take_profit(profit, args.percentage)?;
        }
        (None, Some(stop)) => match args.stop_limit {
            Some(limit) => {
                trade.add_stop_limit(stop, limit, args.percentage, args.percentage)?;
            }
            None => {
                trade.add_stop_loss(stop, args.percentage)?;
            }
        },
        (None, None) => {}
    }
    Ok(trade)
}

fn run_order(args: &OrderArgs) -> ExitCode {
    let json = match build_order_trade(args).and_then(|trade| trade.to_json()) {
        Ok(json) => json,
        Err(e) => return fail(&e),
    };
    println!("{json}");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        return fail(&e);
    }

    let symbols = resolve_symbols(None, &adapter);
    eprintln!("\nSymbols: {}", symbols.join(", "));

    // validate_config has already parsed these
    let kinds = indicator_kinds(&adapter).unwrap_or_default();
    eprintln!("\nIndicators:");
    if kinds.is_empty() {
        eprintln!("  none");
    }
    for kind in &kinds {
        eprintln!("  {kind}");
    }

    let thresholds = signal_thresholds(&adapter).unwrap_or_default();
    eprintln!("\nSignals:");
    if thresholds.is_empty() {
        eprintln!("  none");
    }
    for (column, t) in &thresholds {
        eprintln!(
            "  {column}: buy when {} {}, sell when {} {}",
            t.buy_operator, t.buy, t.sell_operator, t.sell
        );
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
