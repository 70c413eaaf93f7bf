//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocator::{DefensiveSleeve, TargetWeight};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::coarse::{CoarseFilter, DEFAULT_MIN_PRICE, DEFAULT_NUM_COARSE};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_strategy_config,
};
use crate::domain::drawdown::DEFAULT_MAX_DRAWDOWN;
use crate::domain::error::FundexError;
use crate::domain::instrument::Factor;
use crate::domain::metrics::Metrics;
use crate::domain::ranking::{
    DEFAULT_EXCHANGES, DEFAULT_NUM_LONG, FactorWeights, FineSelector, ScoreOrder,
};
use crate::domain::schedule::DEFAULT_REBALANCE_DAYS;
use crate::domain::strategy::{StrategyConfig, TickAction, fine_candidates};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "fundex", about = "Fundamental factor-ranking portfolio allocator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured date range
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Snapshot directory, overriding [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Write the equity curve as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the factor rank table and basket for one snapshot date
    Rank {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Rows to print (defaults to the basket size)
        #[arg(long)]
        top: Option<usize>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            output,
            start,
            end,
        } => run_backtest(&config, data.as_deref(), output.as_deref(), start, end),
        Command::Validate { config } => run_validate(&config),
        Command::Rank {
            config,
            date,
            data,
            top,
        } => run_rank(&config, date, data.as_deref(), top),
    }
}

fn fail(err: FundexError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    output_path: Option<&Path>,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) =
        validate_backtest_config(&adapter).and_then(|_| validate_strategy_config(&adapter))
    {
        return fail(e);
    }

    // Stage 2: Build configs, applying CLI overrides
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Some(start) = start_override {
        bt_config.start_date = start;
    }
    if let Some(end) = end_override {
        bt_config.end_date = end;
    }
    let strategy_config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 3: Open data source
    let data = match resolve_data_path(data_override, &adapter).and_then(|p| CsvAdapter::open(&p)) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    run_backtest_pipeline(&data, &strategy_config, &bt_config, output_path)
}

pub fn run_backtest_pipeline(
    data: &dyn DataPort,
    strategy_config: &StrategyConfig,
    bt_config: &BacktestConfig,
    output_path: Option<&Path>,
) -> ExitCode {
    eprintln!(
        "Running {}: {} to {}, capital {:.0}",
        strategy_config.name, bt_config.start_date, bt_config.end_date, bt_config.initial_capital
    );

    let result = match backtest_engine::run_backtest(data, strategy_config, bt_config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let metrics = Metrics::compute(&result, bt_config.risk_free_rate);

    eprintln!("\n=== Events ===");
    for event in &result.events {
        match &event.report.action {
            TickAction::Rebalanced { targets } => eprintln!(
                "  {}  rebalance   {} symbols, {} liquidated, equity {:.0}",
                event.date,
                targets.len(),
                event.report.liquidated.len(),
                event.equity
            ),
            TickAction::Defensive { drawdown, targets } => eprintln!(
                "  {}  defensive   drawdown {:.1}%, into {}, equity {:.0}",
                event.date,
                drawdown * 100.0,
                describe_targets(targets),
                event.equity
            ),
            TickAction::Deferred | TickAction::Idle => {}
        }
    }

    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:       {:.2}", metrics.final_equity);
    eprintln!("Total Return:       {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:         {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:       {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:      {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:       -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Rebalances:         {}", metrics.rebalances);
    eprintln!("Defensive Triggers: {}", metrics.defensive_triggers);
    if result.skipped_ticks > 0 {
        eprintln!("Skipped Ticks:      {}", result.skipped_ticks);
    }

    if let Some(path) = output_path {
        if let Err(e) = csv_adapter::write_equity_curve(path, &result.portfolio.equity_curve) {
            return fail(e);
        }
        eprintln!("\nEquity curve written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn describe_targets(targets: &[TargetWeight]) -> String {
    targets
        .iter()
        .map(|t| format!("{} {:.0}%", t.symbol, t.weight * 100.0))
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, FundexError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(adapter.get_string("backtest", "end_date").as_deref(), "end_date")?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
    })
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, FundexError> {
    let defaults = StrategyConfig::default();

    let exchanges = adapter
        .get_list("universe", "exchanges")
        .map(|list| list.into_iter().map(|e| e.to_uppercase()).collect())
        .unwrap_or_else(|| DEFAULT_EXCHANGES.iter().map(|e| e.to_string()).collect());

    let score_order = match adapter.get_string("selection", "score_order") {
        Some(raw) => raw
            .parse::<ScoreOrder>()
            .map_err(|reason| FundexError::invalid("selection", "score_order", reason))?,
        None => ScoreOrder::default(),
    };

    Ok(StrategyConfig {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        coarse: CoarseFilter {
            num_coarse: positive_count(adapter, "universe", "num_coarse", DEFAULT_NUM_COARSE),
            min_price: adapter.get_double("universe", "min_price", DEFAULT_MIN_PRICE),
        },
        fine: FineSelector {
            num_long: positive_count(adapter, "selection", "num_long", DEFAULT_NUM_LONG),
            weights: FactorWeights {
                tangible_book: adapter.get_double("selection", "beta_tangible_book", 1.0),
                revenue: adapter.get_double("selection", "beta_revenue", 1.0),
                operating_income: adapter.get_double("selection", "beta_operating_income", 1.0),
                dividends: adapter.get_double("selection", "beta_dividends", 1.0),
            },
            exchanges,
            score_order,
        },
        rebalance_days: adapter.get_int("schedule", "rebalance_days", DEFAULT_REBALANCE_DAYS),
        max_drawdown: adapter.get_double("risk", "max_drawdown", DEFAULT_MAX_DRAWDOWN),
        defensive: build_defensive_sleeve(adapter)?,
    })
}

fn positive_count(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    usize::try_from(adapter.get_int(section, key, default as i64)).unwrap_or(default)
}

fn build_defensive_sleeve(adapter: &dyn ConfigPort) -> Result<DefensiveSleeve, FundexError> {
    let symbols = match adapter.get_list("risk", "defensive_symbols") {
        Some(symbols) => symbols,
        None if adapter.get_string("risk", "defensive_weights").is_none() => {
            return Ok(DefensiveSleeve::default());
        }
        None => DefensiveSleeve::default()
            .symbols()
            .map(str::to_string)
            .collect(),
    };

    let weights: Vec<f64> = match adapter.get_list("risk", "defensive_weights") {
        Some(raw) => raw
            .iter()
            .map(|w| {
                w.parse::<f64>().map_err(|_| {
                    FundexError::invalid(
                        "risk",
                        "defensive_weights",
                        format!("invalid weight '{w}'"),
                    )
                })
            })
            .collect::<Result<_, _>>()?,
        None => vec![1.0 / symbols.len().max(1) as f64; symbols.len()],
    };

    if weights.len() != symbols.len() {
        return Err(FundexError::invalid(
            "risk",
            "defensive_weights",
            format!("expected {} weights, got {}", symbols.len(), weights.len()),
        ));
    }

    Ok(DefensiveSleeve {
        legs: symbols
            .into_iter()
            .zip(weights)
            .map(|(s, w)| TargetWeight::new(s.to_uppercase(), w))
            .collect(),
    })
}

pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, FundexError> {
    if let Some(p) = data_override {
        return Ok(p.to_path_buf());
    }
    config
        .get_string("data", "path")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| FundexError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&adapter)
        .and_then(|_| validate_strategy_config(&adapter))
        .and_then(|_| build_strategy_config(&adapter));
    let config = match checked {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    eprintln!("\nStrategy: {}", config.name);
    eprintln!(
        "  coarse:    top {} by dollar volume, price > {}",
        config.coarse.num_coarse, config.coarse.min_price
    );
    eprintln!(
        "  fine:      {} long, exchanges {}, score order {}",
        config.fine.num_long,
        config.fine.exchanges.join(","),
        config.fine.score_order
    );
    let weights: Vec<String> = Factor::ALL
        .iter()
        .map(|&f| format!("{}={}", f, config.fine.weights.weight(f)))
        .collect();
    eprintln!("  weights:   {}", weights.join(" "));
    eprintln!("  schedule:  every {} days", config.rebalance_days);
    eprintln!(
        "  risk:      max drawdown {:.1}%, defensive {}",
        config.max_drawdown * 100.0,
        describe_targets(&config.defensive.legs)
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_rank(
    config_path: &Path,
    date: NaiveDate,
    data_override: Option<&Path>,
    top: Option<usize>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(e);
    }
    let result = build_strategy_config(&adapter).and_then(|config| {
        let path = resolve_data_path(data_override, &adapter)?;
        let data = CsvAdapter::open(&path)?;
        rank_table(&data, &config, date, top)
    });

    match result {
        Ok(table) => {
            print!("{table}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Coarse and fine selection for `date`, rendered as a text table in selection order.
/// Rows marked `*` are the basket.
pub fn rank_table(
    data: &dyn DataPort,
    config: &StrategyConfig,
    date: NaiveDate,
    top: Option<usize>,
) -> Result<String, FundexError> {
    let universe = data.fetch_universe_snapshot(date)?;
    let symbols = config.coarse.filter(&universe);
    let candidates = fine_candidates(date, &symbols, data)?;
    let ranked = config.fine.rank(&candidates);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# {date}: universe {}, coarse {}, fine {}, score order {}",
        universe.len(),
        symbols.len(),
        ranked.len(),
        config.fine.score_order
    );
    let _ = writeln!(
        out,
        "{:>5} {:<10} {:>6} {:>6} {:>6} {:>6} {:>10}",
        "#", "symbol", "TV", "TR", "OI", "DP", "composite"
    );
    for (i, row) in ranked.iter().take(top.unwrap_or(config.fine.num_long)).enumerate() {
        let _ = write!(
            out,
            "{:>5} {:<10} {:>6} {:>6} {:>6} {:>6} {:>10.2}",
            i + 1,
            row.symbol,
            row.ranks.tangible_book,
            row.ranks.revenue,
            row.ranks.operating_income,
            row.ranks.dividends,
            row.composite,
        );
        out.push_str(if i < config.fine.num_long { " *\n" } else { "\n" });
    }
    Ok(out)
}
