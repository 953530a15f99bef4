//! ScoreLab CLI: scoring, regime, validation and availability commands.
//!
//! Commands:
//! - `score` ranks a universe for one strategy, optionally with the
//!   walk-forward validation attached to the candidates
//! - `regime` prints the market overview and regime recommendation
//! - `validate` runs the walk-forward validator for one strategy
//! - `availability` prints which strategies a date and time allow
//!
//! Market data comes from a CSV directory (`--data-dir`) or the seeded
//! synthetic market (`--synthetic`).

mod csv_market;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scorelab_core::calendar::latest_trading_date;
use scorelab_core::diversify::ExposureCap;
use scorelab_core::domain::{IntradayBranch, RawWeights, StrategyContext, StrategyKind};
use scorelab_core::regime::{market_overview, reference_index_changes, MarketOverview};
use scorelab_core::{
    resolve_strategy_context, strategy_availability, MarketData, ScoreRequest, ScoreResponse,
    Scorer, ScoringConfig, SyntheticMarket, TradingCalendar, Universe, WeekdayCalendar,
};
use scorelab_runner::{
    attach_validation, resolve_branch, BranchSelection, ValidationConfig, ValidationParams,
    ValidationSummary, WalkForwardValidator,
};

use crate::csv_market::CsvMarket;

#[derive(Parser)]
#[command(
    name = "scorelab",
    about = "ScoreLab CLI: factor scoring with walk-forward overfitting checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and rank the universe for a strategy.
    Score {
        /// Strategy: close, premarket or intraday. Defaults to the slot's default.
        #[arg(long)]
        strategy: Option<String>,

        /// Session date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Wall clock to resolve availability against (YYYY-MM-DDTHH:MM).
        #[arg(long)]
        now: Option<String>,

        /// Factor weights as return,stability,market (e.g. 0.5,0.3,0.2).
        #[arg(long)]
        weights: Option<String>,

        /// Apply balanced sector/size sampling.
        #[arg(long, default_value_t = false)]
        diversify: bool,

        /// Sector exposure cap as TOP_N:MAX_PER_SECTOR (e.g. 5:2).
        #[arg(long)]
        exposure_cap: Option<String>,

        /// Intraday signal branch: baseline or phase2.
        #[arg(long)]
        branch: Option<String>,

        /// Attach the walk-forward validation to the candidates.
        #[arg(long, default_value_t = false)]
        validate: bool,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Market overview and regime recommendation.
    Regime {
        /// Date (YYYY-MM-DD). Defaults to the latest trading date.
        #[arg(long)]
        date: Option<String>,

        /// Print JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Run the walk-forward validator for a strategy.
    Validate {
        /// Strategy: close, premarket or intraday.
        #[arg(long, default_value = "intraday")]
        strategy: String,

        /// As-of date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Factor weights as return,stability,market.
        #[arg(long)]
        weights: Option<String>,

        /// Intraday signal branch: baseline or phase2.
        #[arg(long)]
        branch: Option<String>,

        /// Train sessions per window.
        #[arg(long)]
        train: Option<usize>,

        /// Test sessions per window.
        #[arg(long)]
        test: Option<usize>,

        /// Embargo sessions dropped from each test block.
        #[arg(long)]
        embargo: Option<usize>,

        /// Maximum number of windows.
        #[arg(long)]
        max_windows: Option<usize>,

        /// Minimum aggregate sample size.
        #[arg(long)]
        min_sample_size: Option<usize>,

        /// Validate both intraday branches and recommend one.
        #[arg(long, default_value_t = false)]
        compare_branches: bool,

        /// Skip the monitoring log for this run.
        #[arg(long, default_value_t = false)]
        no_monitor: bool,

        /// Print JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Strategies available for a date at a given time.
    Availability {
        /// Requested date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Wall clock (YYYY-MM-DDTHH:MM). Defaults to now.
        #[arg(long)]
        now: Option<String>,

        /// Print JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Data source, universe and configuration shared by the data commands.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Directory of `<code>.csv` daily bars (and optional `<code>.5m.csv`).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the seeded synthetic market.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for the synthetic market.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Universe TOML file. Defaults to the built-in KRX universe.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Restrict the universe to these codes (comma separated).
    #[arg(long, value_delimiter = ',')]
    codes: Vec<String>,

    /// Scoring config TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validation config TOML.
    #[arg(long)]
    validation_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            strategy,
            date,
            now,
            weights,
            diversify,
            exposure_cap,
            branch,
            validate,
            json,
            data,
        } => {
            let opts = ScoreOptions {
                strategy: strategy.as_deref().map(str::parse).transpose()?,
                date: parse_opt_date(date.as_deref())?,
                now: parse_now(now.as_deref())?,
                weights: weights.as_deref().map(parse_weights).transpose()?,
                diversify,
                exposure_cap: exposure_cap.as_deref().map(parse_exposure_cap).transpose()?,
                branch: branch.as_deref().map(str::parse).transpose()?,
                validate,
            };
            run_score(&data, &opts, json)
        }
        Commands::Regime { date, json, data } => {
            run_regime(&data, parse_opt_date(date.as_deref())?, json)
        }
        Commands::Validate {
            strategy,
            date,
            weights,
            branch,
            train,
            test,
            embargo,
            max_windows,
            min_sample_size,
            compare_branches,
            no_monitor,
            json,
            data,
        } => {
            let strategy: StrategyKind = strategy.parse()?;
            let as_of = parse_opt_date(date.as_deref())?.unwrap_or_else(today);
            let params = ValidationParams {
                weights: weights.as_deref().map(parse_weights).transpose()?,
                intraday_branch: branch.as_deref().map(str::parse).transpose()?,
                train_sessions: train,
                test_sessions: test,
                embargo_sessions: embargo,
                max_windows,
                min_sample_size,
                ..ValidationParams::default()
            }
            .comparing_branches(compare_branches)
            .with_monitoring(!no_monitor);
            run_validate(&data, strategy, &params, as_of, json)
        }
        Commands::Availability { date, now, json } => {
            run_availability(parse_opt_date(date.as_deref())?, parse_now(now.as_deref())?, json)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Argument parsing ───────────────────────────────────────────────

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn parse_opt_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
        })
        .transpose()
}

fn parse_now(value: Option<&str>) -> Result<NaiveDateTime> {
    match value {
        Some(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
            .with_context(|| format!("invalid time '{s}', expected YYYY-MM-DDTHH:MM")),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

/// `return,stability,market`; an empty component keeps the default.
fn parse_weights(value: &str) -> Result<RawWeights> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("weights must be return,stability,market, got '{value}'");
    }
    let component = |s: &str| -> Result<Option<f64>> {
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<f64>()
            .map(Some)
            .with_context(|| format!("invalid weight '{s}'"))
    };
    Ok(RawWeights {
        ret: component(parts[0])?,
        stability: component(parts[1])?,
        market: component(parts[2])?,
    })
}

fn parse_exposure_cap(value: &str) -> Result<ExposureCap> {
    let Some((top, per_sector)) = value.split_once(':') else {
        bail!("exposure cap must be TOP_N:MAX_PER_SECTOR, got '{value}'");
    };
    let cap = ExposureCap {
        top_n: top.trim().parse().with_context(|| format!("invalid top N '{top}'"))?,
        max_per_sector: per_sector
            .trim()
            .parse()
            .with_context(|| format!("invalid per-sector cap '{per_sector}'"))?,
    };
    if cap.top_n == 0 || cap.max_per_sector == 0 {
        bail!("exposure cap values must be positive");
    }
    Ok(cap)
}

// ─── Data source ────────────────────────────────────────────────────

enum DataSource {
    Csv(CsvMarket),
    Synthetic(SyntheticMarket),
}

impl DataSource {
    fn open(args: &DataArgs, now: NaiveDateTime) -> Result<Self> {
        match (&args.data_dir, args.synthetic) {
            (Some(_), true) => bail!("--data-dir and --synthetic are mutually exclusive"),
            (None, false) => bail!("one of --data-dir or --synthetic is required"),
            (Some(dir), false) => {
                if !dir.is_dir() {
                    bail!("data directory does not exist: {}", dir.display());
                }
                Ok(DataSource::Csv(CsvMarket::new(dir)))
            }
            (None, true) => Ok(DataSource::Synthetic(
                SyntheticMarket::new(args.seed).with_news_as_of(now),
            )),
        }
    }

    fn market(&self) -> &dyn MarketData {
        match self {
            DataSource::Csv(m) => m,
            DataSource::Synthetic(m) => m,
        }
    }

    fn scorer<'a>(&'a self, calendar: &'a dyn TradingCalendar, config: ScoringConfig) -> Scorer<'a> {
        let scorer = Scorer::new(self.market(), calendar, config);
        match self {
            DataSource::Synthetic(m) => scorer.with_news(m),
            DataSource::Csv(_) => scorer,
        }
    }

    fn describe(&self) -> String {
        match self {
            DataSource::Csv(m) => format!("csv ({})", m.dir().display()),
            DataSource::Synthetic(_) => "synthetic".to_string(),
        }
    }
}

/// Everything a data command needs, loaded once.
struct Workspace {
    source: DataSource,
    calendar: WeekdayCalendar,
    scoring: ScoringConfig,
    validation: ValidationConfig,
    universe: Universe,
}

impl Workspace {
    fn load(args: &DataArgs, now: NaiveDateTime) -> Result<Self> {
        let scoring = match &args.config {
            Some(path) => ScoringConfig::load(path)
                .with_context(|| format!("loading scoring config {}", path.display()))?,
            None => ScoringConfig::default(),
        };
        let validation = match &args.validation_config {
            Some(path) => ValidationConfig::load(path)
                .with_context(|| format!("loading validation config {}", path.display()))?,
            None => ValidationConfig::default(),
        };
        let mut universe = match &args.universe {
            Some(path) => Universe::from_file(path)
                .with_context(|| format!("loading universe {}", path.display()))?,
            None => Universe::default_krx(),
        };
        if !args.codes.is_empty() {
            universe = universe.restricted_to(&args.codes[..]);
        }
        if universe.is_empty() {
            bail!("universe is empty");
        }

        let source = DataSource::open(args, now)?;
        info!(
            source = %source.describe(),
            instruments = universe.len(),
            "workspace loaded"
        );
        Ok(Self {
            source,
            calendar: WeekdayCalendar::new(),
            scoring,
            validation,
            universe,
        })
    }

    fn scorer(&self) -> Scorer<'_> {
        self.source.scorer(&self.calendar, self.scoring.clone())
    }
}

// ─── Commands ───────────────────────────────────────────────────────

struct ScoreOptions {
    strategy: Option<StrategyKind>,
    date: Option<NaiveDate>,
    now: NaiveDateTime,
    weights: Option<RawWeights>,
    diversify: bool,
    exposure_cap: Option<ExposureCap>,
    branch: Option<IntradayBranch>,
    validate: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreOutput {
    strategy_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<BranchSelection>,
    #[serde(flatten)]
    response: ScoreResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationSummary>,
}

fn score(ws: &Workspace, opts: &ScoreOptions) -> Result<ScoreOutput> {
    let resolved = resolve_strategy_context(&ws.calendar, opts.strategy, opts.date, opts.now)?;
    let kind = resolved.context.kind;
    let session = resolved.context.session_date;

    let scorer = ws.scorer();
    let validator = WalkForwardValidator::for_scorer(&scorer, ws.validation.clone());
    let selection = resolve_branch(
        &validator,
        kind,
        opts.branch,
        &ws.universe,
        opts.weights,
        session,
    )?;

    let context = match selection {
        Some(sel) => resolved.context.clone().with_branch(sel.branch),
        None => resolved.context.clone(),
    };
    let mut request = ScoreRequest::new(context).with_diversify(opts.diversify);
    if let Some(weights) = opts.weights {
        request = request.with_weights(weights);
    }
    if let Some(cap) = opts.exposure_cap {
        request = request.with_exposure_cap(cap);
    }
    let mut response = scorer.score_candidates(&ws.universe, &request)?;

    let validation = if opts.validate {
        let params = ValidationParams {
            weights: opts.weights,
            intraday_branch: selection.map(|s| s.branch),
            ..ValidationParams::default()
        };
        let summary = validator.run(kind, &ws.universe, &params, session)?;
        response.candidates = attach_validation(&response.candidates, &summary);
        Some(summary)
    } else {
        None
    };

    Ok(ScoreOutput {
        strategy_reason: resolved.reason.to_string(),
        branch: selection,
        response,
        validation,
    })
}

fn run_score(data: &DataArgs, opts: &ScoreOptions, json: bool) -> Result<()> {
    let ws = Workspace::load(data, opts.now)?;
    let output = score(&ws, opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_score(&output);
    }
    Ok(())
}

fn overview(ws: &Workspace, date: Option<NaiveDate>) -> Result<MarketOverview> {
    let date = latest_trading_date(&ws.calendar, date.unwrap_or_else(today));
    let scorer = ws.scorer();
    let request = ScoreRequest::new(StrategyContext::same_day(StrategyKind::Close, date));
    let response = scorer.score_candidates(&ws.universe, &request)?;
    let indices = reference_index_changes(ws.source.market(), response.session_date);
    Ok(market_overview(&response.candidates, indices))
}

fn run_regime(data: &DataArgs, date: Option<NaiveDate>, json: bool) -> Result<()> {
    let ws = Workspace::load(data, chrono::Local::now().naive_local())?;
    let overview = overview(&ws, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        print_overview(&overview);
    }
    Ok(())
}

fn run_validate(
    data: &DataArgs,
    strategy: StrategyKind,
    params: &ValidationParams,
    as_of: NaiveDate,
    json: bool,
) -> Result<()> {
    let ws = Workspace::load(data, chrono::Local::now().naive_local())?;
    let scorer = ws.scorer();
    let validator = WalkForwardValidator::for_scorer(&scorer, ws.validation.clone());
    let summary = validator.run(strategy, &ws.universe, params, as_of)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_validation(&summary);
    }
    Ok(())
}

fn run_availability(date: Option<NaiveDate>, now: NaiveDateTime, json: bool) -> Result<()> {
    let calendar = WeekdayCalendar::new();
    let availability = strategy_availability(&calendar, date, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&availability)?);
        return Ok(());
    }

    let joined = availability
        .available_strategies
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!();
    println!("=== Strategy Availability ===");
    println!("Date:       {}", availability.requested_date);
    println!("Now:        {}", availability.now.format("%Y-%m-%d %H:%M"));
    match availability.time_bucket {
        Some(bucket) => println!("Bucket:     {bucket:?}"),
        None => println!("Bucket:     (past session)"),
    }
    println!("Available:  {}", if joined.is_empty() { "none" } else { &joined });
    match availability.default_strategy {
        Some(kind) => println!("Default:    {kind}"),
        None => println!("Default:    none"),
    }
    println!();
    for kind in StrategyKind::ALL {
        println!("{:<10} {}", kind.as_str(), availability.messages.get(kind));
    }
    println!();
    Ok(())
}

// ─── Output ─────────────────────────────────────────────────────────

fn print_score(output: &ScoreOutput) {
    let r = &output.response;
    println!();
    println!("=== {} Scores ===", r.strategy);
    println!("Session:    {} (signal {})", r.session_date, r.signal_date);
    println!("Reason:     {}", output.strategy_reason);
    if let Some(sel) = &output.branch {
        println!("Branch:     {} ({})", sel.branch, sel.source);
    }
    println!(
        "Weights:    return {:.3} / stability {:.3} / market {:.3}",
        r.weights.ret, r.weights.stability, r.weights.market
    );
    println!("Scored:     {} of {} ({} skipped)", r.candidates.len(), r.requested, r.skipped);
    println!();
    println!(
        "{:>4} {:<8} {:<20} {:<14} {:>6} {:>8}  {}",
        "Rank", "Code", "Name", "Sector", "Score", "Chg%", "Tags"
    );
    println!("{}", "-".repeat(80));
    for c in &r.candidates {
        println!(
            "{:>4} {:<8} {:<20} {:<14} {:>6.1} {:>8.2}  {}",
            c.rank,
            c.code,
            c.name,
            c.sector,
            c.score,
            c.change_rate,
            c.tags.join(",")
        );
    }
    if let Some(summary) = &output.validation {
        print_validation(summary);
    } else {
        println!();
    }
}

fn print_overview(overview: &MarketOverview) {
    let regime = &overview.regime_recommendation;
    println!();
    println!("=== Market Overview ===");
    println!(
        "Breadth:    {} up / {} steady / {} down",
        overview.up, overview.steady, overview.down
    );
    for index in &overview.indices {
        println!(
            "{:<10} {:<8} {:>10.2} {:>7.2}%",
            index.symbol, index.name, index.value, index.change_rate
        );
    }
    for warning in &overview.warnings {
        println!("WARNING: {}", warning.message);
    }
    println!();
    println!("--- Regime ---");
    println!("Regime:     {} ({})", regime.regime, regime.label);
    println!("Confidence: {:.1}", regime.confidence);
    println!(
        "Weights:    return {:.2} / stability {:.2} / market {:.2}",
        regime.suggested_weights.ret,
        regime.suggested_weights.stability,
        regime.suggested_weights.market
    );
    println!("Reason:     {}", regime.reason);
    println!();
}

fn print_validation(summary: &ValidationSummary) {
    let m = &summary.metrics;
    println!();
    println!("=== Walk-Forward Validation ===");
    println!("Strategy:   {} as of {}", summary.strategy, summary.as_of_date);
    println!(
        "Gate:       {} ({} mode, passed: {})",
        summary.gate_status, summary.mode, summary.gate_passed
    );
    if summary.insufficient_data {
        println!("Data:       INSUFFICIENT");
    }
    if let Some(note) = &summary.note {
        println!("Note:       {note}");
    }
    println!("Penalty:    {:.2}", summary.validation_penalty);
    println!();
    println!("--- Metrics ---");
    println!("Net Sharpe:   {:.4}", m.net_sharpe);
    println!("Max Drawdown: {:.2}%", m.max_drawdown);
    println!("Hit Rate:     {:.2}%", m.hit_rate);
    println!("Turnover:     {:.2}%", m.turnover);
    println!("PBO:          {:.4}", m.pbo);
    println!("DSR:          {:.4}", m.dsr);
    println!("Samples:      {}", m.sample_size);
    if let Some(cmp) = &summary.branch_comparison {
        println!();
        println!("--- Branches ---");
        println!(
            "baseline  sharpe {:>8.4}  pbo {:.4}  {}",
            cmp.baseline.net_sharpe, cmp.baseline.pbo, cmp.baseline.gate_status
        );
        println!(
            "phase2    sharpe {:>8.4}  pbo {:.4}  {}",
            cmp.phase2.net_sharpe, cmp.phase2.pbo, cmp.phase2.gate_status
        );
        println!("Recommended: {}", cmp.recommended_branch);
    }
    for alert in &summary.monitoring.alerts {
        println!("ALERT: {alert}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use scorelab_core::domain::GateStatus;

    fn synthetic_args() -> DataArgs {
        DataArgs {
            data_dir: None,
            synthetic: true,
            seed: 7,
            universe: None,
            codes: Vec::new(),
            config: None,
            validation_config: None,
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_score_command() {
        let cli = Cli::try_parse_from([
            "scorelab",
            "score",
            "--strategy",
            "intraday",
            "--weights",
            "0.5,0.3,0.2",
            "--exposure-cap",
            "5:2",
            "--synthetic",
            "--codes",
            "005930,000660",
        ])
        .unwrap();
        match cli.command {
            Commands::Score {
                strategy,
                weights,
                exposure_cap,
                data,
                ..
            } => {
                assert_eq!(strategy.as_deref(), Some("intraday"));
                assert_eq!(weights.as_deref(), Some("0.5,0.3,0.2"));
                assert_eq!(exposure_cap.as_deref(), Some("5:2"));
                assert!(data.synthetic);
                assert_eq!(data.codes, vec!["005930", "000660"]);
            }
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn weights_allow_missing_components() {
        let w = parse_weights("0.5, ,0.2").unwrap();
        assert_eq!(w.ret, Some(0.5));
        assert_eq!(w.stability, None);
        assert_eq!(w.market, Some(0.2));
        assert!(parse_weights("0.5,0.5").is_err());
        assert!(parse_weights("a,b,c").is_err());
    }

    #[test]
    fn exposure_cap_parsing() {
        let cap = parse_exposure_cap("5:2").unwrap();
        assert_eq!((cap.top_n, cap.max_per_sector), (5, 2));
        assert!(parse_exposure_cap("5").is_err());
        assert!(parse_exposure_cap("0:2").is_err());
    }

    #[test]
    fn dates_and_clock_parse() {
        assert_eq!(
            parse_opt_date(Some("2024-06-14")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 14)
        );
        assert!(parse_opt_date(Some("14/06/2024")).is_err());
        assert_eq!(parse_opt_date(None).unwrap(), None);
        assert_eq!(parse_now(Some("2024-06-14T10:30")).unwrap(), at("2024-06-14T10:30"));
    }

    #[test]
    fn data_source_requires_exactly_one_option() {
        let now = at("2024-06-14T10:30");
        let mut args = synthetic_args();
        args.synthetic = false;
        assert!(DataSource::open(&args, now).is_err());

        args.data_dir = Some(PathBuf::from("."));
        args.synthetic = true;
        assert!(DataSource::open(&args, now).is_err());

        args.data_dir = Some(PathBuf::from("/nonexistent/scorelab"));
        args.synthetic = false;
        assert!(DataSource::open(&args, now).is_err());
    }

    #[test]
    fn score_resolves_branch_and_attaches_validation() {
        let now = at("2024-06-14T10:30");
        let mut ws = Workspace::load(&synthetic_args(), now).unwrap();
        ws.validation.monitoring.enabled = false;

        let opts = ScoreOptions {
            strategy: Some(StrategyKind::Intraday),
            date: None,
            now,
            weights: None,
            diversify: true,
            exposure_cap: None,
            branch: Some(IntradayBranch::Baseline),
            validate: true,
        };
        let output = score(&ws, &opts).unwrap();
        assert_eq!(output.strategy_reason, "explicit:intraday");
        assert_eq!(output.branch.map(|s| s.branch), Some(IntradayBranch::Baseline));
        assert_eq!(output.response.session_date, now.date());
        assert!(!output.response.candidates.is_empty());

        let summary = output.validation.as_ref().unwrap();
        assert_eq!(summary.strategy, StrategyKind::Intraday);
        for c in &output.response.candidates {
            assert_eq!(c.validation.as_ref().map(|v| v.gate_status), Some(summary.gate_status));
        }
    }

    #[test]
    fn intraday_is_unavailable_for_past_sessions() {
        let ws = Workspace::load(&synthetic_args(), at("2024-06-14T10:30")).unwrap();
        let opts = ScoreOptions {
            strategy: Some(StrategyKind::Intraday),
            date: NaiveDate::from_ymd_opt(2024, 6, 12),
            now: at("2024-06-14T10:30"),
            weights: None,
            diversify: false,
            exposure_cap: None,
            branch: None,
            validate: false,
        };
        assert!(score(&ws, &opts).is_err());
    }

    #[test]
    fn close_default_on_past_date() {
        let now = at("2024-06-14T10:30");
        let ws = Workspace::load(&synthetic_args(), now).unwrap();
        let opts = ScoreOptions {
            strategy: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 12),
            now,
            weights: None,
            diversify: false,
            exposure_cap: None,
            branch: None,
            validate: false,
        };
        let output = score(&ws, &opts).unwrap();
        assert_eq!(output.response.strategy, StrategyKind::Close);
        assert!(output.branch.is_none());
        assert!(output.validation.is_none());
    }

    #[test]
    fn overview_counts_every_candidate() {
        let ws = Workspace::load(&synthetic_args(), at("2024-06-14T10:30")).unwrap();
        let overview = overview(&ws, NaiveDate::from_ymd_opt(2024, 6, 15)).unwrap();
        let total = overview.up + overview.steady + overview.down;
        assert!(total > 0);
        assert!((25.0..=95.0).contains(&overview.regime_recommendation.confidence));
    }

    #[test]
    fn disabled_strategy_validation_warns() {
        let ws = Workspace::load(&synthetic_args(), at("2024-06-14T10:30")).unwrap();
        let scorer = ws.scorer();
        let mut config = ws.validation.clone();
        config.monitoring.enabled = false;
        let validator = WalkForwardValidator::for_scorer(&scorer, config);
        let summary = validator
            .run(
                StrategyKind::Close,
                &ws.universe,
                &ValidationParams::default(),
                NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            )
            .unwrap();
        assert!(summary.insufficient_data);
        assert_eq!(summary.gate_status, GateStatus::Warn);
    }
}
