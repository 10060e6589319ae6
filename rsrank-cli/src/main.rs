//! RS Rank CLI — ranking, market board, download and cache commands.
//!
//! Commands:
//! - `rank`: rank a market's universe against its index and publish the snapshot
//! - `quotes`: build the market board of yields, indices, futures and FX
//! - `download`: warm the Parquet cache for a market or explicit symbols
//! - `cache status`: report cached symbols, ranges and sizes
//! - `universe`: print a market's universe, or its full config as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rsrank_core::data::{
    download_symbols, CachedProvider, CircuitBreaker, DataProvider, ParquetCache,
    SyntheticProvider, YahooProvider,
};
use rsrank_runner::quotes::render_board;
use rsrank_runner::{
    build_board, build_sink, default_instruments, load_names, publish, render_ranking,
    run_ranking, PublishConfig, RankingConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rsrank",
    about = "RS Rank — relative-strength stock ranking against a market index"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where prices come from.
#[derive(Args, Clone)]
struct SourceArgs {
    /// Offline mode: read the Parquet cache only, no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use deterministic synthetic prices instead of real data.
    #[arg(long, default_value_t = false, conflicts_with = "offline")]
    synthetic: bool,

    /// Cache directory. Defaults to ./data.
    #[arg(long, default_value = "data")]
    cache_dir: PathBuf,
}

/// Which market to work on.
#[derive(Args, Clone)]
struct MarketArgs {
    /// Built-in market preset: kr or us.
    #[arg(long, default_value = "us")]
    market: String,

    /// Path to a TOML config file (overrides --market).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a market's universe and publish the snapshot.
    Rank {
        #[command(flatten)]
        market: MarketArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Last trading date to rank on (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Also write the snapshot to `<dir>/<key>.json`.
        #[arg(long)]
        mirror_dir: Option<PathBuf>,

        /// Rank and report only; publish nothing.
        #[arg(long, default_value_t = false)]
        no_publish: bool,

        /// Print the snapshot JSON instead of the table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Build and publish the market board.
    Quotes {
        /// TOML config whose [publish] section is used.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        /// Document key of the board.
        #[arg(long, default_value = "global_indices")]
        key: String,

        /// Also write the board to `<dir>/<key>.json`.
        #[arg(long)]
        mirror_dir: Option<PathBuf>,

        /// Print only; publish nothing.
        #[arg(long, default_value_t = false)]
        no_publish: bool,
    },
    /// Download closes into the Parquet cache.
    Download {
        /// Symbols to download. Defaults to the market's index and universe.
        symbols: Vec<String>,

        #[command(flatten)]
        market: MarketArgs,

        /// Start date (YYYY-MM-DD). Defaults to the ranking lookback.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print a market's universe.
    Universe {
        #[command(flatten)]
        market: MarketArgs,

        /// Print the whole market config as TOML, ready to edit.
        #[arg(long, default_value_t = false)]
        toml: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges and sizes.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank {
            market,
            source,
            end,
            mirror_dir,
            no_publish,
            json,
        } => run_rank_cmd(&market, &source, end, mirror_dir, no_publish, json),
        Commands::Quotes {
            config,
            source,
            key,
            mirror_dir,
            no_publish,
        } => run_quotes_cmd(config, &source, &key, mirror_dir, no_publish),
        Commands::Download {
            symbols,
            market,
            start,
            end,
            force,
            cache_dir,
        } => run_download(symbols, &market, start, end, force, cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
        Commands::Universe { market, toml } => run_universe(&market, toml),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn load_config(args: &MarketArgs) -> Result<RankingConfig> {
    if let Some(path) = &args.config {
        return RankingConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match RankingConfig::preset(&args.market) {
        Some(config) => Ok(config),
        None => bail!("unknown market '{}' (expected kr or us)", args.market),
    }
}

/// Run `f` against the provider the source flags select.
fn with_provider<R>(source: &SourceArgs, f: impl FnOnce(&dyn DataProvider) -> R) -> Result<R> {
    if source.synthetic {
        warn!("using synthetic prices; results are not real market data");
        return Ok(f(&SyntheticProvider::default()));
    }
    let cache = ParquetCache::new(&source.cache_dir);
    if source.offline {
        return Ok(f(&CachedProvider::offline(&cache)));
    }
    let yahoo = YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    Ok(f(&CachedProvider::new(&yahoo, &cache)))
}

fn run_rank_cmd(
    market: &MarketArgs,
    source: &SourceArgs,
    end: Option<String>,
    mirror_dir: Option<PathBuf>,
    no_publish: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(market)?;
    let end = parse_date(end.as_deref())?.unwrap_or_else(today);
    let names = load_names(&config);
    let generated_at = chrono::Local::now().naive_local();

    let run = with_provider(source, |provider| {
        run_ranking(&config, provider, &names, end, generated_at)
    })??;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.outcome.snapshot)?);
    } else {
        print!(
            "{}",
            render_ranking(
                &config.market.name,
                &run.outcome.snapshot,
                &run.outcome.index_returns,
                &config.ranking
            )
        );
    }
    for d in &run.dropped {
        info!(code = %d.code, kind = %d.kind, "not ranked");
    }

    if no_publish {
        return Ok(());
    }
    if run.has_synthetic && mirror_dir.is_none() {
        warn!("synthetic run: skipping publication (pass --mirror-dir to write locally)");
        return Ok(());
    }
    let publish_config = if run.has_synthetic {
        PublishConfig::default()
    } else {
        config.publish.clone()
    };

    // A failed publication is logged; the ranking itself succeeded.
    match build_sink(&publish_config, mirror_dir.as_deref()) {
        Ok(Some(sink)) => {
            publish(sink.as_ref(), &config.market.sink_key, &run.outcome.snapshot);
        }
        Ok(None) => info!("no publication target configured"),
        Err(e) => error!(error = %e, "publication sink unavailable"),
    }
    Ok(())
}

fn run_quotes_cmd(
    config: Option<PathBuf>,
    source: &SourceArgs,
    key: &str,
    mirror_dir: Option<PathBuf>,
    no_publish: bool,
) -> Result<()> {
    let publish_config = match &config {
        Some(path) => RankingConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?
            .publish,
        None => PublishConfig::default(),
    };
    let instruments = default_instruments();
    let generated_at = chrono::Local::now().naive_local();

    let board = with_provider(source, |provider| {
        build_board(provider, &instruments, today(), generated_at)
    })?;
    print!("{}", render_board(&board, &instruments));

    if no_publish {
        return Ok(());
    }
    match build_sink(&publish_config, mirror_dir.as_deref()) {
        Ok(Some(sink)) => {
            publish(sink.as_ref(), key, &board);
        }
        Ok(None) => info!("no publication target configured"),
        Err(e) => error!(error = %e, "publication sink unavailable"),
    }
    Ok(())
}

fn run_download(
    symbols: Vec<String>,
    market: &MarketArgs,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let end_date = parse_date(end.as_deref())?.unwrap_or_else(today);

    let (symbols, default_start) = if symbols.is_empty() {
        let config = load_config(market)?;
        let mut all = vec![config.market.index_symbol.clone()];
        all.extend(config.universe.codes().map(|c| config.market.provider_symbol(c)));
        (all, config.ranking.lookback_start(end_date))
    } else {
        let lookback = rsrank_core::RankingParams::reference().lookback_start(end_date);
        (symbols, lookback)
    };
    let start_date = parse_date(start.as_deref())?.unwrap_or(default_start);

    let provider = YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?;
    let cache = ParquetCache::new(cache_dir);
    let sym_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

    let summary = download_symbols(&provider, &cache, &sym_refs, start_date, end_date, force);

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        bail!("{} of {} downloads failed", summary.failed(), summary.total);
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let entries = cache.entries();
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let rows: Vec<(String, String, usize, u64)> = entries
        .iter()
        .map(|meta| {
            let dir = cache_dir.join(format!("symbol={}", meta.symbol));
            (
                meta.symbol.clone(),
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.point_count,
                dir_size(&dir),
            )
        })
        .collect();
    let total_size: u64 = rows.iter().map(|r| r.3).sum();

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<12} {:<25} {:>8} {:>10}", "Symbol", "Date Range", "Closes", "Size");
    println!("{}", "-".repeat(58));
    for (sym, range, count, size) in &rows {
        println!("{sym:<12} {range:<25} {count:>8} {:>10}", format_size(*size));
    }

    Ok(())
}

fn run_universe(market: &MarketArgs, toml: bool) -> Result<()> {
    let config = load_config(market)?;
    if toml {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    println!(
        "Market: {} (index {}, {} members)",
        config.market.name,
        config.market.index_symbol,
        config.universe.len()
    );
    for m in &config.universe.members {
        println!(
            "{:<10} {:<32} {}",
            config.market.provider_symbol(&m.code),
            m.name,
            m.sector.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
