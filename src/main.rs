//! codepool CLI: issue, redeem and score single-use codes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use codepool::assign;
use codepool::audit;
use codepool::code::UNSET_SCORE;
use codepool::config::PoolConfig;
use codepool::error::CodePoolError;
use codepool::pool::CodeState;
use codepool::store::CodeStore;

#[derive(Parser)]
#[command(name = "codepool", version, about = "Single-use redemption codes with realism scores")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pool file (overrides the config file).
    #[arg(long, global = true)]
    pool: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new pool of codes.
    Init {
        /// Number of codes to issue (defaults to the config's `total`).
        #[arg(long)]
        total: Option<usize>,

        /// Overwrite an existing pool file.
        #[arg(long)]
        force: bool,
    },

    /// Redeem a code.
    Redeem {
        code: String,
    },

    /// Show the realism score of a code.
    Score {
        code: String,
    },

    /// Rate a code from 1 to 5.
    Rate {
        code: String,
        #[arg(value_parser = clap::value_parser!(i32).range(1..=5))]
        score: i32,
    },

    /// Show redemption statistics.
    Stats,

    /// List every code with its state and score.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Pair recipients (one per line) with unredeemed codes.
    Assign {
        #[arg(long)]
        recipients: PathBuf,
    },

    /// Report pool codes that appear in a server log.
    Audit {
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Serialize)]
struct CodeListing {
    code: String,
    state: CodeState,
    score: Option<i32>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PoolConfig::load_or_default(cli.config.as_deref())?;
    if let Some(pool) = cli.pool {
        config.path = pool;
    }

    match cli.command {
        Commands::Init { total, force } => {
            if config.path.exists() && !force {
                miette::bail!(
                    help = "Pass --force to replace it; every issued code will stop working.",
                    "pool file {} already exists",
                    config.path.display()
                );
            }
            let total = total.unwrap_or(config.total);
            let store = CodeStore::create(&config.path, total).map_err(CodePoolError::from)?;
            println!("Issued {total} codes into {}", store.path().display());
        }

        Commands::Redeem { code } => {
            let store = open(&config)?;
            if store.redeem(&code).map_err(CodePoolError::from)?.is_success() {
                println!("redeemed {code}");
            } else {
                println!("code does not exist or has been redeemed already");
            }
        }

        Commands::Score { code } => {
            let store = open(&config)?;
            match store.score(&code).map_err(CodePoolError::from)? {
                UNSET_SCORE => println!("{code}: unrated"),
                score => println!("{code}: {score}"),
            }
        }

        Commands::Rate { code, score } => {
            let store = open(&config)?;
            store.set_score(&code, score).map_err(CodePoolError::from)?;
            println!("set score for {code} to {score}");
        }

        Commands::Stats => {
            let store = open(&config)?;
            let pool = store.snapshot().map_err(CodePoolError::from)?;
            println!("Pool:         {}", store.path().display());
            println!("Total:        {}", pool.total);
            println!("Clicks:       {}", pool.clicks);
            match store.clickthrough() {
                Ok(ratio) => println!("Clickthrough: {:.1}%", ratio * 100.0),
                Err(e) => println!("Clickthrough: n/a ({e})"),
            }
            let rated: Vec<i32> = pool
                .realism_scores
                .values()
                .copied()
                .filter(|s| *s != UNSET_SCORE)
                .collect();
            if !rated.is_empty() {
                let mean = rated.iter().map(|s| f64::from(*s)).sum::<f64>() / rated.len() as f64;
                println!("Rated:        {} (mean {mean:.2})", rated.len());
            }
        }

        Commands::List { json } => {
            let store = open(&config)?;
            let pool = store.snapshot().map_err(CodePoolError::from)?;
            let listing: Vec<CodeListing> = pool
                .codes
                .keys()
                .map(|code| CodeListing {
                    code: code.to_string(),
                    state: pool.state(code.as_str()),
                    score: pool.score(code.as_str()).filter(|s| *s != UNSET_SCORE),
                })
                .collect();
            if json {
                let out = serde_json::to_string_pretty(&listing).into_diagnostic()?;
                println!("{out}");
            } else {
                for entry in &listing {
                    let score = entry
                        .score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!("{}  {:<8}  {score}", entry.code, format!("{:?}", entry.state));
                }
            }
        }

        Commands::Assign { recipients } => {
            let store = open(&config)?;
            let recipients = assign::read_recipients(&recipients).map_err(CodePoolError::from)?;
            let pool = store.snapshot().map_err(CodePoolError::from)?;
            for a in assign::pair(&recipients, &pool).map_err(CodePoolError::from)? {
                println!("{} {}", a.recipient, a.code);
            }
        }

        Commands::Audit { log } => {
            let store = open(&config)?;
            let pool = store.snapshot().map_err(CodePoolError::from)?;
            let found = audit::scan_file(&log, &pool).map_err(CodePoolError::from)?;
            for code in &found {
                println!("{code}");
            }
            println!("{}", found.len());
        }
    }

    Ok(())
}

fn open(config: &PoolConfig) -> Result<CodeStore> {
    Ok(CodeStore::open(&config.path).map_err(CodePoolError::from)?)
}
