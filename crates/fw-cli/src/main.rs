use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use clap::{Parser, Subcommand};
use fw_config::{load_layered_yaml, paths_from_env, resolve_secrets, LoadedConfig, MonitorConfig, SecretRequirement};
use fw_probe::{ExistenceProbe, ProbeOutcome, RemoteProber, SftpConnector};
use fw_reconcile::{canonical_filename, ChangeEvent, FeedType};
use fw_runtime::{generate_day, run_pass, ChangeSink, PassSettings, PgDeliveryStore};

#[derive(Parser)]
#[command(name = "fw")]
#[command(about = "File-arrival watch CLI", long_about = None)]
struct Cli {
    /// Config paths in merge order (default: FW_CONFIG, else config/base.yaml)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash,

    /// Expected-delivery schedule commands
    Schedule {
        #[command(subcommand)]
        cmd: ScheduleCmd,
    },

    /// Probe the remote source for one slot and print the outcome
    Probe {
        /// Feed type (metar, synop, buoy, ship, ...)
        #[arg(long)]
        feed: String,

        /// Slot instant, RFC 3339 (e.g. 2024-01-01T05:00:00Z)
        #[arg(long)]
        at: String,
    },

    /// Run one reconciliation pass and print every status change
    Pass {
        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ScheduleCmd {
    /// Upsert every slot of a day (default: today, UTC). Existing rows keep their status.
    Seed {
        /// YYYY-MM-DD
        #[arg(long)]
        day: Option<String>,
    },
}

/// Prints each change event as one JSON line.
struct StdoutSink;

impl ChangeSink for StdoutSink {
    fn publish(&self, event: &ChangeEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("failed to encode change event: {err}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = fw_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = fw_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_deliveries_table={}",
                        s.ok, s.has_deliveries_table
                    );
                }
                DbCmd::Migrate => {
                    fw_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash => {
            let loaded = load_config(&cli.config_paths)?;
            loaded.monitor()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Schedule { cmd } => match cmd {
            ScheduleCmd::Seed { day } => {
                let cfg = load_config(&cli.config_paths)?.monitor()?;
                let day = match day {
                    Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .with_context(|| format!("invalid --day '{d}'; expected YYYY-MM-DD"))?,
                    None => Utc::now().date_naive(),
                };

                let store = pg_store().await?;
                let report = generate_day(&store, &cfg.feed_schedules()?, day).await;
                println!(
                    "day={} inserted={} existing={} failed={}",
                    report.day, report.inserted, report.existing, report.failed
                );
                if report.failed > 0 {
                    anyhow::bail!("{} slot(s) failed to upsert", report.failed);
                }
            }
        },

        Commands::Probe { feed, at } => {
            let at = parse_instant(&at)?;
            let feed = FeedType::from_name(&feed);
            let cfg = load_config(&cli.config_paths)?.monitor()?;
            let base_path = cfg
                .base_path()
                .context("remote.base_path is not configured")?;

            let prober = remote_prober(&cfg)?;
            let outcome = prober.probe(&base_path, &feed, at).await;
            println!(
                "feed_type={} timestamp={} canonical={}",
                feed,
                at.to_rfc3339(),
                canonical_filename(&feed, at.hour())
            );
            match outcome {
                ProbeOutcome::Found { path } => println!("found=true path={path}"),
                ProbeOutcome::Absent { tried } => println!("found=false tried={tried}"),
                ProbeOutcome::Unreachable { error } => {
                    println!("found=false unreachable=true");
                    anyhow::bail!("remote unreachable: {error}");
                }
            }
        }

        Commands::Pass { at } => {
            let now = match at {
                Some(s) => parse_instant(&s)?,
                None => Utc::now(),
            };
            let cfg = load_config(&cli.config_paths)?.monitor()?;
            let store = pg_store().await?;
            let prober = remote_prober(&cfg)?;
            let settings = PassSettings {
                base_path: cfg.base_path(),
                policy: cfg.delay_policy(),
            };

            let report = run_pass(&store, &prober, &StdoutSink, &settings, now).await?;
            eprintln!(
                "due={} probed={} transitions={} persist_failures={} superseded={}",
                report.due, report.probed, report.transitions, report.persist_failures, report.superseded
            );
        }
    }

    Ok(())
}

fn load_config(explicit: &[String]) -> Result<LoadedConfig> {
    let paths = if explicit.is_empty() {
        paths_from_env()
    } else {
        explicit.to_vec()
    };
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    load_layered_yaml(&refs)
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid instant '{s}'; expected RFC 3339"))?
        .with_timezone(&Utc))
}

async fn pg_store() -> Result<PgDeliveryStore> {
    let pool = fw_db::connect_from_env().await?;
    Ok(PgDeliveryStore::new(pool))
}

fn remote_prober(cfg: &MonitorConfig) -> Result<RemoteProber<SftpConnector>> {
    let secrets = resolve_secrets(cfg, SecretRequirement::RemoteRequired)?;
    let connector = SftpConnector::new(
        cfg.remote_host()?,
        cfg.remote.port,
        secrets.remote_username.unwrap_or_default(),
        secrets.remote_password.unwrap_or_default(),
        cfg.connect_timeout(),
    );
    Ok(RemoteProber::new(connector))
}
