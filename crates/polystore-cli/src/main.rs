//! polystore CLI - configure, initialize, export, import and migrate the store.

use clap::{Parser, Subcommand};
use polystore::{
    export_snapshot, import_snapshot, initialize_schema, migrate, open, Adapter, ConfigManager,
    DatabaseConfig, ImportMode, Provider, Snapshot, StoreError,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "polystore")]
#[command(about = "Provider-agnostic persistence: schema, snapshots and migration")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "POLYSTORE_CONFIG", default_value = "polystore.json")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Create tables, additive columns and indexes on the active provider
    Init,

    /// Write every table of the active provider to a snapshot file
    Export {
        /// Snapshot file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load a snapshot file into the active provider
    Import {
        /// Snapshot file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Import mode: replace or append
        #[arg(long, default_value = "replace")]
        mode: String,

        /// Import into this provider instead of the active one
        #[arg(long)]
        provider: Option<String>,
    },

    /// Copy all data from one configured provider to another
    Migrate {
        /// Target provider
        #[arg(long)]
        to: String,

        /// Source provider [default: the active provider]
        #[arg(long)]
        from: Option<String>,

        /// Import mode: replace or append
        #[arg(long, default_value = "replace")]
        mode: String,

        /// Make the target the active provider after a successful migration
        #[arg(long)]
        activate: bool,
    },

    /// Test the connection to the active provider
    HealthCheck,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration without passwords
    Show,

    /// Merge a JSON patch into the configuration; empty passwords keep the stored one
    Set {
        /// JSON object, e.g. '{"provider":"postgres","postgres":{"host":"db"}}'
        patch: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), StoreError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let manager = ConfigManager::new(&cli.config);
    let config = manager.load();
    info!("Loaded configuration from {:?}", manager.path());

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&manager.public_config())?);
            }
            ConfigAction::Set { patch } => {
                let patch: Value = serde_json::from_str(&patch).map_err(|e| {
                    StoreError::validation(format!("configuration patch is not valid JSON: {}", e))
                })?;
                if !patch.is_object() {
                    return Err(StoreError::validation(
                        "configuration patch must be a JSON object",
                    ));
                }
                manager.update(&patch)?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&manager.public_config())?);
                } else {
                    println!("Configuration saved to {}", manager.path().display());
                }
            }
        },

        Commands::Init => {
            let mut adapter = open(&config).await?;
            let result = initialize_schema(&mut adapter).await;
            let closed = adapter.close().await;
            let report = result?;
            closed?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Schema initialized on {}", config.describe());
                println!("  Tables: {}", report.tables);
                for step in report.columns.iter().chain(&report.indexes) {
                    println!("  {}: {:?}", step.name, step.outcome);
                }
            }
        }

        Commands::Export { output } => {
            let snapshot = export_snapshot(&config).await?;
            std::fs::write(&output, serde_json::to_string_pretty(&snapshot)?)?;

            if cli.output_json {
                println!("{}", json!({ "output": output, "rows": snapshot.row_count() }));
            } else {
                println!(
                    "Exported {} row(s) from {} to {}",
                    snapshot.row_count(),
                    snapshot.source,
                    output.display()
                );
            }
        }

        Commands::Import {
            input,
            mode,
            provider,
        } => {
            let mode: ImportMode = mode.parse()?;
            let target = match provider {
                Some(tag) => config.with_provider(Provider::parse(&tag)?),
                None => config,
            };
            let snapshot = Snapshot::from_json(&std::fs::read_to_string(&input)?)?;
            let report = import_snapshot(&target, &snapshot, mode).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Imported {} row(s) into {} ({} mode)",
                    report.total_inserted(),
                    target.describe(),
                    mode
                );
                for table in &report.tables {
                    println!(
                        "  {}: {} inserted, {} skipped",
                        table.table, table.inserted, table.skipped
                    );
                }
            }
        }

        Commands::Migrate {
            to,
            from,
            mode,
            activate,
        } => {
            let mode: ImportMode = mode.parse()?;
            let source = match from {
                Some(tag) => config.with_provider(Provider::parse(&tag)?),
                None => config.clone(),
            };
            let target = config.with_provider(Provider::parse(&to)?);

            let started = Instant::now();
            let report = migrate(&source, &target, mode).await?;

            if activate {
                manager.save(&target)?;
                info!("Active provider is now {}", target.provider);
            }

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nMigration completed!");
                println!("  From: {}", source.describe());
                println!("  To: {}", target.describe());
                println!("  Mode: {}", mode);
                println!("  Rows: {}", report.import.total_inserted());
                println!("  Duration: {:.2}s", started.elapsed().as_secs_f64());
                if activate {
                    println!("  Active provider: {}", target.provider);
                }
            }
        }

        Commands::HealthCheck => {
            let result = health_check(&config).await;

            if cli.output_json {
                let body = match &result {
                    Ok(latency_ms) => json!({
                        "provider": config.provider,
                        "healthy": true,
                        "latencyMs": latency_ms,
                    }),
                    Err(e) => json!({
                        "provider": config.provider,
                        "healthy": false,
                        "error": e.public_message(),
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Health Check Results:");
                match &result {
                    Ok(latency_ms) => {
                        println!("  {}: OK ({}ms)", config.describe(), latency_ms)
                    }
                    Err(e) => println!("  {}: FAILED\n    Error: {}", config.describe(), e),
                }
            }

            result?;
        }
    }

    Ok(())
}

/// Open, run a trivial query and close. Returns the round-trip latency.
async fn health_check(config: &DatabaseConfig) -> Result<u128, StoreError> {
    let started = Instant::now();
    let mut adapter = open(config).await?;
    let probe = adapter.get("SELECT 1 AS ok", &[]).await;
    let closed = adapter.close().await;
    probe?;
    closed?;
    Ok(started.elapsed().as_millis())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries command output
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
