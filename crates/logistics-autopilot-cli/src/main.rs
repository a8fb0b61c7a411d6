//! logistics-autopilot: run automation cycles against the game from the
//! command line.

mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use logistics_autopilot::{Autopilot, AutopilotConfig, Domain, EntityId};

#[derive(Parser)]
#[command(
    name = "logistics-autopilot",
    about = "Headless autopilot for the Logitycoon logistics game",
    version,
    after_help = "Run 'logistics-autopilot <command> --help' for details on each command."
)]
struct Cli {
    /// Path to a TOML config file.
    /// Also reads LOGISTICS_AUTOPILOT_CONFIG.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cycle per domain, in the order given.
    Run {
        /// employees, garage, fuel, trips, freight or warehouse.
        #[arg(required = true)]
        domains: Vec<Domain>,
    },

    /// Run every domain that can act: employees, garage, fuel, trips, freight.
    RunAll,

    /// Press the pending buttons of specific freights.
    Freight {
        /// Freight ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Extract records from a saved page without touching the network.
    Extract {
        domain: Domain,

        /// Saved HTML page.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the effective configuration as TOML.
    Config,

    /// Generate shell completion scripts.
    ///
    /// Example:
    ///   logistics-autopilot completions bash > ~/.local/share/bash-completion/completions/logistics-autopilot
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Cancel in-flight chains on Ctrl-C.
fn cancel_on_ctrl_c(autopilot: &Autopilot) {
    let token = autopilot.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight actions");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = run(&cli).await;

    // 0 = every cycle ran, 1 = error or an aborted cycle
    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if cli.json {
                output::print_json(&serde_json::json!({
                    "error": true,
                    "message": format!("{e:#}"),
                }));
            } else {
                eprintln!("  Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}

/// Run the selected command. `Ok(false)` when a cycle could not run.
async fn run(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "logistics-autopilot", &mut std::io::stdout());
            Ok(true)
        }
        Commands::Config => {
            let mut config = load_config(cli)?;
            if config.session_cookie.is_some() {
                config.session_cookie = Some("<redacted>".into());
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
        Commands::Extract { domain, file } => {
            let html = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let autopilot = Autopilot::new(load_config(cli)?)?;
            output::print_json(&autopilot.extract_page(*domain, &html));
            Ok(true)
        }
        Commands::Run { domains } => run_domains(cli, domains).await,
        Commands::RunAll => run_domains(cli, &Domain::ACTING).await,
        Commands::Freight { ids } => {
            let ids = ids
                .iter()
                .map(|raw| {
                    EntityId::parse(raw)
                        .with_context(|| format!("'{raw}' is not a numeric freight id"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let autopilot = Autopilot::new(load_config(cli)?)?;
            cancel_on_ctrl_c(&autopilot);
            let report = autopilot.run_freight(&ids).await;
            let ok = report.error.is_none();
            output::print_reports(&[report], cli.json);
            Ok(ok)
        }
    }
}

async fn run_domains(cli: &Cli, domains: &[Domain]) -> anyhow::Result<bool> {
    let autopilot = Autopilot::new(load_config(cli)?)?;
    cancel_on_ctrl_c(&autopilot);

    let mut reports = Vec::with_capacity(domains.len());
    for domain in domains {
        if autopilot.shutdown_token().is_cancelled() {
            break;
        }
        reports.push(autopilot.run_cycle(*domain).await);
    }

    let ok = reports.iter().all(|r| r.error.is_none());
    output::print_reports(&reports, cli.json);
    Ok(ok)
}

fn load_config(cli: &Cli) -> anyhow::Result<AutopilotConfig> {
    AutopilotConfig::resolve(cli.config.as_deref()).context("loading configuration")
}
