use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pd_runners::config::{Config, ENV_LOG};
use pd_runners::{Client, ListRunnersOptions, RunnerType};

mod commands;

use commands::RunnerArgs;

#[derive(Parser, Debug)]
#[command(name="pd-runners", version, about="Manage PagerDuty automation actions runners")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose logs
    #[arg(short, long, global = true)]
    verbose: bool,
    /// API base URL (defaults to $PAGERDUTY_API_URL, then https://api.pagerduty.com)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// API token (defaults to $PAGERDUTY_TOKEN, then stored credentials)
    #[arg(long, global = true)]
    token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a runner
    Get { id: String },
    /// Create a runner
    Create {
        #[command(flatten)]
        runner: RunnerFlags,
    },
    /// Update a runner
    Update {
        id: String,
        #[command(flatten)]
        runner: RunnerFlags,
    },
    /// Delete a runner
    Delete { id: String },
    /// List runners
    List {
        /// Only runners whose name contains this string
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Manage team access to a runner
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },
    /// Store the --token (and --api-url, if given) for later invocations
    Login,
    /// Remove stored credentials
    Logout,
}

#[derive(Subcommand, Debug)]
enum TeamCommands {
    /// Associate a team with a runner
    Add { runner_id: String, team_id: String },
    /// Dissociate a team from a runner
    Remove { runner_id: String, team_id: String },
    /// Show a runner's team association
    Show { runner_id: String, team_id: String },
}

#[derive(Args, Debug)]
struct RunnerFlags {
    #[arg(long)]
    name: String,
    /// sidecar | runbook
    #[arg(long)]
    runner_type: Option<RunnerType>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    runbook_base_uri: Option<String>,
    #[arg(long)]
    runbook_api_key: Option<String>,
    /// Team id with access to a sidecar runner (repeatable)
    #[arg(long = "team")]
    teams: Vec<String>,
    /// Privilege granted to a sidecar runner (repeatable)
    #[arg(long = "permission")]
    permissions: Vec<String>,
}

impl From<RunnerFlags> for RunnerArgs {
    fn from(f: RunnerFlags) -> Self {
        RunnerArgs {
            name: f.name,
            runner_type: f.runner_type,
            description: f.description,
            runbook_base_uri: f.runbook_base_uri,
            runbook_api_key: f.runbook_api_key,
            teams: f.teams,
            permissions: f.permissions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "pd_runners=debug,info" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var(ENV_LOG).unwrap_or_else(|_| filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { command, api_url, token, timeout, json, .. } = cli;
    let connect = || -> Result<Client> {
        let config = Config::resolve(api_url.clone(), token.clone(), timeout)?;
        if config.token.is_none() {
            tracing::warn!("no API token configured; requests will be unauthenticated");
        }
        Ok(Client::new(&config)?)
    };

    match command {
        Commands::Get { id } => commands::cmd_get(&connect()?, &id, json).await?,
        Commands::Create { runner } => commands::cmd_create(&connect()?, runner.into(), json).await?,
        Commands::Update { id, runner } => {
            commands::cmd_update(&connect()?, &id, runner.into(), json).await?
        }
        Commands::Delete { id } => commands::cmd_delete(&connect()?, &id).await?,
        Commands::List { name, limit } => {
            commands::cmd_list(&connect()?, ListRunnersOptions { name, limit }, json).await?
        }
        Commands::Team { command } => {
            let client = connect()?;
            match command {
                TeamCommands::Add { runner_id, team_id } => {
                    commands::cmd_team_associate(&client, &runner_id, &team_id).await?
                }
                TeamCommands::Remove { runner_id, team_id } => {
                    commands::cmd_team_dissociate(&client, &runner_id, &team_id).await?
                }
                TeamCommands::Show { runner_id, team_id } => {
                    commands::cmd_team_show(&client, &runner_id, &team_id).await?
                }
            }
        }
        Commands::Login => {
            let token = token.clone().context("--token is required to log in")?;
            commands::cmd_login(token, api_url.clone())?
        }
        Commands::Logout => commands::cmd_logout()?,
    }
    Ok(())
}
