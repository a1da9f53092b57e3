use anyhow::{Context, Result};

use pd_runners::config::{self, StoredCredentials};
use pd_runners::{AutomationActionsRunner, Client, ListRunnersOptions, RunnerType};

/// Fields accepted by `create` and `update`.
#[derive(Debug, Clone, Default)]
pub struct RunnerArgs {
    pub name: String,
    pub runner_type: Option<RunnerType>,
    pub description: Option<String>,
    pub runbook_base_uri: Option<String>,
    pub runbook_api_key: Option<String>,
    pub teams: Vec<String>,
    pub permissions: Vec<String>,
}

impl RunnerArgs {
    fn into_runner(self, runner_type: RunnerType) -> Result<AutomationActionsRunner> {
        let mut runner = AutomationActionsRunner::new(self.name, runner_type);
        runner.description = self.description;
        match runner_type {
            RunnerType::Runbook => {
                if !self.teams.is_empty() || !self.permissions.is_empty() {
                    anyhow::bail!("--team and --permission only apply to sidecar runners");
                }
                if let Some(uri) = self.runbook_base_uri {
                    runner = runner.with_runbook(uri, self.runbook_api_key);
                } else if self.runbook_api_key.is_some() {
                    anyhow::bail!("--runbook-api-key requires --runbook-base-uri");
                }
            }
            RunnerType::Sidecar => {
                if self.runbook_base_uri.is_some() || self.runbook_api_key.is_some() {
                    anyhow::bail!("--runbook-base-uri and --runbook-api-key only apply to runbook runners");
                }
                if !self.teams.is_empty() {
                    runner = runner.with_teams(self.teams);
                }
                if !self.permissions.is_empty() {
                    runner = runner.with_permissions(self.permissions);
                }
            }
        }
        Ok(runner)
    }
}

pub async fn cmd_get(client: &Client, id: &str, json: bool) -> Result<()> {
    let (runner, _) = client
        .automation_actions_runner()
        .get(id)
        .await
        .with_context(|| format!("fetching runner {id}"))?;
    print_runner(&runner, json)
}

pub async fn cmd_create(client: &Client, args: RunnerArgs, json: bool) -> Result<()> {
    let runner_type = args.runner_type.context("--runner-type is required")?;
    let input = args.into_runner(runner_type)?;
    let (runner, _) = client
        .automation_actions_runner()
        .create(&input)
        .await
        .context("creating runner")?;
    if !json {
        println!("✅ Runner created");
    }
    print_runner(&runner, json)
}

pub async fn cmd_update(client: &Client, id: &str, args: RunnerArgs, json: bool) -> Result<()> {
    let service = client.automation_actions_runner();
    // runner_type cannot change; take it from the server when not given
    let runner_type = match args.runner_type {
        Some(t) => t,
        None => {
            service
                .get(id)
                .await
                .with_context(|| format!("fetching runner {id}"))?
                .0
                .runner_type
        }
    };
    let input = args.into_runner(runner_type)?;
    let (runner, _) = service
        .update(id, &input)
        .await
        .with_context(|| format!("updating runner {id}"))?;
    if !json {
        println!("✅ Runner updated");
    }
    print_runner(&runner, json)
}

pub async fn cmd_delete(client: &Client, id: &str) -> Result<()> {
    client
        .automation_actions_runner()
        .delete(id)
        .await
        .with_context(|| format!("deleting runner {id}"))?;
    println!("🗑️  Runner {id} deleted");
    Ok(())
}

pub async fn cmd_list(client: &Client, opts: ListRunnersOptions, json: bool) -> Result<()> {
    let (list, _) = client
        .automation_actions_runner()
        .list(&opts)
        .await
        .context("listing runners")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list.runners)?);
        return Ok(());
    }
    if list.runners.is_empty() {
        println!("No runners found");
        return Ok(());
    }
    for runner in &list.runners {
        println!("{}", list_line(runner));
    }
    Ok(())
}

pub async fn cmd_team_associate(client: &Client, runner_id: &str, team_id: &str) -> Result<()> {
    client
        .automation_actions_runner()
        .associate_team(runner_id, team_id)
        .await
        .with_context(|| format!("associating team {team_id} with runner {runner_id}"))?;
    println!("✅ Team {team_id} associated with runner {runner_id}");
    Ok(())
}

pub async fn cmd_team_dissociate(client: &Client, runner_id: &str, team_id: &str) -> Result<()> {
    client
        .automation_actions_runner()
        .dissociate_team(runner_id, team_id)
        .await
        .with_context(|| format!("dissociating team {team_id} from runner {runner_id}"))?;
    println!("✅ Team {team_id} dissociated from runner {runner_id}");
    Ok(())
}

pub async fn cmd_team_show(client: &Client, runner_id: &str, team_id: &str) -> Result<()> {
    let (team, _) = client
        .automation_actions_runner()
        .get_team_association(runner_id, team_id)
        .await
        .with_context(|| format!("fetching team {team_id} of runner {runner_id}"))?;
    println!("Team {} ({}) is associated with runner {runner_id}", team.id, team.kind);
    Ok(())
}

pub fn cmd_login(token: String, api_url: Option<String>) -> Result<()> {
    let path = config::save_credentials(&StoredCredentials { token, api_url })?;
    println!("🔑 Credentials saved to: {}", path.display());
    Ok(())
}

pub fn cmd_logout() -> Result<()> {
    let path = config::creds_path()?;
    if !path.exists() {
        println!("ℹ️  No stored credentials. Already logged out.");
        return Ok(());
    }
    std::fs::remove_file(&path)?;
    println!("🗑️  Credentials removed from: {}", path.display());
    Ok(())
}

fn print_runner(runner: &AutomationActionsRunner, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(runner)?);
    } else {
        print!("{}", describe_runner(runner));
    }
    Ok(())
}

fn list_line(runner: &AutomationActionsRunner) -> String {
    format!(
        "{:<28} {:<8} {}",
        runner.id.as_deref().unwrap_or("-"),
        runner.runner_type,
        runner.name
    )
}

fn describe_runner(runner: &AutomationActionsRunner) -> String {
    let mut out = String::new();
    let mut field = |label: &str, value: &str| out.push_str(&format!("{label:<15} {value}\n"));

    field("ID:", runner.id.as_deref().unwrap_or("-"));
    field("Name:", &runner.name);
    field("Type:", runner.runner_type.as_str());
    if let Some(status) = &runner.status {
        field("Status:", status);
    }
    if let Some(description) = &runner.description {
        field("Description:", description);
    }
    if let Some(created) = &runner.creation_time {
        field("Created:", created);
    }
    if let Some(last_seen) = &runner.last_seen {
        field("Last seen:", last_seen);
    }
    if let Some(uri) = &runner.runbook_base_uri {
        field("Runbook URI:", uri);
    }
    if let Some(teams) = &runner.teams {
        let ids: Vec<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        field("Teams:", &ids.join(", "));
    }
    if let Some(privileges) = &runner.privileges {
        field("Permissions:", &privileges.permissions.join(", "));
    }
    out
}
