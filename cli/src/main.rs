use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use client::config::ConfigError;
use client::feedback::{CREATE_TEAM_FAILED, FormFeedback, LOGIN_FAILED, REGISTRATION_FAILED};
use client::storage::FileStore;
use client::validation::{LoginForm, RegisterForm, TeamForm, ValidationErrors, validate_team_update};
use client::{ApiError, App, ClientConfig};
use serde::Serialize;
use wire::{AddMemberPayload, TeamRole, UpdateTeamPayload};

const BASE_URL_VAR: &str = "BASKETEASY_API_BASE_URL";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Rejected(FormFeedback),
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "basketeasy", about = "BasketEasy team-management CLI")]
struct Cli {
    /// Overrides BASKETEASY_API_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Where credentials persist between invocations.
    #[arg(long, env = "BASKETEASY_STATE_FILE", default_value = ".basketeasy/credentials.json")]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BASKETEASY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BASKETEASY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "BASKETEASY_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    Logout,
    /// Show the signed-in user's profile.
    Whoami,
    Teams(TeamsCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct TeamsCommand {
    #[command(subcommand)]
    command: TeamsSubcommand,
}

#[derive(Subcommand, Debug)]
enum TeamsSubcommand {
    List,
    Show {
        id: String,
    },
    Create(TeamFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: TeamPatch,
    },
    Delete {
        id: String,
    },
    Members {
        id: String,
    },
    AddMember {
        id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    RemoveMember {
        id: String,
        user_id: String,
    },
}

#[derive(Args, Debug)]
struct TeamFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    club: String,
    #[arg(long, default_value = "", help = "Hex color, e.g. #667eea")]
    color: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    image_url: String,
}

#[derive(Args, Debug)]
struct TeamPatch {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    club: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    Show { id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Member,
    Admin,
}

impl From<RoleArg> for TeamRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Member => Self::Member,
            RoleArg::Admin => Self::Admin,
        }
    }
}

impl From<TeamFields> for TeamForm {
    fn from(fields: TeamFields) -> Self {
        Self {
            name: fields.name,
            club: fields.club,
            color: fields.color,
            description: fields.description,
            image_url: fields.image_url,
        }
    }
}

impl From<TeamPatch> for UpdateTeamPayload {
    fn from(patch: TeamPatch) -> Self {
        Self {
            name: patch.name,
            club: patch.club,
            color: patch.color,
            description: patch.description,
            image_url: patch.image_url,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.base_url.as_deref(), |key| std::env::var(key).ok())?;
    tracing::debug!(base_url = %config.base_url, state_file = %cli.state_file.display(), "starting");
    let app = App::new(config, Arc::new(FileStore::new(cli.state_file)))?;

    match cli.command {
        Command::Login { email, password } => {
            let credentials = LoginForm { email, password }.validate()?;
            let user = app.auth().login(&credentials).await.map_err(|e| rejected(&e, LOGIN_FAILED))?;
            print_json(&user)
        }
        Command::Register { username, email, password, confirm_password } => {
            let data = RegisterForm { username, email, password, confirm_password }.validate()?;
            let user = app.auth().register(&data).await.map_err(|e| rejected(&e, REGISTRATION_FAILED))?;
            print_json(&user)
        }
        Command::Logout => {
            app.auth().logout()?;
            eprintln!("signed out");
            Ok(())
        }
        Command::Whoami => print_json(&app.auth().profile().await?),
        Command::Teams(teams) => run_teams(&app, teams).await,
        Command::Users(users) => run_users(&app, users).await,
    }
}

async fn run_teams(app: &App, teams: TeamsCommand) -> Result<(), CliError> {
    let resource = app.teams();
    match teams.command {
        TeamsSubcommand::List => print_json(&resource.list().await?),
        TeamsSubcommand::Show { id } => print_json(&resource.get(&id).await?),
        TeamsSubcommand::Create(fields) => {
            let payload = TeamForm::from(fields).validate()?;
            let team = resource.create(&payload).await.map_err(|e| rejected(&e, CREATE_TEAM_FAILED))?;
            print_json(&team)
        }
        TeamsSubcommand::Update { id, fields } => {
            let patch = UpdateTeamPayload::from(fields);
            if patch.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            let patch = validate_team_update(patch)?;
            print_json(&resource.update(&id, &patch).await?)
        }
        TeamsSubcommand::Delete { id } => {
            resource.delete(&id).await?;
            eprintln!("deleted team {id}");
            Ok(())
        }
        TeamsSubcommand::Members { id } => print_json(&resource.members(&id).await?),
        TeamsSubcommand::AddMember { id, user_id, role } => {
            let payload = AddMemberPayload { user_id, role: role.map(TeamRole::from) };
            print_json(&resource.add_member(&id, &payload).await?)
        }
        TeamsSubcommand::RemoveMember { id, user_id } => {
            resource.remove_member(&id, &user_id).await?;
            eprintln!("removed user {user_id} from team {id}");
            Ok(())
        }
    }
}

async fn run_users(app: &App, users: UsersCommand) -> Result<(), CliError> {
    let resource = app.users();
    match users.command {
        UsersSubcommand::List => print_json(&resource.list().await?),
        UsersSubcommand::Show { id } => print_json(&resource.get(&id).await?),
    }
}

/// Environment config, with `--base-url` taking precedence over the variable.
fn load_config<F>(base_url: Option<&str>, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    ClientConfig::from_lookup(|key| match base_url {
        Some(url) if key == BASE_URL_VAR => Some(url.to_owned()),
        _ => lookup(key),
    })
}

fn rejected(error: &ApiError, fallback: &str) -> CliError {
    match error {
        ApiError::Status { .. } | ApiError::Transport(_) => CliError::Rejected(FormFeedback::from_api_error(error, fallback)),
        other => CliError::Api(other.clone()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
