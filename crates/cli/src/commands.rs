//! CLI commands

use admin_core::AdminConfig;
use admin_http::ResourceKind;
use admin_session::{AdminConsole, GuardDecision, LoginRedirect, Redirector, SessionState};
use anyhow::{Result, bail};
use clap::Subcommand;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session credential
    Login {
        /// Account identity (user name or email)
        identity: String,

        /// Account secret
        #[arg(long, env = "AUTHSERVER_ADMIN_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Sign out and forget the stored credential
    Logout,

    /// Validate the stored credential and show who is signed in
    Status,

    /// List resources of a kind
    List {
        /// applications, users, roles or groups
        kind: ResourceKind,
    },

    /// Show a single resource
    Get { kind: ResourceKind, id: String },

    /// Delete a single resource
    Delete { kind: ResourceKind, id: String },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Output file path (defaults to <data dir>/config.toml)
        output: Option<PathBuf>,
    },
}

/// Tells the operator to sign in again
struct TerminalRedirector;

impl Redirector for TerminalRedirector {
    fn redirect(&self, target: &LoginRedirect) {
        if target.session_expired {
            eprintln!("Your session has expired. Run `authserver-admin login` to sign in again.");
        } else {
            eprintln!("Not signed in. Run `authserver-admin login` first.");
        }
    }
}

impl Commands {
    pub async fn execute(self, config: AdminConfig) -> Result<()> {
        match self {
            Self::Config { command } => command.execute(&config),
            Self::Login { identity, secret } => login(&console(config)?, &identity, &secret).await,
            Self::Logout => logout(&console(config)?).await,
            Self::Status => status(&console(config)?).await,
            Self::List { kind } => {
                let console = signed_in(config, &kind.collection_path()).await?;
                let items: Vec<Value> = console.gateway().list_resources(kind).await?;
                print_json(&Value::Array(items))
            }
            Self::Get { kind, id } => {
                let console = signed_in(config, &kind.item_path(&id)).await?;
                let item: Value = console.gateway().get_resource(kind, &id).await?;
                print_json(&item)
            }
            Self::Delete { kind, id } => {
                let console = signed_in(config, &kind.item_path(&id)).await?;
                console.gateway().delete_resource(kind, &id).await?;
                println!("Deleted {kind} {id}");
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    pub fn execute(self, admin_config: &AdminConfig) -> Result<()> {
        match self {
            Self::Init { output } => {
                let config_path =
                    output.unwrap_or_else(|| admin_config.data_dir().join(config::CONFIG_FILE_NAME));

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
        }
    }
}

fn console(config: AdminConfig) -> Result<AdminConsole> {
    Ok(AdminConsole::builder(config)
        .redirector(Arc::new(TerminalRedirector))
        .build()?)
}

/// Restore the stored session and check `path` is reachable
async fn signed_in(config: AdminConfig, path: &str) -> Result<AdminConsole> {
    let console = console(config)?;
    console.session().set_current_path(path);
    console.start().await;

    match console.route_guard().settled(path).await {
        GuardDecision::RenderContent => Ok(console),
        GuardDecision::Redirect(redirect) => {
            TerminalRedirector.redirect(&redirect);
            bail!("Authentication required")
        }
        GuardDecision::Loading => bail!("Session check did not complete"),
    }
}

async fn login(console: &AdminConsole, identity: &str, secret: &str) -> Result<()> {
    let user = console.session().login(identity, secret).await?;
    info!(user_id = %user.id, "Login succeeded");
    println!("Signed in as {} ({})", user.name, user.role);
    Ok(())
}

async fn logout(console: &AdminConsole) -> Result<()> {
    let backend = console.session().logout();
    println!("Signed out");

    // Local state is already gone; give the backend call a chance to finish
    if let Some(task) = backend
        && let Err(e) = task.await
    {
        debug!("Backend logout task failed: {e}");
    }
    Ok(())
}

async fn status(console: &AdminConsole) -> Result<()> {
    match console.start().await {
        SessionState::Authenticated { user, .. } => {
            println!("Signed in as {} ({}), id {}", user.name, user.role, user.id);
        }
        state => {
            println!("Not signed in ({})", state.name());
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
