//! Pending invitation lookup.

use clap::{Args, Subcommand};
use uuid::Uuid;

use seatkeeper_core::error::AppError;
use seatkeeper_entity::invite::InviteKey;

use crate::output::{self, OutputFormat};

/// Arguments for invite commands
#[derive(Debug, Args)]
pub struct InviteArgs {
    /// Invite subcommand
    #[command(subcommand)]
    pub command: InviteCommand,
}

/// Invite subcommands
#[derive(Debug, Subcommand)]
pub enum InviteCommand {
    /// Show a pending invitation by invitee or by session code
    Show {
        /// Invitee user identifier
        #[arg(long, requires = "workspace", conflicts_with = "code")]
        user: Option<Uuid>,
        /// Workspace identifier
        #[arg(short, long)]
        workspace: Option<Uuid>,
        /// Session code from the invitation link
        #[arg(long)]
        code: Option<String>,
    },
}

/// Execute invite commands
pub async fn execute(
    args: &InviteArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        InviteCommand::Show {
            user,
            workspace,
            code,
        } => {
            let key = match (user, workspace, code) {
                (Some(user), Some(workspace), _) => InviteKey::member(*user, *workspace),
                (_, _, Some(code)) => InviteKey::session(code.clone()),
                _ => {
                    return Err(AppError::validation(
                        "pass --user with --workspace, or --code",
                    ));
                }
            };
            let config = super::load_config(config_path)?;
            let services = super::connect_services(&config).await?;
            match services.invites.find(&key).await? {
                Some(invite) => output::print_item(&invite, format),
                None => output::print_warning(&format!("No pending invitation for {key}")),
            }
        }
    }

    Ok(())
}
