//! Workspace member inspection commands.

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use seatkeeper_core::error::AppError;
use seatkeeper_entity::license::Product;
use seatkeeper_entity::workspace::{MemberFilter, MemberType, WorkspaceRole};
use seatkeeper_service::MemberView;

use crate::output::{self, OutputFormat};

/// Arguments for members commands
#[derive(Debug, Args)]
pub struct MembersArgs {
    /// Members subcommand
    #[command(subcommand)]
    pub command: MembersCommand,
}

/// How a member joined, as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum JoinedVia {
    /// Accepted an invitation
    Invited,
    /// Created by bulk provisioning
    Provisioned,
}

/// Members subcommands
#[derive(Debug, Subcommand)]
pub enum MembersCommand {
    /// List members, optionally filtered
    List {
        /// Workspace identifier
        #[arg(short, long)]
        workspace: Uuid,
        /// Only members with this role (OWNER, MANAGER, MEMBER)
        #[arg(long, conflicts_with_all = ["product", "member_type"])]
        role: Option<String>,
        /// Only members holding this product (REMOTE, MEETING, DRIVE)
        #[arg(long, conflicts_with = "member_type")]
        product: Option<String>,
        /// Only members that joined this way
        #[arg(long, value_enum)]
        member_type: Option<JoinedVia>,
    },
}

#[derive(Debug, Tabled)]
struct MemberRow {
    user_id: Uuid,
    email: String,
    name: String,
    role: String,
    joined_via: String,
    products: String,
}

impl From<&MemberView> for MemberRow {
    fn from(view: &MemberView) -> Self {
        let products: Vec<String> = view.products.iter().map(Product::to_string).collect();
        Self {
            user_id: view.membership.user_id,
            email: view.email.clone(),
            name: view.name.clone(),
            role: view.membership.role.to_string(),
            joined_via: match view.membership.member_type {
                MemberType::Invited => "invited".into(),
                MemberType::Provisioned => "provisioned".into(),
            },
            products: products.join(", "),
        }
    }
}

#[derive(Serialize)]
struct Listing<'a> {
    workspace_id: Uuid,
    members: &'a [MemberView],
}

fn filter_from(
    role: Option<&str>,
    product: Option<&str>,
    member_type: Option<JoinedVia>,
) -> Result<MemberFilter, AppError> {
    if let Some(role) = role {
        return Ok(MemberFilter::Role(role.parse::<WorkspaceRole>()?));
    }
    if let Some(product) = product {
        return Ok(MemberFilter::Product(product.parse::<Product>()?));
    }
    Ok(match member_type {
        Some(JoinedVia::Invited) => MemberFilter::MemberType(MemberType::Invited),
        Some(JoinedVia::Provisioned) => MemberFilter::MemberType(MemberType::Provisioned),
        None => MemberFilter::All,
    })
}

/// Execute members commands
pub async fn execute(
    args: &MembersArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        MembersCommand::List {
            workspace,
            role,
            product,
            member_type,
        } => {
            let filter = filter_from(role.as_deref(), product.as_deref(), *member_type)?;
            let config = super::load_config(config_path)?;
            let services = super::connect_services(&config).await?;
            let views = services.memberships.member_views(*workspace, filter).await?;
            let rows: Vec<MemberRow> = views.iter().map(MemberRow::from).collect();
            output::print_rows(
                &rows,
                &Listing {
                    workspace_id: *workspace,
                    members: &views,
                },
                format,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert!(matches!(
            filter_from(Some("manager"), None, None).unwrap(),
            MemberFilter::Role(WorkspaceRole::Manager)
        ));
        assert!(matches!(
            filter_from(None, Some("drive"), None).unwrap(),
            MemberFilter::Product(Product::Drive)
        ));
        assert!(matches!(
            filter_from(None, None, Some(JoinedVia::Provisioned)).unwrap(),
            MemberFilter::MemberType(MemberType::Provisioned)
        ));
        assert!(matches!(filter_from(None, None, None).unwrap(), MemberFilter::All));
        assert!(filter_from(None, Some("fax"), None).is_err());
    }
}
