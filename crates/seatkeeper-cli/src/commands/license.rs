//! Seat pool inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use seatkeeper_core::error::AppError;
use seatkeeper_entity::license::ProductUsage;

use crate::output::{self, OutputFormat};

/// Arguments for license commands
#[derive(Debug, Args)]
pub struct LicenseArgs {
    /// License subcommand
    #[command(subcommand)]
    pub command: LicenseCommand,
}

/// License subcommands
#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Show the active plan's seat and resource usage
    Usage {
        /// Workspace identifier
        #[arg(short, long)]
        workspace: Uuid,
    },
    /// List the active plan's product pools
    Products {
        /// Workspace identifier
        #[arg(short, long)]
        workspace: Uuid,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct ProductRow {
    product: String,
    status: String,
    quantity: i64,
    in_use: i64,
    available: i64,
}

impl From<&ProductUsage> for ProductRow {
    fn from(usage: &ProductUsage) -> Self {
        Self {
            product: usage.product.to_string(),
            status: usage.status.as_str().to_string(),
            quantity: usage.quantity,
            in_use: usage.in_use,
            available: usage.available(),
        }
    }
}

/// Execute license commands
pub async fn execute(
    args: &LicenseArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let services = super::connect_services(&config).await?;

    match &args.command {
        LicenseCommand::Usage { workspace } => {
            let usage = services.pool.usage(*workspace).await?;
            if format == OutputFormat::Json {
                output::print_item(&usage, format);
                return Ok(());
            }
            println!("Plan {}:", usage.plan_id);
            output::print_kv("Seats In Use", &usage.seats_in_use.to_string());
            output::print_kv(
                "Call Time (min)",
                &format!(
                    "{} / {}",
                    usage.allocated.call_time_minutes, usage.caps.call_time_minutes
                ),
            );
            output::print_kv(
                "Storage (GB)",
                &format!("{} / {}", usage.allocated.storage_gb, usage.caps.storage_gb),
            );
            output::print_kv(
                "Download Hits",
                &format!(
                    "{} / {}",
                    usage.allocated.download_hits, usage.caps.download_hits
                ),
            );
        }
        LicenseCommand::Products { workspace } => {
            let caps = services.pool.seat_caps(*workspace).await?;
            let rows: Vec<ProductRow> = caps.products.iter().map(ProductRow::from).collect();
            output::print_rows(&rows, &caps.products, format);
            if format == OutputFormat::Table {
                output::print_kv("Max Members", &caps.max_members.to_string());
            }
        }
    }

    Ok(())
}
