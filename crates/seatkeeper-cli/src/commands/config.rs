//! Configuration inspection commands.

use clap::{Args, Subcommand};

use seatkeeper_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Validate the configuration and print a summary
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(config_path)?;
            config.database.url = mask_password(&config.database.url);
            config.cache.redis.url = mask_password(&config.cache.redis.url);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                output::print_kv("Database", &config.database.provider);
                if !config.database.is_memory() {
                    output::print_kv("Database URL", &mask_password(&config.database.url));
                }
                output::print_kv("Cache", &config.cache.provider);
                output::print_kv("Collaborators", &config.collaborators.mode);
                output::print_kv(
                    "Invite TTL",
                    &format!("{}s", config.license.invite_ttl_seconds),
                );
                output::print_kv(
                    "Authorization TTL",
                    &format!("{}s", config.license.authorization_ttl_seconds),
                );
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }

    Ok(())
}

/// Mask the password in a connection URL for display
fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let Some(at) = url.rfind('@') else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(offset) => format!("{}:****{}", &url[..scheme_end + offset], &url[at..]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://seat:secret@db:5432/seatkeeper"),
            "postgres://seat:****@db:5432/seatkeeper"
        );
        assert_eq!(
            mask_password("redis://127.0.0.1:6379"),
            "redis://127.0.0.1:6379"
        );
    }
}
