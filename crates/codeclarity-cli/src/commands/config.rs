use anyhow::{Context as _, Result};
use clap::Subcommand;

use codeclarity_core::config::{Config, CONFIG_FILE};

use super::Context;
use crate::output::{self, print_json, Table};

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// View current configuration
    View,
    /// Print one configuration value
    Get {
        /// api_base_url (url), default_org_id (org), output_format (format) or debug
        key: String,
    },
    /// Set a configuration value
    Set {
        /// api_base_url (url), default_org_id (org), output_format (format) or debug
        key: String,
        value: String,
    },
}

pub fn run(ctx: &Context, command: ConfigCommand) -> Result<()> {
    let dir = &ctx.settings.config_dir;
    let mut config = Config::load(dir).context("Failed to load config")?;

    match command {
        ConfigCommand::View => {
            if ctx.format.is_json() {
                return print_json(&config);
            }
            let mut table = Table::new(&["key", "value"]);
            for (key, value) in config.entries() {
                table.add_row(vec![key.to_string(), output::or_empty(&value)]);
            }
            table.print();
            println!();
            println!("{}", output::dim(dir.join(CONFIG_FILE).display()));
        }
        ConfigCommand::Get { key } => {
            println!("{}", config.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            let key = config.set(&key, &value)?;
            config.save(dir).context("Failed to save config")?;
            output::success(format!("Set {} = {}", key, config.value(key)));
        }
    }
    Ok(())
}
