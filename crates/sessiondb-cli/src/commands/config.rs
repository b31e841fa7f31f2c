//! Configuration management commands.

use sessiondb_core::Config;

use crate::{AppContext, ConfigAction};

pub fn handle(action: ConfigAction, ctx: &AppContext) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", ctx.config.to_toml_string()?);
        }
        ConfigAction::Path => {
            println!("User config:    {}", Config::config_dir().join("config.toml").display());
            println!("Project config: .sessiondb/config.toml");
            println!("Database:       {}", ctx.config.database.resolved_path().display());
        }
    }
    Ok(())
}
