//! Config command implementations

use anyhow::Result;

use crate::context::AppContext;
use crate::output::{format_config, print_info};

/// Print the config file location
pub fn config_path(ctx: &AppContext) -> Result<()> {
    println!("{}", ctx.path.display());
    Ok(())
}

/// Print configured servers, workspaces and effective settings
pub fn config_show(ctx: &AppContext) -> Result<()> {
    if !ctx.path.exists() {
        print_info(&format!(
            "No config file at {}, showing defaults",
            ctx.path.display()
        ));
    }

    println!("{}", format_config(&ctx.config.servers, &ctx.config.workspaces));
    println!();
    println!("[settings]");
    print!("{}", toml::to_string_pretty(&ctx.config.settings)?);
    Ok(())
}
