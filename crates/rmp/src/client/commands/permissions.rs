use clap::Parser;
use staffing::permission::Role;

use crate::client::globalsettings::GlobalSettings;
use crate::service::access::{Access, Principal};
use crate::service::permission::{cells, load_matrix};

#[derive(Parser)]
pub struct PermissionsOpts {
    #[clap(subcommand)]
    pub subcmd: PermissionsCommand,
}

#[derive(Parser)]
pub enum PermissionsCommand {
    /// Print the effective permission matrix
    Show(PermissionsShowOpts),
}

#[derive(Parser)]
pub struct PermissionsShowOpts {
    /// Only rows of this role
    #[arg(long)]
    pub role: Option<Role>,
}

pub async fn command_permissions(
    gsettings: &GlobalSettings,
    opts: PermissionsOpts,
) -> anyhow::Result<()> {
    let db = gsettings.open_database()?;
    match opts.subcmd {
        PermissionsCommand::Show(opts) => {
            let matrix = db.call(|conn| load_matrix(conn)).await?;
            let access = Access::new(Principal::system(), matrix);
            let rows = cells(&access)?
                .into_iter()
                .filter(|cell| opts.role.is_none_or(|role| role == cell.role))
                .collect();
            gsettings.printer().print_permissions(rows);
        }
    }
    Ok(())
}
