use anyhow::Context;
use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::service::access::Access;
use crate::zoho::{ZohoClient, sync_projects};

#[derive(Parser)]
pub struct ZohoOpts {
    #[clap(subcommand)]
    pub subcmd: ZohoCommand,
}

#[derive(Parser)]
pub enum ZohoCommand {
    /// Import projects from Zoho Projects once
    Sync,
}

pub async fn command_zoho(gsettings: &GlobalSettings, opts: ZohoOpts) -> anyhow::Result<()> {
    match opts.subcmd {
        ZohoCommand::Sync => {
            let section = gsettings
                .config()
                .zoho
                .clone()
                .context("The configuration has no [zoho] section")?;
            let client = ZohoClient::new(section)?;
            let db = gsettings.open_database()?;
            let summary = sync_projects(&db, Access::system(), &client).await?;
            gsettings.printer().print_sync_summary(summary);
        }
    }
    Ok(())
}
