use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::server::bootstrap::start_server;

#[derive(Parser)]
pub struct ServerOpts {
    #[clap(subcommand)]
    pub subcmd: ServerCommand,
}

#[derive(Parser)]
pub enum ServerCommand {
    /// Start the API server
    Start(ServerStartOpts),
}

#[derive(Parser)]
pub struct ServerStartOpts {
    /// Address to listen on, overrides the configuration file
    #[arg(long, env = "RMP_HOST")]
    pub host: Option<String>,

    /// Port to listen on, overrides the configuration file
    #[arg(long, env = "RMP_PORT")]
    pub port: Option<u16>,
}

pub async fn command_server(gsettings: &GlobalSettings, opts: ServerOpts) -> anyhow::Result<()> {
    match opts.subcmd {
        ServerCommand::Start(opts) => {
            let mut config = gsettings.config().clone();
            if let Some(host) = opts.host {
                config.server.host = host;
            }
            if let Some(port) = opts.port {
                config.server.port = port;
            }
            start_server(config).await
        }
    }
}
