use std::io::IsTerminal;

use clap::{CommandFactory, FromArgMatches};
use cli_table::ColorChoice;
use rmp::client::commands::employee::{command_bench, command_employee};
use rmp::client::commands::permissions::command_permissions;
use rmp::client::commands::report::command_report;
use rmp::client::commands::server::command_server;
use rmp::client::commands::user::command_user;
use rmp::client::commands::zoho::command_zoho;
use rmp::client::globalsettings::GlobalSettings;
use rmp::client::output::cli::CliOutput;
use rmp::client::output::json::JsonOutput;
use rmp::client::output::outputs::{Output, Outputs};
use rmp::common::cli::{ColorPolicy, CommonOpts, RootOptions, SubCommand};
use rmp::common::config::Config;
use rmp::common::setup::setup_logging;

fn make_global_settings(opts: CommonOpts) -> anyhow::Result<GlobalSettings> {
    let mut config = Config::load(opts.config.as_deref())?;
    if let Some(database) = opts.database {
        config.database.path = database;
    }

    let color_policy = match opts.colors {
        ColorPolicy::Always => ColorChoice::AlwaysAnsi,
        ColorPolicy::Auto => {
            if std::io::stdout().is_terminal() {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        }
        ColorPolicy::Never => ColorChoice::Never,
    };

    let printer: Box<dyn Output> = match opts.output_mode {
        Outputs::Cli => {
            match color_policy {
                ColorChoice::Always | ColorChoice::AlwaysAnsi => {
                    colored::control::set_override(true)
                }
                ColorChoice::Never => colored::control::set_override(false),
                _ => {}
            }
            Box::new(CliOutput::new(color_policy))
        }
        Outputs::Json => Box::<JsonOutput>::default(),
    };

    Ok(GlobalSettings::new(config, printer))
}

#[tokio::main]
async fn main() -> rmp::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.debug);

    let gsettings = match make_global_settings(top_opts.common) {
        Ok(gsettings) => gsettings,
        Err(error) => {
            log::error!("{error:?}");
            std::process::exit(1);
        }
    };

    let result = match top_opts.subcmd {
        SubCommand::Server(opts) => command_server(&gsettings, opts).await,
        SubCommand::User(opts) => command_user(&gsettings, opts).await,
        SubCommand::Employee(opts) => command_employee(&gsettings, opts).await,
        SubCommand::Bench(opts) => command_bench(&gsettings, opts).await,
        SubCommand::Report(opts) => command_report(&gsettings, opts).await,
        SubCommand::Zoho(opts) => command_zoho(&gsettings, opts).await,
        SubCommand::Permissions(opts) => command_permissions(&gsettings, opts).await,
    };

    if let Err(e) = result {
        gsettings.printer().print_error(e);
        std::process::exit(1);
    }

    Ok(())
}
