use std::path::PathBuf;

use clap::Parser;

use crate::client::commands::employee::{BenchOpts, EmployeeOpts};
use crate::client::commands::permissions::PermissionsOpts;
use crate::client::commands::report::ReportOpts;
use crate::client::commands::server::ServerOpts;
use crate::client::commands::user::UserOpts;
use crate::client::commands::zoho::ZohoOpts;
use crate::client::output::outputs::Outputs;

#[derive(clap::ValueEnum, Clone, Copy)]
pub enum ColorPolicy {
    /// Use colors if the stdout is detected to be a terminal.
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Path to the configuration file
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        global = true,
        env = "RMP_CONFIG",
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub config: Option<PathBuf>,

    /// Path to the database, overrides the configuration file
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        global = true,
        env = "RMP_DATABASE",
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub database: Option<PathBuf>,

    /// Sets console color policy
    #[arg(
        long,
        default_value_t = ColorPolicy::Auto,
        value_enum,
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub colors: ColorPolicy,

    /// Sets output formatting
    #[arg(
        long,
        env = "RMP_OUTPUT_MODE",
        default_value_t = Outputs::Cli,
        value_enum,
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub output_mode: Outputs,

    /// Enables more detailed log output
    #[arg(
        long,
        env = "RMP_DEBUG",
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub debug: bool,
}

// Root CLI options
#[derive(Parser)]
#[command(
    author,
    about,
    version,
    disable_help_subcommand(true),
    help_expected(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Parser)]
pub enum SubCommand {
    /// Commands for the API server
    Server(ServerOpts),
    /// Manage API users and their tokens
    User(UserOpts),
    /// Inspect employees
    Employee(EmployeeOpts),
    /// List employees without any allocation
    Bench(BenchOpts),
    /// Render reports
    Report(ReportOpts),
    /// Zoho Projects integration
    Zoho(ZohoOpts),
    /// Inspect the permission matrix
    Permissions(PermissionsOpts),
}
