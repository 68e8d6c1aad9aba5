use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::report::{ReportFormat, ReportKind, generate_to_dir};
use crate::service::access::Access;
use crate::service::today;

#[derive(Parser)]
pub struct ReportOpts {
    #[clap(subcommand)]
    pub subcmd: ReportCommand,
}

#[derive(Parser)]
pub enum ReportCommand {
    /// Render a report into a file
    Generate(ReportGenerateOpts),
}

#[derive(Parser)]
pub struct ReportGenerateOpts {
    /// One of `allocations`, `bench`, `utilization`, `certifications`, `over-allocation`
    pub kind: ReportKind,

    /// `xlsx` or `pdf`
    #[arg(long, default_value = "xlsx")]
    pub format: ReportFormat,

    /// Day the report describes, today by default
    #[arg(long)]
    pub on: Option<NaiveDate>,

    /// Directory of the output, the configured report directory by default
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
}

pub async fn command_report(gsettings: &GlobalSettings, opts: ReportOpts) -> anyhow::Result<()> {
    let db = gsettings.open_database()?;
    match opts.subcmd {
        ReportCommand::Generate(opts) => {
            let directory = opts
                .output_dir
                .unwrap_or_else(|| gsettings.config().reports.output_dir.clone());
            let on = opts.on.unwrap_or_else(today);
            let path = db
                .call(move |conn| {
                    generate_to_dir(conn, &Access::system(), opts.kind, opts.format, on, &directory)
                })
                .await?;
            gsettings.printer().print_report_written(&path);
        }
    }
    Ok(())
}
