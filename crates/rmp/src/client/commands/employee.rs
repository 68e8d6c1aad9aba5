use chrono::NaiveDate;
use clap::Parser;
use staffing::availability::AvailabilityStatus;
use staffing::{EmployeeId, Period};

use crate::client::globalsettings::GlobalSettings;
use crate::repo::employee::{self as repo, EmployeeFilter};
use crate::service::access::Access;
use crate::service::employee;
use crate::service::today;

#[derive(Parser)]
pub struct EmployeeOpts {
    #[clap(subcommand)]
    pub subcmd: EmployeeCommand,
}

#[derive(Parser)]
pub enum EmployeeCommand {
    /// List employees with their availability
    List(EmployeeListOpts),
    /// Show availability of a single employee
    Availability(AvailabilityOpts),
}

#[derive(Parser)]
pub struct EmployeeListOpts {
    /// Only employees of this department
    #[arg(long)]
    pub department: Option<String>,

    /// Include employees who have left by the day
    #[arg(long)]
    pub all: bool,

    /// Only employees with this availability status
    #[arg(long)]
    pub status: Option<AvailabilityStatus>,

    /// Day of the availability, today by default
    #[arg(long)]
    pub on: Option<NaiveDate>,
}

#[derive(Parser)]
pub struct AvailabilityOpts {
    /// Employee ID
    pub id: EmployeeId,

    /// Day of the availability, today by default
    #[arg(long, conflicts_with("from"))]
    pub on: Option<NaiveDate>,

    /// Print the load timeline starting on this day
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the timeline
    #[arg(long, requires("from"))]
    pub to: Option<NaiveDate>,
}

#[derive(Parser)]
pub struct BenchOpts {
    /// Day to check, today by default
    #[arg(long)]
    pub on: Option<NaiveDate>,
}

pub async fn command_employee(gsettings: &GlobalSettings, opts: EmployeeOpts) -> anyhow::Result<()> {
    let db = gsettings.open_database()?;
    match opts.subcmd {
        EmployeeCommand::List(opts) => {
            let on = opts.on.unwrap_or_else(today);
            let filter = EmployeeFilter {
                department: opts.department,
                employed_on: (!opts.all).then_some(on),
                ..Default::default()
            };
            let employees = db
                .call(move |conn| {
                    employee::list_with_availability(conn, &Access::system(), &filter, opts.status, on)
                })
                .await?;
            gsettings.printer().print_employee_list(employees);
        }
        EmployeeCommand::Availability(opts) => {
            let id = opts.id;
            let record = db.call(move |conn| repo::get(conn, id)).await?;
            match opts.from {
                Some(from) => {
                    let window = Period::new(from, opts.to)?;
                    let timeline = db
                        .call(move |conn| employee::timeline(conn, &Access::system(), id, &window))
                        .await?;
                    gsettings.printer().print_timeline(&record, timeline);
                }
                None => {
                    let on = opts.on.unwrap_or_else(today);
                    let availability = db
                        .call(move |conn| employee::availability(conn, &Access::system(), id, on))
                        .await?;
                    gsettings.printer().print_availability(&record, availability);
                }
            }
        }
    }
    Ok(())
}

pub async fn command_bench(gsettings: &GlobalSettings, opts: BenchOpts) -> anyhow::Result<()> {
    let db = gsettings.open_database()?;
    let on = opts.on.unwrap_or_else(today);
    let employees = db
        .call(move |conn| employee::bench(conn, &Access::system(), on))
        .await?;
    gsettings.printer().print_employee_list(employees);
    Ok(())
}
