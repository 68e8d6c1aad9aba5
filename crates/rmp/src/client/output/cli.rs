use std::path::Path;

use cli_table::format::{Justify, Separator};
use cli_table::{Cell, CellStruct, Color, ColorChoice, Style, Table, TableStruct, print_stdout};
use colored::Colorize;
use staffing::availability::{Availability, AvailabilityStatus};
use staffing::permission::PermissionCell;

use crate::client::output::outputs::Output;
use crate::common::format::{format_end_date, format_percentage, human_fte};
use crate::repo::employee::Employee;
use crate::repo::user::User;
use crate::service::employee::{EmployeeWithAvailability, Timeline};
use crate::zoho::SyncSummary;

pub struct CliOutput {
    color_policy: ColorChoice,
}

impl CliOutput {
    pub fn new(color_policy: ColorChoice) -> CliOutput {
        CliOutput { color_policy }
    }

    fn print_vertical_table(&self, rows: Vec<Vec<CellStruct>>) {
        let table = rows.table().separator(
            Separator::builder()
                .column(Some(Default::default()))
                .build(),
        );
        self.print_table(table);
    }

    fn print_horizontal_table(&self, rows: Vec<Vec<CellStruct>>, header: Vec<CellStruct>) {
        let table = rows
            .table()
            .separator(
                Separator::builder()
                    .title(Some(Default::default()))
                    .column(Some(Default::default()))
                    .build(),
            )
            .title(header);
        self.print_table(table);
    }

    fn print_table(&self, table: TableStruct) {
        let table = table.color_choice(self.color_policy);
        if let Err(e) = print_stdout(table) {
            log::error!("Cannot print table to stdout: {e:?}");
        }
    }
}

fn header(names: &[&str]) -> Vec<CellStruct> {
    names.iter().map(|name| name.cell().bold(true)).collect()
}

fn status_cell(status: AvailabilityStatus) -> CellStruct {
    let color = match status {
        AvailabilityStatus::Bench => Color::Yellow,
        AvailabilityStatus::PartiallyAllocated => Color::Cyan,
        AvailabilityStatus::FullyAllocated => Color::Green,
        AvailabilityStatus::OverAllocated => Color::Red,
        AvailabilityStatus::Inactive => Color::White,
    };
    status.as_str().to_uppercase().cell().foreground_color(Some(color))
}

fn optional(value: &Option<String>) -> CellStruct {
    value.as_deref().unwrap_or("").cell()
}

impl Output for CliOutput {
    fn print_user_created(&self, user: &User, token: &str) {
        println!(
            "User {} ({}) created with id {}",
            user.username.bold(),
            user.role,
            user.id
        );
        println!("Token: {}", token.green());
        println!("{}", "The token is shown only once, store it now.".yellow());
    }

    fn print_user_list(&self, users: Vec<User>) {
        let rows = users
            .into_iter()
            .map(|user| {
                vec![
                    user.id.cell().justify(Justify::Right),
                    user.username.cell(),
                    user.role.as_str().cell(),
                    user.employee_id
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                        .cell(),
                    if user.active { "yes" } else { "no" }.cell(),
                    user.created_at.format("%Y-%m-%d %H:%M").to_string().cell(),
                ]
            })
            .collect();
        self.print_horizontal_table(
            rows,
            header(&["Id", "Username", "Role", "Employee", "Active", "Created"]),
        );
    }

    fn print_employee_list(&self, employees: Vec<EmployeeWithAvailability>) {
        if employees.is_empty() {
            println!("No employees found");
            return;
        }
        let rows = employees
            .into_iter()
            .map(|EmployeeWithAvailability { employee, availability }| {
                vec![
                    employee.id.cell().justify(Justify::Right),
                    employee.code.cell(),
                    employee.name.cell(),
                    optional(&employee.department),
                    status_cell(availability.status),
                    human_fte(availability.allocated).cell(),
                    human_fte(availability.available).cell(),
                    format_end_date(availability.free_from).cell(),
                ]
            })
            .collect();
        self.print_horizontal_table(
            rows,
            header(&[
                "Id",
                "Code",
                "Name",
                "Department",
                "Status",
                "Allocated",
                "Available",
                "Free from",
            ]),
        );
    }

    fn print_availability(&self, employee: &Employee, availability: Availability) {
        let free_from = match availability.free_from {
            Some(date) => date.to_string(),
            None => "never".to_string(),
        };
        let rows = vec![
            vec!["Employee".cell().bold(true), format!("{} ({})", employee.name, employee.code).cell()],
            vec!["Date".cell().bold(true), availability.date.to_string().cell()],
            vec!["Status".cell().bold(true), status_cell(availability.status)],
            vec!["Capacity".cell().bold(true), human_fte(availability.capacity).cell()],
            vec!["Allocated".cell().bold(true), human_fte(availability.allocated).cell()],
            vec!["Available".cell().bold(true), human_fte(availability.available).cell()],
            vec![
                "Utilization".cell().bold(true),
                format!("{}%", format_percentage(availability.utilization())).cell(),
            ],
            vec!["Free from".cell().bold(true), free_from.cell()],
        ];
        self.print_vertical_table(rows);
    }

    fn print_timeline(&self, employee: &Employee, timeline: Timeline) {
        println!("{} ({})", employee.name.bold(), employee.code);
        let capacity = timeline.capacity;
        let rows = timeline
            .segments
            .into_iter()
            .map(|segment| {
                let load = human_fte(segment.load).cell();
                let load = if segment.load > capacity {
                    load.foreground_color(Some(Color::Red))
                } else {
                    load
                };
                vec![
                    segment.period.start().to_string().cell(),
                    format_end_date(segment.period.end()).cell(),
                    load,
                    human_fte(capacity.saturating_sub(segment.load)).cell(),
                ]
            })
            .collect();
        self.print_horizontal_table(rows, header(&["From", "To", "Load", "Available"]));
    }

    fn print_report_written(&self, path: &Path) {
        println!("Report written to {}", path.display().to_string().bold());
    }

    fn print_sync_summary(&self, summary: SyncSummary) {
        let rows = vec![
            vec!["Created".cell().bold(true), summary.created.cell()],
            vec!["Updated".cell().bold(true), summary.updated.cell()],
            vec!["Unchanged".cell().bold(true), summary.unchanged.cell()],
            vec!["Skipped".cell().bold(true), summary.skipped.cell()],
        ];
        self.print_vertical_table(rows);
    }

    fn print_permissions(&self, cells: Vec<PermissionCell>) {
        let rows = cells
            .into_iter()
            .map(|cell| {
                let actions = if cell.actions.is_empty() {
                    "-".to_string()
                } else {
                    cell.actions.join(", ")
                };
                let actions = actions.cell();
                vec![
                    cell.role.as_str().cell(),
                    cell.module.as_str().cell(),
                    if cell.overridden {
                        actions.foreground_color(Some(Color::Yellow))
                    } else {
                        actions
                    },
                ]
            })
            .collect();
        self.print_horizontal_table(rows, header(&["Role", "Module", "Actions"]));
    }

    fn print_error(&self, error: anyhow::Error) {
        eprintln!("{}", format!("{error:?}").red());
    }
}
