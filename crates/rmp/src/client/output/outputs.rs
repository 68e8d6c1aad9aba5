use std::path::Path;

use staffing::availability::Availability;
use staffing::permission::PermissionCell;

use crate::repo::employee::Employee;
use crate::repo::user::User;
use crate::service::employee::{EmployeeWithAvailability, Timeline};
use crate::zoho::SyncSummary;

#[derive(clap::ValueEnum, Clone, Copy)]
pub enum Outputs {
    Cli,
    Json,
}

pub trait Output {
    // Users
    fn print_user_created(&self, user: &User, token: &str);
    fn print_user_list(&self, users: Vec<User>);

    // Employees
    fn print_employee_list(&self, employees: Vec<EmployeeWithAvailability>);
    fn print_availability(&self, employee: &Employee, availability: Availability);
    fn print_timeline(&self, employee: &Employee, timeline: Timeline);

    // Reports
    fn print_report_written(&self, path: &Path);

    // Integrations
    fn print_sync_summary(&self, summary: SyncSummary);

    // Permissions
    fn print_permissions(&self, cells: Vec<PermissionCell>);

    fn print_error(&self, error: anyhow::Error);
}
