use std::path::Path;

use serde::Serialize;
use serde_json::json;
use staffing::availability::Availability;
use staffing::permission::PermissionCell;

use crate::client::output::outputs::Output;
use crate::repo::employee::Employee;
use crate::repo::user::User;
use crate::service::employee::{EmployeeWithAvailability, Timeline};
use crate::zoho::SyncSummary;

#[derive(Default)]
pub struct JsonOutput;

impl JsonOutput {
    fn print<T: Serialize>(&self, data: &T) {
        match serde_json::to_string_pretty(data) {
            Ok(text) => println!("{text}"),
            Err(error) => log::error!("Cannot serialize output: {error}"),
        }
    }
}

impl Output for JsonOutput {
    fn print_user_created(&self, user: &User, token: &str) {
        self.print(&json!({
            "user": user,
            "token": token,
        }));
    }

    fn print_user_list(&self, users: Vec<User>) {
        self.print(&users);
    }

    fn print_employee_list(&self, employees: Vec<EmployeeWithAvailability>) {
        self.print(&employees);
    }

    fn print_availability(&self, employee: &Employee, availability: Availability) {
        self.print(&json!({
            "employee_id": employee.id,
            "availability": availability,
        }));
    }

    fn print_timeline(&self, _employee: &Employee, timeline: Timeline) {
        self.print(&timeline);
    }

    fn print_report_written(&self, path: &Path) {
        self.print(&json!({ "path": path }));
    }

    fn print_sync_summary(&self, summary: SyncSummary) {
        self.print(&summary);
    }

    fn print_permissions(&self, cells: Vec<PermissionCell>) {
        self.print(&cells);
    }

    fn print_error(&self, error: anyhow::Error) {
        self.print(&json!({ "error": format!("{error:?}") }));
    }
}
