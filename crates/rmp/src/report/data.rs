use chrono::{Days, NaiveDate};
use itertools::Itertools;
use rusqlite::Connection;
use staffing::availability::AvailabilityStatus;
use staffing::ledger::Ledger;
use staffing::{Fte, Period};

use crate::common::error::RmpError;
use crate::repo::allocation::{self, AllocationFilter};
use crate::repo::employee::{self, EmployeeFilter};
use crate::repo::{skill, training};
use crate::report::{Cell, ReportKind, ReportTable};
use crate::service::employee::{availability_of, ledgers};

const CERTIFICATION_WINDOW_DAYS: u64 = 30;
const OVER_ALLOCATION_WINDOW_DAYS: u64 = 90;
const BENCH_TOP_SKILLS: usize = 3;

fn add_days(date: NaiveDate, days: u64) -> crate::Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| RmpError::ReportError(format!("Date out of range: {date} + {days} days")))
}

pub fn allocations(conn: &Connection, on: NaiveDate) -> crate::Result<ReportTable> {
    let mut table = ReportTable::new(
        ReportKind::Allocations,
        on,
        &["Employee", "Project", "Project name", "Role", "Start", "End", "FTE", "%", "Billable"],
    );
    let allocations = allocation::list_detailed(
        conn,
        &AllocationFilter {
            active_on: Some(on),
            ..Default::default()
        },
    )?;
    let mut total = Fte::ZERO;
    for detail in allocations {
        let a = &detail.allocation;
        total += a.fte;
        table.push_row(vec![
            detail.employee_name.clone().into(),
            detail.project_code.clone().into(),
            detail.project_name.clone().into(),
            a.role.clone().into(),
            a.start_date.into(),
            a.end_date.into(),
            a.fte.as_f64().into(),
            a.percentage.into(),
            (if a.billable { "yes" } else { "no" }).into(),
        ]);
    }
    table.footer = Some(vec![
        "Total".into(),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        total.as_f64().into(),
        Cell::Empty,
        Cell::Empty,
    ]);
    Ok(table)
}

pub fn bench(conn: &Connection, on: NaiveDate) -> crate::Result<ReportTable> {
    let mut table = ReportTable::new(
        ReportKind::Bench,
        on,
        &["Code", "Name", "Department", "Designation", "Capacity", "Top skills"],
    );
    let ledgers = ledgers(conn)?;
    let empty = Ledger::default();
    let employees = employee::list(
        conn,
        &EmployeeFilter {
            employed_on: Some(on),
            ..Default::default()
        },
    )?;
    for employee in employees {
        let ledger = ledgers.get(&employee.id).unwrap_or(&empty);
        if availability_of(ledger, &employee, on).status != AvailabilityStatus::Bench {
            continue;
        }
        let skills = skill::employee_skills(conn, employee.id)?
            .into_iter()
            .take(BENCH_TOP_SKILLS)
            .map(|s| format!("{} ({})", s.name, s.proficiency))
            .join(", ");
        table.push_row(vec![
            employee.code.into(),
            employee.name.into(),
            employee.department.into(),
            employee.designation.into(),
            employee.capacity.as_f64().into(),
            skills.into(),
        ]);
    }
    let count = table.rows.len();
    table.footer = Some(vec![
        format!("{count} employee(s)").into(),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
    ]);
    Ok(table)
}

pub fn utilization(conn: &Connection, on: NaiveDate) -> crate::Result<ReportTable> {
    let mut table = ReportTable::new(
        ReportKind::Utilization,
        on,
        &[
            "Code",
            "Name",
            "Department",
            "Capacity",
            "Allocated",
            "Billable",
            "Utilization %",
            "Status",
        ],
    );
    let ledgers = ledgers(conn)?;
    let empty = Ledger::default();
    let billable = allocation::list(
        conn,
        &AllocationFilter {
            active_on: Some(on),
            ..Default::default()
        },
    )?
    .into_iter()
    .filter(|a| a.billable)
    .into_group_map_by(|a| a.employee_id);

    let mut capacity_total = Fte::ZERO;
    let mut allocated_total = Fte::ZERO;
    let mut billable_total = Fte::ZERO;
    let employees = employee::list(
        conn,
        &EmployeeFilter {
            employed_on: Some(on),
            ..Default::default()
        },
    )?;
    for employee in employees {
        let ledger = ledgers.get(&employee.id).unwrap_or(&empty);
        let availability = availability_of(ledger, &employee, on);
        let billable_fte: Fte = billable
            .get(&employee.id)
            .map(|allocations| allocations.iter().map(|a| a.fte).sum())
            .unwrap_or_default();
        capacity_total += employee.capacity;
        allocated_total += availability.allocated;
        billable_total += billable_fte;
        table.push_row(vec![
            employee.code.into(),
            employee.name.into(),
            employee.department.into(),
            employee.capacity.as_f64().into(),
            availability.allocated.as_f64().into(),
            billable_fte.as_f64().into(),
            availability.utilization().into(),
            availability.status.as_str().into(),
        ]);
    }
    table.footer = Some(vec![
        "Total".into(),
        Cell::Empty,
        Cell::Empty,
        capacity_total.as_f64().into(),
        allocated_total.as_f64().into(),
        billable_total.as_f64().into(),
        allocated_total.percentage_of(capacity_total).into(),
        Cell::Empty,
    ]);
    Ok(table)
}

pub fn certifications(conn: &Connection, on: NaiveDate) -> crate::Result<ReportTable> {
    let mut table = ReportTable::new(
        ReportKind::Certifications,
        on,
        &["Employee", "Certification", "Issuer", "Expires", "Days left"],
    );
    let until = add_days(on, CERTIFICATION_WINDOW_DAYS)?;
    for expiring in training::expiring_between(conn, on, until)? {
        let certification = expiring.certification;
        let days_left = certification
            .expires_on
            .map(|expiry| Cell::Number((expiry - on).num_days() as f64))
            .unwrap_or(Cell::Empty);
        table.push_row(vec![
            expiring.employee_name.into(),
            certification.name.into(),
            certification.issuer.into(),
            certification.expires_on.into(),
            days_left,
        ]);
    }
    Ok(table)
}

pub fn over_allocation(conn: &Connection, on: NaiveDate) -> crate::Result<ReportTable> {
    let mut table = ReportTable::new(
        ReportKind::OverAllocation,
        on,
        &["Employee", "From", "To", "Load", "Capacity", "Excess"],
    );
    let window = Period::new(on, Some(add_days(on, OVER_ALLOCATION_WINDOW_DAYS)?))?;
    let ledgers = ledgers(conn)?;
    for employee in employee::list(conn, &EmployeeFilter::default())? {
        let Some(ledger) = ledgers.get(&employee.id) else {
            continue;
        };
        for segment in ledger.overloaded_segments(&window, employee.capacity) {
            table.push_row(vec![
                employee.name.clone().into(),
                segment.period.start().into(),
                segment.period.end().into(),
                segment.load.as_f64().into(),
                employee.capacity.as_f64().into(),
                segment.load.saturating_sub(employee.capacity).as_f64().into(),
            ]);
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use crate::repo::allocation;
    use crate::repo::skill::{self, Proficiency, SkillData};
    use crate::repo::training::{self, CertificationData};
    use crate::report::Cell;
    use crate::tests::utils::{allocation_record, date, seed_staff, test_db};

    #[test]
    fn test_bench_lists_top_skills() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            allocation::insert(conn, &allocation_record(e[0], p[0], "2024-01-01", None, "1"))?;
            for (name, level) in [
                ("Rust", Proficiency::Expert),
                ("SQL", Proficiency::Advanced),
                ("Go", Proficiency::Beginner),
                ("C", Proficiency::Elementary),
            ] {
                let id = skill::insert(
                    conn,
                    &SkillData {
                        name: name.to_string(),
                        category: None,
                    },
                )?;
                skill::upsert_employee_skill(conn, e[1], id, level, None)?;
            }
            let table = super::bench(conn, date("2024-02-01"))?;
            assert_eq!(table.rows.len(), 1);
            assert_eq!(
                table.rows[0][5],
                Cell::Text("Rust (expert), SQL (advanced), C (elementary)".to_string())
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_utilization_totals() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            allocation::insert(conn, &allocation_record(e[0], p[0], "2024-01-01", None, "0.5"))?;
            let mut internal = allocation_record(e[0], p[1], "2024-01-01", None, "0.25");
            internal.billable = false;
            allocation::insert(conn, &internal)?;

            let table = super::utilization(conn, date("2024-02-01"))?;
            let ada = &table.rows[0];
            assert_eq!(ada[4], Cell::Number(0.75));
            assert_eq!(ada[5], Cell::Number(0.5));
            assert_eq!(ada[6], Cell::Number(75.0));
            let footer = table.footer.unwrap();
            assert_eq!(footer[3], Cell::Number(2.0));
            assert_eq!(footer[6], Cell::Number(37.5));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_over_allocation_rows() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, p) = seed_staff(conn)?;
            allocation::insert(conn, &allocation_record(e[0], p[0], "2024-01-01", None, "1"))?;
            allocation::insert(
                conn,
                &allocation_record(e[0], p[1], "2024-02-10", Some("2024-02-20"), "0.5"),
            )?;
            let table = super::over_allocation(conn, date("2024-02-01"))?;
            assert_eq!(table.rows.len(), 1);
            assert_eq!(table.rows[0][1], Cell::Date(date("2024-02-10")));
            assert_eq!(table.rows[0][5], Cell::Number(0.5));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_certifications_window() {
        let db = test_db();
        db.with_conn(|conn| {
            let (e, _) = seed_staff(conn)?;
            for (name, expires) in [("CKA", "2024-02-10"), ("AWS", "2024-05-01")] {
                training::insert_certification(
                    conn,
                    e[0],
                    &CertificationData {
                        name: name.to_string(),
                        issuer: None,
                        issued_on: date("2022-01-01"),
                        expires_on: Some(date(expires)),
                        credential_id: None,
                    },
                )?;
            }
            let table = super::certifications(conn, date("2024-02-01"))?;
            assert_eq!(table.rows.len(), 1);
            assert_eq!(table.rows[0][4], Cell::Number(9.0));
            Ok(())
        })
        .unwrap();
    }
}
