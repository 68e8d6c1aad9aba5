use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

use crate::common::config::ScheduledReport;
use crate::db::Database;
use crate::report::{build, write_to_dir};
use crate::service::access::Access;

/// Earliest moment any schedule fires after `now`, with every report due at that moment.
pub fn next_due(
    schedules: &[ScheduledReport],
    now: NaiveDateTime,
) -> Option<(NaiveDateTime, Vec<&ScheduledReport>)> {
    let next = schedules.iter().map(|s| s.at.next_after(now)).min()?;
    let due = schedules
        .iter()
        .filter(|s| s.at.next_after(now) == next)
        .collect();
    Some((next, due))
}

async fn generate(db: &Database, output_dir: &Path, report: &ScheduledReport) -> crate::Result<PathBuf> {
    let kind = report.kind;
    let format = report.format;
    let dir = output_dir.to_path_buf();
    let table = db
        .call(move |conn| build(conn, &Access::system(), kind, Local::now().date_naive()))
        .await?;
    tokio::task::spawn_blocking(move || write_to_dir(&table, format, &dir)).await?
}

/// Renders scheduled reports forever. Failures of a single report are logged.
pub async fn run_scheduler(db: Database, output_dir: PathBuf, schedules: Vec<ScheduledReport>) {
    if schedules.is_empty() {
        log::debug!("No reports are scheduled");
        return;
    }
    log::info!("Report scheduler started with {} schedule(s)", schedules.len());
    loop {
        let now = Local::now().naive_local();
        let Some((next, due)) = next_due(&schedules, now) else {
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        log::debug!("Next scheduled report at {next}");
        tokio::time::sleep(wait).await;

        for report in due {
            match generate(&db, &output_dir, report).await {
                Ok(path) => log::info!("Scheduled report {} written to {}", report.kind, path.display()),
                Err(error) => log::error!(
                    "Scheduled report {} ({}) failed: {error}",
                    report.kind,
                    report.at
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDateTime};
    use tempfile::TempDir;

    use super::{generate, next_due};
    use crate::common::config::ScheduledReport;
    use crate::report::{ReportFormat, ReportKind, file_name};
    use crate::tests::utils::{seed_staff, test_db};

    fn scheduled(kind: ReportKind, at: &str) -> ScheduledReport {
        ScheduledReport {
            kind,
            format: ReportFormat::Pdf,
            at: at.parse().unwrap(),
        }
    }

    fn time(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_no_schedules() {
        assert!(next_due(&[], time("2024-01-01 00:00")).is_none());
    }

    #[test]
    fn test_picks_earliest() {
        // 2024-01-01 is a Monday
        let schedules = vec![
            scheduled(ReportKind::Bench, "weekly:mon@08:00"),
            scheduled(ReportKind::Utilization, "daily@06:30"),
        ];
        let (at, due) = next_due(&schedules, time("2024-01-01 07:00")).unwrap();
        assert_eq!(at, time("2024-01-01 08:00"));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, ReportKind::Bench);

        let (at, due) = next_due(&schedules, time("2024-01-01 09:00")).unwrap();
        assert_eq!(at, time("2024-01-02 06:30"));
        assert_eq!(due[0].kind, ReportKind::Utilization);
    }

    #[test]
    fn test_groups_reports_due_together() {
        let schedules = vec![
            scheduled(ReportKind::Bench, "daily@08:00"),
            scheduled(ReportKind::Allocations, "weekly:tue@08:00"),
        ];
        let (at, due) = next_due(&schedules, time("2024-01-01 09:00")).unwrap();
        assert_eq!(at, time("2024-01-02 08:00"));
        assert_eq!(due.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_writes_report() {
        let db = test_db();
        db.with_conn(|conn| seed_staff(conn).map(|_| ())).unwrap();
        let dir = TempDir::new().unwrap();
        let report = scheduled(ReportKind::Bench, "daily@08:00");

        let path = generate(&db, dir.path(), &report).await.unwrap();
        let today = Local::now().date_naive();
        assert_eq!(path, dir.path().join(file_name(ReportKind::Bench, ReportFormat::Pdf, today)));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
