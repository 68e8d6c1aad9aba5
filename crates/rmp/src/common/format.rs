use chrono::NaiveDate;
use staffing::Fte;

/// `0.5 (50%)`
pub fn human_fte(fte: Fte) -> String {
    format!("{} ({}%)", fte, format_percentage(fte.percentage()))
}

pub fn format_percentage(value: f64) -> String {
    let text = format!("{value:.1}");
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

pub fn format_end_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string())
}
