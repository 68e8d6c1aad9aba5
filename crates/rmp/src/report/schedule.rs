//! When scheduled reports run.
//!
//! Schedules are written as `daily@HH:MM` or `weekly:<day>@HH:MM` where the
//! day is one of `mon`, `tue`, `wed`, `thu`, `fri`, `sat`, `sun`. Times are in
//! the local time zone of the server.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::char;
use nom::combinator::{cut, map, map_res, value};
use nom::sequence::{preceded, separated_pair, tuple};
use serde::Deserialize;

use crate::common::parser::{NomResult, consume_all, p_u32};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Schedule {
    Daily { at: NaiveTime },
    Weekly { day: Weekday, at: NaiveTime },
}

fn p_time(input: &str) -> NomResult<NaiveTime> {
    map_res(tuple((p_u32, char(':'), p_u32)), |(hour, _, minute)| {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("invalid time of day {hour:02}:{minute:02}"))
    })(input)
}

fn p_weekday(input: &str) -> NomResult<Weekday> {
    alt((
        value(Weekday::Mon, tag("mon")),
        value(Weekday::Tue, tag("tue")),
        value(Weekday::Wed, tag("wed")),
        value(Weekday::Thu, tag("thu")),
        value(Weekday::Fri, tag("fri")),
        value(Weekday::Sat, tag("sat")),
        value(Weekday::Sun, tag("sun")),
    ))(input)
}

fn p_schedule(input: &str) -> NomResult<Schedule> {
    alt((
        map(preceded(tag("daily@"), cut(p_time)), |at| Schedule::Daily { at }),
        map(
            preceded(
                tag("weekly:"),
                cut(separated_pair(p_weekday, char('@'), p_time)),
            ),
            |(day, at)| Schedule::Weekly { day, at },
        ),
    ))(input)
}

pub fn parse_schedule(input: &str) -> anyhow::Result<Schedule> {
    consume_all(p_schedule, input.trim())
}

impl Schedule {
    /// First run strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Schedule::Daily { at } => {
                let candidate = now.date().and_time(at);
                if candidate > now {
                    candidate
                } else {
                    candidate + Days::new(1)
                }
            }
            Schedule::Weekly { day, at } => {
                let ahead = (7 + day.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
                let candidate = now.date().and_time(at) + Days::new(ahead.into());
                if candidate > now {
                    candidate
                } else {
                    candidate + Days::new(7)
                }
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_schedule(s)
    }
}

impl TryFrom<String> for Schedule {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_schedule(&value).map_err(|e| anyhow!("invalid schedule `{value}`: {e}"))
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Daily { at } => write!(f, "daily@{}", at.format("%H:%M")),
            Schedule::Weekly { day, at } => {
                write!(f, "weekly:{}@{}", weekday_name(*day), at.format("%H:%M"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDateTime, NaiveTime, Weekday};

    use super::{Schedule, parse_schedule};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            parse_schedule("daily@06:30").unwrap(),
            Schedule::Daily { at: time(6, 30) }
        );
        assert_eq!(
            parse_schedule("weekly:fri@17:05").unwrap(),
            Schedule::Weekly {
                day: Weekday::Fri,
                at: time(17, 5)
            }
        );
        assert_eq!(
            parse_schedule("weekly:mon@8:00").unwrap().to_string(),
            "weekly:mon@08:00"
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_schedule("monthly@08:00").is_err());
        assert!(parse_schedule("daily@08").is_err());
        assert!(parse_schedule("weekly:xyz@08:00").is_err());
        assert!(parse_schedule("daily@08:00 extra").is_err());
        insta::assert_snapshot!(
            parse_schedule("daily@25:00").unwrap_err().to_string(),
            @"Semantic error at '25:00': invalid time of day 25:00"
        );
    }

    #[test]
    fn test_next_daily() {
        let schedule = Schedule::Daily { at: time(8, 0) };
        assert_eq!(schedule.next_after(at("2024-05-01 07:59")), at("2024-05-01 08:00"));
        assert_eq!(schedule.next_after(at("2024-05-01 08:00")), at("2024-05-02 08:00"));
        assert_eq!(schedule.next_after(at("2024-12-31 23:00")), at("2025-01-01 08:00"));
    }

    #[test]
    fn test_next_weekly() {
        // 2024-05-01 is a Wednesday
        let schedule = Schedule::Weekly {
            day: Weekday::Mon,
            at: time(8, 0),
        };
        assert_eq!(schedule.next_after(at("2024-05-01 12:00")), at("2024-05-06 08:00"));
        assert_eq!(schedule.next_after(at("2024-05-06 07:00")), at("2024-05-06 08:00"));
        assert_eq!(schedule.next_after(at("2024-05-06 08:00")), at("2024-05-13 08:00"));
        let same_day = Schedule::Weekly {
            day: Weekday::Wed,
            at: time(18, 0),
        };
        assert_eq!(same_day.next_after(at("2024-05-01 12:00")), at("2024-05-01 18:00"));
    }
}
