//! A minimal 5-field cron parser (minute hour day-of-month month
//! day-of-week), evaluated in UTC.
//!
//! No timezone-aware cron crate is available, so `RoutineRow::timezone`
//! is accepted but not applied — see `DESIGN.md`.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::{RoutineError, RoutineResult};

/// One parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minute: Vec<u32>,
    hour: Vec<u32>,
    day_of_month: Vec<u32>,
    month: Vec<u32>,
    day_of_week: Vec<u32>,
}

/// Search horizon for `next_after`: if no matching minute is found
/// within four years, the expression is treated as unsatisfiable.
const SEARCH_HORIZON_MINUTES: i64 = 4 * 365 * 24 * 60;

impl CronSchedule {
    /// Parse a standard 5-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns [`RoutineError::MalformedRule`] if `expr` doesn't have
    /// exactly five whitespace-separated fields or a field is out of
    /// range.
    pub fn parse(expr: &str) -> RoutineResult<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(RoutineError::MalformedRule(format!(
                "cron expression {expr:?} must have 5 fields, found {}",
                fields.len()
            )));
        };
        Ok(Self {
            minute: parse_field(minute, 0, 59)?,
            hour: parse_field(hour, 0, 23)?,
            day_of_month: parse_field(day_of_month, 1, 31)?,
            month: parse_field(month, 1, 12)?,
            day_of_week: parse_field(day_of_week, 0, 6)?,
        })
    }

    /// The first minute-aligned instant strictly after `after` that
    /// satisfies this schedule.
    ///
    /// # Errors
    ///
    /// Returns [`RoutineError::MalformedRule`] if no match falls within
    /// a four-year search horizon (almost always a misconfigured
    /// expression, e.g. `31 2 *` which never occurs).
    pub fn next_after(&self, after: DateTime<Utc>) -> RoutineResult<DateTime<Utc>> {
        let mut candidate = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after)
            + Duration::minutes(1);

        for _ in 0..SEARCH_HORIZON_MINUTES {
            if self.matches(candidate) {
                return Ok(candidate);
            }
            candidate += Duration::minutes(1);
        }

        Err(RoutineError::MalformedRule(format!(
            "no occurrence found within {SEARCH_HORIZON_MINUTES} minutes"
        )))
    }

    fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.contains(&at.minute())
            && self.hour.contains(&at.hour())
            && self.day_of_month.contains(&at.day())
            && self.month.contains(&at.month())
            && self.day_of_week.contains(&(at.weekday().num_days_from_sunday()))
    }
}

fn parse_field(field: &str, min: u32, max: u32) -> RoutineResult<Vec<u32>> {
    let mut values = Vec::new();
    for part in field.split(',') {
        values.extend(parse_part(part, min, max)?);
    }
    values.sort_unstable();
    values.dedup();
    Ok(values)
}

fn parse_part(part: &str, min: u32, max: u32) -> RoutineResult<Vec<u32>> {
    let (range_spec, step) = match part.split_once('/') {
        Some((base, step)) => (
            base,
            step.parse::<u32>()
                .map_err(|_| RoutineError::MalformedRule(format!("bad step {step:?}")))?,
        ),
        None => (part, 1),
    };
    if step == 0 {
        return Err(RoutineError::MalformedRule("step of 0 is invalid".into()));
    }

    let (lo, hi) = if range_spec == "*" {
        (min, max)
    } else if let Some((lo, hi)) = range_spec.split_once('-') {
        let lo = lo
            .parse::<u32>()
            .map_err(|_| RoutineError::MalformedRule(format!("bad range start {lo:?}")))?;
        let hi = hi
            .parse::<u32>()
            .map_err(|_| RoutineError::MalformedRule(format!("bad range end {hi:?}")))?;
        (lo, hi)
    } else {
        let value = range_spec
            .parse::<u32>()
            .map_err(|_| RoutineError::MalformedRule(format!("bad field value {range_spec:?}")))?;
        (value, value)
    };

    if lo < min || hi > max || lo > hi {
        return Err(RoutineError::MalformedRule(format!(
            "field value {lo}-{hi} out of range {min}-{max}"
        )));
    }

    Ok((lo..=hi).step_by(step as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn every_minute_matches_anything() {
        let schedule = CronSchedule::parse("* * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 45).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 12, 31, 0).unwrap());
    }

    #[test]
    fn top_of_every_hour() {
        let schedule = CronSchedule::parse("0 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn daily_at_specific_time() {
        let schedule = CronSchedule::parse("15 9 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 9, 16, 0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 9, 15, 0).unwrap());
    }

    #[test]
    fn weekday_only_schedule_skips_weekend() {
        // 2026-01-02 is a Friday; next weekday fire should be Monday 2026-01-05.
        let schedule = CronSchedule::parse("0 8 * * 1-5").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap());
    }

    #[test]
    fn step_values_are_expanded() {
        let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 15, 0).unwrap());
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(CronSchedule::parse("* * *").is_err());
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(CronSchedule::parse("0 25 * * *").is_err());
    }

    #[test]
    fn unsatisfiable_day_of_month_errors_within_horizon() {
        let schedule = CronSchedule::parse("0 0 31 2 *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(schedule.next_after(after).is_err());
    }
}
