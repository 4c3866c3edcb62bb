use chrono::NaiveDate;
use thiserror::Error;

/// Why an analysis window was rejected. Only the first failing check is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Start date {start} must be before end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("Start date {start} is before the earliest available date {floor}")]
    DateBeforeFloor { start: NaiveDate, floor: NaiveDate },

    #[error("{date} is after the latest allowed date {max}")]
    DateInFuture { date: NaiveDate, max: NaiveDate },

    #[error("End date must be at least {months} months after the start date (earliest allowed end: {earliest_end})")]
    SpanTooShort { months: u32, earliest_end: NaiveDate },
}
