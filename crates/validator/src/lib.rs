//! Pure validation of an analysis window against the temporal policy.
//!
//! Nothing here touches the network or any session state; a rejected window
//! blocks the whole submission before a request is built.

use crate::error::ValidationError;
use chrono::{Months, NaiveDate};
use configuration::DateSettings;
use core_types::DateRange;

pub mod error;

/// Temporal policy resolved against a concrete "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    /// Calendar months the window must span at least.
    pub minimum_span_months: u32,
    /// Latest date either end may fall on.
    pub max_date: NaiveDate,
    /// Earliest start date, if the data source has a floor.
    pub min_date: Option<NaiveDate>,
}

impl RangePolicy {
    /// Resolves configured settings; `today` becomes the upper bound.
    pub fn from_settings(settings: &DateSettings, today: NaiveDate) -> Self {
        Self {
            minimum_span_months: settings.minimum_span_months,
            max_date: today,
            min_date: settings.earliest_date,
        }
    }
}

/// Validates a start/end pair. Checks run in a fixed order and the first failure wins:
/// reversed bounds, data floor, future dates, then minimum span.
pub fn validate(
    start: NaiveDate,
    end: NaiveDate,
    policy: &RangePolicy,
) -> Result<DateRange, ValidationError> {
    if start > end {
        return Err(ValidationError::StartAfterEnd { start, end });
    }

    if let Some(floor) = policy.min_date {
        if start < floor {
            return Err(ValidationError::DateBeforeFloor { start, floor });
        }
    }

    if end > policy.max_date {
        return Err(ValidationError::DateInFuture { date: end, max: policy.max_date });
    }
    if start > policy.max_date {
        return Err(ValidationError::DateInFuture { date: start, max: policy.max_date });
    }

    // Adding months clamps to the end of shorter months (Jan 31 + 1 month = Feb 28/29).
    let earliest_end = start.checked_add_months(Months::new(policy.minimum_span_months));
    match earliest_end {
        Some(earliest_end) if end >= earliest_end => {}
        other => {
            return Err(ValidationError::SpanTooShort {
                months: policy.minimum_span_months,
                earliest_end: other.unwrap_or(NaiveDate::MAX),
            });
        }
    }

    DateRange::new(start, end).map_err(|_| ValidationError::StartAfterEnd { start, end })
}
