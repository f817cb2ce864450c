//! Remaining-duration estimation for a running test.
//!
//! The estimator collaborator reports how many days a test needs in total
//! from its start date. That figure is turned into days remaining from now
//! and bounded by the test's configured run window, net of the days already
//! elapsed. The result is signed: an overdue test reports zero or negative
//! days so callers can tell it apart.

use chrono::{DateTime, Duration, Utc};

use super::collaborators::{EstimateRequest, EstimatorFactory};
use super::config::{Item, TestDefinition};
use crate::error::{ReportError, Result};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days rounded up. Exact multiples of a day do not round.
pub fn ceil_days(span: Duration) -> i64 {
    let ms = span.num_milliseconds();
    let whole = ms.div_euclid(MS_PER_DAY);
    if ms.rem_euclid(MS_PER_DAY) == 0 {
        whole
    } else {
        whole + 1
    }
}

/// Whole days the test has been running. A start date in the future counts as zero.
pub fn running_days(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_days().max(0)
}

/// Bound `calculated` days by the run window.
///
/// `calculated < 1` means the estimate is unknown or already elapsed; the full
/// `max` window is reported unadjusted. Otherwise the max-ceiling is applied
/// first and the min-floor last, so the floor wins when they cross.
pub fn remaining_days(calculated: i64, min: i64, max: i64, running: i64) -> i64 {
    if calculated < 1 {
        return max;
    }
    let capped = calculated.min(max - running);
    capped.max(min - running)
}

pub fn estimate_remaining_days(
    estimators: &dyn EstimatorFactory,
    host: &Item,
    experience_count: u32,
    required_power: f64,
    definition: &TestDefinition,
    now: DateTime<Utc>,
) -> Result<i64> {
    let (min, max) = definition.duration_bounds()?;
    definition.validate_percentages()?;
    if experience_count < 1 {
        return Err(ReportError::Configuration(format!(
            "test definition {} has no experiences under test",
            definition.id
        )));
    }

    let request = EstimateRequest {
        experience_count,
        required_power,
        traffic_allocation_pct: definition.traffic_allocation_percentage,
        confidence_level_pct: definition.confidence_level_percentage,
    };
    let estimate = estimators
        .estimator(&definition.language, definition.device_name())
        .get_estimate(host, &request, definition)?;

    let day_count = i64::from(estimate.estimated_day_count.unwrap_or(0));
    let calculated = match definition
        .start_date
        .checked_add_signed(Duration::days(day_count))
    {
        Some(end_date) => ceil_days(end_date - now),
        None => {
            // past the representable calendar: same as no estimate
            tracing::debug!(
                definition = %definition.id,
                day_count,
                "estimated end date out of range"
            );
            0
        }
    };
    let running = running_days(definition.start_date, now);

    let days = remaining_days(calculated, min, max, running);
    tracing::trace!(
        definition = %definition.id,
        estimated_day_count = ?estimate.estimated_day_count,
        calculated,
        running,
        days,
        "estimated remaining duration"
    );
    Ok(days)
}
