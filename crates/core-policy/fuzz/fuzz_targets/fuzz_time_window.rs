//! Fuzz target for the time-window evaluation path
//!
//! Arbitrary period/recurrence pairs evaluated at an arbitrary instant
//! must never panic, and a pair that fails to parse must never match.

#![no_main]

use arbitrary::Arbitrary;
use chrono::{Days, NaiveDate, NaiveTime};
use core_policy::calendar::is_within;
use core_policy::{ICalendarEvaluator, RecurrenceEvaluator};
use libfuzzer_sys::fuzz_target;

/// Structured input for one window evaluation
#[derive(Arbitrary, Debug)]
struct WindowInput {
    period: String,
    recurrence: String,
    day_offset: u16,
    second_of_day: u32,
}

fuzz_target!(|input: WindowInput| {
    let Some(base) = NaiveDate::from_ymd_opt(2000, 1, 1) else {
        return;
    };
    let Some(date) = base.checked_add_days(Days::new(u64::from(input.day_offset))) else {
        return;
    };
    let Some(time) =
        NaiveTime::from_num_seconds_from_midnight_opt(input.second_of_day % 86_400, 0)
    else {
        return;
    };
    let now = date.and_time(time);

    let matched = ICalendarEvaluator.evaluate(&input.period, &input.recurrence, now);
    match is_within(&input.period, &input.recurrence, now) {
        Ok(inside) => assert_eq!(matched, inside),
        Err(_) => assert!(!matched, "malformed window must fail closed"),
    }
});
