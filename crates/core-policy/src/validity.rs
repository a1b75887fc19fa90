//! Time-window validation (SRP - only answers "is this ACE valid now?")
//!
//! The validator depends on two abstractions (DIP):
//!
//! - [`Clock`]: where "now" comes from
//! - [`RecurrenceEvaluator`]: how one period/recurrence pair is evaluated
//!
//! The default evaluator is [`ICalendarEvaluator`], backed by
//! [`crate::calendar`].

use crate::ace::AccessControlEntry;
use crate::calendar;
use chrono::NaiveDateTime;

/// Source of the current local time
pub trait Clock {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Evaluates whether `now` falls in one recurring window
pub trait RecurrenceEvaluator {
    /// True if `now` is inside `period` under `recurrence`
    ///
    /// An empty `recurrence` means the period alone applies. Malformed
    /// input must yield `false`.
    fn evaluate(&self, period: &str, recurrence: &str, now: NaiveDateTime) -> bool;
}

/// Default evaluator: iCalendar periods with daily `RRULE`s
#[derive(Debug, Clone, Copy, Default)]
pub struct ICalendarEvaluator;

impl RecurrenceEvaluator for ICalendarEvaluator {
    fn evaluate(&self, period: &str, recurrence: &str, now: NaiveDateTime) -> bool {
        calendar::is_within(period, recurrence, now).unwrap_or(false)
    }
}

/// Decides whether an ACE is currently within one of its validity windows
#[derive(Debug, Clone, Copy)]
pub struct TimeWindowValidator<E = ICalendarEvaluator> {
    evaluator: E,
    trusted_clock: bool,
}

impl Default for TimeWindowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeWindowValidator {
    /// Validator using the iCalendar evaluator
    #[must_use]
    pub const fn new() -> Self {
        Self {
            evaluator: ICalendarEvaluator,
            trusted_clock: true,
        }
    }

    /// Degraded-trust validator for platforms without a reliable clock
    ///
    /// Every ACE is considered within its windows. Only for devices that
    /// cannot keep real time; time restrictions are not enforced at all.
    #[must_use]
    pub const fn untrusted_clock() -> Self {
        Self {
            evaluator: ICalendarEvaluator,
            trusted_clock: false,
        }
    }
}

impl<E: RecurrenceEvaluator> TimeWindowValidator<E> {
    /// Validator using a custom evaluator
    #[must_use]
    pub const fn with_evaluator(evaluator: E, trusted_clock: bool) -> Self {
        Self {
            evaluator,
            trusted_clock,
        }
    }

    /// False when running in degraded-trust mode
    #[must_use]
    pub const fn is_clock_trusted(&self) -> bool {
        self.trusted_clock
    }

    /// True if `now` lies within any of the ACE's windows
    ///
    /// - no periods: always valid
    /// - periods without recurrences, or lists of different length: never
    ///   valid (misconfigured, fail closed)
    /// - otherwise: valid on the first matching pair
    #[must_use]
    pub fn is_within_valid_time(&self, ace: &AccessControlEntry, now: NaiveDateTime) -> bool {
        if !self.trusted_clock || ace.periods.is_empty() {
            return true;
        }
        if ace.recurrences.len() != ace.periods.len() {
            return false;
        }
        ace.periods
            .iter()
            .zip(ace.recurrences.iter())
            .any(|(period, recurrence)| self.evaluator.evaluate(period, recurrence, now))
    }
}
