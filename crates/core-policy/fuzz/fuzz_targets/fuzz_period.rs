//! Fuzz target for Period::parse and Recurrence::parse
//!
//! Both parsers see untrusted text from installed ACLs and must only ever
//! return a Result.

#![no_main]

use core_policy::calendar::{Period, Recurrence};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(period) = Period::parse(text) {
        assert!(period.end() > period.start(), "accepted period must be non-empty");
    }
    let _ = Recurrence::parse(text);
});
