pub mod db;
pub mod eval;
pub mod window;

use app_utils::SystemClock;
use chrono::NaiveDateTime;
use core_policy::calendar::parse_date_time;
use core_policy::Clock;

/// `--at` value, or the host's local time
fn evaluation_time(at: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    match at {
        Some(text) => parse_date_time(text)
            .map_err(|e| anyhow::anyhow!("Invalid --at value '{}': {}", text, e)),
        None => Ok(SystemClock.now()),
    }
}
