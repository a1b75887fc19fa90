use super::evaluation_time;
use colored::*;
use core_policy::calendar::is_within;

pub fn run(period: &str, recurrence: &str, at: Option<&str>) -> anyhow::Result<()> {
    let now = evaluation_time(at)?;
    let within = is_within(period, recurrence, now)
        .map_err(|e| anyhow::anyhow!("Invalid window: {}", e))?;

    let rule = if recurrence.is_empty() { "(period only)" } else { recurrence };
    println!("{} {} {}", "Window:".bold(), period, rule);
    println!("  Time: {}", now.format("%Y-%m-%d %H:%M:%S"));
    if within {
        println!("{} inside the window", "✓".green().bold());
    } else {
        println!("{} outside the window", "✗".red().bold());
    }

    Ok(())
}
