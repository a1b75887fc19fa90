use app_utils::SecurityDatabase;
use colored::*;
use core_policy::calendar::{Period, Recurrence};
use std::collections::HashSet;

pub fn check(file_path: &str) -> anyhow::Result<()> {
    println!("{} {}", "Checking security database:".bold(), file_path);

    let db = SecurityDatabase::from_path(file_path)
        .map_err(|e| anyhow::anyhow!("Invalid security database: {}", e))?;
    let acl = db.acl_store()?;
    let amacl = db.amacl_store()?;

    match db.owner {
        Some(owner) => println!("  {} Owner: {}", "✓".green(), owner),
        None => println!("  {} Owner: none (device unowned)", "✓".green()),
    }
    println!("  {} ACEs: {}", "✓".green(), acl.len());
    println!("  {} AMACL entries: {}", "✓".green(), amacl.len());

    let mut warnings = 0;

    let mut seen = HashSet::new();
    for (i, ace) in db.acl.iter().enumerate() {
        let key = (ace.subject, ace.resources.clone(), ace.permission.bits());
        if !seen.insert(key) {
            println!("  {} ACE {} is a duplicate", "⚠".yellow(), i + 1);
            warnings += 1;
        }

        // Such windows fail closed at evaluation time
        if !ace.periods.is_empty() && ace.periods.len() != ace.recurrences.len() {
            println!(
                "  {} ACE {} has {} period(s) but {} recurrence(s); it never matches",
                "⚠".yellow(),
                i + 1,
                ace.periods.len(),
                ace.recurrences.len()
            );
            warnings += 1;
        }
        for period in &ace.periods {
            if let Err(e) = Period::parse(period) {
                println!("  {} ACE {} period '{}': {}", "⚠".yellow(), i + 1, period, e);
                warnings += 1;
            }
        }
        for recurrence in ace.recurrences.iter().filter(|r| !r.is_empty()) {
            if let Err(e) = Recurrence::parse(recurrence) {
                println!("  {} ACE {} recurrence '{}': {}", "⚠".yellow(), i + 1, recurrence, e);
                warnings += 1;
            }
        }
    }

    println!();
    if warnings == 0 {
        println!("{} Security database is valid!", "✓".green().bold());
    } else {
        println!(
            "{} Security database is valid with {} warning(s)",
            "⚠".yellow().bold(),
            warnings
        );
    }

    Ok(())
}
