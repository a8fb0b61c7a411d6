//! Report and record printing for the terminal.

use serde::Serialize;

use logistics_autopilot::CycleReport;

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("  Error: could not serialize output: {e}"),
    }
}

pub fn print_reports(reports: &[CycleReport], json: bool) {
    if json {
        print_json(&reports);
        return;
    }
    for report in reports {
        print_report(report);
    }
}

fn print_report(report: &CycleReport) {
    let status = match (&report.error, report.failures.is_empty()) {
        (Some(_), _) => "aborted",
        (None, true) => "ok",
        (None, false) => "partial",
    };
    println!("{} cycle: {status}", report.domain);
    println!("  started:   {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  elapsed:   {}ms", report.elapsed_ms);
    println!("  processed: {}", report.processed);
    println!("  acted:     {}", report.acted);
    println!("  skipped:   {}", report.skipped);
    if let Some(error) = &report.error {
        println!("  error:     {error}");
    }
    if !report.failures.is_empty() {
        println!("  failures:");
        for (id, kind) in &report.failures {
            let kind = serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("{kind:?}"));
            println!("    {id:<12} {kind}");
        }
    }
}
