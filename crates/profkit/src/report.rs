//! Plain-text report formatting shared by the commands
//!
//! Output is simple aligned text so it reads well in a terminal and pastes
//! cleanly into notes.

use crate::profile::{FunctionStats, simplify_path};
use profkit_trace::HeapCounters;
use std::time::Duration;

/// Format bytes as human-readable with decimals (heaptrack style)
pub fn format_bytes(bytes: i64) -> String {
    let abs = bytes.unsigned_abs() as f64;
    let sign = if bytes < 0 { "-" } else { "" };
    if abs >= 1024.0 * 1024.0 * 1024.0 {
        format!("{}{:.2}G", sign, abs / (1024.0 * 1024.0 * 1024.0))
    } else if abs >= 1024.0 * 1024.0 {
        format!("{}{:.2}M", sign, abs / (1024.0 * 1024.0))
    } else if abs >= 1024.0 {
        format!("{}{:.1}K", sign, abs / 1024.0)
    } else {
        format!("{}{}B", sign, bytes.unsigned_abs())
    }
}

/// Format a number with commas for readability
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a file path and line for display
pub fn format_location(file: &str, line: u32) -> String {
    let simplified = simplify_path(file);
    if line > 0 {
        format!("{}:{}", simplified, line)
    } else {
        simplified
    }
}

/// Seconds with microsecond precision, as profiler tables show them
pub fn format_secs(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}

/// Wall time of a run: `1m02s` past a minute, `1.2s` below
pub fn format_run_duration(ms: i64) -> String {
    let secs = ms as f64 / 1000.0;
    if secs >= 60.0 {
        let whole = ms / 1000;
        format!("{}m{:02}s", whole / 60, whole % 60)
    } else {
        format!("{:.1}s", secs)
    }
}

/// Escape a string for embedding in hand-written JSON
pub fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\u{20}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Print the call table: ncalls, tottime, percall, cumtime, percall, site
pub fn print_call_stats(stats: &[FunctionStats], limit: usize) {
    println!(
        "{:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:<30}  FUNCTION",
        "NCALLS", "TOTTIME", "PERCALL", "CUMTIME", "PERCALL", "LOCATION"
    );
    println!("{}", "-".repeat(110));

    for entry in stats.iter().take(limit) {
        println!(
            "{:>10}  {:>10}  {:>10}  {:>10}  {:>10}  {:<30}  {}",
            entry.calls,
            format_secs(entry.tottime),
            format_secs(entry.percall_tottime()),
            format_secs(entry.cumtime),
            format_secs(entry.percall_cumtime()),
            format_location(&entry.location.file, entry.location.line),
            entry.location.function
        );
    }
}

/// Print the allocation table for sites that allocated anything
pub fn print_heap_stats(stats: &[FunctionStats], limit: usize) {
    println!(
        "{:>10}  {:>12}  {:>10}  {:<30}  FUNCTION",
        "SIZE", "CALLS", "LIVE", "LOCATION"
    );
    println!("{}", "-".repeat(90));

    for entry in stats
        .iter()
        .filter(|s| s.heap.alloc_count > 0)
        .take(limit)
    {
        println!(
            "{:>10}  {:>12}  {:>10}  {:<30}  {}",
            format_bytes(entry.heap.alloc_bytes as i64),
            format!("{} allocs", format_count(entry.heap.alloc_count)),
            format_bytes(entry.heap.live_bytes()),
            format_location(&entry.location.file, entry.location.line),
            entry.location.function
        );
    }
}

/// One-line totals for a traced window
pub fn heap_totals_line(totals: &HeapCounters) -> String {
    format!(
        "Allocs: {} | Total: {} | Frees: {} | Live: {}",
        format_count(totals.alloc_count),
        format_bytes(totals.alloc_bytes as i64),
        format_count(totals.free_count),
        format_bytes(totals.live_bytes())
    )
}
