use crate::cli::TopMetric;
use crate::error::Result;
use crate::profile::SortKey;
use crate::report::{
    format_bytes, format_count, format_location, format_run_duration, format_secs, json_escape,
};
use crate::storage::{
    CallEntry, HeapEntry, ProfileSummary, open_profile, query_summary, query_top_calls,
    query_top_heap,
};
use std::path::Path;

pub fn run(
    file: &Path,
    metric: TopMetric,
    limit: usize,
    sort: SortKey,
    json: bool,
    csv: bool,
) -> Result<()> {
    let conn = open_profile(file)?;
    let summary = query_summary(&conn)?;

    match metric {
        TopMetric::Calls => {
            let entries = query_top_calls(&conn, sort, limit)?;

            if json {
                print_calls_json(file, &summary, &entries);
            } else if csv {
                print_calls_csv(&entries);
            } else {
                print_calls_table(file, &summary, sort, &entries);
            }
        }
        TopMetric::Heap => {
            let entries = query_top_heap(&conn, limit)?;

            if entries.is_empty() {
                eprintln!("No heap data found. Heap figures require:");
                eprintln!("  - The 'heap' feature of profkit-trace enabled at build time");
                eprintln!("  - A workload that allocates while traced (e.g. `profkit encode -o`)");
                return Ok(());
            }

            if json {
                print_heap_json(file, &summary, &entries);
            } else if csv {
                print_heap_csv(&entries);
            } else {
                print_heap_table(file, &summary, &entries);
            }
        }
    }

    Ok(())
}

fn print_header(file: &Path, summary: &ProfileSummary) {
    println!("# {} ({})", file.display(), summary.workload);
    if let Some(ms) = summary.duration_ms {
        println!(
            "# Duration: {} | Calls: {}",
            format_run_duration(ms),
            format_count(summary.total_calls)
        );
    }
}

fn print_calls_table(file: &Path, summary: &ProfileSummary, sort: SortKey, entries: &[CallEntry]) {
    print_header(file, summary);
    println!("# Ordered by: {}", sort.as_str());
    println!();

    println!(
        "{:>10}  {:>10}  {:>6}  {:>10}  {:<30}  FUNCTION",
        "NCALLS", "TOTTIME", "TOT%", "CUMTIME", "LOCATION"
    );
    println!("{}", "-".repeat(90));

    for entry in entries {
        println!(
            "{:>10}  {:>10}  {:>5.1}%  {:>10}  {:<30}  {}",
            entry.calls,
            format_secs(entry.tottime),
            entry.tottime_percent,
            format_secs(entry.cumtime),
            format_location(&entry.file, entry.line),
            entry.function
        );
    }
}

fn print_calls_json(file: &Path, summary: &ProfileSummary, entries: &[CallEntry]) {
    println!("{{");
    println!("  \"file\": \"{}\",", json_escape(&file.display().to_string()));
    println!("  \"workload\": \"{}\",", json_escape(&summary.workload));
    if let Some(ms) = summary.duration_ms {
        println!("  \"duration_ms\": {},", ms);
    }
    println!("  \"total_calls\": {},", summary.total_calls);
    println!("  \"entries\": [");

    for (i, entry) in entries.iter().enumerate() {
        let comma = if i < entries.len() - 1 { "," } else { "" };
        println!(
            "    {{ \"calls\": {}, \"tottime_ns\": {}, \"cumtime_ns\": {}, \"tottime_pct\": {:.1}, \"file\": \"{}\", \"line\": {}, \"function\": \"{}\" }}{}",
            entry.calls,
            entry.tottime.as_nanos(),
            entry.cumtime.as_nanos(),
            entry.tottime_percent,
            json_escape(&entry.file),
            entry.line,
            json_escape(&entry.function),
            comma
        );
    }

    println!("  ]");
    println!("}}");
}

fn print_calls_csv(entries: &[CallEntry]) {
    println!("calls,tottime_ns,cumtime_ns,tottime_pct,file,line,function");
    for entry in entries {
        println!(
            "{},{},{},{:.1},{},{},\"{}\"",
            entry.calls,
            entry.tottime.as_nanos(),
            entry.cumtime.as_nanos(),
            entry.tottime_percent,
            entry.file,
            entry.line,
            entry.function
        );
    }
}

fn print_heap_table(file: &Path, summary: &ProfileSummary, entries: &[HeapEntry]) {
    print_header(file, summary);
    println!(
        "# Allocs: {} | Total: {}",
        format_count(summary.total_alloc_count),
        format_bytes(summary.total_alloc_bytes)
    );
    println!();

    // Heaptrack-style output: SIZE  CALLS  LOCATION  FUNCTION
    println!(
        "{:>10}  {:>14}  {:>10}  {:<30}  FUNCTION",
        "SIZE", "CALLS", "LIVE", "LOCATION"
    );
    println!("{}", "-".repeat(90));

    for entry in entries {
        let calls = format!("{} allocs", format_count(entry.alloc_count));
        println!(
            "{:>10}  {:>14}  {:>10}  {:<30}  {}",
            format_bytes(entry.alloc_bytes),
            calls,
            format_bytes(entry.live_bytes),
            format_location(&entry.file, entry.line),
            entry.function
        );
    }
}

fn print_heap_json(file: &Path, summary: &ProfileSummary, entries: &[HeapEntry]) {
    println!("{{");
    println!("  \"file\": \"{}\",", json_escape(&file.display().to_string()));
    println!("  \"workload\": \"{}\",", json_escape(&summary.workload));
    if let Some(ms) = summary.duration_ms {
        println!("  \"duration_ms\": {},", ms);
    }
    println!("  \"entries\": [");

    for (i, entry) in entries.iter().enumerate() {
        let comma = if i < entries.len() - 1 { "," } else { "" };
        println!(
            "    {{ \"alloc_bytes\": {}, \"alloc_count\": {}, \"free_bytes\": {}, \"free_count\": {}, \"live_bytes\": {}, \"file\": \"{}\", \"line\": {}, \"function\": \"{}\" }}{}",
            entry.alloc_bytes,
            entry.alloc_count,
            entry.free_bytes,
            entry.free_count,
            entry.live_bytes,
            json_escape(&entry.file),
            entry.line,
            json_escape(&entry.function),
            comma
        );
    }

    println!("  ]");
    println!("}}");
}

fn print_heap_csv(entries: &[HeapEntry]) {
    println!("alloc_bytes,alloc_count,free_bytes,free_count,live_bytes,file,line,function");
    for entry in entries {
        println!(
            "{},{},{},{},{},{},{},\"{}\"",
            entry.alloc_bytes,
            entry.alloc_count,
            entry.free_bytes,
            entry.free_count,
            entry.live_bytes,
            entry.file,
            entry.line,
            entry.function
        );
    }
}
