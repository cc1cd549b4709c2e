use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::profile::{Profiler, SortKey};
use crate::report;
use crate::workload;
use profkit_trace::HeapCounters;

/// Figures from one traced encoding run
pub struct EncodeRun {
    pub written: usize,
    pub totals: HeapCounters,
    pub profiler: Profiler,
}

/// Encode `events` cycled sample events into `sink` with heap tracing on
pub fn profile_encode<W: Write>(events: usize, sink: &mut W) -> Result<EncodeRun> {
    let samples = workload::sample_events(chrono::Local::now().naive_local());
    let profiler = Profiler::new();

    profkit_trace::reset();
    profkit_trace::start();
    let before = profkit_trace::snapshot();
    let written = workload::encode_events(workload::cycle_events(&samples, events), sink, &profiler);
    let totals = profkit_trace::snapshot().delta(&before);
    profkit_trace::stop();

    let written = written?;
    sink.flush()?;
    tracing::info!(written, allocs = totals.alloc_count, "encoded events");

    Ok(EncodeRun {
        written,
        totals,
        profiler,
    })
}

/// Create the stream file. Without a path, a temporary file is created and
/// kept after the run so the output can be inspected.
pub fn open_stream(stream: Option<&Path>) -> Result<(File, PathBuf)> {
    match stream {
        Some(path) => Ok((File::create(path)?, path.to_path_buf())),
        None => {
            let scratch = tempfile::Builder::new()
                .prefix("profkit-events.")
                .suffix(".txt")
                .tempfile()?;
            Ok(scratch.keep().map_err(io::Error::from)?)
        }
    }
}

pub fn run(events: usize, stream: Option<&Path>, top: usize, output: Option<&Path>) -> Result<()> {
    let (file, stream_path) = open_stream(stream)?;
    eprintln!("Encoding to {}", stream_path.display());

    let mut sink = BufWriter::new(file);
    let run = profile_encode(events, &mut sink)?;
    drop(sink);
    let elapsed = run.profiler.elapsed();

    println!("# encode | {} events -> {}", run.written, stream_path.display());
    if profkit_trace::heap_compiled() {
        println!("# {}", report::heap_totals_line(&run.totals));
    } else {
        println!("# Heap tracing not compiled in (enable the `heap` feature of profkit-trace)");
    }
    println!();

    let stats = run.profiler.stats(SortKey::Heap);
    report::print_heap_stats(&stats, top);
    println!();
    report::print_call_stats(&stats, top);

    if let Some(path) = output {
        super::save_profile(
            path,
            "encode",
            &run.profiler,
            elapsed,
            &[
                ("events", run.written.to_string()),
                ("alloc_count", run.totals.alloc_count.to_string()),
                ("alloc_bytes", run.totals.alloc_bytes.to_string()),
            ],
        )?;
    }

    Ok(())
}
